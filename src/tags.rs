//! Static tag and attribute tables used while decoding.

/// Whether `name` is a standard markup element and therefore never a component placeholder.
#[must_use]
pub fn is_standard(name: &str) -> bool {
	matches!(
		name,
		"a" | "abbr"
			| "address" | "area"
			| "article" | "aside"
			| "audio" | "b"
			| "base" | "bdi"
			| "bdo" | "blockquote"
			| "body" | "br"
			| "button" | "canvas"
			| "caption" | "cite"
			| "code" | "col"
			| "colgroup" | "data"
			| "datalist" | "dd"
			| "del" | "details"
			| "dfn" | "dialog"
			| "div" | "dl"
			| "dt" | "em"
			| "embed" | "fieldset"
			| "figcaption" | "figure"
			| "footer" | "form"
			| "h1" | "h2"
			| "h3" | "h4"
			| "h5" | "h6"
			| "head" | "header"
			| "hgroup" | "hr"
			| "html" | "i"
			| "iframe" | "img"
			| "input" | "ins"
			| "kbd" | "keygen"
			| "label" | "legend"
			| "li" | "link"
			| "main" | "map"
			| "mark" | "math"
			| "menu" | "menuitem"
			| "meta" | "meter"
			| "nav" | "noscript"
			| "object" | "ol"
			| "optgroup" | "option"
			| "output" | "p"
			| "param" | "picture"
			| "pre" | "progress"
			| "q" | "rp"
			| "rt" | "ruby"
			| "s" | "samp"
			| "script" | "search"
			| "section" | "select"
			| "slot" | "small"
			| "source" | "span"
			| "strong" | "style"
			| "sub" | "summary"
			| "sup" | "svg"
			| "table" | "tbody"
			| "td" | "template"
			| "textarea" | "tfoot"
			| "th" | "thead"
			| "time" | "title"
			| "tr" | "track"
			| "u" | "ul"
			| "var" | "video"
			| "wbr"
	)
}

/// Elements that never have content outside of SVG.
#[must_use]
pub fn is_void(name: &str) -> bool {
	matches!(
		name,
		"area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "keygen" | "link" | "meta" | "param" | "source" | "track" | "wbr"
	)
}

/// Elements whose content is not parsed as markup.
pub(crate) fn is_raw_text(name: &str) -> bool {
	matches!(name, "script" | "style" | "textarea" | "title")
}

/// Restores the case of a lower-cased SVG attribute name.
///
/// Unknown names are returned unchanged.
#[must_use]
pub fn svg_attribute_name(lower: &str) -> &str {
	match lower {
		"allowreorder" => "allowReorder",
		"attributename" => "attributeName",
		"attributetype" => "attributeType",
		"autoreverse" => "autoReverse",
		"basefrequency" => "baseFrequency",
		"baseprofile" => "baseProfile",
		"calcmode" => "calcMode",
		"clippathunits" => "clipPathUnits",
		"contentscripttype" => "contentScriptType",
		"contentstyletype" => "contentStyleType",
		"diffuseconstant" => "diffuseConstant",
		"externalresourcesrequired" => "externalResourcesRequired",
		"filterres" => "filterRes",
		"filterunits" => "filterUnits",
		"glyphref" => "glyphRef",
		"gradienttransform" => "gradientTransform",
		"gradientunits" => "gradientUnits",
		"kernelmatrix" => "kernelMatrix",
		"kernelunitlength" => "kernelUnitLength",
		"keypoints" => "keyPoints",
		"keysplines" => "keySplines",
		"keytimes" => "keyTimes",
		"lengthadjust" => "lengthAdjust",
		"limitingconeangle" => "limitingConeAngle",
		"markerheight" => "markerHeight",
		"markerunits" => "markerUnits",
		"markerwidth" => "markerWidth",
		"maskcontentunits" => "maskContentUnits",
		"maskunits" => "maskUnits",
		"numoctaves" => "numOctaves",
		"pathlength" => "pathLength",
		"patterncontentunits" => "patternContentUnits",
		"patterntransform" => "patternTransform",
		"patternunits" => "patternUnits",
		"pointsatx" => "pointsAtX",
		"pointsaty" => "pointsAtY",
		"pointsatz" => "pointsAtZ",
		"preservealpha" => "preserveAlpha",
		"preserveaspectratio" => "preserveAspectRatio",
		"primitiveunits" => "primitiveUnits",
		"referrerpolicy" => "referrerPolicy",
		"refx" => "refX",
		"refy" => "refY",
		"repeatcount" => "repeatCount",
		"repeatdur" => "repeatDur",
		"requiredextensions" => "requiredExtensions",
		"requiredfeatures" => "requiredFeatures",
		"specularconstant" => "specularConstant",
		"specularexponent" => "specularExponent",
		"spreadmethod" => "spreadMethod",
		"startoffset" => "startOffset",
		"stddeviation" => "stdDeviation",
		"stitchtiles" => "stitchTiles",
		"surfacescale" => "surfaceScale",
		"systemlanguage" => "systemLanguage",
		"tablevalues" => "tableValues",
		"targetx" => "targetX",
		"targety" => "targetY",
		"textlength" => "textLength",
		"viewbox" => "viewBox",
		"viewtarget" => "viewTarget",
		"xchannelselector" => "xChannelSelector",
		"ychannelselector" => "yChannelSelector",
		"zoomandpan" => "zoomAndPan",
		other => other,
	}
}
