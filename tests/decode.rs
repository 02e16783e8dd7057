use compo_dom::{
	decode::{Decoder, Tag, Token},
	error::DecodeError,
	transform::{handler_binding, AttributeTransform},
	Namespace,
};
use hashbrown::HashSet;
use std::sync::Arc;

fn tokens(decoder: &mut Decoder<'_>) -> Result<Vec<Token>, DecodeError> {
	let mut tokens = Vec::new();
	while let Some(token) = decoder.next_token()? {
		tokens.push(token);
	}
	Ok(tokens)
}

fn tag(name: &str, namespace: Option<Namespace>, attributes: &[(&str, &str)], self_closing: bool) -> Tag {
	Tag {
		name: name.to_owned(),
		namespace,
		attributes: attributes.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
		self_closing,
	}
}

fn end(name: &str) -> Token {
	Token::End(name.to_owned())
}

#[test]
fn empty_markup() {
	assert!(tokens(&mut Decoder::new("")).unwrap().is_empty());
	assert!(tokens(&mut Decoder::new("  \n\t <!-- nothing --> ")).unwrap().is_empty());
}

#[test]
fn elements_and_text() {
	let mut decoder = Decoder::new(
		r#"
		<!DOCTYPE html>
		<DIV Class="a">
			Hello &amp; <!-- skipped --> welcome
			<br></br>
			<input type=checkbox checked>
		</div>
		"#,
	);
	assert_eq!(
		tokens(&mut decoder).unwrap(),
		[
			Token::Start(tag("div", None, &[("class", "a")], false)),
			Token::Text("Hello &  welcome".to_owned()),
			Token::Empty(tag("br", None, &[], false)),
			Token::Empty(tag("input", None, &[("checked", ""), ("type", "checkbox")], false)),
			end("div"),
		]
	);
}

#[test]
fn svg_namespace_and_self_closing() {
	let mut decoder = Decoder::new(r#"<svg viewbox="0 0 1 1"><path d="M0" /><foreignObject></foreignObject></svg><br>"#);

	let Some(Token::Start(svg)) = decoder.next_token().unwrap() else { panic!() };
	assert_eq!(svg, tag("svg", Some(Namespace::Svg), &[("viewBox", "0 0 1 1")], false));
	assert!(decoder.in_svg());

	assert_eq!(
		decoder.next_token().unwrap(),
		Some(Token::Empty(tag("path", Some(Namespace::Svg), &[("d", "M0")], true)))
	);
	assert_eq!(
		decoder.next_token().unwrap(),
		Some(Token::Start(tag("foreignobject", Some(Namespace::Svg), &[], false)))
	);
	assert_eq!(decoder.next_token().unwrap(), Some(end("foreignobject")));
	assert_eq!(decoder.next_token().unwrap(), Some(end("svg")));
	assert!(!decoder.in_svg());

	assert_eq!(decoder.next_token().unwrap(), Some(Token::Empty(tag("br", None, &[], false))));
	assert_eq!(decoder.next_token().unwrap(), None);
}

#[test]
fn self_closing_svg_root() {
	let mut decoder = Decoder::new("<div><svg /></div>");
	assert_eq!(
		tokens(&mut decoder).unwrap(),
		[
			Token::Start(tag("div", None, &[], false)),
			Token::Empty(tag("svg", Some(Namespace::Svg), &[], true)),
			end("div"),
		]
	);
}

#[test]
fn self_closing_outside_svg() {
	let mut decoder = Decoder::new("<div />");
	assert_eq!(decoder.next_token(), Err(DecodeError::SelfClosingOutsideSvg("div".to_owned())));

	let mut decoder = Decoder::new("<p>line<br/></p>");
	assert!(matches!(decoder.next_token(), Ok(Some(Token::Start(_)))));
	assert_eq!(decoder.next_token(), Ok(Some(Token::Text("line".to_owned()))));
	assert_eq!(decoder.next_token(), Err(DecodeError::SelfClosingOutsideSvg("br".to_owned())));
}

#[test]
fn components_are_terminal() {
	let mut decoder = Decoder::new(r#"<div><App.Foo Value="x" disabled>ignored end</app.foo></div>"#);
	assert_eq!(
		tokens(&mut decoder).unwrap(),
		[
			Token::Start(tag("div", None, &[], false)),
			Token::Component(tag("app.foo", None, &[("disabled", ""), ("value", "x")], false)),
			Token::Text("ignored end".to_owned()),
			end("div"),
		]
	);
}

#[test]
fn raw_text_elements() {
	let mut decoder = Decoder::new("<script>if (a <b && c) {}</script><textarea>&lt;b&gt;</textarea>");
	assert_eq!(
		tokens(&mut decoder).unwrap(),
		[
			Token::Start(tag("script", None, &[], false)),
			Token::Text("if (a <b && c) {}".to_owned()),
			end("script"),
			Token::Start(tag("textarea", None, &[], false)),
			Token::Text("<b>".to_owned()),
			end("textarea"),
		]
	);
}

#[test]
fn structure_errors() {
	assert_eq!(tokens(&mut Decoder::new("</div>")), Err(DecodeError::UnexpectedEndTag("div".to_owned())));
	assert_eq!(
		tokens(&mut Decoder::new("<div><span></div>")),
		Err(DecodeError::MismatchedEndTag {
			expected: "span".to_owned(),
			found: "div".to_owned(),
		})
	);
	assert_eq!(tokens(&mut Decoder::new("<div><p>")), Err(DecodeError::UnexpectedEof("p".to_owned())));
	assert_eq!(tokens(&mut Decoder::new("<div class")), Err(DecodeError::UnexpectedEof("div".to_owned())));
}

#[test]
fn attribute_errors() {
	assert_eq!(
		tokens(&mut Decoder::new(r#"<div %error="42">"#)),
		Err(DecodeError::InvalidAttributeName {
			tag: "div".to_owned(),
			name: "%error".to_owned(),
		})
	);
	assert_eq!(
		tokens(&mut Decoder::new(r#"<div title="open>"#)),
		Err(DecodeError::UnterminatedAttributeValue {
			tag: "div".to_owned(),
			name: "title".to_owned(),
		})
	);
}

#[test]
fn first_duplicate_attribute_wins() {
	let mut decoder = Decoder::new(r#"<p id="a" ID="b"></p>"#);
	let Some(Token::Start(p)) = decoder.next_token().unwrap() else { panic!() };
	assert_eq!(p.attributes["id"], "a");
	assert_eq!(p.attributes.len(), 1);
}

#[test]
fn allowed_nodes() {
	let allowed: HashSet<String> = ["div".to_owned()].into_iter().collect();
	let mut decoder = Decoder::new("<div><app.foo><span></span></div>").with_allowed_nodes(&allowed);
	assert!(matches!(decoder.next_token(), Ok(Some(Token::Start(_)))));
	assert!(matches!(decoder.next_token(), Ok(Some(Token::Component(_)))));
	assert_eq!(decoder.next_token(), Err(DecodeError::Disallowed("span".to_owned())));

	let everything = HashSet::new();
	let mut decoder = Decoder::new("<div><span></span></div>").with_allowed_nodes(&everything);
	assert_eq!(tokens(&mut decoder).unwrap().len(), 4);
}

#[test]
fn transforms_apply_in_order() {
	let upper: AttributeTransform = Arc::new(|name: String, value: String| (name, value.to_uppercase()));
	let transforms = [handler_binding(), upper];
	let mut decoder = Decoder::new(r#"<button onclick="save" title="ok"></button>"#).with_transforms(&transforms);
	let Some(Token::Start(button)) = decoder.next_token().unwrap() else { panic!() };
	assert_eq!(button.attributes["onclick"], "CALLCOMPOHANDLER(THIS, EVENT, 'SAVE')");
	assert_eq!(button.attributes["title"], "OK");
}

#[test]
fn svg_text_is_kept() {
	let mut decoder = Decoder::new("<svg>\n\t<text x=\"1\">label</text>\n</svg>");
	assert_eq!(
		tokens(&mut decoder).unwrap(),
		[
			Token::Start(tag("svg", Some(Namespace::Svg), &[], false)),
			Token::Start(tag("text", Some(Namespace::Svg), &[("x", "1")], false)),
			Token::Text("label".to_owned()),
			end("text"),
			end("svg"),
		]
	);
}
