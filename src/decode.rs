//! Streaming markup decoder.
//!
//! The decoder is forgiving about whitespace and case, but strict about structure:
//! Every container element must be closed by a matching end tag, and self-closing syntax is only accepted for SVG content and component placeholders.
//!
//! Text inside SVG content is kept like any other text, since `<text>`, `<title>` and `<desc>` need it.
//! Whitespace-only runs are dropped everywhere.

use crate::{error::DecodeError, node::Namespace, tags, transform::AttributeTransform};
use hashbrown::HashSet;
use memchr::{memchr, memmem};
use std::{borrow::Cow, collections::BTreeMap};
use tracing::trace;

/// One decoded node event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
	/// A trimmed, non-empty text run with character references resolved.
	Text(String),
	/// A container element. It is closed by a later [`Token::End`] with the same name.
	Start(Tag),
	/// A void or self-closing element. It has no children and no [`Token::End`].
	Empty(Tag),
	/// A nested component placeholder. Never has children.
	Component(Tag),
	End(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
	/// Lower-cased tag name.
	pub name: String,
	pub namespace: Option<Namespace>,
	/// Transformed attributes. If a name appears more than once, the first occurrence wins.
	pub attributes: BTreeMap<String, String>,
	pub self_closing: bool,
}

/// Pulls [`Token`]s out of rendered markup, one at a time.
///
/// ```
/// # use compo_dom::decode::{Decoder, Token};
/// let mut decoder = Decoder::new("<div class=greeting>Hello <!-- name --> world!</div>");
/// let Some(Token::Start(div)) = decoder.next_token()? else { unreachable!() };
/// assert_eq!(div.attributes["class"], "greeting");
/// assert_eq!(decoder.next_token()?, Some(Token::Text("Hello  world!".to_owned())));
/// assert_eq!(decoder.next_token()?, Some(Token::End("div".to_owned())));
/// assert_eq!(decoder.next_token()?, None);
/// # Ok::<(), compo_dom::error::DecodeError>(())
/// ```
pub struct Decoder<'a> {
	tokenizer: Tokenizer<'a>,
	peeked: Option<Raw<'a>>,
	transforms: &'a [AttributeTransform],
	allowed_nodes: Option<&'a HashSet<String>>,
	open: Vec<String>,
	svg_depth: usize,
}
impl<'a> Decoder<'a> {
	#[must_use]
	pub fn new(markup: &'a str) -> Self {
		Self {
			tokenizer: Tokenizer::new(markup),
			peeked: None,
			transforms: &[],
			allowed_nodes: None,
			open: Vec::new(),
			svg_depth: 0,
		}
	}

	/// Attribute transforms, applied in order to each attribute of each decoded tag.
	#[must_use]
	pub fn with_transforms(mut self, transforms: &'a [AttributeTransform]) -> Self {
		self.transforms = transforms;
		self
	}

	/// Restricts elements (but not component placeholders) to the given tag names, unless the set is empty.
	#[must_use]
	pub fn with_allowed_nodes(mut self, allowed_nodes: &'a HashSet<String>) -> Self {
		self.allowed_nodes = (!allowed_nodes.is_empty()).then_some(allowed_nodes);
		self
	}

	/// Whether the decoder is currently inside an `<svg>` element.
	#[must_use]
	pub fn in_svg(&self) -> bool {
		self.svg_depth > 0
	}

	/// Decodes the next node event, or returns [`None`] once the markup is exhausted.
	///
	/// # Errors
	///
	/// Iff the markup is malformed or contains a disallowed element.
	/// The decoder must not be used further after an error.
	pub fn next_token(&mut self) -> Result<Option<Token>, DecodeError> {
		loop {
			let raw = match self.peeked.take() {
				Some(raw) => raw,
				None => match self.tokenizer.next()? {
					Some(raw) => raw,
					None => {
						return match self.open.pop() {
							Some(name) => Err(DecodeError::UnexpectedEof(name)),
							None => Ok(None),
						}
					}
				},
			};

			match raw {
				Raw::Text(mut text) => {
					loop {
						match self.tokenizer.next()? {
							Some(Raw::Text(more)) => text.to_mut().push_str(&more),
							other => {
								self.peeked = other;
								break;
							}
						}
					}
					let trimmed = text.trim();
					if !trimmed.is_empty() {
						return Ok(Some(Token::Text(trimmed.to_owned())));
					}
				}

				Raw::Start { name, attributes, self_closing } => return self.start(name, attributes, self_closing).map(Some),

				Raw::End(name) => {
					if self.svg_depth == 0 && (tags::is_void(&name) || !tags::is_standard(&name)) {
						trace!(name = name.as_str(), "Skipped end tag without start token.");
						continue;
					}
					return match self.open.pop() {
						None => Err(DecodeError::UnexpectedEndTag(name)),
						Some(expected) if expected != name => Err(DecodeError::MismatchedEndTag { expected, found: name }),
						Some(_) => {
							if name == "svg" {
								self.svg_depth = self.svg_depth.saturating_sub(1);
							}
							Ok(Some(Token::End(name)))
						}
					};
				}
			}
		}
	}

	fn start(&mut self, name: String, attributes: Vec<(String, String)>, self_closing: bool) -> Result<Token, DecodeError> {
		if !self.in_svg() && !tags::is_standard(&name) {
			return Ok(Token::Component(self.tag(name, None, attributes, self_closing)));
		}

		if let Some(allowed_nodes) = self.allowed_nodes {
			if !allowed_nodes.contains(&name) {
				return Err(DecodeError::Disallowed(name));
			}
		}

		let namespace = (self.in_svg() || name == "svg").then_some(Namespace::Svg);
		if self_closing {
			if namespace.is_none() {
				return Err(DecodeError::SelfClosingOutsideSvg(name));
			}
			return Ok(Token::Empty(self.tag(name, namespace, attributes, true)));
		}
		if namespace.is_none() && tags::is_void(&name) {
			return Ok(Token::Empty(self.tag(name, namespace, attributes, false)));
		}

		if name == "svg" {
			self.svg_depth += 1;
		}
		self.open.push(name.clone());
		Ok(Token::Start(self.tag(name, namespace, attributes, false)))
	}

	fn tag(&self, name: String, namespace: Option<Namespace>, attributes: Vec<(String, String)>, self_closing: bool) -> Tag {
		let mut map = BTreeMap::new();
		for (mut key, mut value) in attributes {
			if namespace == Some(Namespace::Svg) {
				let restored = tags::svg_attribute_name(&key);
				if restored != key {
					key = restored.to_owned();
				}
			}
			for transform in self.transforms {
				(key, value) = transform(key, value);
			}
			map.entry(key).or_insert(value);
		}
		Tag {
			name,
			namespace,
			attributes: map,
			self_closing,
		}
	}
}
impl core::fmt::Debug for Decoder<'_> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Decoder")
			.field("position", &self.tokenizer.position)
			.field("open", &self.open)
			.field("svg_depth", &self.svg_depth)
			.field("transforms", &self.transforms.len())
			.field("allowed_nodes", &self.allowed_nodes)
			.finish_non_exhaustive()
	}
}

enum Raw<'a> {
	/// Character references are already resolved.
	Text(Cow<'a, str>),
	Start {
		name: String,
		attributes: Vec<(String, String)>,
		self_closing: bool,
	},
	End(String),
}

/// Splits markup into tags and text. Comments, doctypes and processing instructions are dropped here.
struct Tokenizer<'a> {
	markup: &'a str,
	position: usize,
	/// Set after the start tag of an element whose content isn't markup.
	raw_text_of: Option<String>,
}
impl<'a> Tokenizer<'a> {
	fn new(markup: &'a str) -> Self {
		Self {
			markup,
			position: 0,
			raw_text_of: None,
		}
	}

	fn bytes(&self) -> &'a [u8] {
		self.markup.as_bytes()
	}

	fn next(&mut self) -> Result<Option<Raw<'a>>, DecodeError> {
		if let Some(name) = self.raw_text_of.take() {
			if let Some(text) = self.raw_text(name)? {
				return Ok(Some(Raw::Text(text)));
			}
		}

		let bytes = self.bytes();
		while self.position < bytes.len() {
			if bytes[self.position] == b'<' {
				match (bytes.get(self.position + 1), bytes.get(self.position + 2)) {
					(Some(b'!'), _) => {
						self.skip_declaration();
						continue;
					}
					(Some(b'?'), _) => {
						self.skip_past(b'>');
						continue;
					}
					(Some(b'/'), Some(&c)) if is_tag_start_byte(c) => return self.end_tag().map(Some),
					(Some(&c), _) if is_tag_start_byte(c) => return self.start_tag().map(Some),
					_ => (),
				}
			}
			return Ok(Some(Raw::Text(self.text())));
		}
		Ok(None)
	}

	fn is_markup_start(&self, at: usize) -> bool {
		let bytes = self.bytes();
		match (bytes.get(at + 1), bytes.get(at + 2)) {
			(Some(b'!' | b'?'), _) => true,
			(Some(b'/'), Some(&c)) => is_tag_start_byte(c),
			(Some(&c), _) => is_tag_start_byte(c),
			(None, _) => false,
		}
	}

	fn text(&mut self) -> Cow<'a, str> {
		let bytes = self.bytes();
		let start = self.position;
		let mut end = start + 1;
		loop {
			match memchr(b'<', &bytes[end..]) {
				Some(offset) if self.is_markup_start(end + offset) => {
					end += offset;
					break;
				}
				Some(offset) => end += offset + 1,
				None => {
					end = bytes.len();
					break;
				}
			}
		}
		self.position = end;
		unescape(&self.markup[start..end])
	}

	fn skip_past(&mut self, byte: u8) {
		let bytes = self.bytes();
		self.position = memchr(byte, &bytes[self.position..]).map_or(bytes.len(), |offset| self.position + offset + 1);
	}

	fn skip_declaration(&mut self) {
		let rest = &self.bytes()[self.position..];
		if rest.starts_with(b"<!--") {
			self.position = memmem::find(&rest[4..], b"-->").map_or(self.markup.len(), |offset| self.position + 4 + offset + 3);
		} else {
			self.skip_past(b'>');
		}
	}

	fn name(&mut self) -> String {
		let bytes = self.bytes();
		let start = self.position;
		while self.position < bytes.len() && is_tag_name_byte(bytes[self.position]) {
			self.position += 1;
		}
		self.markup[start..self.position].to_ascii_lowercase()
	}

	fn skip_whitespace(&mut self) {
		let bytes = self.bytes();
		while self.position < bytes.len() && bytes[self.position].is_ascii_whitespace() {
			self.position += 1;
		}
	}

	fn end_tag(&mut self) -> Result<Raw<'a>, DecodeError> {
		self.position += 2;
		let name = self.name();
		match memchr(b'>', &self.bytes()[self.position..]) {
			Some(offset) => {
				self.position += offset + 1;
				Ok(Raw::End(name))
			}
			None => Err(DecodeError::UnexpectedEof(name)),
		}
	}

	fn start_tag(&mut self) -> Result<Raw<'a>, DecodeError> {
		self.position += 1;
		let name = self.name();
		let bytes = self.bytes();
		let mut attributes = Vec::new();
		let self_closing = loop {
			self.skip_whitespace();
			match bytes.get(self.position) {
				None => return Err(DecodeError::UnexpectedEof(name)),
				Some(b'>') => {
					self.position += 1;
					break false;
				}
				Some(b'/') => {
					self.position += 1;
					if bytes.get(self.position) == Some(&b'>') {
						self.position += 1;
						break true;
					}
				}
				Some(_) => attributes.push(self.attribute(&name)?),
			}
		};

		if !self_closing && tags::is_raw_text(&name) {
			self.raw_text_of = Some(name.clone());
		}
		Ok(Raw::Start { name, attributes, self_closing })
	}

	fn attribute(&mut self, tag: &str) -> Result<(String, String), DecodeError> {
		let bytes = self.bytes();
		let start = self.position;
		while self.position < bytes.len() && !matches!(bytes[self.position], b'=' | b'>' | b'/') && !bytes[self.position].is_ascii_whitespace() {
			self.position += 1;
		}
		if self.position == start {
			self.position += 1;
		}
		let name = &self.markup[start..self.position];
		if !name.bytes().all(is_attribute_name_byte) {
			return Err(DecodeError::InvalidAttributeName {
				tag: tag.to_owned(),
				name: name.to_owned(),
			});
		}
		let name = name.to_ascii_lowercase();

		self.skip_whitespace();
		if bytes.get(self.position) != Some(&b'=') {
			return Ok((name, String::new()));
		}
		self.position += 1;
		self.skip_whitespace();

		let value = match bytes.get(self.position) {
			None => return Err(DecodeError::UnexpectedEof(tag.to_owned())),
			Some(&quote @ (b'"' | b'\'')) => {
				let value_start = self.position + 1;
				let Some(offset) = memchr(quote, &bytes[value_start..]) else {
					return Err(DecodeError::UnterminatedAttributeValue { tag: tag.to_owned(), name });
				};
				self.position = value_start + offset + 1;
				&self.markup[value_start..value_start + offset]
			}
			Some(_) => {
				let value_start = self.position;
				while self.position < bytes.len()
					&& bytes[self.position] != b'>'
					&& !bytes[self.position].is_ascii_whitespace()
					&& !bytes[self.position..].starts_with(b"/>")
				{
					self.position += 1;
				}
				&self.markup[value_start..self.position]
			}
		};
		Ok((name, unescape(value).into_owned()))
	}

	/// Consumes the content of a raw text element up to (but excluding) its end tag.
	fn raw_text(&mut self, name: String) -> Result<Option<Cow<'a, str>>, DecodeError> {
		let bytes = self.bytes();
		let start = self.position;
		let mut at = start;
		let end = loop {
			let Some(offset) = memmem::find(&bytes[at..], b"</") else {
				return Err(DecodeError::UnexpectedEof(name));
			};
			at += offset;
			let name_end = at + 2 + name.len();
			if bytes.get(at + 2..name_end).is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
				&& bytes.get(name_end).map_or(true, |&c| c == b'>' || c.is_ascii_whitespace())
			{
				break at;
			}
			at += 2;
		};
		self.position = end;

		let content = &self.markup[start..end];
		Ok(if content.is_empty() {
			None
		} else if matches!(name.as_str(), "textarea" | "title") {
			Some(unescape(content))
		} else {
			Some(Cow::Borrowed(content))
		})
	}
}

fn is_tag_start_byte(c: u8) -> bool {
	c.is_ascii_alphabetic() || c == b'_'
}

fn is_tag_name_byte(c: u8) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b':' | b'.')
}

/// Whether `name` is read back as a single tag name.
pub(crate) fn is_tag_name(name: &str) -> bool {
	let mut bytes = name.bytes();
	bytes.next().map_or(false, is_tag_start_byte) && bytes.all(is_tag_name_byte)
}

fn is_attribute_name_byte(c: u8) -> bool {
	is_tag_name_byte(c) || c == b'@'
}

/// Resolves character references. Unknown or malformed references are kept as they are.
#[must_use]
pub fn unescape(text: &str) -> Cow<'_, str> {
	let Some(first) = memchr(b'&', text.as_bytes()) else {
		return Cow::Borrowed(text);
	};

	let mut unescaped = String::with_capacity(text.len());
	unescaped.push_str(&text[..first]);
	let mut rest = &text[first..];
	while let Some(at) = rest.find('&') {
		unescaped.push_str(&rest[..at]);
		rest = &rest[at..];
		let window = &rest.as_bytes()[1..rest.len().min(12)];
		let reference = memchr(b';', window).map(|end| &rest[1..=end]);
		match reference.and_then(|reference| Some((reference.len(), resolve_reference(reference)?))) {
			Some((length, c)) => {
				unescaped.push(c);
				rest = &rest[length + 2..];
			}
			None => {
				unescaped.push('&');
				rest = &rest[1..];
			}
		}
	}
	unescaped.push_str(rest);
	Cow::Owned(unescaped)
}

fn resolve_reference(reference: &str) -> Option<char> {
	match reference {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		numeric => {
			let numeric = numeric.strip_prefix('#')?;
			let code = match numeric.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => numeric.parse().ok()?,
			};
			char::from_u32(code)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unescapes_references() {
		assert_eq!(unescape("plain"), Cow::Borrowed("plain"));
		assert_eq!(unescape("a &amp; b &lt;c&gt; &#39;d&#x27; &quot;"), "a & b <c> 'd' \"");
		assert_eq!(unescape("&unknown; & &#xZZ; &"), "&unknown; & &#xZZ; &");
		assert_eq!(unescape("caf&#233;&nbsp;"), "café\u{a0}");
	}

	#[test]
	fn literal_angle_bracket_is_text() {
		let mut tokenizer = Tokenizer::new("1 < 2 <b>");
		let Some(Raw::Text(text)) = tokenizer.next().unwrap() else { panic!() };
		assert_eq!(text, "1 < 2 ");
		assert!(matches!(tokenizer.next().unwrap(), Some(Raw::Start { name, .. }) if name == "b"));
	}

	#[test]
	fn names_may_start_with_an_underscore() {
		let mut tokenizer = Tokenizer::new("<_inner.child></_inner.child>");
		assert!(matches!(tokenizer.next().unwrap(), Some(Raw::Start { name, .. }) if name == "_inner.child"));
		assert!(matches!(tokenizer.next().unwrap(), Some(Raw::End(name)) if name == "_inner.child"));

		assert!(is_tag_name("_inner.child"));
		assert!(is_tag_name("app.foo"));
		assert!(!is_tag_name(""));
		assert!(!is_tag_name("1st.foo"));
		assert!(!is_tag_name("ünï.foo"));
	}

	#[test]
	fn raw_text_is_not_markup() {
		let mut tokenizer = Tokenizer::new("<script>if (a <b) {}</SCRIPT >");
		assert!(matches!(tokenizer.next().unwrap(), Some(Raw::Start { .. })));
		let Some(Raw::Text(text)) = tokenizer.next().unwrap() else { panic!() };
		assert_eq!(text, "if (a <b) {}");
		assert!(matches!(tokenizer.next().unwrap(), Some(Raw::End(name)) if name == "script"));
		assert!(tokenizer.next().unwrap().is_none());
	}

	#[test]
	fn attribute_forms() {
		let mut tokenizer = Tokenizer::new(r#"<input Disabled value = 'a "b"' id=x data-n="&amp;"/>"#);
		let Some(Raw::Start { attributes, self_closing, .. }) = tokenizer.next().unwrap() else { panic!() };
		assert!(self_closing);
		assert_eq!(
			attributes,
			[("disabled", ""), ("value", r#"a "b""#), ("id", "x"), ("data-n", "&")]
				.iter()
				.map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
				.collect::<Vec<_>>()
		);
	}
}
