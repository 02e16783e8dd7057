//! Typed setter tables mapping placeholder attributes onto component fields.

use crate::{component::Component, error::FieldMappingError};
use core::{any::type_name, marker::PhantomData, str::FromStr};
use num_traits::{Float, Num};
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, error::Error as StdError, fmt};

type BoxError = Box<dyn StdError + Send + Sync>;
type Setter<C> = Box<dyn Fn(&mut C, &str) -> Result<(), BoxError> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKind {
	String,
	Boolean,
	Integer,
	Float,
	Json,
}

struct Field<C> {
	name: String,
	kind: FieldKind,
	set: Setter<C>,
}

/// The assignable fields of a component type `C`.
///
/// Attribute names are matched against the lower-cased field names given here.
///
/// ```
/// # use compo_dom::fields::Fields;
/// #[derive(Default)]
/// struct Greeting {
/// 	name: String,
/// 	shout: bool,
/// 	repeat: u8,
/// }
///
/// let fields = Fields::<Greeting>::new()
/// 	.string("name", |g, v| g.name = v)
/// 	.boolean("shout", |g, v| g.shout = v)
/// 	.integer("repeat", |g, v| g.repeat = v);
/// assert_eq!(fields.len(), 3);
/// ```
pub struct Fields<C> {
	fields: Vec<Field<C>>,
	_phantom: PhantomData<fn(&mut C)>,
}
impl<C> Default for Fields<C> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Fields<C> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			fields: Vec::new(),
			_phantom: PhantomData,
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	fn with(mut self, name: &str, kind: FieldKind, set: Setter<C>) -> Self {
		let name = name.to_lowercase();
		self.fields.retain(|field| field.name != name);
		self.fields.push(Field { name, kind, set });
		self
	}

	/// A field taking the attribute value as-is.
	#[must_use]
	pub fn string(self, name: &str, set: impl Fn(&mut C, String) + Send + Sync + 'static) -> Self {
		self.with(
			name,
			FieldKind::String,
			Box::new(move |c, value| {
				set(c, value.to_owned());
				Ok(())
			}),
		)
	}

	/// A flag field. A valueless attribute sets it. If the attribute is missing, it is reset to `false`.
	#[must_use]
	pub fn boolean(self, name: &str, set: impl Fn(&mut C, bool) + Send + Sync + 'static) -> Self {
		self.with(
			name,
			FieldKind::Boolean,
			Box::new(move |c, value| {
				set(c, parse_bool(value)?);
				Ok(())
			}),
		)
	}

	/// An integer field. Accepts an optional sign, `0x`, `0o`, `0b` or (octal) `0` prefixes and `_` between digits.
	#[must_use]
	pub fn integer<T: Num + 'static>(self, name: &str, set: impl Fn(&mut C, T) + Send + Sync + 'static) -> Self
	where
		T::FromStrRadixErr: StdError + Send + Sync + 'static,
	{
		self.with(
			name,
			FieldKind::Integer,
			Box::new(move |c, value| {
				set(c, parse_integer(value)?);
				Ok(())
			}),
		)
	}

	#[must_use]
	pub fn float<T: Float + FromStr + 'static>(self, name: &str, set: impl Fn(&mut C, T) + Send + Sync + 'static) -> Self
	where
		<T as FromStr>::Err: StdError + Send + Sync + 'static,
	{
		self.with(
			name,
			FieldKind::Float,
			Box::new(move |c, value| {
				set(c, value.trim().parse()?);
				Ok(())
			}),
		)
	}

	/// A field of any other type, decoded from a JSON attribute value.
	#[must_use]
	pub fn json<T: DeserializeOwned + 'static>(self, name: &str, set: impl Fn(&mut C, T) + Send + Sync + 'static) -> Self {
		self.with(
			name,
			FieldKind::Json,
			Box::new(move |c, value| {
				set(c, serde_json::from_str(value)?);
				Ok(())
			}),
		)
	}

	/// Assigns `attributes` to `component`.
	///
	/// Attributes without a matching field are ignored.
	///
	/// # Errors
	///
	/// Iff an attribute value can't be converted to its field's type.
	/// Fields before the failing one (in declaration order) keep their new values.
	pub fn map(&self, component: &mut C, attributes: &BTreeMap<String, String>) -> Result<(), FieldMappingError> {
		for field in &self.fields {
			let result = match (attributes.get(&field.name), field.kind) {
				(Some(value), _) => (field.set)(component, value).map_err(|source| (value.as_str(), source)),
				(None, FieldKind::Boolean) => (field.set)(component, "false").map_err(|source| ("", source)),
				(None, _) => Ok(()),
			};
			if let Err((value, source)) = result {
				return Err(FieldMappingError {
					component: type_name::<C>().to_owned(),
					field: field.name.clone(),
					value: value.to_owned(),
					source,
				});
			}
		}
		Ok(())
	}
}
impl<C> fmt::Debug for Fields<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.fields.iter().map(|field| (&field.name, field.kind))).finish()
	}
}

/// Type-erased [`Fields`], as stored by the [`Factory`](`crate::factory::Factory`).
pub(crate) trait FieldMapper: Send + Sync {
	fn map_fields(&self, component: &mut dyn Component, attributes: &BTreeMap<String, String>) -> Result<(), FieldMappingError>;
}
impl<C: Component> FieldMapper for Fields<C> {
	fn map_fields(&self, component: &mut dyn Component, attributes: &BTreeMap<String, String>) -> Result<(), FieldMappingError> {
		let component = component
			.as_any_mut()
			.downcast_mut::<C>()
			.unwrap_or_else(|| panic!("compo-dom bug: Field table of {} applied to a different component type.", type_name::<C>()));
		self.map(component, attributes)
	}
}

#[derive(Debug)]
struct InvalidBool(String);
impl fmt::Display for InvalidBool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?} is not a boolean", self.0)
	}
}
impl StdError for InvalidBool {}

fn parse_bool(value: &str) -> Result<bool, InvalidBool> {
	match value.trim() {
		"" | "1" | "t" | "T" | "true" | "True" | "TRUE" => Ok(true),
		"0" | "f" | "F" | "false" | "False" | "FALSE" => Ok(false),
		other => Err(InvalidBool(other.to_owned())),
	}
}

#[derive(Debug)]
struct MisplacedSeparator(String);
impl fmt::Display for MisplacedSeparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?} has a digit separator that isn't between digits", self.0)
	}
}
impl StdError for MisplacedSeparator {}

/// Parses an integer literal with an optional sign and base prefix.
///
/// A lone leading `0` selects octal, and `_` may separate digits.
fn parse_integer<T: Num>(value: &str) -> Result<T, BoxError>
where
	T::FromStrRadixErr: StdError + Send + Sync + 'static,
{
	let value = value.trim();
	let (negative, unsigned) = match value.as_bytes().first() {
		Some(b'-') => (true, &value[1..]),
		Some(b'+') => (false, &value[1..]),
		_ => (false, value),
	};
	let prefix = unsigned.get(..2).map(str::to_ascii_lowercase);
	let (radix, digits, prefixed) = match prefix.as_deref() {
		Some("0x") => (16, &unsigned[2..], true),
		Some("0o") => (8, &unsigned[2..], true),
		Some("0b") => (2, &unsigned[2..], true),
		_ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..], true),
		_ => (10, unsigned, false),
	};

	let digits = if digits.contains('_') {
		if (!prefixed && digits.starts_with('_')) || digits.ends_with('_') || digits.contains("__") {
			return Err(MisplacedSeparator(value.to_owned()).into());
		}
		digits.replace('_', "")
	} else {
		digits.to_owned()
	};
	let digits = if negative { format!("-{}", digits) } else { digits };
	Ok(T::from_str_radix(&digits, radix)?)
}
