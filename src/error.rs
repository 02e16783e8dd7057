use thiserror::Error;

/// Failure reported by a [`ChangeSink`](`crate::diff::ChangeSink`).
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("component {0:?} is not registered")]
	NotRegistered(String),

	#[error("component is not mounted")]
	ComponentNotMounted,

	#[error(transparent)]
	Template(#[from] TemplateError),

	#[error(transparent)]
	Decode(#[from] DecodeError),

	#[error(transparent)]
	FieldMapping(#[from] FieldMappingError),

	#[error("syncing changes failed")]
	Sync(#[source] SinkError),

	/// A nested component failed to map its fields or to render.
	#[error("rendering {component} failed")]
	Nested {
		component: String,
		#[source]
		source: Box<Error>,
	},
}
impl Error {
	/// Unwraps [`Error::Nested`] layers.
	#[must_use]
	pub fn root_cause(&self) -> &Error {
		match self {
			Error::Nested { source, .. } => source.root_cause(),
			other => other,
		}
	}

	pub(crate) fn nested(component: &str, source: Error) -> Self {
		Error::Nested {
			component: component.to_owned(),
			source: Box::new(source),
		}
	}
}

#[derive(Debug, Error)]
pub enum ValidationError {
	/// Distinct zero-sized values can't be told apart by identity.
	#[error("{type_name} is zero-sized; components need at least one field with storage")]
	ZeroSized { type_name: &'static str },

	#[error("{type_name} would be registered as {name:?}, which can't be written as a tag name")]
	InvalidName { type_name: &'static str, name: String },

	#[error("{type_name} would be registered as {name:?}, which is a standard markup tag")]
	ReservedName { type_name: &'static str, name: String },

	#[error("{type_name} would be registered as {name:?}, which is already taken by {existing}")]
	NameConflict {
		type_name: &'static str,
		name: String,
		existing: &'static str,
	},
}

#[derive(Debug, Error)]
pub enum TemplateError {
	#[error("parsing the component template failed")]
	Parse(#[source] minijinja::Error),

	#[error("executing the component template failed")]
	Exec(#[source] minijinja::Error),

	#[error("template extension can't be named {0:?}")]
	ExtensionConflict(String),

	#[error("component does not render anything")]
	EmptyRender,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
	#[error("unexpected end of markup in <{0}>")]
	UnexpectedEof(String),

	#[error("<{0}> is not allowed")]
	Disallowed(String),

	#[error("<{0} /> is self-closing outside of an svg element")]
	SelfClosingOutsideSvg(String),

	#[error("invalid attribute name {name:?} in <{tag}>")]
	InvalidAttributeName { tag: String, name: String },

	#[error("unterminated value of attribute {name:?} in <{tag}>")]
	UnterminatedAttributeValue { tag: String, name: String },

	#[error("expected </{expected}> but found </{found}>")]
	MismatchedEndTag { expected: String, found: String },

	#[error("unexpected </{0}>")]
	UnexpectedEndTag(String),

	#[error("markup contains no node")]
	NoRoot,
}

#[derive(Debug, Error)]
#[error("failed to map {field}={value:?} onto {component}")]
pub struct FieldMappingError {
	pub component: String,
	pub field: String,
	pub value: String,
	#[source]
	pub source: Box<dyn std::error::Error + Send + Sync>,
}
