//! Executes component templates.

use crate::{component::Component, error::TemplateError};
use minijinja::{value::Rest, AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use std::sync::Arc;
use time::{format_description, OffsetDateTime};
use tracing::{instrument, trace};

/// Resolves the path segments given to the `resources` template function into a URL.
pub type ResourceResolver = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

/// Function names that component extensions may not use.
///
/// Besides the renderer's own, this includes the template engine's global functions.
pub const BUILTIN_FUNCTIONS: &[&str] = &["raw", "json", "time", "resources", "range", "dict", "namespace", "debug"];

/// Resolves to `/resources/` followed by the `/`-joined segments.
#[must_use]
pub fn default_resources() -> ResourceResolver {
	Arc::new(|segments: &[String]| format!("/resources/{}", segments.join("/")))
}

/// Renders components into markup.
///
/// Templates are [minijinja](https://docs.rs/minijinja) templates with HTML auto-escaping and strict undefined variable handling.
/// The template context is the component's serialized data.
///
/// Available functions, besides those of the component's [`funcs`](`Component::funcs`):
///
/// - `raw(text)`: Inserts `text` without escaping.
/// - `json(value)`: Serializes `value` as JSON.
/// - `time(unix_seconds, format)`: Formats a UTC timestamp with a [`time` format description](https://time-rs.github.io/book/api/format-description.html).
/// - `resources(segments...)`: Resolves a static resource URL.
#[derive(Clone)]
pub struct TemplateRenderer {
	resources: ResourceResolver,
}
impl Default for TemplateRenderer {
	fn default() -> Self {
		Self::new(default_resources())
	}
}
impl TemplateRenderer {
	#[must_use]
	pub fn new(resources: ResourceResolver) -> Self {
		Self { resources }
	}

	/// Renders `component` and returns the trimmed markup.
	///
	/// # Errors
	///
	/// - [`TemplateError::ExtensionConflict`] iff an extension function shadows a built-in one.
	/// - [`TemplateError::Parse`] and [`TemplateError::Exec`] for template failures.
	/// - [`TemplateError::EmptyRender`] iff the output is only whitespace.
	#[instrument(skip_all, fields(component = component.type_path()))]
	pub fn render(&self, component: &dyn Component) -> Result<String, TemplateError> {
		let source = component.render();

		let mut environment = Environment::new();
		environment.set_auto_escape_callback(|_| AutoEscape::Html);
		environment.set_undefined_behavior(UndefinedBehavior::Strict);
		environment.add_function("raw", raw);
		environment.add_function("json", json);
		environment.add_function("time", format_time);
		let resources = self.resources.clone();
		environment.add_function("resources", move |segments: Rest<String>| Value::from_safe_string(resources(&segments.0)));

		for (name, function) in component.funcs() {
			if BUILTIN_FUNCTIONS.contains(&&*name) {
				return Err(TemplateError::ExtensionConflict(name.into_owned()));
			}
			environment.add_function(name.into_owned(), move |arguments: Rest<Value>| function(&arguments.0));
		}

		let template = environment.template_from_str(&source).map_err(TemplateError::Parse)?;
		let markup = template.render(component.template_context()).map_err(TemplateError::Exec)?;

		let trimmed = markup.trim();
		if trimmed.is_empty() {
			return Err(TemplateError::EmptyRender);
		}
		#[cfg(feature = "dangerous-logging")]
		trace!(markup = trimmed, "Rendered.");
		#[cfg(not(feature = "dangerous-logging"))]
		trace!(length = trimmed.len(), "Rendered.");
		Ok(if trimmed.len() == markup.len() { markup } else { trimmed.to_owned() })
	}
}
impl core::fmt::Debug for TemplateRenderer {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("TemplateRenderer").finish_non_exhaustive()
	}
}

fn raw(text: String) -> Value {
	Value::from_safe_string(text)
}

fn json(value: Value) -> Result<String, minijinja::Error> {
	serde_json::to_string(&value).map_err(invalid("value is not serializable as JSON"))
}

fn invalid<E: std::error::Error + Send + Sync + 'static>(message: &'static str) -> impl FnOnce(E) -> minijinja::Error {
	move |error| minijinja::Error::new(ErrorKind::InvalidOperation, message).with_source(error)
}

fn format_time(unix_seconds: i64, format: &str) -> Result<String, minijinja::Error> {
	let time = OffsetDateTime::from_unix_timestamp(unix_seconds).map_err(invalid("timestamp out of range"))?;
	let format = format_description::parse_owned::<2>(format).map_err(invalid("invalid time format description"))?;
	time.format(&format).map_err(invalid("time formatting failed"))
}
