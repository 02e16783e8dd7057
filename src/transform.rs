//! Attribute rewriting applied while decoding.

use crate::factory::{component_base, component_name_from_url, Factory};
use std::sync::Arc;
use url::Url;

/// Rewrites one decoded attribute, given as `(name, value)`.
pub type AttributeTransform = Arc<dyn Fn(String, String) -> (String, String) + Send + Sync>;

/// Binds `on*` event attributes to the host's component handler dispatch.
///
/// Values starting with `js:` are kept as plain script, without the prefix.
///
/// ```
/// # use compo_dom::transform::handler_binding;
/// let transform = handler_binding();
/// assert_eq!(transform("onclick".into(), "Toggle".into()).1, "callCompoHandler(this, event, 'Toggle')");
/// assert_eq!(transform("onclick".into(), "js:alert(1)".into()).1, "alert(1)");
/// assert_eq!(transform("title".into(), "Toggle".into()).1, "Toggle");
/// ```
#[must_use]
pub fn handler_binding() -> AttributeTransform {
	Arc::new(|name: String, value: String| {
		if !name.starts_with("on") {
			return (name, value);
		}
		let value = match value.strip_prefix("js:") {
			Some(script) => script.to_owned(),
			None => format!("callCompoHandler(this, event, '{}')", value),
		};
		(name, value)
	})
}

/// Rewrites relative `href` links to registered components into component links.
///
/// ```
/// # use compo_dom::{factory::Factory, transform::href_component};
/// # use std::sync::Arc;
/// # #[derive(Default, serde::Serialize)] struct Hello { name: String }
/// # impl compo_dom::Component for Hello { fn render(&self) -> String { "<p>{{ name }}</p>".into() } }
/// # impl compo_dom::ComponentType for Hello {}
/// let factory = Arc::new(Factory::new());
/// let hello = factory.register::<Hello>()?;
///
/// let transform = href_component(factory);
/// assert_eq!(transform("href".into(), format!("{}?name=World", hello)).1, format!("compo:///{}?name=World", hello));
/// assert_eq!(transform("href".into(), "/other".into()).1, "/other");
/// assert_eq!(transform("href".into(), "https://example.com/hello".into()).1, "https://example.com/hello");
/// # Ok::<(), compo_dom::error::ValidationError>(())
/// ```
#[must_use]
pub fn href_component(factory: Arc<Factory>) -> AttributeTransform {
	Arc::new(move |name: String, value: String| {
		if name != "href" {
			return (name, value);
		}
		let rewritten = component_name_from_url(&value)
			.filter(|component| factory.is_registered(component))
			.and_then(|_| match Url::parse(&value) {
				Ok(url) => Some(url),
				Err(url::ParseError::RelativeUrlWithoutBase) => component_base().join(&value).ok(),
				Err(_) => None,
			});
		match rewritten {
			Some(url) => (name, url.to_string()),
			None => (name, value),
		}
	})
}
