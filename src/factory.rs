//! The component registry.

use crate::{
	component::{share, Component, ComponentType, SharedComponent},
	decode,
	error::{Error, ValidationError},
	fields::FieldMapper,
	tags,
};
use core::{
	any::{type_name, TypeId},
	fmt::{self, Debug, Formatter},
	mem::size_of,
};
use hashbrown::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument};
use url::Url;

/// URL scheme of component links.
pub const COMPONENT_SCHEME: &str = "compo";

struct Registration {
	type_id: TypeId,
	type_name: &'static str,
	construct: fn() -> SharedComponent,
	fields: Arc<dyn FieldMapper>,
}

fn construct<C: ComponentType>() -> SharedComponent {
	share(C::default())
}

/// Maps normalized component names to constructors and field tables.
///
/// A [`Factory`] is shared between an [`Engine`](`crate::diff::Engine`) and whatever else needs to instantiate components by name,
/// for example the [`href_component`](`crate::transform::href_component`) transform.
pub struct Factory {
	entry_package: String,
	registrations: RwLock<HashMap<String, Registration>>,
}
impl Default for Factory {
	fn default() -> Self {
		Self::new()
	}
}
impl Factory {
	#[must_use]
	pub fn new() -> Self {
		Self {
			entry_package: "main".to_owned(),
			registrations: RwLock::default(),
		}
	}

	/// Sets the package whose components are registered without package prefix.
	///
	/// The package of a type is the last module of its path, so for `my_app::Hello` this would be `"my_app"`.
	#[must_use]
	pub fn with_entry_package(mut self, entry_package: impl Into<String>) -> Self {
		self.entry_package = entry_package.into();
		self
	}

	#[must_use]
	pub fn entry_package(&self) -> &str {
		&self.entry_package
	}

	/// Registers `C` under its normalized name and returns that name.
	///
	/// Registering the same type again is a no-op.
	///
	/// # Errors
	///
	/// - [`ValidationError::ZeroSized`] iff `C` has no storage, since distinct instances couldn't be told apart.
	/// - [`ValidationError::InvalidName`] iff the name can't appear as a tag in markup, for example because it isn't ASCII.
	/// - [`ValidationError::ReservedName`] iff the name is a standard markup tag.
	/// - [`ValidationError::NameConflict`] iff another type was already registered under the same name.
	#[instrument(skip(self), fields(component = type_name::<C>()))]
	pub fn register<C: ComponentType>(&self) -> Result<String, ValidationError> {
		let type_name = type_name::<C>();
		if size_of::<C>() == 0 {
			return Err(ValidationError::ZeroSized { type_name });
		}

		let name = normalize_component_name(type_name, &self.entry_package);
		if !decode::is_tag_name(&name) {
			return Err(ValidationError::InvalidName { type_name, name });
		}
		if tags::is_standard(&name) {
			return Err(ValidationError::ReservedName { type_name, name });
		}

		let mut registrations = self.registrations.write().unwrap_or_else(PoisonError::into_inner);
		if let Some(existing) = registrations.get(&name) {
			return if existing.type_id == TypeId::of::<C>() {
				Ok(name)
			} else {
				Err(ValidationError::NameConflict {
					type_name,
					name,
					existing: existing.type_name,
				})
			};
		}

		debug!(name = name.as_str(), "Registered component.");
		registrations.insert(
			name.clone(),
			Registration {
				type_id: TypeId::of::<C>(),
				type_name,
				construct: construct::<C>,
				fields: Arc::new(C::fields()),
			},
		);
		Ok(name)
	}

	#[must_use]
	pub fn is_registered(&self, name: &str) -> bool {
		self.registrations.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
	}

	/// Creates a default instance of the component registered as `name`.
	///
	/// # Errors
	///
	/// [`Error::NotRegistered`] iff there is no such component.
	pub fn new_component(&self, name: &str) -> Result<SharedComponent, Error> {
		let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);
		let registration = registrations.get(name).ok_or_else(|| Error::NotRegistered(name.to_owned()))?;
		Ok((registration.construct)())
	}

	/// The normalized name of a live component, whether registered or not.
	#[must_use]
	pub fn component_name(&self, component: &dyn Component) -> String {
		normalize_component_name(component.type_path(), &self.entry_package)
	}

	pub(crate) fn field_mapper(&self, name: &str) -> Option<Arc<dyn FieldMapper>> {
		self.registrations.read().unwrap_or_else(PoisonError::into_inner).get(name).map(|registration| registration.fields.clone())
	}
}
impl Debug for Factory {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let registrations = self.registrations.read().unwrap_or_else(PoisonError::into_inner);
		let mut names: Vec<_> = registrations.iter().map(|(name, registration)| (name.as_str(), registration.type_name)).collect();
		names.sort_unstable();
		f.debug_struct("Factory")
			.field("entry_package", &self.entry_package)
			.field("registrations", &names)
			.finish()
	}
}

/// Derives a component name from a Rust type path.
///
/// Generic arguments are ignored. The name is the lower-cased type name,
/// prefixed with its package (the module it's declared in) unless that is `entry_package`.
///
/// ```
/// # use compo_dom::factory::normalize_component_name;
/// assert_eq!(normalize_component_name("lib::FooBar", "main"), "lib.foobar");
/// assert_eq!(normalize_component_name("main::FooBar", "main"), "foobar");
/// assert_eq!(normalize_component_name("my_app::ui::List<alloc::string::String>", "main"), "ui.list");
/// ```
#[must_use]
pub fn normalize_component_name(type_path: &str, entry_package: &str) -> String {
	let path = type_path.split('<').next().unwrap_or(type_path);
	let mut segments = path.rsplit("::");
	let type_name = segments.next().unwrap_or(path);
	match segments.next() {
		Some(package) if !package.is_empty() && package != entry_package => format!("{}.{}", package, type_name).to_lowercase(),
		_ => type_name.to_lowercase(),
	}
}

/// Extracts the component name from a link.
///
/// Only relative links and links with the [`COMPONENT_SCHEME`] name components.
///
/// ```
/// # use compo_dom::factory::component_name_from_url;
/// assert_eq!(component_name_from_url("/hello?int=42").as_deref(), Some("hello"));
/// assert_eq!(component_name_from_url("compo:///Hello/world").as_deref(), Some("hello"));
/// assert_eq!(component_name_from_url("test://hello"), None);
/// ```
#[must_use]
pub fn component_name_from_url(raw: &str) -> Option<String> {
	let url = match Url::parse(raw) {
		Ok(url) if url.scheme() == COMPONENT_SCHEME => url,
		Ok(_) => return None,
		Err(url::ParseError::RelativeUrlWithoutBase) => component_base().join(raw).ok()?,
		Err(_) => return None,
	};
	let name = url.path_segments()?.next()?;
	if name.is_empty() {
		None
	} else {
		Some(name.to_lowercase())
	}
}

pub(crate) fn component_base() -> Url {
	Url::parse("compo:///").unwrap_or_else(|error| panic!("compo-dom bug: Invalid component base URL: {}", error))
}
