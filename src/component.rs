//! The component contract consumed by the [`Engine`](`crate::diff::Engine`).

use crate::fields::Fields;
use core::any::{type_name, Any};
use minijinja::Value;
use serde::Serialize;
use std::{
	borrow::Cow,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A component as held by the engine.
///
/// Components are identified by the address of this allocation, so clones of the same [`Arc`] refer to the same component.
pub type SharedComponent = Arc<Mutex<dyn Component>>;

/// Extension function callable from a component's template.
pub type TemplateFunction = Arc<dyn Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync>;

/// A unit of UI state and render logic.
///
/// [`render`](`Component::render`) returns a [minijinja](https://docs.rs/minijinja) template, which is executed with the component's
/// serialized fields as context and must produce markup with exactly one root node.
///
/// All hooks are optional. [`on_mount`](`Component::on_mount`) and [`on_dismount`](`Component::on_dismount`)
/// are never called inline by the engine, but handed to its [`UiExecutor`](`crate::diff::UiExecutor`).
pub trait Component: ComponentData + Send {
	fn render(&self) -> String;

	fn on_mount(&mut self) {}

	fn on_dismount(&mut self) {}

	/// Called once when the component is mounted. The returned subscription is closed before the component is dismounted.
	fn subscribe(&mut self) -> Option<Box<dyn Subscription>> {
		None
	}

	/// Additional template functions. They must not shadow the built-in ones.
	fn funcs(&self) -> TemplateFunctions {
		TemplateFunctions::new()
	}
}

/// Implemented for all serializable `'static` types.
pub trait ComponentData: Any {
	fn template_context(&self) -> Value;
	fn as_any_mut(&mut self) -> &mut dyn Any;
	fn type_path(&self) -> &'static str;
}
impl<T: Serialize + Any> ComponentData for T {
	fn template_context(&self) -> Value {
		Value::from_serialize(self)
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}

	fn type_path(&self) -> &'static str {
		type_name::<T>()
	}
}

/// A component that can be registered with a [`Factory`](`crate::factory::Factory`) and instantiated from markup.
pub trait ComponentType: Component + Default {
	/// Fields that can be assigned from the attributes of a placeholder tag like `<app.foo value="...">`.
	#[must_use]
	fn fields() -> Fields<Self> {
		Fields::new()
	}
}

pub trait Subscription: Send {
	fn close(&mut self);
}
impl<F: FnMut() + Send> Subscription for F {
	fn close(&mut self) {
		self()
	}
}

#[derive(Clone, Default)]
pub struct TemplateFunctions(Vec<(Cow<'static, str>, TemplateFunction)>);
impl TemplateFunctions {
	#[must_use]
	pub fn new() -> Self {
		Self(Vec::new())
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<Cow<'static, str>>, function: impl Fn(&[Value]) -> Result<Value, minijinja::Error> + Send + Sync + 'static) -> Self {
		self.0.push((name.into(), Arc::new(function)));
		self
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl IntoIterator for TemplateFunctions {
	type Item = (Cow<'static, str>, TemplateFunction);
	type IntoIter = std::vec::IntoIter<Self::Item>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
impl core::fmt::Debug for TemplateFunctions {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_list().entries(self.0.iter().map(|(name, _)| name)).finish()
	}
}

/// Wraps a component for use with an [`Engine`](`crate::diff::Engine`).
///
/// The returned handle coerces to [`SharedComponent`] while staying usable for state changes:
///
/// ```ignore
/// let foo = share(Foo::default());
/// engine.mount(foo.clone())?;
/// foo.lock().unwrap().value = "changed".into();
/// engine.render(&foo)?;
/// ```
pub fn share<C: Component>(component: C) -> Arc<Mutex<C>> {
	Arc::new(Mutex::new(component))
}

/// Address-based identity of a shared component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Identity(usize);
impl Identity {
	pub fn of<C: ?Sized>(component: &Arc<Mutex<C>>) -> Self {
		Self(Arc::as_ptr(component).cast::<()>() as usize)
	}
}

/// Locks a component, ignoring poisoning: A panicking hook doesn't invalidate the component's data for rendering.
pub(crate) fn lock<C: ?Sized>(component: &Mutex<C>) -> MutexGuard<'_, C> {
	component.lock().unwrap_or_else(PoisonError::into_inner)
}
