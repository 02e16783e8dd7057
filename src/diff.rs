use crate::{
	change::{Change, ChangeBuffers},
	component::{lock, Identity, SharedComponent, Subscription},
	decode::{Decoder, Tag, Token},
	error::{DecodeError, Error, SinkError, ValidationError},
	factory::Factory,
	node::{Namespace, Node, NodeId, NodeKind},
	temp_set::TempKeySet,
	tree::Tree,
	template::{default_resources, ResourceResolver, TemplateRenderer},
	transform::AttributeTransform,
};
use core::{
	fmt::{self, Debug, Formatter},
	mem::{size_of_val, take},
};
use hashbrown::{HashMap, HashSet};
use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Receives each flushed batch of [`Change`]s, in order.
pub type ChangeSink = Box<dyn Fn(&[Change]) -> Result<(), SinkError> + Send + Sync>;

/// Schedules a lifecycle hook on the UI thread.
pub type UiExecutor = Arc<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Construction parameters of an [`Engine`].
pub struct EngineConfig {
	pub factory: Arc<Factory>,
	pub resources: ResourceResolver,
	pub attribute_transforms: Vec<AttributeTransform>,
	/// If not empty, decoded elements must have one of these tag names.
	pub allowed_nodes: Vec<String>,
	pub sink: ChangeSink,
	pub ui: UiExecutor,
}
impl EngineConfig {
	/// A configuration that accepts every batch and discards lifecycle hooks.
	#[must_use]
	pub fn new(factory: Arc<Factory>) -> Self {
		Self {
			factory,
			resources: default_resources(),
			attribute_transforms: Vec::new(),
			allowed_nodes: Vec::new(),
			sink: Box::new(|_: &[Change]| -> Result<(), SinkError> { Ok(()) }),
			ui: Arc::new(|hook: Box<dyn FnOnce() + Send>| drop(hook)),
		}
	}

	#[must_use]
	pub fn with_resources(mut self, resources: impl Fn(&[String]) -> String + Send + Sync + 'static) -> Self {
		self.resources = Arc::new(resources);
		self
	}

	/// Appends a transform to the chain applied to each decoded attribute.
	#[must_use]
	pub fn with_attribute_transform(mut self, transform: AttributeTransform) -> Self {
		self.attribute_transforms.push(transform);
		self
	}

	#[must_use]
	pub fn with_allowed_nodes(mut self, allowed_nodes: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.allowed_nodes = allowed_nodes.into_iter().map(Into::into).collect();
		self
	}

	#[must_use]
	pub fn with_sink(mut self, sink: impl Fn(&[Change]) -> Result<(), SinkError> + Send + Sync + 'static) -> Self {
		self.sink = Box::new(sink);
		self
	}

	#[must_use]
	pub fn with_ui(mut self, ui: impl Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static) -> Self {
		self.ui = Arc::new(ui);
		self
	}
}
impl Debug for EngineConfig {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("EngineConfig")
			.field("factory", &self.factory)
			.field("attribute_transforms", &self.attribute_transforms.len())
			.field("allowed_nodes", &self.allowed_nodes)
			.finish_non_exhaustive()
	}
}

/// Keeps a tree of rendered components in sync with a remote UI surface.
///
/// Each successful [`mount`](`Engine::mount`), [`render`](`Engine::render`) or [`close`](`Engine::close`)
/// hands exactly one batch of [`Change`]s to the configured sink.
///
/// # Failure Atomicity
///
/// If a call fails (including in the sink), the node tree is restored to its state before the call
/// and no lifecycle hooks of that call run. Field values already assigned to nested components are kept.
///
/// # Concurrency
///
/// Updates are serialized, lookups can run concurrently with each other.
/// Don't hold a component's lock while calling into the engine, since rendering locks it.
pub struct Engine {
	config: EngineConfig,
	renderer: TemplateRenderer,
	allowed_nodes: HashSet<String>,
	inner: RwLock<Inner>,
	subscriptions: Mutex<HashMap<NodeId, Box<dyn Subscription>>>,
}

struct Inner {
	tree: Tree,
	buffers: ChangeBuffers,
	effects: Vec<Effect>,
	attribute_diff_set: TempKeySet,
	next_id: u64,
}

type Hook = Box<dyn FnOnce() + Send>;

/// Lifecycle work deferred until its batch was accepted.
enum Effect {
	Mount { id: NodeId, component: SharedComponent },
	Dismount { id: NodeId, component: SharedComponent },
}

enum Step {
	Node(NodeId),
	End(String),
	Eof,
}

impl Engine {
	#[must_use]
	#[instrument]
	pub fn new(config: EngineConfig) -> Self {
		Self {
			renderer: TemplateRenderer::new(config.resources.clone()),
			allowed_nodes: config.allowed_nodes.iter().cloned().collect(),
			config,
			inner: RwLock::new(Inner {
				tree: Tree::default(),
				buffers: ChangeBuffers::new(),
				effects: Vec::new(),
				attribute_diff_set: TempKeySet::new(),
				next_id: 0,
			}),
			subscriptions: Mutex::default(),
		}
	}

	#[must_use]
	pub fn factory(&self) -> &Arc<Factory> {
		&self.config.factory
	}

	/// Replaces the current tree with a fresh render of `component`.
	///
	/// The batch deletes the previous tree, builds the new one and ends with [`Change::SetRoot`].
	///
	/// # Errors
	///
	/// Iff `component` is zero-sized, rendering or decoding fails anywhere in the new tree, or the sink rejects the batch.
	#[instrument(skip_all)]
	pub fn mount(&self, component: SharedComponent) -> Result<(), Error> {
		let hooks = {
			let mut inner = self.write();
			let effects = self.transact(&mut *inner, |pass| {
				pass.close_tree();
				let id = pass.render_component(&component)?;
				pass.inner.tree.set_root(Some(id.clone()));
				pass.inner.buffers.set_root(id);
				Ok(())
			})?;
			self.settle(effects)
		};
		self.dispatch(hooks);
		Ok(())
	}

	/// Re-renders a mounted component and patches its subtree.
	///
	/// # Errors
	///
	/// [`Error::ComponentNotMounted`] iff `component` isn't part of the tree,
	/// otherwise as for [`mount`](`Engine::mount`).
	#[instrument(skip_all)]
	pub fn render<C: ?Sized>(&self, component: &Arc<Mutex<C>>) -> Result<(), Error> {
		let hooks = {
			let mut inner = self.write();
			let id = inner.tree.identities.get(&Identity::of(component)).cloned().ok_or(Error::ComponentNotMounted)?;
			let effects = self.transact(&mut *inner, |pass| pass.render_existing(&id))?;
			self.settle(effects)
		};
		self.dispatch(hooks);
		Ok(())
	}

	/// Deletes the whole tree and dismounts all components.
	///
	/// The delete batch is still handed to the sink, but a failure there is only logged.
	/// Closing an empty engine does nothing.
	#[instrument(skip_all)]
	pub fn close(&self) {
		let hooks = {
			let mut inner = self.write();
			if inner.tree.root.is_none() && inner.tree.nodes.is_empty() {
				return;
			}
			Pass { engine: self, inner: &mut *inner }.close_tree();
			inner.tree.commit();
			let batch = inner.buffers.take_batch();
			debug!("Closing with {} change(s).", batch.len());
			if let Err(error) = (self.config.sink)(&batch) {
				error!("Failed to sync closing changes: {}", error);
			}
			let effects = take(&mut inner.effects);
			let hooks = self.settle(effects);

			let mut subscriptions = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
			if !subscriptions.is_empty() {
				warn!("Closing {} subscription(s) without a mounted component.", subscriptions.len());
			}
			for (_, mut subscription) in subscriptions.drain() {
				subscription.close();
			}
			hooks
		};
		self.dispatch(hooks);
	}

	#[must_use]
	pub fn contains<C: ?Sized>(&self, component: &Arc<Mutex<C>>) -> bool {
		self.read().tree.identities.contains_key(&Identity::of(component))
	}

	/// # Errors
	///
	/// [`Error::ComponentNotMounted`] iff no component is mounted as `id`.
	pub fn component_by_id(&self, id: &str) -> Result<SharedComponent, Error> {
		self.read().tree.components.get(id).cloned().ok_or(Error::ComponentNotMounted)
	}

	#[must_use]
	pub fn root_id(&self) -> Option<NodeId> {
		self.read().tree.root.clone()
	}

	/// A snapshot of the node `id`.
	#[must_use]
	pub fn node(&self, id: &str) -> Option<Node> {
		self.read().tree.nodes.get(id).cloned()
	}

	#[must_use]
	pub fn node_count(&self) -> usize {
		self.read().tree.nodes.len()
	}

	#[must_use]
	pub fn component_count(&self) -> usize {
		self.read().tree.components.len()
	}

	/// Records not yet handed to the sink. Outside of a running update, this is always zero.
	#[must_use]
	pub fn pending_change_count(&self) -> usize {
		self.read().buffers.len()
	}

	fn read(&self) -> RwLockReadGuard<'_, Inner> {
		self.inner.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Inner> {
		self.inner.write().unwrap_or_else(PoisonError::into_inner)
	}

	/// Runs `update` and flushes its batch, or rolls the tree back.
	///
	/// Returns the lifecycle effects of the accepted batch.
	fn transact(&self, inner: &mut Inner, update: impl FnOnce(&mut Pass<'_>) -> Result<(), Error>) -> Result<Vec<Effect>, Error> {
		let mut result = update(&mut Pass { engine: self, inner: &mut *inner });
		if result.is_ok() {
			result = self.flush(inner);
		}

		match result {
			Ok(()) => {
				inner.tree.commit();
				info!("Node/component count: {}/{}", inner.tree.nodes.len(), inner.tree.components.len());
				info!("Diff heap capacity (attribute keys): {}", inner.attribute_diff_set.capacity());
				if STATIC_MAX_LEVEL >= Level::WARN && inner.attribute_diff_set.capacity() >= 100 {
					warn!(
						"The attribute key diff heap capacity is large ({}).\n\
						This may point to elements with an excessive number of attributes.",
						inner.attribute_diff_set.capacity()
					);
				}
				Ok(take(&mut inner.effects))
			}
			Err(error) => {
				debug!("Rolling back {} tree change(s): {}", inner.tree.journal_len(), error);
				inner.tree.rollback();
				inner.buffers.clear();
				inner.effects.clear();
				Err(error)
			}
		}
	}

	fn flush(&self, inner: &mut Inner) -> Result<(), Error> {
		let batch = inner.buffers.take_batch();
		trace!("Syncing {} change(s).", batch.len());
		(self.config.sink)(&batch).map_err(Error::Sync)
	}

	/// Opens and closes subscriptions for an accepted batch and returns the hooks to dispatch.
	///
	/// Must be called before the write lock is released, so that subscriptions follow the order of the batches.
	/// Mount: subscribe, then [`on_mount`](`crate::Component::on_mount`).
	/// Dismount: close the subscription, then [`on_dismount`](`crate::Component::on_dismount`).
	fn settle(&self, effects: Vec<Effect>) -> Vec<Hook> {
		if effects.is_empty() {
			return Vec::new();
		}
		let mut subscriptions = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
		effects
			.into_iter()
			.map(|effect| match effect {
				Effect::Mount { id, component } => {
					let subscription = lock(&component).subscribe();
					if let Some(subscription) = subscription {
						if let Some(mut stale) = subscriptions.insert(id, subscription) {
							stale.close();
						}
					}
					Box::new(move || lock(&component).on_mount()) as Hook
				}
				Effect::Dismount { id, component } => {
					if let Some(mut subscription) = subscriptions.remove(&id) {
						subscription.close();
					}
					Box::new(move || lock(&component).on_dismount()) as Hook
				}
			})
			.collect()
	}

	fn dispatch(&self, hooks: Vec<Hook>) {
		for hook in hooks {
			(self.config.ui)(hook);
		}
	}
}
impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let inner = self.read();
		f.debug_struct("Engine")
			.field("config", &self.config)
			.field("root", &inner.tree.root)
			.field("nodes", &inner.tree.nodes.len())
			.field("components", &inner.tree.components.len())
			.finish_non_exhaustive()
	}
}

/// One update of the tree, between its start and flush.
struct Pass<'a> {
	engine: &'a Engine,
	inner: &'a mut Inner,
}
impl Pass<'_> {
	fn next_id(&mut self, tag: &str) -> NodeId {
		self.inner.next_id += 1;
		NodeId::new(tag, self.inner.next_id)
	}

	fn node(&self, id: &NodeId) -> &Node {
		self.inner.tree.nodes.get(id).unwrap_or_else(|| missing(id))
	}

	fn node_mut(&mut self, id: &NodeId) -> &mut Node {
		self.inner.tree.node_mut(id).unwrap_or_else(|| missing(id))
	}

	/// Whether `previous` exists and can be updated into a node of the given shape.
	fn reusable(&self, previous: Option<&NodeId>, kind: NodeKind, tag: &str, namespace: Option<Namespace>) -> Option<NodeId> {
		previous.filter(|&id| self.node(id).matches(kind, tag, namespace)).cloned()
	}

	fn create(&mut self, node: Node) {
		self.inner.buffers.create(Change::NewNode {
			node_id: node.id.clone(),
			component_id: node.component_id.clone(),
			kind: node.kind,
			tag: node.tag.clone(),
			namespace: node.namespace,
			is_component: node.kind == NodeKind::Component,
		});
		self.inner.tree.insert_node(node);
	}

	fn close_tree(&mut self) {
		if let Some(root) = self.inner.tree.set_root(None) {
			self.delete_node(&root);
		}
		debug_assert!(self.inner.tree.nodes.is_empty());
		debug_assert!(self.inner.tree.components.is_empty());
		debug_assert!(self.inner.tree.identities.is_empty());
	}

	/// Finds or mounts `component` as a tree root and renders it.
	#[instrument(skip_all)]
	fn render_component(&mut self, component: &SharedComponent) -> Result<NodeId, Error> {
		let id = match self.inner.tree.identities.get(&Identity::of(component)) {
			Some(id) => id.clone(),
			None => {
				let name = {
					let guard = lock(component);
					if size_of_val(&*guard) == 0 {
						return Err(ValidationError::ZeroSized { type_name: guard.type_path() }.into());
					}
					self.engine.config.factory.component_name(&*guard)
				};
				let id = self.next_id(&name);
				self.mount_component(id.clone(), name, None, component.clone());
				id
			}
		};
		self.render_existing(&id)?;
		Ok(id)
	}

	fn mount_component(&mut self, id: NodeId, name: String, owner: Option<NodeId>, component: SharedComponent) {
		trace!("Mounting {}.", id);
		self.create(Node::component(id.clone(), name, owner));
		self.inner.tree.insert_component(id.clone(), component.clone());
		self.inner.effects.push(Effect::Mount { id, component });
	}

	/// Renders the mounted component `id` and reconciles its single child with the result.
	#[instrument(skip(self))]
	fn render_existing(&mut self, id: &NodeId) -> Result<(), Error> {
		let component = self.inner.tree.components.get(id).cloned().unwrap_or_else(|| missing(id));
		let markup = self.engine.renderer.render(&*lock(&component))?;

		let engine = self.engine;
		let mut decoder = Decoder::new(&markup)
			.with_transforms(&engine.config.attribute_transforms)
			.with_allowed_nodes(&engine.allowed_nodes);

		let previous_root = self.node(id).children.first().cloned();
		let root = match self.render_node(&mut decoder, id, previous_root.as_ref())? {
			Step::Node(root) => root,
			Step::End(_) | Step::Eof => return Err(DecodeError::NoRoot.into()),
		};
		if !matches!(decoder.next_token(), Ok(None)) {
			warn!("Ignored markup after the root node of {}.", id);
		}

		match previous_root {
			None => {
				self.node_mut(id).children.push(root.clone());
				self.inner.buffers.change(Change::AppendChild {
					node_id: id.clone(),
					child_id: root,
				});
			}
			Some(previous_root) if previous_root != root => {
				self.node_mut(id).children[0] = root.clone();
				self.delete_node(&previous_root);
				self.inner.buffers.change(Change::ReplaceChild {
					node_id: id.clone(),
					child_id: previous_root,
					new_child_id: root,
				});
			}
			Some(_) => (),
		}
		Ok(())
	}

	/// Decodes the next node into the slot of `previous`, reusing it where possible.
	fn render_node(&mut self, decoder: &mut Decoder<'_>, owner: &NodeId, previous: Option<&NodeId>) -> Result<Step, Error> {
		Ok(match decoder.next_token()? {
			None => Step::Eof,
			Some(Token::End(name)) => Step::End(name),
			Some(Token::Text(text)) => Step::Node(self.render_text(owner, previous, text)),
			Some(Token::Start(tag)) => Step::Node(self.render_element(decoder, owner, previous, tag, true)?),
			Some(Token::Empty(tag)) => Step::Node(self.render_element(decoder, owner, previous, tag, false)?),
			Some(Token::Component(tag)) => Step::Node(self.render_placeholder(owner, previous, tag)?),
		})
	}

	fn render_text(&mut self, owner: &NodeId, previous: Option<&NodeId>, text: String) -> NodeId {
		#[cfg(feature = "dangerous-logging")]
		let span = trace_span!("Diffing text node", ?previous, text = text.as_str());
		#[cfg(not(feature = "dangerous-logging"))]
		let span = trace_span!("Diffing text node", ?previous, length = text.len());
		let _enter = span.enter();

		let id = match self.reusable(previous, NodeKind::Text, "text", None) {
			Some(id) => id,
			None => {
				let id = self.next_id("text");
				self.create(Node::text(id.clone(), owner.clone()));
				id
			}
		};

		let Inner { tree, buffers, .. } = &mut *self.inner;
		let node = tree.node_mut(&id).unwrap_or_else(|| missing(&id));
		if node.text != text {
			node.text.clone_from(&text);
			buffers.change(Change::SetText { node_id: id.clone(), value: text });
		}
		id
	}

	fn render_element(&mut self, decoder: &mut Decoder<'_>, owner: &NodeId, previous: Option<&NodeId>, tag: Tag, container: bool) -> Result<NodeId, Error> {
		let span = trace_span!("Diffing element", tag = tag.name.as_str(), ?previous, container);
		let _enter = span.enter();

		let id = match self.reusable(previous, NodeKind::Element, &tag.name, tag.namespace) {
			Some(id) => id,
			None => {
				let id = self.next_id(&tag.name);
				self.create(Node::element(id.clone(), tag.name.clone(), tag.namespace, owner.clone()));
				id
			}
		};
		self.diff_attributes(&id, tag.attributes);

		let previous_children = take(&mut self.node_mut(&id).children);
		if !container {
			for child in previous_children {
				self.remove_child(&id, child);
			}
			return Ok(id);
		}

		let mut children = Vec::with_capacity(previous_children.len());
		let mut previous_children = previous_children.into_iter().peekable();
		let mut closed = false;
		while let Some(old) = previous_children.peek().cloned() {
			match self.render_node(decoder, owner, Some(&old))? {
				Step::Node(new) => {
					previous_children.next();
					if new != old {
						self.inner.buffers.change(Change::ReplaceChild {
							node_id: id.clone(),
							child_id: old.clone(),
							new_child_id: new.clone(),
						});
						self.delete_node(&old);
					}
					children.push(new);
				}
				Step::End(name) => {
					debug_assert_eq!(name, tag.name);
					closed = true;
					break;
				}
				Step::Eof => return Err(DecodeError::UnexpectedEof(tag.name).into()),
			}
		}

		for surplus in previous_children {
			self.remove_child(&id, surplus);
		}

		while !closed {
			match self.render_node(decoder, owner, None)? {
				Step::Node(child) => {
					self.inner.buffers.change(Change::AppendChild {
						node_id: id.clone(),
						child_id: child.clone(),
					});
					children.push(child);
				}
				Step::End(name) => {
					debug_assert_eq!(name, tag.name);
					closed = true;
				}
				Step::Eof => return Err(DecodeError::UnexpectedEof(tag.name).into()),
			}
		}

		self.node_mut(&id).children = children;
		Ok(id)
	}

	/// Emits attribute changes in key order.
	fn diff_attributes(&mut self, id: &NodeId, attributes: BTreeMap<String, String>) {
		let Inner {
			tree,
			buffers,
			attribute_diff_set,
			..
		} = &mut *self.inner;
		let node = tree.node_mut(id).unwrap_or_else(|| missing(id));
		let seen = attribute_diff_set.temp();

		for (key, value) in attributes {
			seen.insert(key.clone());
			if node.attributes.get(&key) == Some(&value) {
				continue;
			}
			#[cfg(feature = "dangerous-logging")]
			trace!(key = key.as_str(), value = value.as_str(), "Setting attribute.");
			buffers.change(Change::SetAttr {
				node_id: id.clone(),
				key: key.clone(),
				value: value.clone(),
			});
			node.attributes.insert(key, value);
		}

		node.attributes.retain(|key, _| {
			let keep = seen.contains(key);
			if !keep {
				buffers.change(Change::DelAttr {
					node_id: id.clone(),
					key: key.clone(),
				});
			}
			keep
		});
	}

	/// Reuses or creates a nested component, assigns its fields and renders it.
	fn render_placeholder(&mut self, owner: &NodeId, previous: Option<&NodeId>, tag: Tag) -> Result<NodeId, Error> {
		let span = trace_span!("Diffing component", name = tag.name.as_str(), ?previous);
		let _enter = span.enter();

		let id = match self.reusable(previous, NodeKind::Component, &tag.name, None) {
			Some(id) => id,
			None => {
				let component = self.engine.config.factory.new_component(&tag.name)?;
				let id = self.next_id(&tag.name);
				self.mount_component(id.clone(), tag.name.clone(), Some(owner.clone()), component);
				id
			}
		};

		let component = self.inner.tree.components.get(&id).cloned().unwrap_or_else(|| missing(&id));
		if let Some(fields) = self.engine.config.factory.field_mapper(&tag.name) {
			fields
				.map_fields(&mut *lock(&component), &tag.attributes)
				.map_err(|error| Error::nested(&tag.name, error.into()))?;
		}
		self.node_mut(&id).attributes = tag.attributes;

		self.render_existing(&id).map_err(|error| Error::nested(&tag.name, error))?;
		Ok(id)
	}

	fn remove_child(&mut self, parent: &NodeId, child: NodeId) {
		self.delete_node(&child);
		self.inner.buffers.change(Change::RemoveChild {
			node_id: parent.clone(),
			child_id: child,
		});
	}

	/// Deletes `id` and its subtree, children first.
	fn delete_node(&mut self, id: &NodeId) {
		let Some(node) = self.inner.tree.remove_node(id) else {
			return;
		};
		for child in &node.children {
			self.delete_node(child);
		}

		if node.kind == NodeKind::Component {
			if let Some(component) = self.inner.tree.remove_component(id) {
				trace!("Dismounting {}.", id);
				self.inner.effects.push(Effect::Dismount { id: id.clone(), component });
			}
		}
		self.inner.buffers.delete(node.id);
	}
}

fn missing(id: &NodeId) -> ! {
	panic!("compo-dom bug: Node {} is missing from the tree.", id)
}
