//! The engine's node and component maps, with an undo journal for the running update.

use crate::{
	component::{Identity, SharedComponent},
	node::{Node, NodeId},
};
use hashbrown::{HashMap, HashSet};

#[derive(Default)]
pub(crate) struct Tree {
	pub nodes: HashMap<NodeId, Node>,
	pub components: HashMap<NodeId, SharedComponent>,
	pub identities: HashMap<Identity, NodeId>,
	pub root: Option<NodeId>,
	journal: Vec<Undo>,
	/// Nodes whose state before the current update is already journaled.
	touched: HashSet<NodeId>,
}

/// A previous value, restored on rollback.
enum Undo {
	Node(NodeId, Option<Node>),
	Component(NodeId, Option<SharedComponent>),
	Identity(Identity, Option<NodeId>),
	Root(Option<NodeId>),
}

impl Tree {
	fn touch(&mut self, id: &NodeId) {
		if self.touched.insert(id.clone()) {
			self.journal.push(Undo::Node(id.clone(), self.nodes.get(id).cloned()));
		}
	}

	pub fn insert_node(&mut self, node: Node) {
		self.touch(&node.id);
		self.nodes.insert(node.id.clone(), node);
	}

	pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
		self.touch(id);
		self.nodes.get_mut(id)
	}

	pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
		let removed = self.nodes.remove(id)?;
		if self.touched.insert(id.clone()) {
			self.journal.push(Undo::Node(id.clone(), Some(removed.clone())));
		}
		Some(removed)
	}

	pub fn insert_component(&mut self, id: NodeId, component: SharedComponent) {
		let identity = Identity::of(&component);
		let previous = self.identities.insert(identity, id.clone());
		self.journal.push(Undo::Identity(identity, previous));
		let previous = self.components.insert(id.clone(), component);
		self.journal.push(Undo::Component(id, previous));
	}

	pub fn remove_component(&mut self, id: &NodeId) -> Option<SharedComponent> {
		let component = self.components.remove(id)?;
		self.journal.push(Undo::Component(id.clone(), Some(component.clone())));
		let identity = Identity::of(&component);
		let previous = self.identities.remove(&identity);
		self.journal.push(Undo::Identity(identity, previous));
		Some(component)
	}

	pub fn set_root(&mut self, root: Option<NodeId>) -> Option<NodeId> {
		let previous = core::mem::replace(&mut self.root, root);
		self.journal.push(Undo::Root(previous.clone()));
		previous
	}

	/// Forgets the journal, keeping all changes.
	pub fn commit(&mut self) {
		self.journal.clear();
		self.touched.clear();
	}

	/// Undoes every change since the last [`commit`](`Tree::commit`).
	pub fn rollback(&mut self) {
		while let Some(undo) = self.journal.pop() {
			match undo {
				Undo::Node(id, Some(node)) => drop(self.nodes.insert(id, node)),
				Undo::Node(id, None) => drop(self.nodes.remove(&id)),
				Undo::Component(id, Some(component)) => drop(self.components.insert(id, component)),
				Undo::Component(id, None) => drop(self.components.remove(&id)),
				Undo::Identity(identity, Some(id)) => drop(self.identities.insert(identity, id)),
				Undo::Identity(identity, None) => drop(self.identities.remove(&identity)),
				Undo::Root(root) => self.root = root,
			}
		}
		self.touched.clear();
	}

	pub fn journal_len(&self) -> usize {
		self.journal.len()
	}
}
