//! Patch records handed to the change sink.
//!
//! Invariants of an emitted batch:
//! - All [`Change::NewNode`] records come first, then structural and attribute changes, then all [`Change::DelNode`] records.
//! - Records are applied in array order. No record references a node that isn't created yet or was already deleted.
//! - [`Change::SetRoot`] only appears as the last record of a mount batch.

use crate::node::{Namespace, NodeId, NodeKind};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Change {
	NewNode {
		node_id: NodeId,
		#[serde(skip_serializing_if = "Option::is_none")]
		component_id: Option<NodeId>,
		kind: NodeKind,
		tag: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		namespace: Option<Namespace>,
		is_component: bool,
	},
	DelNode {
		node_id: NodeId,
	},
	SetAttr {
		node_id: NodeId,
		key: String,
		value: String,
	},
	DelAttr {
		node_id: NodeId,
		key: String,
	},
	SetText {
		node_id: NodeId,
		value: String,
	},
	AppendChild {
		node_id: NodeId,
		child_id: NodeId,
	},
	RemoveChild {
		node_id: NodeId,
		child_id: NodeId,
	},
	ReplaceChild {
		node_id: NodeId,
		child_id: NodeId,
		new_child_id: NodeId,
	},
	SetRoot {
		node_id: NodeId,
	},
}
impl Change {
	/// The serialized `action` name.
	#[must_use]
	pub fn action(&self) -> &'static str {
		match self {
			Change::NewNode { .. } => "newNode",
			Change::DelNode { .. } => "delNode",
			Change::SetAttr { .. } => "setAttr",
			Change::DelAttr { .. } => "delAttr",
			Change::SetText { .. } => "setText",
			Change::AppendChild { .. } => "appendChild",
			Change::RemoveChild { .. } => "removeChild",
			Change::ReplaceChild { .. } => "replaceChild",
			Change::SetRoot { .. } => "setRoot",
		}
	}

	/// The node the record applies to (the parent, for child operations).
	#[must_use]
	pub fn node_id(&self) -> &NodeId {
		match self {
			Change::NewNode { node_id, .. }
			| Change::DelNode { node_id }
			| Change::SetAttr { node_id, .. }
			| Change::DelAttr { node_id, .. }
			| Change::SetText { node_id, .. }
			| Change::AppendChild { node_id, .. }
			| Change::RemoveChild { node_id, .. }
			| Change::ReplaceChild { node_id, .. }
			| Change::SetRoot { node_id } => node_id,
		}
	}
}

/// Pending records of the current pass, kept apart until flushed.
#[derive(Debug)]
pub(crate) struct ChangeBuffers {
	creates: Vec<Change>,
	changes: Vec<Change>,
	deletes: Vec<Change>,
	root: Option<NodeId>,
}
impl ChangeBuffers {
	pub fn new() -> Self {
		Self {
			creates: Vec::with_capacity(64),
			changes: Vec::with_capacity(64),
			deletes: Vec::with_capacity(64),
			root: None,
		}
	}

	pub fn create(&mut self, change: Change) {
		debug_assert!(matches!(change, Change::NewNode { .. }));
		self.creates.push(change);
	}

	pub fn change(&mut self, change: Change) {
		debug_assert!(!matches!(change, Change::NewNode { .. } | Change::DelNode { .. } | Change::SetRoot { .. }));
		self.changes.push(change);
	}

	pub fn delete(&mut self, node_id: NodeId) {
		self.deletes.push(Change::DelNode { node_id });
	}

	/// Schedules a [`Change::SetRoot`] after all other records.
	pub fn set_root(&mut self, node_id: NodeId) {
		self.root = Some(node_id);
	}

	pub fn len(&self) -> usize {
		self.creates.len() + self.changes.len() + self.deletes.len() + usize::from(self.root.is_some())
	}

	/// Drains all pending records into one ordered batch. The buffers keep their capacity.
	pub fn take_batch(&mut self) -> Vec<Change> {
		let mut batch = Vec::with_capacity(self.len());
		batch.append(&mut self.creates);
		batch.append(&mut self.changes);
		batch.append(&mut self.deletes);
		batch.extend(self.root.take().map(|node_id| Change::SetRoot { node_id }));
		batch
	}

	pub fn clear(&mut self) {
		self.creates.clear();
		self.changes.clear();
		self.deletes.clear();
		self.root = None;
	}
}
