//! The live node tree.

use core::{
	borrow::Borrow,
	fmt::{self, Display, Formatter},
};
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, sync::Arc};

/// Identifies one node of an [`Engine`](`crate::diff::Engine`)'s tree.
///
/// Ids have the form `<tag>:<n>` and are never reused by the same engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);
impl NodeId {
	pub(crate) fn new(tag: &str, n: u64) -> Self {
		Self(format!("{}:{}", tag, n).into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Serialize for NodeId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}
impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl Borrow<str> for NodeId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl PartialEq<str> for NodeId {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
	Element,
	Text,
	/// Mount point of a nested component. Its only child is the component's rendered root.
	Component,
}

/// Element namespace. HTML elements have none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Namespace {
	#[serde(rename = "http://www.w3.org/2000/svg")]
	Svg,
}
impl Namespace {
	#[must_use]
	pub fn uri(self) -> &'static str {
		match self {
			Namespace::Svg => "http://www.w3.org/2000/svg",
		}
	}
}

/// One element, text run or component placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
	pub id: NodeId,
	pub kind: NodeKind,
	/// Element tag name, normalized component name, or `"text"`.
	pub tag: String,
	pub namespace: Option<Namespace>,
	/// For component nodes, the attributes last mapped onto the component's fields.
	pub attributes: BTreeMap<String, String>,
	pub text: String,
	pub children: Vec<NodeId>,
	/// The component whose render produced this node. [`None`] only for the tree root.
	pub component_id: Option<NodeId>,
}
impl Node {
	pub(crate) fn element(id: NodeId, tag: String, namespace: Option<Namespace>, component_id: NodeId) -> Self {
		Self {
			id,
			kind: NodeKind::Element,
			tag,
			namespace,
			attributes: BTreeMap::new(),
			text: String::new(),
			children: Vec::new(),
			component_id: Some(component_id),
		}
	}

	pub(crate) fn text(id: NodeId, component_id: NodeId) -> Self {
		Self {
			id,
			kind: NodeKind::Text,
			tag: "text".to_owned(),
			namespace: None,
			attributes: BTreeMap::new(),
			text: String::new(),
			children: Vec::new(),
			component_id: Some(component_id),
		}
	}

	pub(crate) fn component(id: NodeId, name: String, component_id: Option<NodeId>) -> Self {
		Self {
			id,
			kind: NodeKind::Component,
			tag: name,
			namespace: None,
			attributes: BTreeMap::new(),
			text: String::new(),
			children: Vec::with_capacity(1),
			component_id,
		}
	}

	/// Whether this node can be reused for a decoded node of the given shape.
	#[must_use]
	pub fn matches(&self, kind: NodeKind, tag: &str, namespace: Option<Namespace>) -> bool {
		self.kind == kind && (kind == NodeKind::Text || (self.tag == tag && self.namespace == namespace))
	}
}
