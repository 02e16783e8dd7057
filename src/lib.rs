#![doc(html_root_url = "https://docs.rs/compo-dom/0.0.1")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod change;
pub mod component;
pub mod decode;
pub mod diff;
pub mod error;
pub mod factory;
pub mod fields;
pub mod node;
pub mod tags;
pub mod template;
pub mod transform;

mod temp_set;
mod tree;

pub use change::Change;
pub use component::{share, Component, ComponentType, SharedComponent, Subscription, TemplateFunctions};
pub use diff::{Engine, EngineConfig};
pub use error::Error;
pub use factory::Factory;
pub use fields::Fields;
pub use node::{Namespace, Node, NodeId, NodeKind};
