//! xmltooling tree
//!
//! Arena-based XML object tree. Every node owns a [`NamespaceManager`] and
//! an [`AttributeMap`]; parent/child links are [`NodeId`] handles into the
//! arena, so there are no reference cycles.
//!
//! [`NamespaceManager`]: xt_core::NamespaceManager

mod attributes;
mod builder;
mod marshall;
mod object;
mod tree;
mod unmarshall;

pub use attributes::{AttributeMap, AttributeMapMut};
pub use builder::{BuilderRegistry, GenericBuilder, XmlObjectBuilder};
pub use marshall::{MarshallOptions, Marshaller};
pub use object::XmlObject;
pub use tree::{Ancestors, XmlTree};
pub use unmarshall::{UnmarshallOptions, Unmarshaller};

use std::fmt;

use xt_core::{QName, XmlError};

/// Handle to a node in an [`XmlTree`].
///
/// Carries a generation so handles to destroyed nodes never alias a node
/// created later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Tree errors
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Node {child} is already a child of {parent}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    #[error("Attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("Prefix '{prefix}' in value '{value}' is not bound to a namespace")]
    UnresolvedPrefix { prefix: String, value: String },

    #[error("No builder registered for {0}")]
    NoBuilder(QName),

    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Marshalling failed: {0}")]
    Marshall(#[from] fmt::Error),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

pub type Result<T> = std::result::Result<T, TreeError>;
