//! xmltooling
//!
//! Namespace-aware XML object trees.
//!
//! # Crates
//! - `xt-core`: QNames, namespaces and per-element namespace bookkeeping
//! - `xt-collections`: collections indexed by concrete type
//! - `xt-tree`: the object tree, builders, marshaller and unmarshaller
//! - `xt-context`: contexts with type-indexed subcontexts
//!
//! # Example
//! ```rust
//! use xmltooling::{Config, XmlTooling, XmlTree};
//!
//! let tooling = XmlTooling::new(Config::default());
//! let mut tree = XmlTree::new();
//! let root = tooling.parse(&mut tree, r#"<p:Doc xmlns:p="urn:p"/>"#).unwrap();
//! assert_eq!(tooling.serialize(&tree, root).unwrap(), r#"<p:Doc xmlns:p="urn:p"/>"#);
//! ```

mod config;
mod logging;
mod tooling;

pub use config::{Config, MarshallConfig, UnmarshallConfig};
pub use logging::init_logging;
pub use tooling::XmlTooling;

pub use xt_collections::{ClassIndexedSet, CollectionError, Cursor, IndexedMember};
pub use xt_context::{
    AsAny, BaseContext, ContainerId, Context, ContextError, MessageContext, SubcontextContainer,
};
pub use xt_core::{
    DEFAULT_NS_TOKEN, Namespace, NamespaceManager, QName, XML_NS, XMLNS_NS, XSI_NS, XmlError,
    xsi_type_name,
};
pub use xt_tree::{
    AttributeMap, AttributeMapMut, BuilderRegistry, GenericBuilder, MarshallOptions, Marshaller,
    NodeId, TreeError, UnmarshallOptions, Unmarshaller, XmlObject, XmlObjectBuilder, XmlTree,
};

/// Tooling version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Facade errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid log filter '{filter}': {source}")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Logging already initialized: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}
