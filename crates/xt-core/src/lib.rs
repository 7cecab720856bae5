//! xmltooling core
//!
//! Qualified names, namespaces and the per-node namespace manager that
//! decides which prefixes an element has to declare.

mod constants;
mod manager;
mod namespace;
mod qname;

pub use constants::{
    DEFAULT_NS_TOKEN, XML_NS, XML_PREFIX, XMLNS_NS, XMLNS_PREFIX, XSI_NS, XSI_PREFIX,
    XSI_TYPE_LOCAL_NAME, xml_namespace, xsi_namespace, xsi_type_name,
};
pub use manager::NamespaceManager;
pub use namespace::Namespace;
pub use qname::QName;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, XmlError>;
