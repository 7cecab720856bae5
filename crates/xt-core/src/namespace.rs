//! Namespace value (URI + prefix)

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{QName, Result, XmlError};

/// A namespace URI bound to a prefix.
///
/// Equality and hashing only look at the URI and the prefix. The
/// `always_declare` flag rides along and is owned by whoever registered the
/// namespace.
#[derive(Debug, Clone)]
pub struct Namespace {
    uri: String,
    prefix: Option<String>,
    always_declare: bool,
}

impl Namespace {
    /// Create a namespace. An empty prefix means the default namespace.
    pub fn new(uri: &str, prefix: Option<&str>) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(XmlError::InvalidArgument(
                "namespace URI must not be empty".into(),
            ));
        }
        Ok(Self {
            uri: uri.to_string(),
            prefix: normalize_prefix(prefix),
            always_declare: false,
        })
    }

    /// Namespace implied by a qualified name, if the name has a namespace
    pub fn from_qname(name: &QName) -> Option<Self> {
        let uri = name.namespace_uri()?;
        Self::new(uri, name.prefix()).ok()
    }

    pub(crate) fn well_known(uri: &str, prefix: &str) -> Self {
        Self {
            uri: uri.to_string(),
            prefix: Some(prefix.to_string()),
            always_declare: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Prefix, `None` for the default namespace
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn always_declare(&self) -> bool {
        self.always_declare
    }

    pub fn set_always_declare(&mut self, always_declare: bool) {
        self.always_declare = always_declare;
    }

    /// Copy of this namespace with the given flag
    pub fn with_always_declare(&self, always_declare: bool) -> Self {
        Self {
            always_declare,
            ..self.clone()
        }
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.prefix == other.prefix
    }
}

impl Eq for Namespace {}

impl Hash for Namespace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.prefix.hash(state);
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "xmlns:{}=\"{}\"", prefix, self.uri),
            None => write!(f, "xmlns=\"{}\"", self.uri),
        }
    }
}

fn normalize_prefix(prefix: Option<&str>) -> Option<String> {
    prefix
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}
