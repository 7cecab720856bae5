//! Qualified names

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Result, XmlError};

/// Namespace URI + local name, with the prefix kept as a serialization hint.
///
/// Two names are equal when URI and local name match, whatever their
/// prefixes.
#[derive(Debug, Clone)]
pub struct QName {
    namespace_uri: Option<String>,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    pub fn new(namespace_uri: Option<&str>, local_name: &str, prefix: Option<&str>) -> Self {
        Self {
            namespace_uri: namespace_uri
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
            local_name: local_name.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// Name without a namespace
    pub fn local(local_name: &str) -> Self {
        Self::new(None, local_name, None)
    }

    /// Parse a Clark-notation name (`{uri}local` or `local`)
    pub fn from_clark(value: &str) -> Result<Self> {
        let value = value.trim();
        let name = match value.strip_prefix('{') {
            Some(rest) => {
                let (uri, local) = rest.split_once('}').ok_or_else(|| {
                    XmlError::InvalidArgument(format!("unterminated namespace in '{value}'"))
                })?;
                Self::new(Some(uri), local, None)
            }
            None => Self::local(value),
        };
        if name.local_name.is_empty() {
            return Err(XmlError::InvalidArgument(format!(
                "missing local name in '{value}'"
            )));
        }
        Ok(name)
    }

    /// Split `prefix:local` into its parts
    pub fn split_prefixed(value: &str) -> (Option<&str>, &str) {
        match value.trim().split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => (Some(prefix), local),
            _ => (None, value.trim()),
        }
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Same name under a different prefix
    pub fn with_prefix(&self, prefix: Option<&str>) -> Self {
        Self::new(self.namespace_uri(), &self.local_name, prefix)
    }

    /// `prefix:local`, or just `local` when unprefixed
    pub fn to_prefixed_string(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace_uri {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}
