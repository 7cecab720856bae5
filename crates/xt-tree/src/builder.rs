//! Object builders
//!
//! Builders are looked up by schema type first, then by element name, then
//! fall back to the registry's default builder.

use std::collections::HashMap;
use std::fmt;

use xt_core::QName;

use crate::{NodeId, Result, TreeError, XmlTree};

/// Creates XML objects in a tree
pub trait XmlObjectBuilder {
    /// Create a detached node for `element_name`, optionally typed
    fn build(&self, tree: &mut XmlTree, element_name: QName, schema_type: Option<QName>) -> NodeId;
}

impl<F> XmlObjectBuilder for F
where
    F: Fn(&mut XmlTree, QName, Option<QName>) -> NodeId,
{
    fn build(&self, tree: &mut XmlTree, element_name: QName, schema_type: Option<QName>) -> NodeId {
        self(tree, element_name, schema_type)
    }
}

/// Builder producing plain objects with no element-specific setup
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericBuilder;

impl XmlObjectBuilder for GenericBuilder {
    fn build(&self, tree: &mut XmlTree, element_name: QName, schema_type: Option<QName>) -> NodeId {
        tree.create(element_name, schema_type)
    }
}

/// Builders keyed by element or type name
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<QName, Box<dyn XmlObjectBuilder>>,
    default_builder: Option<Box<dyn XmlObjectBuilder>>,
}

impl BuilderRegistry {
    /// Empty registry without a default builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that falls back to [`GenericBuilder`]
    pub fn with_generic_default() -> Self {
        let mut registry = Self::new();
        registry.set_default_builder(GenericBuilder);
        registry
    }

    pub fn register<B>(&mut self, name: QName, builder: B)
    where
        B: XmlObjectBuilder + 'static,
    {
        tracing::debug!(%name, "registered builder");
        self.builders.insert(name, Box::new(builder));
    }

    pub fn deregister(&mut self, name: &QName) -> bool {
        self.builders.remove(name).is_some()
    }

    pub fn set_default_builder<B>(&mut self, builder: B)
    where
        B: XmlObjectBuilder + 'static,
    {
        self.default_builder = Some(Box::new(builder));
    }

    pub fn clear_default_builder(&mut self) {
        self.default_builder = None;
    }

    /// Builder registered under exactly this name
    pub fn builder(&self, name: &QName) -> Option<&dyn XmlObjectBuilder> {
        self.builders.get(name).map(|b| b.as_ref())
    }

    /// Builder for an element: type name first, element name next, then the
    /// default
    pub fn builder_for(
        &self,
        element_name: &QName,
        schema_type: Option<&QName>,
    ) -> Option<&dyn XmlObjectBuilder> {
        schema_type
            .and_then(|t| self.builder(t))
            .or_else(|| self.builder(element_name))
            .or(self.default_builder.as_deref())
    }

    /// Build an object with the matching builder
    pub fn build(
        &self,
        tree: &mut XmlTree,
        element_name: QName,
        schema_type: Option<QName>,
    ) -> Result<NodeId> {
        let builder = self
            .builder_for(&element_name, schema_type.as_ref())
            .ok_or_else(|| TreeError::NoBuilder(element_name.clone()))?;
        Ok(builder.build(tree, element_name, schema_type))
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .field("has_default", &self.default_builder.is_some())
            .finish()
    }
}
