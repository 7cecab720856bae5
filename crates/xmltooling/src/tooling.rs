//! Tooling - Main entry point

use xt_context::{Context, MessageContext};
use xt_tree::{BuilderRegistry, Marshaller, NodeId, Unmarshaller, XmlTree};

use crate::{Config, Error};

/// Configured parser, serializer and builder registry
#[derive(Debug)]
pub struct XmlTooling {
    config: Config,
    registry: BuilderRegistry,
}

impl XmlTooling {
    /// Create tooling whose registry falls back to generic objects
    pub fn new(config: Config) -> Self {
        tracing::info!("xmltooling {} initialized", crate::VERSION);
        Self {
            config,
            registry: BuilderRegistry::with_generic_default(),
        }
    }

    /// Use a custom builder registry
    pub fn with_registry(config: Config, registry: BuilderRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BuilderRegistry {
        &mut self.registry
    }

    pub fn marshaller(&self) -> Marshaller {
        Marshaller::new((&self.config.marshall).into())
    }

    pub fn unmarshaller(&self) -> Unmarshaller<'_> {
        Unmarshaller::new(&self.registry, (&self.config.unmarshall).into())
    }

    /// Parse `xml` into `tree`, returning the document element
    pub fn parse(&self, tree: &mut XmlTree, xml: &str) -> Result<NodeId, Error> {
        Ok(self.unmarshaller().unmarshall(tree, xml)?)
    }

    /// Serialize the subtree rooted at `root`
    pub fn serialize(&self, tree: &XmlTree, root: NodeId) -> Result<String, Error> {
        Ok(self.marshaller().marshall(tree, root)?)
    }

    /// Message context following the configured subcontext policy
    pub fn message_context(&self, message: Option<NodeId>) -> MessageContext {
        let mut context = match message {
            Some(root) => MessageContext::with_message(root),
            None => MessageContext::new(),
        };
        context
            .subcontexts_mut()
            .set_auto_create_subcontexts(self.config.auto_create_subcontexts);
        context
    }
}

impl Default for XmlTooling {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
