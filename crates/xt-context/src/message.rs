//! Message context

use xt_tree::NodeId;

use crate::{Context, Result, SubcontextContainer};

/// Context for one message exchange, pointing at the message's root node
#[derive(Debug, Default)]
pub struct MessageContext {
    message: Option<NodeId>,
    subcontexts: SubcontextContainer,
}

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for an already parsed message
    pub fn with_message(message: NodeId) -> Self {
        Self {
            message: Some(message),
            subcontexts: SubcontextContainer::new(),
        }
    }

    pub fn message(&self) -> Option<NodeId> {
        self.message
    }

    /// Replace the message, returning the previous one
    pub fn set_message(&mut self, message: Option<NodeId>) -> Option<NodeId> {
        std::mem::replace(&mut self.message, message)
    }
}

impl Context for MessageContext {
    fn subcontexts(&self) -> &SubcontextContainer {
        &self.subcontexts
    }

    fn subcontexts_mut(&mut self) -> &mut SubcontextContainer {
        &mut self.subcontexts
    }

    fn create(_owner: &SubcontextContainer) -> Result<Self> {
        Ok(Self::new())
    }
}
