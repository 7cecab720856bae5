//! xmltooling contexts
//!
//! A context is a state object that carries its own set of subcontexts, at
//! most one per concrete type. Subcontexts are contexts too, so they form a
//! tree rooted at whatever context the caller starts from.
//!
//! # Example
//! ```rust
//! use xt_context::{BaseContext, Context, MessageContext};
//!
//! let mut message = MessageContext::new();
//! message.subcontexts_mut().set_auto_create_subcontexts(true);
//! let base = message.subcontexts_mut().get_subcontext::<BaseContext>().unwrap();
//! assert!(base.is_some());
//! ```

mod container;
mod context;
mod message;

pub use container::{ContainerId, SubcontextContainer};
pub use context::{AsAny, BaseContext, Context};
pub use message::MessageContext;

use xt_collections::CollectionError;

/// Context errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The subcontext type has no way to build itself from its owner
    #[error("Subcontext {type_name} cannot be constructed from its owning container")]
    Construction { type_name: &'static str },

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

pub type Result<T> = std::result::Result<T, ContextError>;
