//! xmltooling collections
//!
//! Collections keyed by the concrete runtime type of their members.

mod class_indexed;

pub use class_indexed::{ClassIndexedSet, Cursor, IndexedMember};

use std::any::TypeId;

/// Collection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// The very same instance is already a member
    #[error("Set already contains this instance of {type_name}")]
    DuplicateInstance { type_name: &'static str },

    /// Another instance of the member's type is already present
    #[error("Set already contains a member of type {type_name} ({type_id:?})")]
    DuplicateType {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// Iterator protocol misuse
    #[error("Illegal state: {0}")]
    IllegalState(&'static str),
}
