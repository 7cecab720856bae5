//! Context trait

use std::any::Any;
use std::fmt;

use crate::{ContextError, Result, SubcontextContainer};

/// Type-erasure helpers, implemented for every `'static` type.
///
/// Call these on `&dyn Context`, not on `Box<dyn Context>`: the box is
/// `'static` too and would answer for itself.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// Name of the concrete type
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn any_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A state object owning a set of subcontexts
pub trait Context: AsAny + fmt::Debug {
    fn subcontexts(&self) -> &SubcontextContainer;

    fn subcontexts_mut(&mut self) -> &mut SubcontextContainer;

    /// Build a fresh instance to be stored in `owner`.
    ///
    /// Used by auto-creation. Types that cannot be built this way keep the
    /// default, which fails with [`ContextError::Construction`].
    fn create(owner: &SubcontextContainer) -> Result<Self>
    where
        Self: Sized,
    {
        tracing::debug!(owner = %owner.id(), "no factory for subcontext type");
        Err(ContextError::Construction {
            type_name: std::any::type_name::<Self>(),
        })
    }
}

/// Context with no state of its own
#[derive(Debug, Default)]
pub struct BaseContext {
    subcontexts: SubcontextContainer,
}

impl BaseContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Context for BaseContext {
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
