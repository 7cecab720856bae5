//! Subcontext container
//!
//! Stores at most one subcontext per concrete type, optionally building
//! missing ones on lookup.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use xt_collections::{ClassIndexedSet, IndexedMember};

use crate::{AsAny, Context, Result};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a container, and so of the context owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(u64);

impl ContainerId {
    fn next() -> Self {
        Self(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

impl IndexedMember for Box<dyn Context> {
    fn index_type(&self) -> TypeId {
        (**self).as_any().type_id()
    }

    fn index_type_name(&self) -> &'static str {
        (**self).any_type_name()
    }

    fn same_instance(&self, other: &Self) -> bool {
        self.subcontexts().id() == other.subcontexts().id()
    }
}

/// Subcontexts of one context
#[derive(Debug)]
pub struct SubcontextContainer {
    id: ContainerId,
    parent: Option<ContainerId>,
    auto_create: bool,
    subcontexts: ClassIndexedSet<Box<dyn Context>>,
}

impl SubcontextContainer {
    pub fn new() -> Self {
        Self {
            id: ContainerId::next(),
            parent: None,
            auto_create: false,
            subcontexts: ClassIndexedSet::new(),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Container this one's context was added to
    pub fn parent_id(&self) -> Option<ContainerId> {
        self.parent
    }

    pub fn is_auto_create_subcontexts(&self) -> bool {
        self.auto_create
    }

    pub fn set_auto_create_subcontexts(&mut self, auto_create: bool) {
        self.auto_create = auto_create;
    }

    /// Subcontext of type `T`, built if missing and auto-creation is on
    pub fn get_subcontext<T: Context>(&mut self) -> Result<Option<&mut T>> {
        self.get_subcontext_with::<T>(self.auto_create)
    }

    /// Subcontext of type `T`, built through [`Context::create`] if missing
    /// and `autocreate` is set
    pub fn get_subcontext_with<T: Context>(&mut self, autocreate: bool) -> Result<Option<&mut T>> {
        let type_id = TypeId::of::<T>();
        if !self.subcontexts.contains_type_id(type_id) {
            if !autocreate {
                return Ok(None);
            }
            let created = T::create(self)?;
            tracing::debug!(
                container = %self.id,
                subcontext = std::any::type_name::<T>(),
                "auto-created subcontext"
            );
            self.add_subcontext(Box::new(created), false)?;
        }
        Ok(self
            .subcontexts
            .get_mut_by_type_id(type_id)
            .and_then(|member| (**member).as_any_mut().downcast_mut::<T>()))
    }

    /// Existing subcontext of type `T`, never auto-created
    pub fn subcontext<T: Context>(&self) -> Option<&T> {
        self.subcontexts
            .get::<T>()
            .and_then(|member| (**member).as_any().downcast_ref::<T>())
    }

    pub fn contains_subcontext<T: Context>(&self) -> bool {
        self.subcontexts.contains_type::<T>()
    }

    /// Add a subcontext, replacing an existing one of the same type only if
    /// `replace` is set. Returns the replaced subcontext.
    pub fn add_subcontext(
        &mut self,
        mut subcontext: Box<dyn Context>,
        replace: bool,
    ) -> Result<Option<Box<dyn Context>>> {
        subcontext.subcontexts_mut().parent = Some(self.id);
        let mut replaced = self.subcontexts.add(subcontext, replace).inspect_err(|err| {
            tracing::debug!(container = %self.id, %err, "rejected subcontext");
        })?;
        if let Some(old) = replaced.as_mut() {
            old.subcontexts_mut().parent = None;
        }
        Ok(replaced)
    }

    /// Remove the subcontext whose own container is `id`
    pub fn remove_subcontext(&mut self, id: ContainerId) -> Option<Box<dyn Context>> {
        let mut cursor = self.subcontexts.cursor();
        while let Some(member) = cursor.advance() {
            if member.subcontexts().id() == id {
                let mut removed = cursor.remove().ok()?;
                removed.subcontexts_mut().parent = None;
                return Some(removed);
            }
        }
        None
    }

    /// Remove the subcontext of type `T`, if any
    pub fn remove_subcontext_type<T: Context>(&mut self) -> Option<Box<T>> {
        let mut removed = self.subcontexts.remove_type::<T>()?;
        removed.subcontexts_mut().parent = None;
        <dyn Context as AsAny>::into_any(removed)
            .downcast::<T>()
            .ok()
    }

    /// Subcontexts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Context> {
        self.subcontexts.iter().map(|member| &**member)
    }

    pub fn len(&self) -> usize {
        self.subcontexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subcontexts.is_empty()
    }

    pub fn clear(&mut self) {
        for member in self.subcontexts.iter_mut() {
            member.subcontexts_mut().parent = None;
        }
        self.subcontexts.clear();
    }
}

impl Default for SubcontextContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BaseContext, ContextError};
    use xt_collections::CollectionError;

    #[derive(Debug, Default)]
    struct Counter {
        hits: u32,
        subcontexts: SubcontextContainer,
    }

    impl Context for Counter {
        fn subcontexts(&self) -> &SubcontextContainer {
            &self.subcontexts
        }

        fn subcontexts_mut(&mut self) -> &mut SubcontextContainer {
            &mut self.subcontexts
        }

        fn create(_owner: &SubcontextContainer) -> Result<Self> {
            Ok(Self::default())
        }
    }

    /// No factory
    #[derive(Debug, Default)]
    struct Manual {
        subcontexts: SubcontextContainer,
    }

    impl Context for Manual {
        fn subcontexts(&self) -> &SubcontextContainer {
            &self.subcontexts
        }

        fn subcontexts_mut(&mut self) -> &mut SubcontextContainer {
            &mut self.subcontexts
        }
    }

    #[test]
    fn test_missing_without_autocreate() {
        let mut container = SubcontextContainer::new();
        assert!(!container.is_auto_create_subcontexts());
        assert!(container.get_subcontext::<Counter>().unwrap().is_none());
        assert!(container.is_empty());
    }

    #[test]
    fn test_autocreate_returns_same_instance() {
        let mut container = SubcontextContainer::new();
        container
            .get_subcontext_with::<Counter>(true)
            .unwrap()
            .unwrap()
            .hits += 1;
        let counter = container.get_subcontext_with::<Counter>(true).unwrap().unwrap();
        counter.hits += 1;
        assert_eq!(container.subcontext::<Counter>().unwrap().hits, 2);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_container_flag() {
        let mut container = SubcontextContainer::new();
        container.set_auto_create_subcontexts(true);
        assert!(container.get_subcontext::<Counter>().unwrap().is_some());
        // explicit argument wins over the flag
        assert!(container.get_subcontext_with::<BaseContext>(false).unwrap().is_none());
    }

    #[test]
    fn test_construction_error_surfaces() {
        let mut container = SubcontextContainer::new();
        let err = container.get_subcontext_with::<Manual>(true).unwrap_err();
        assert!(matches!(err, ContextError::Construction { type_name } if type_name.ends_with("Manual")));
        assert!(container.is_empty());
    }

    #[test]
    fn test_add_duplicate_type() {
        let mut container = SubcontextContainer::new();
        container.add_subcontext(Box::new(Counter::default()), false).unwrap();
        let err = container
            .add_subcontext(Box::new(Counter::default()), false)
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::Collection(CollectionError::DuplicateType { .. })
        ));
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut container = SubcontextContainer::new();
        let first = Counter {
            hits: 1,
            ..Default::default()
        };
        container.add_subcontext(Box::new(first), false).unwrap();
        let second = Counter {
            hits: 2,
            ..Default::default()
        };
        let replaced = container.add_subcontext(Box::new(second), true).unwrap().unwrap();

        assert_eq!(replaced.subcontexts().parent_id(), None);
        let current = container.subcontext::<Counter>().unwrap();
        assert_eq!(current.hits, 2);
        assert_eq!(current.subcontexts().parent_id(), Some(container.id()));
    }

    #[test]
    fn test_remove_by_type_and_identity() {
        let mut container = SubcontextContainer::new();
        container.add_subcontext(Box::new(Counter::default()), false).unwrap();
        container.add_subcontext(Box::new(BaseContext::new()), false).unwrap();

        let base_id = container.subcontext::<BaseContext>().unwrap().subcontexts().id();
        let removed = container.remove_subcontext(base_id).unwrap();
        assert_eq!(removed.subcontexts().id(), base_id);
        assert!(removed.subcontexts().parent_id().is_none());
        assert!(container.remove_subcontext(base_id).is_none());

        let counter = container.remove_subcontext_type::<Counter>().unwrap();
        assert_eq!(counter.hits, 0);
        assert!(container.remove_subcontext_type::<Counter>().is_none());
        assert!(container.is_empty());
    }

    #[test]
    fn test_iteration_order() {
        let mut container = SubcontextContainer::new();
        container.add_subcontext(Box::new(Counter::default()), false).unwrap();
        container.add_subcontext(Box::new(BaseContext::new()), false).unwrap();
        container.add_subcontext(Box::new(Counter::default()), true).unwrap();

        let names: Vec<&str> = container.iter().map(|c| c.any_type_name()).collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("BaseContext"));
        assert!(names[1].ends_with("Counter"));
    }

    #[test]
    fn test_ids_unique() {
        let a = SubcontextContainer::new();
        let b = SubcontextContainer::default();
        assert_ne!(a.id(), b.id());
    }
}
