//! Class-indexed set
//!
//! Holds at most one member per concrete type. Members are kept in
//! insertion order; a member that is removed and added again goes to the end.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::CollectionError;

/// Something that can live in a [`ClassIndexedSet`]
pub trait IndexedMember {
    /// Concrete type the member is indexed under
    fn index_type(&self) -> TypeId;

    /// Human readable name of the indexed type, for errors and logs
    fn index_type_name(&self) -> &'static str;

    /// Whether `self` and `other` are the same instance
    fn same_instance(&self, other: &Self) -> bool;
}

impl IndexedMember for Rc<dyn Any> {
    fn index_type(&self) -> TypeId {
        Any::type_id(&**self)
    }

    fn index_type_name(&self) -> &'static str {
        "dyn Any"
    }

    fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl IndexedMember for Box<dyn Any> {
    fn index_type(&self) -> TypeId {
        Any::type_id(&**self)
    }

    fn index_type_name(&self) -> &'static str {
        "dyn Any"
    }

    fn same_instance(&self, other: &Self) -> bool {
        // boxed zero-sized values all share one dangling address
        std::mem::size_of_val(&**self) != 0
            && std::ptr::addr_eq(&**self as *const dyn Any, &**other as *const dyn Any)
    }
}

/// Set holding at most one member per concrete type
#[derive(Debug)]
pub struct ClassIndexedSet<M> {
    members: Vec<M>,
    by_type: HashMap<TypeId, usize>,
}

impl<M: IndexedMember> ClassIndexedSet<M> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Add a member.
    ///
    /// Fails if the instance is already present, or if another member of the
    /// same type is present and `replace` is false. With `replace` the
    /// previous member of that type is removed and returned.
    pub fn add(&mut self, member: M, replace: bool) -> Result<Option<M>, CollectionError> {
        if self.contains(&member) {
            return Err(CollectionError::DuplicateInstance {
                type_name: member.index_type_name(),
            });
        }

        let type_id = member.index_type();
        let replaced = match self.by_type.get(&type_id).copied() {
            Some(_) if !replace => {
                return Err(CollectionError::DuplicateType {
                    type_name: member.index_type_name(),
                    type_id,
                });
            }
            Some(index) => {
                tracing::trace!(type_name = member.index_type_name(), "replacing member");
                Some(self.remove_at(index))
            }
            None => None,
        };

        self.by_type.insert(type_id, self.members.len());
        self.members.push(member);
        Ok(replaced)
    }

    /// Member indexed under `T`
    pub fn get<T: Any>(&self) -> Option<&M> {
        self.get_by_type_id(TypeId::of::<T>())
    }

    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<&M> {
        self.by_type.get(&type_id).map(|&i| &self.members[i])
    }

    pub fn get_mut_by_type_id(&mut self, type_id: TypeId) -> Option<&mut M> {
        let index = *self.by_type.get(&type_id)?;
        self.members.get_mut(index)
    }

    /// Remove this exact instance. Absent members are ignored.
    pub fn remove(&mut self, member: &M) -> Option<M> {
        let index = self.members.iter().position(|m| m.same_instance(member))?;
        Some(self.remove_at(index))
    }

    /// Remove whatever member is indexed under `T`
    pub fn remove_type<T: Any>(&mut self) -> Option<M> {
        self.remove_by_type_id(TypeId::of::<T>())
    }

    pub fn remove_by_type_id(&mut self, type_id: TypeId) -> Option<M> {
        let index = *self.by_type.get(&type_id)?;
        Some(self.remove_at(index))
    }

    pub fn contains(&self, member: &M) -> bool {
        self.members.iter().any(|m| m.same_instance(member))
    }

    pub fn contains_type<T: Any>(&self) -> bool {
        self.contains_type_id(TypeId::of::<T>())
    }

    pub fn contains_type_id(&self, type_id: TypeId) -> bool {
        self.by_type.contains_key(&type_id)
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.by_type.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, M> {
        self.members.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, M> {
        self.members.iter_mut()
    }

    /// Cursor supporting removal while iterating
    pub fn cursor(&mut self) -> Cursor<'_, M> {
        Cursor {
            set: self,
            next: 0,
            current: None,
        }
    }

    /// Keep only the members for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&M) -> bool,
    {
        self.members.retain(|m| keep(m));
        self.reindex();
    }

    fn remove_at(&mut self, index: usize) -> M {
        let member = self.members.remove(index);
        self.by_type.remove(&member.index_type());
        // Shift indices of everything after the removed slot
        for idx in self.by_type.values_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        member
    }

    fn reindex(&mut self) {
        self.by_type = self
            .members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.index_type(), i))
            .collect();
    }
}

impl<M: IndexedMember> Default for ClassIndexedSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M: IndexedMember> IntoIterator for &'a ClassIndexedSet<M> {
    type Item = &'a M;
    type IntoIter = std::slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iteration with removal.
///
/// `remove` deletes the member returned by the last `advance`; it is only
/// legal once per advance.
pub struct Cursor<'a, M> {
    set: &'a mut ClassIndexedSet<M>,
    next: usize,
    current: Option<usize>,
}

impl<'a, M: IndexedMember> Cursor<'a, M> {
    /// Move to the next member
    pub fn advance(&mut self) -> Option<&M> {
        if self.next >= self.set.members.len() {
            self.current = None;
            return None;
        }
        let index = self.next;
        self.current = Some(index);
        self.next += 1;
        self.set.members.get(index)
    }

    /// Remove the member returned by the last `advance`
    pub fn remove(&mut self) -> Result<M, CollectionError> {
        let index = self.current.take().ok_or(CollectionError::IllegalState(
            "remove() requires a preceding advance()",
        ))?;
        self.next = index;
        Ok(self.set.remove_at(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FooMember;
    #[derive(Debug)]
    struct BarMember;
    #[derive(Debug)]
    struct BazMember(u32);

    fn member<T: Any>(value: T) -> Rc<dyn Any> {
        Rc::new(value)
    }

    fn populated() -> (ClassIndexedSet<Rc<dyn Any>>, Vec<Rc<dyn Any>>) {
        let mut set = ClassIndexedSet::new();
        let members = vec![member(FooMember), member(BarMember), member(BazMember(1))];
        for (i, m) in members.iter().enumerate() {
            set.add(m.clone(), false).unwrap();
            assert_eq!(set.len(), i + 1);
        }
        (set, members)
    }

    #[test]
    fn test_insertion_order() {
        let (set, members) = populated();
        let iterated: Vec<_> = set.iter().cloned().collect();
        assert_eq!(iterated.len(), 3);
        for (a, b) in iterated.iter().zip(&members) {
            assert!(a.same_instance(b));
        }
    }

    #[test]
    fn test_duplicate_instance() {
        let (mut set, members) = populated();
        let err = set.add(members[0].clone(), false).unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateInstance { .. }));
        let err = set.add(members[0].clone(), true).unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateInstance { .. }));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_duplicate_type() {
        let (mut set, _) = populated();
        let err = set.add(member(BazMember(2)), false).unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateType { .. }));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_replace() {
        let (mut set, members) = populated();
        let replacement = member(BazMember(2));
        let old = set.add(replacement.clone(), true).unwrap().unwrap();
        assert!(old.same_instance(&members[2]));

        let stored = set.get::<BazMember>().unwrap();
        assert!(stored.same_instance(&replacement));
        assert_eq!(stored.downcast_ref::<BazMember>().unwrap().0, 2);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_get_and_contains() {
        let (mut set, members) = populated();
        assert!(set.get::<FooMember>().unwrap().same_instance(&members[0]));
        assert!(set.contains(&members[1]));
        assert!(set.contains_type::<BarMember>());
        assert!(!set.contains(&member(BarMember)));

        set.remove(&members[1]);
        assert!(set.get::<BarMember>().is_none());
        assert!(!set.contains_type::<BarMember>());
        assert!(set.remove(&members[1]).is_none());
        assert!(set.remove_type::<BarMember>().is_none());
    }

    #[test]
    fn test_readd_goes_to_end() {
        let (mut set, members) = populated();
        set.remove(&members[0]);
        set.add(members[0].clone(), false).unwrap();

        let order: Vec<_> = set.iter().cloned().collect();
        assert!(order[0].same_instance(&members[1]));
        assert!(order[1].same_instance(&members[2]));
        assert!(order[2].same_instance(&members[0]));
        assert!(set.get::<BazMember>().unwrap().same_instance(&members[2]));
    }

    #[test]
    fn test_clear() {
        let (mut set, _) = populated();
        set.clear();
        assert!(set.is_empty());
        assert!(set.get::<FooMember>().is_none());
    }

    #[test]
    fn test_cursor_removal() {
        let (mut set, members) = populated();
        let mut cursor = set.cursor();

        assert!(cursor.advance().is_some());
        let removed = cursor.advance().unwrap().clone();
        assert!(removed.same_instance(&members[1]));
        cursor.remove().unwrap();
        let next = cursor.advance().unwrap();
        assert!(next.same_instance(&members[2]));
        assert!(cursor.advance().is_none());

        assert_eq!(set.len(), 2);
        assert!(set.get::<BazMember>().unwrap().same_instance(&members[2]));
    }

    #[test]
    fn test_cursor_remove_before_advance() {
        let (mut set, _) = populated();
        let mut cursor = set.cursor();
        assert!(matches!(cursor.remove(), Err(CollectionError::IllegalState(_))));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_cursor_double_remove() {
        let (mut set, _) = populated();
        let mut cursor = set.cursor();
        cursor.advance();
        assert!(cursor.remove().is_ok());
        assert!(matches!(cursor.remove(), Err(CollectionError::IllegalState(_))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_cursor_remove_all() {
        let (mut set, _) = populated();
        let mut cursor = set.cursor();
        while cursor.advance().is_some() {
            cursor.remove().unwrap();
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_retain() {
        let (mut set, members) = populated();
        set.retain(|m| !m.is::<FooMember>());
        assert_eq!(set.len(), 2);
        assert!(set.get::<BazMember>().unwrap().same_instance(&members[2]));
        assert!(set.get::<FooMember>().is_none());
    }

    #[test]
    fn test_boxed_members() {
        let mut set: ClassIndexedSet<Box<dyn Any>> = ClassIndexedSet::new();
        set.add(Box::new(FooMember), false).unwrap();
        assert!(matches!(
            set.add(Box::new(FooMember), false),
            Err(CollectionError::DuplicateType { .. })
        ));
        set.add(Box::new(BazMember(7)), false).unwrap();
        let baz = set.get::<BazMember>().unwrap();
        assert_eq!(baz.downcast_ref::<BazMember>().unwrap().0, 7);
    }
}
