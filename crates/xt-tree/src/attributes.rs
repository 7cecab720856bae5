//! Element Attributes
//!
//! Ordered attribute storage. Mutations go through [`AttributeMapMut`],
//! which keeps the owner's namespace manager in step with the map.

use std::collections::{HashMap, HashSet};

use xt_core::{NamespaceManager, QName, xsi_type_name};

/// Attribute collection of one XML object
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    attributes: Vec<(QName, String)>,
    by_name: HashMap<QName, usize>,
    qname_attributes: HashSet<QName>,
    qname_values: HashMap<QName, QName>,
    id_attributes: HashSet<QName>,
    infer_qname_values: bool,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Get attribute value
    pub fn get(&self, name: &QName) -> Option<&str> {
        self.by_name
            .get(name)
            .and_then(|&i| self.attributes.get(i))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &QName) -> bool {
        self.by_name.contains_key(name)
    }

    /// Attribute names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &QName> {
        self.attributes.iter().map(|(name, _)| name)
    }

    /// Iterate over attributes
    pub fn iter(&self) -> impl Iterator<Item = (&QName, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name, value.as_str()))
    }

    /// Whether values of `name` are always QNames
    pub fn is_qname_attribute(&self, name: &QName) -> bool {
        *name == xsi_type_name() || self.qname_attributes.contains(name)
    }

    /// Whether the current value of `name` was registered as a QName
    pub fn has_qname_value(&self, name: &QName) -> bool {
        self.qname_values.contains_key(name)
    }

    /// QName held by `name`, if its value was registered as one
    pub fn qname_value(&self, name: &QName) -> Option<&QName> {
        self.qname_values.get(name)
    }

    pub fn is_id_attribute(&self, name: &QName) -> bool {
        self.id_attributes.contains(name)
    }

    /// Values of all ID attributes
    pub fn id_values(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(name, _)| self.id_attributes.contains(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether `prefix:local` values of unregistered attributes are treated
    /// as QNames when the prefix resolves
    pub fn infer_qname_values(&self) -> bool {
        self.infer_qname_values
    }

    fn insert(&mut self, name: QName, value: String) -> Option<String> {
        if let Some(&index) = self.by_name.get(&name) {
            let old = std::mem::replace(&mut self.attributes[index], (name, value));
            Some(old.1)
        } else {
            let index = self.attributes.len();
            self.by_name.insert(name.clone(), index);
            self.attributes.push((name, value));
            None
        }
    }

    fn take(&mut self, name: &QName) -> Option<String> {
        let index = self.by_name.remove(name)?;
        // Update indices for items after removed
        for idx in self.by_name.values_mut() {
            if *idx > index {
                *idx -= 1;
            }
        }
        Some(self.attributes.remove(index).1)
    }
}

/// Mutable view over an attribute map and the namespace manager it reports to
pub struct AttributeMapMut<'a> {
    map: &'a mut AttributeMap,
    manager: &'a mut NamespaceManager,
}

impl<'a> AttributeMapMut<'a> {
    pub(crate) fn new(map: &'a mut AttributeMap, manager: &'a mut NamespaceManager) -> Self {
        Self { map, manager }
    }

    /// Set a plain string attribute, returning the previous value
    pub fn put(&mut self, name: QName, value: impl Into<String>) -> Option<String> {
        self.release_value(&name);
        self.manager.register_attribute_name(&name);
        self.map.insert(name, value.into())
    }

    /// Set a QName-valued attribute. The stored text is `prefix:local`.
    pub fn put_qname(&mut self, name: QName, value: &QName) -> Option<String> {
        self.manager.register_attribute_name(&name);
        let key = NamespaceManager::generate_attribute_key(&name);
        self.manager.register_attribute_value(&key, value);
        self.map.qname_values.insert(name.clone(), value.clone());
        self.map.insert(name, value.to_prefixed_string())
    }

    /// Remove an attribute, returning its value
    pub fn remove(&mut self, name: &QName) -> Option<String> {
        let old = self.map.take(name)?;
        self.release_value(name);
        self.manager.deregister_attribute_name(name);
        Some(old)
    }

    /// Remove every attribute
    pub fn clear(&mut self) {
        let names: Vec<QName> = self.map.names().cloned().collect();
        for name in &names {
            self.remove(name);
        }
    }

    /// Declare that values of `name` are QNames
    pub fn register_qname_attribute(&mut self, name: QName) {
        self.map.qname_attributes.insert(name);
    }

    pub fn deregister_qname_attribute(&mut self, name: &QName) {
        self.map.qname_attributes.remove(name);
    }

    /// Declare that `name` carries an ID
    pub fn register_id_attribute(&mut self, name: QName) {
        self.map.id_attributes.insert(name);
    }

    pub fn deregister_id_attribute(&mut self, name: &QName) {
        self.map.id_attributes.remove(name);
    }

    pub fn set_infer_qname_values(&mut self, infer: bool) {
        self.map.infer_qname_values = infer;
    }

    fn release_value(&mut self, name: &QName) {
        if self.map.qname_values.remove(name).is_some() {
            let key = NamespaceManager::generate_attribute_key(name);
            self.manager.deregister_attribute_value(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> NamespaceManager {
        NamespaceManager::new(&QName::new(Some("urn:owner"), "Owner", Some("o")))
    }

    #[test]
    fn test_put_get_remove() {
        let mut map = AttributeMap::new();
        let mut manager = owner();
        let id = QName::local("ID");
        let lang = QName::new(Some("urn:a"), "lang", Some("a"));

        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        attrs.put(id.clone(), "abc");
        attrs.put(lang.clone(), "en");
        assert_eq!(attrs.put(id.clone(), "def"), Some("abc".to_string()));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&id), Some("def"));
        assert_eq!(manager.namespaces().len(), 2);

        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        assert_eq!(attrs.remove(&lang), Some("en".to_string()));
        assert!(attrs.remove(&lang).is_none());
        assert_eq!(map.get(&id), Some("def"));
        assert_eq!(manager.namespaces().len(), 1);
    }

    #[test]
    fn test_order_preserved_after_removal() {
        let mut map = AttributeMap::new();
        let mut manager = owner();
        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        for name in ["a", "b", "c"] {
            attrs.put(QName::local(name), name);
        }
        attrs.remove(&QName::local("a"));

        let names: Vec<_> = map.names().map(|n| n.local_name().to_string()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(map.get(&QName::local("c")), Some("c"));
    }

    #[test]
    fn test_qname_value_overwritten_by_plain_value() {
        let mut map = AttributeMap::new();
        let mut manager = owner();
        let attr = QName::local("Format");

        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        attrs.put_qname(attr.clone(), &QName::new(Some("urn:v"), "Value", Some("v")));
        assert_eq!(map.get(&attr), Some("v:Value"));
        assert!(map.has_qname_value(&attr));
        assert_eq!(map.qname_value(&attr).map(QName::namespace_uri), Some(Some("urn:v")));
        assert_eq!(manager.non_visible_namespace_prefixes(), vec!["v".to_string()]);

        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        attrs.put(attr.clone(), "plain");
        assert!(!map.has_qname_value(&attr));
        assert!(map.qname_value(&attr).is_none());
        assert!(manager.non_visible_namespace_prefixes().is_empty());
    }

    #[test]
    fn test_clear_deregisters_everything() {
        let mut map = AttributeMap::new();
        let mut manager = owner();
        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        attrs.put(QName::new(Some("urn:a"), "x", Some("a")), "1");
        attrs.put_qname(QName::local("y"), &QName::new(Some("urn:b"), "B", Some("b")));
        attrs.clear();

        assert!(map.is_empty());
        assert_eq!(manager.namespaces().len(), 1);
        assert!(manager.non_visible_namespace_prefixes().is_empty());
    }

    #[test]
    fn test_id_attributes() {
        let mut map = AttributeMap::new();
        let mut manager = owner();
        let id = QName::local("ID");
        let mut attrs = AttributeMapMut::new(&mut map, &mut manager);
        attrs.register_id_attribute(id.clone());
        attrs.put(id.clone(), "_123");
        attrs.put(QName::local("Other"), "_456");

        assert!(map.is_id_attribute(&id));
        assert_eq!(map.id_values().collect::<Vec<_>>(), vec!["_123"]);
    }

    #[test]
    fn test_xsi_type_is_qname_attribute() {
        let map = AttributeMap::new();
        assert!(map.is_qname_attribute(&xsi_type_name()));
        assert!(!map.is_qname_attribute(&QName::local("type")));
    }
}
