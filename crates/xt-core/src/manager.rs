//! Namespace Manager
//!
//! Tracks, for a single XML object, every source that makes a namespace
//! relevant to its serialization: element name, schema type, attribute
//! names, QName-valued attributes and content, and explicit declarations.
//!
//! Sources fall into two groups:
//! - *visible* uses (element name, attribute names) put the prefix on the
//!   element itself, so any serializer sees it being used;
//! - *forcing* uses (schema type, attribute values, content value,
//!   declarations) hide the prefix inside text, so the namespace has to be
//!   declared where it is used unless a visible use covers it.
//!
//! The manager only knows about its owner. Subtree aggregation is done by the
//! tree, which feeds the children's results into
//! [`NamespaceManager::non_visible_namespaces`].

use std::collections::HashSet;

use crate::constants::{DEFAULT_NS_TOKEN, xml_namespace, xsi_namespace};
use crate::{Namespace, QName};

/// Per-node namespace bookkeeping
#[derive(Debug, Clone, Default)]
pub struct NamespaceManager {
    element_name: Option<Namespace>,
    element_type: Option<Namespace>,
    equivalent_names: Vec<(QName, Namespace)>,
    attribute_names: Vec<(QName, Namespace)>,
    attribute_values: Vec<(String, Namespace)>,
    content_value: Option<Namespace>,
    declarations: Vec<Namespace>,
    namespaces: Vec<Namespace>,
}

impl NamespaceManager {
    /// Manager for an element with the given name
    pub fn new(element_name: &QName) -> Self {
        let mut manager = Self::default();
        manager.register_element_name(element_name);
        manager
    }

    /// Key under which a QName-valued attribute is registered.
    ///
    /// Clark notation of the attribute name, so the same name always maps to
    /// the same key.
    pub fn generate_attribute_key(name: &QName) -> String {
        name.to_string()
    }

    pub fn register_element_name(&mut self, name: &QName) {
        self.element_name = Namespace::from_qname(name);
    }

    /// Register (or clear) the explicit schema type of the owner
    pub fn register_element_type(&mut self, schema_type: Option<&QName>) {
        self.element_type = schema_type.and_then(Namespace::from_qname);
        tracing::trace!(element_type = ?self.element_type, "registered element type");
    }

    pub fn element_name_namespace(&self) -> Option<&Namespace> {
        self.element_name.as_ref()
    }

    pub fn element_type_namespace(&self) -> Option<&Namespace> {
        self.element_type.as_ref()
    }

    pub fn register_equivalent_name(&mut self, name: &QName) {
        let Some(ns) = Namespace::from_qname(name) else {
            return;
        };
        upsert(&mut self.equivalent_names, name.clone(), ns);
    }

    pub fn deregister_equivalent_name(&mut self, name: &QName) {
        self.equivalent_names.retain(|(key, _)| key != name);
    }

    /// Register a namespace that must always be declared on the owner
    pub fn register_namespace_declaration(&mut self, ns: &Namespace) {
        tracing::trace!(%ns, "register namespace declaration");
        insert_unique(&mut self.declarations, ns.with_always_declare(true));
    }

    pub fn deregister_namespace_declaration(&mut self, ns: &Namespace) {
        self.declarations.retain(|decl| decl != ns);
    }

    /// Register a namespace with unspecified usage
    pub fn register_namespace(&mut self, ns: &Namespace) {
        tracing::trace!(%ns, "register namespace");
        insert_unique(&mut self.namespaces, ns.with_always_declare(false));
    }

    pub fn deregister_namespace(&mut self, ns: &Namespace) {
        self.namespaces.retain(|existing| existing != ns);
    }

    /// Record an attribute on the owner. Names without a namespace are ignored.
    pub fn register_attribute_name(&mut self, name: &QName) {
        let Some(ns) = Namespace::from_qname(name) else {
            return;
        };
        tracing::trace!(attribute = %name, "register attribute name");
        upsert(&mut self.attribute_names, name.clone(), ns);
    }

    pub fn deregister_attribute_name(&mut self, name: &QName) {
        self.attribute_names.retain(|(key, _)| key != name);
    }

    /// Record a QName-valued attribute. Registering again under the same key
    /// replaces the previous value.
    pub fn register_attribute_value(&mut self, key: &str, value: &QName) {
        match Namespace::from_qname(value) {
            Some(ns) => {
                tracing::trace!(key, value = %value, "register attribute value");
                upsert(&mut self.attribute_values, key.to_string(), ns);
            }
            None => self.deregister_attribute_value(key),
        }
    }

    pub fn deregister_attribute_value(&mut self, key: &str) {
        self.attribute_values.retain(|(existing, _)| existing != key);
    }

    /// Record QName-valued text content, replacing any previous one
    pub fn register_content_value(&mut self, value: &QName) {
        self.content_value = Namespace::from_qname(value);
    }

    pub fn deregister_content_value(&mut self) {
        self.content_value = None;
    }

    /// Explicit declarations currently registered
    pub fn namespace_declarations(&self) -> &[Namespace] {
        &self.declarations
    }

    /// Every namespace relevant to the owner, de-duplicated.
    ///
    /// A namespace reported by several sources appears once, flagged
    /// `always_declare` if any of those sources forces it.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut merged = Vec::new();
        for (ns, forcing) in self.sources() {
            merge(&mut merged, ns, forcing);
        }
        merged
    }

    /// Namespaces whose prefixes show up in the owner's own markup
    pub fn visible_namespaces(&self) -> Vec<Namespace> {
        let mut visible = Vec::new();
        if let Some(ns) = &self.element_name {
            insert_unique(&mut visible, ns.clone());
        }
        if self.element_type.is_some() {
            insert_unique(&mut visible, xsi_namespace());
        }
        for (_, ns) in &self.attribute_names {
            insert_unique(&mut visible, ns.clone());
        }
        visible
    }

    /// Namespaces only referenced from text (type, values, content) or
    /// explicitly declared
    pub fn non_visible_namespace_candidates(&self) -> Vec<Namespace> {
        let mut candidates = Vec::new();
        if let Some(ns) = &self.element_type {
            insert_unique(&mut candidates, ns.clone());
        }
        for (_, ns) in &self.attribute_values {
            insert_unique(&mut candidates, ns.clone());
        }
        if let Some(ns) = &self.content_value {
            insert_unique(&mut candidates, ns.clone());
        }
        for ns in &self.declarations {
            insert_unique(&mut candidates, ns.clone());
        }
        candidates
    }

    /// Non-visible namespaces of the owner's subtree.
    ///
    /// `children` carries the already computed results of the owner's
    /// children. Anything the owner uses visibly drops out, as does `xml`.
    pub fn non_visible_namespaces<I>(&self, children: I) -> Vec<Namespace>
    where
        I: IntoIterator<Item = Vec<Namespace>>,
    {
        let mut result = Vec::new();
        for child in children {
            for ns in child {
                insert_unique(&mut result, ns);
            }
        }
        for ns in self.non_visible_namespace_candidates() {
            insert_unique(&mut result, ns);
        }

        let visible: HashSet<Namespace> = self.visible_namespaces().into_iter().collect();
        let xml = xml_namespace();
        result.retain(|ns| !visible.contains(ns) && *ns != xml);
        result
    }

    /// Prefixes of the owner's non-visible namespaces, ignoring descendants
    pub fn non_visible_namespace_prefixes(&self) -> Vec<String> {
        Self::prefixes_of(&self.non_visible_namespaces(std::iter::empty()))
    }

    /// Prefix set for a group of namespaces, `#default` standing in for the
    /// default namespace
    pub fn prefixes_of(namespaces: &[Namespace]) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::with_capacity(namespaces.len());
        for ns in namespaces {
            let prefix = ns.prefix().unwrap_or(DEFAULT_NS_TOKEN);
            if !prefixes.iter().any(|p| p == prefix) {
                prefixes.push(prefix.to_string());
            }
        }
        prefixes
    }

    /// Every registration as (namespace, forcing)
    fn sources(&self) -> Vec<(Namespace, bool)> {
        let mut sources = Vec::new();
        if let Some(ns) = &self.element_name {
            sources.push((ns.clone(), false));
        }
        if let Some(ns) = &self.element_type {
            sources.push((ns.clone(), true));
            sources.push((xsi_namespace(), false));
        }
        sources.extend(self.equivalent_names.iter().map(|(_, ns)| (ns.clone(), false)));
        sources.extend(self.attribute_names.iter().map(|(_, ns)| (ns.clone(), false)));
        sources.extend(self.attribute_values.iter().map(|(_, ns)| (ns.clone(), true)));
        if let Some(ns) = &self.content_value {
            sources.push((ns.clone(), true));
        }
        sources.extend(self.declarations.iter().map(|ns| (ns.clone(), true)));
        sources.extend(self.namespaces.iter().map(|ns| (ns.clone(), false)));
        sources
    }
}

fn merge(merged: &mut Vec<Namespace>, ns: Namespace, forcing: bool) {
    let forcing = forcing || ns.always_declare();
    match merged.iter_mut().find(|existing| **existing == ns) {
        Some(existing) => {
            if forcing {
                existing.set_always_declare(true);
            }
        }
        None => merged.push(ns.with_always_declare(forcing)),
    }
}

fn insert_unique(set: &mut Vec<Namespace>, ns: Namespace) {
    if !set.contains(&ns) {
        set.push(ns);
    }
}

fn upsert<K: PartialEq>(entries: &mut Vec<(K, Namespace)>, key: K, ns: Namespace) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(entry) => entry.1 = ns,
        None => entries.push((key, ns)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{XML_NS, XSI_NS};

    fn ns(uri: &str, prefix: &str) -> Namespace {
        Namespace::new(uri, Some(prefix)).unwrap()
    }

    fn name(uri: &str, local: &str, prefix: &str) -> QName {
        QName::new(Some(uri), local, Some(prefix))
    }

    fn element() -> NamespaceManager {
        NamespaceManager::new(&name("urn:ns1", "TestElementName", "prefix1"))
    }

    #[test]
    fn test_element_namespace_always_present() {
        let manager = element();
        let namespaces = manager.namespaces();
        assert_eq!(namespaces.len(), 1);
        assert!(namespaces.contains(&ns("urn:ns1", "prefix1")));
    }

    #[test]
    fn test_element_without_namespace() {
        let manager = NamespaceManager::new(&QName::local("Plain"));
        assert!(manager.namespaces().is_empty());
        assert!(manager.non_visible_namespace_prefixes().is_empty());
    }

    #[test]
    fn test_object_with_type() {
        let mut manager = element();
        manager.register_element_type(Some(&name("urn:ns2", "TestType", "prefix2")));

        let namespaces = manager.namespaces();
        assert_eq!(namespaces.len(), 3);
        assert!(namespaces.contains(&ns("urn:ns2", "prefix2")));
        assert!(namespaces.contains(&ns(XSI_NS, "xsi")));

        manager.register_element_type(None);
        assert_eq!(manager.namespaces().len(), 1);
    }

    #[test]
    fn test_type_prefix_is_non_visible() {
        let mut manager = element();
        manager.register_element_type(Some(&name("urn:ns2", "TestType", "prefix2")));
        assert_eq!(manager.non_visible_namespace_prefixes(), vec!["prefix2".to_string()]);
    }

    #[test]
    fn test_deregister_middle_attribute_name() {
        let mut manager = NamespaceManager::new(&QName::local("Plain"));
        let a = name("urn:a", "attr", "a");
        let b = name("urn:b", "attr", "b");
        let c = name("urn:c", "attr", "c");
        manager.register_attribute_name(&a);
        manager.register_attribute_name(&b);
        manager.register_attribute_name(&c);
        assert_eq!(manager.namespaces().len(), 3);

        manager.deregister_attribute_name(&b);
        let namespaces = manager.namespaces();
        assert_eq!(namespaces.len(), 2);
        assert!(!namespaces.contains(&ns("urn:b", "b")));
    }

    #[test]
    fn test_shared_namespace_survives_partial_deregistration() {
        let mut manager = element();
        let attr = name("urn:ns1", "attr", "prefix1");
        manager.register_attribute_name(&attr);
        manager.deregister_attribute_name(&attr);
        assert!(manager.namespaces().contains(&ns("urn:ns1", "prefix1")));

        let decl = ns("urn:x", "x");
        manager.register_namespace(&decl);
        manager.register_namespace_declaration(&decl);
        manager.deregister_namespace_declaration(&decl);
        let namespaces = manager.namespaces();
        let found = namespaces.iter().find(|n| **n == decl).unwrap();
        assert!(!found.always_declare());
    }

    #[test]
    fn test_register_deregister_round_trip() {
        let baseline = element();
        let before = (baseline.namespaces(), baseline.non_visible_namespace_prefixes());

        let mut manager = baseline.clone();
        let decl = ns("urn:d", "d");
        manager.register_namespace_declaration(&decl);
        manager.deregister_namespace_declaration(&decl);
        manager.register_namespace(&decl);
        manager.deregister_namespace(&decl);
        let attr = name("urn:a", "attr", "a");
        manager.register_attribute_name(&attr);
        manager.deregister_attribute_name(&attr);
        manager.register_attribute_value("key", &attr);
        manager.deregister_attribute_value("key");
        manager.register_content_value(&attr);
        manager.deregister_content_value();
        manager.register_equivalent_name(&attr);
        manager.deregister_equivalent_name(&attr);

        assert_eq!(
            (manager.namespaces(), manager.non_visible_namespace_prefixes()),
            before
        );
    }

    #[test]
    fn test_deregister_absent_is_noop() {
        let mut manager = element();
        manager.deregister_namespace_declaration(&ns("urn:none", "n"));
        manager.deregister_namespace(&ns("urn:none", "n"));
        manager.deregister_attribute_name(&name("urn:none", "a", "n"));
        manager.deregister_attribute_value("missing");
        manager.deregister_content_value();
        assert_eq!(manager.namespaces().len(), 1);
    }

    #[test]
    fn test_attribute_name_does_not_force() {
        let mut manager = element();
        let attr = name("urn:ns2", "attr", "prefix2");
        manager.register_attribute_name(&attr);

        assert!(manager.non_visible_namespace_prefixes().is_empty());
        let namespaces = manager.namespaces();
        let found = namespaces.iter().find(|n| n.uri() == "urn:ns2").unwrap();
        assert!(!found.always_declare());
    }

    #[test]
    fn test_attribute_value_forces() {
        let mut manager = element();
        let value = name("urn:ns2", "Value", "prefix2");
        let key = NamespaceManager::generate_attribute_key(&QName::local("attr"));
        manager.register_attribute_value(&key, &value);

        assert_eq!(manager.non_visible_namespace_prefixes(), vec!["prefix2".to_string()]);
        let namespaces = manager.namespaces();
        let found = namespaces.iter().find(|n| n.uri() == "urn:ns2").unwrap();
        assert!(found.always_declare());
    }

    #[test]
    fn test_content_value_forces_and_replaces() {
        let mut manager = element();
        manager.register_content_value(&name("urn:ns2", "A", "prefix2"));
        manager.register_content_value(&name("urn:ns3", "B", "prefix3"));

        assert_eq!(manager.non_visible_namespace_prefixes(), vec!["prefix3".to_string()]);
        assert_eq!(manager.namespaces().len(), 2);
    }

    #[test]
    fn test_attribute_value_overwrite() {
        let mut manager = element();
        let key = NamespaceManager::generate_attribute_key(&name("urn:ns1", "attr", "prefix1"));
        manager.register_attribute_value(&key, &name("urn:ns2", "First", "prefix2"));
        manager.register_attribute_value(&key, &name("urn:ns3", "Second", "prefix3"));

        let namespaces = manager.namespaces();
        assert_eq!(namespaces.len(), 2);
        assert!(namespaces.contains(&ns("urn:ns3", "prefix3")));
        assert!(!namespaces.contains(&ns("urn:ns2", "prefix2")));
    }

    #[test]
    fn test_attribute_key_is_stable() {
        let a = NamespaceManager::generate_attribute_key(&name("urn:a", "attr", "a"));
        let b = NamespaceManager::generate_attribute_key(&name("urn:a", "attr", "other"));
        assert_eq!(a, b);
        assert_eq!(a, "{urn:a}attr");
    }

    #[test]
    fn test_merged_entry_is_forced_if_any_source_forces() {
        let mut manager = element();
        let attr = name("urn:ns2", "attr", "prefix2");
        manager.register_attribute_name(&attr);
        manager.register_namespace_declaration(&ns("urn:ns2", "prefix2"));

        let namespaces = manager.namespaces();
        assert_eq!(namespaces.len(), 2);
        let found = namespaces.iter().find(|n| n.uri() == "urn:ns2").unwrap();
        assert!(found.always_declare());
        // visibly used by the attribute name
        assert!(manager.non_visible_namespace_prefixes().is_empty());
    }

    #[test]
    fn test_xml_namespace_never_non_visible() {
        let mut manager = element();
        manager.register_content_value(&QName::new(Some(XML_NS), "lang", Some("xml")));
        assert!(manager.non_visible_namespace_prefixes().is_empty());
    }

    #[test]
    fn test_default_namespace_token() {
        let mut manager = element();
        manager.register_content_value(&QName::new(Some("urn:dflt"), "Value", None));
        assert_eq!(manager.non_visible_namespace_prefixes(), vec![DEFAULT_NS_TOKEN.to_string()]);
    }

    #[test]
    fn test_children_results_filtered_by_visible_use() {
        let mut manager = element();
        manager.register_attribute_name(&name("urn:ns2", "attr", "prefix2"));

        let from_children = vec![
            vec![ns("urn:ns2", "prefix2"), ns("urn:ns3", "prefix3")],
            vec![ns("urn:ns1", "prefix1")],
        ];
        let result = manager.non_visible_namespaces(from_children);
        assert_eq!(result, vec![ns("urn:ns3", "prefix3")]);
    }
}
