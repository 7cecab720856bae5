//! XML Object - one element of the tree

use xt_core::{NamespaceManager, QName};

use crate::NodeId;
use crate::attributes::{AttributeMap, AttributeMapMut};

/// Element node of an [`XmlTree`](crate::XmlTree)
#[derive(Debug, Clone)]
pub struct XmlObject {
    element_name: QName,
    schema_type: Option<QName>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    attributes: AttributeMap,
    text: Option<String>,
    qname_content: Option<QName>,
    namespace_manager: NamespaceManager,
}

impl XmlObject {
    pub fn new(element_name: QName, schema_type: Option<QName>) -> Self {
        let mut namespace_manager = NamespaceManager::new(&element_name);
        namespace_manager.register_element_type(schema_type.as_ref());
        Self {
            element_name,
            schema_type,
            parent: None,
            children: Vec::new(),
            attributes: AttributeMap::new(),
            text: None,
            qname_content: None,
            namespace_manager,
        }
    }

    pub fn element_name(&self) -> &QName {
        &self.element_name
    }

    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    /// Set or clear the explicit `xsi:type`
    pub fn set_schema_type(&mut self, schema_type: Option<QName>) {
        self.namespace_manager
            .register_element_type(schema_type.as_ref());
        self.schema_type = schema_type;
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Attribute access that keeps the namespace manager up to date
    pub fn attributes_mut(&mut self) -> AttributeMapMut<'_> {
        AttributeMapMut::new(&mut self.attributes, &mut self.namespace_manager)
    }

    /// Text content
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// QName held by the content, if it was set as one
    pub fn qname_content(&self) -> Option<&QName> {
        self.qname_content.as_ref()
    }

    /// Set plain text content
    pub fn set_text(&mut self, text: Option<String>) {
        self.namespace_manager.deregister_content_value();
        self.qname_content = None;
        self.text = text;
    }

    /// Set QName-valued content, stored as `prefix:local`
    pub fn set_qname_content(&mut self, value: &QName) {
        self.namespace_manager.register_content_value(value);
        self.text = Some(value.to_prefixed_string());
        self.qname_content = Some(value.clone());
    }

    pub fn namespace_manager(&self) -> &NamespaceManager {
        &self.namespace_manager
    }

    pub fn namespace_manager_mut(&mut self) -> &mut NamespaceManager {
        &mut self.namespace_manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xt_core::Namespace;

    #[test]
    fn test_text_replaces_qname_content() {
        let mut object = XmlObject::new(QName::new(Some("urn:a"), "A", Some("a")), None);
        object.set_qname_content(&QName::new(Some("urn:v"), "Value", Some("v")));
        assert_eq!(object.text(), Some("v:Value"));
        assert_eq!(object.qname_content().map(QName::local_name), Some("Value"));
        assert_eq!(object.namespace_manager().namespaces().len(), 2);

        object.set_text(Some("plain".into()));
        assert_eq!(object.text(), Some("plain"));
        assert!(object.qname_content().is_none());
        assert_eq!(object.namespace_manager().namespaces().len(), 1);
    }

    #[test]
    fn test_schema_type_tracks_manager() {
        let mut object = XmlObject::new(QName::new(Some("urn:a"), "A", Some("a")), None);
        object.set_schema_type(Some(QName::new(Some("urn:t"), "T", Some("t"))));
        let namespaces = object.namespace_manager().namespaces();
        assert!(namespaces.contains(&Namespace::new("urn:t", Some("t")).unwrap()));
        assert_eq!(namespaces.len(), 3);

        object.set_schema_type(None);
        assert!(object.schema_type().is_none());
        assert_eq!(object.namespace_manager().namespaces().len(), 1);
    }
}
