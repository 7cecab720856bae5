//! XML Parser
//!
//! Builds XML object trees from text using roxmltree. Objects are created
//! through a [`BuilderRegistry`]; namespaces declared on an element in the
//! source become explicit declarations on the matching object.

use xt_core::{Namespace, QName, XML_NS, XML_PREFIX, XSI_NS, XSI_TYPE_LOCAL_NAME};

use crate::{BuilderRegistry, NodeId, Result, TreeError, XmlTree};

/// Parsing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmarshallOptions {
    /// Treat `prefix:local` attribute values as QNames when the prefix is
    /// in scope
    pub infer_qname_values: bool,
}

impl Default for UnmarshallOptions {
    fn default() -> Self {
        Self {
            infer_qname_values: true,
        }
    }
}

/// Parses XML text into an [`XmlTree`]
#[derive(Debug)]
pub struct Unmarshaller<'a> {
    registry: &'a BuilderRegistry,
    options: UnmarshallOptions,
}

impl<'a> Unmarshaller<'a> {
    pub fn new(registry: &'a BuilderRegistry, options: UnmarshallOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &UnmarshallOptions {
        &self.options
    }

    /// Parse `xml` and add its document element to `tree` as a detached
    /// subtree. On error nothing is left behind in the tree.
    pub fn unmarshall(&self, tree: &mut XmlTree, xml: &str) -> Result<NodeId> {
        let doc = roxmltree::Document::parse(xml)?;
        let before = tree.len();
        let top = doc.root_element();
        let root = self.build_element(tree, top)?;
        if let Err(err) = self.build_below(tree, top, root) {
            tree.destroy(root)?;
            return Err(err);
        }
        tracing::debug!(%root, nodes = tree.len() - before, "unmarshalled document");
        Ok(root)
    }

    /// Populate `root` and build everything below it in document order.
    /// Objects are attached before they are populated, so destroying `root`
    /// cleans up after a failure.
    fn build_below(&self, tree: &mut XmlTree, top: roxmltree::Node<'_, '_>, root: NodeId) -> Result<()> {
        let mut pending = vec![(top, root)];
        while let Some((node, id)) = pending.pop() {
            self.populate(tree, node, id)?;
            let mut children = Vec::new();
            for child in node.children().filter(|child| child.is_element()) {
                let child_id = self.build_element(tree, child)?;
                if let Err(err) = tree.append_child(id, child_id) {
                    tree.destroy(child_id)?;
                    return Err(err);
                }
                children.push((child, child_id));
            }
            pending.extend(children.into_iter().rev());
        }
        Ok(())
    }

    fn build_element(&self, tree: &mut XmlTree, node: roxmltree::Node<'_, '_>) -> Result<NodeId> {
        let tag = node.tag_name();
        let element_name = QName::new(
            tag.namespace(),
            tag.name(),
            tag.namespace().and_then(|uri| node.lookup_prefix(uri)),
        );
        let schema_type = match node.attribute((XSI_NS, XSI_TYPE_LOCAL_NAME)) {
            Some(value) => Some(resolve_qname(node, value).ok_or_else(|| unresolved(value))?),
            None => None,
        };

        let id = self.registry.build(tree, element_name, schema_type)?;
        tracing::trace!(%id, element = %node.tag_name().name(), "built object");
        Ok(id)
    }

    fn populate(&self, tree: &mut XmlTree, node: roxmltree::Node<'_, '_>, id: NodeId) -> Result<()> {
        for ns in local_declarations(node) {
            tree.declare_namespace(id, &ns)?;
        }

        if self.options.infer_qname_values {
            tree.object_mut(id)?
                .attributes_mut()
                .set_infer_qname_values(true);
        }

        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NS) && attr.name() == XSI_TYPE_LOCAL_NAME {
                continue;
            }
            let name = QName::new(
                attr.namespace(),
                attr.name(),
                attr.namespace().and_then(|uri| attribute_prefix(node, uri)),
            );
            self.set_attribute(tree, node, id, name, attr.value())?;
        }

        let text: String = node
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect();
        if !text.trim().is_empty() {
            tree.set_text(id, Some(text))?;
        }
        Ok(())
    }

    fn set_attribute(
        &self,
        tree: &mut XmlTree,
        node: roxmltree::Node<'_, '_>,
        id: NodeId,
        name: QName,
        value: &str,
    ) -> Result<()> {
        let attributes = tree.object(id)?.attributes();
        let qname_attribute = attributes.is_qname_attribute(&name);
        let infer = attributes.infer_qname_values() && QName::split_prefixed(value).0.is_some();

        let resolved = if qname_attribute || infer {
            resolve_qname(node, value)
        } else {
            None
        };
        let mut attributes = tree.object_mut(id)?.attributes_mut();
        match resolved {
            Some(qname) => {
                attributes.put_qname(name, &qname);
            }
            None if qname_attribute => return Err(unresolved(value)),
            None => {
                if infer {
                    tracing::warn!(attribute = %name, value, "prefix not in scope, keeping plain value");
                }
                attributes.put(name, value);
            }
        }
        Ok(())
    }
}

/// Namespaces declared on `node` itself rather than inherited
fn local_declarations(node: roxmltree::Node<'_, '_>) -> Vec<Namespace> {
    let parent = node.parent_element();
    let mut declared = Vec::new();
    for ns in node.namespaces() {
        if ns.uri() == XML_NS || ns.uri().is_empty() {
            continue;
        }
        let inherited = parent.is_some_and(|p| p.lookup_namespace_uri(ns.name()) == Some(ns.uri()));
        if inherited {
            continue;
        }
        match Namespace::new(ns.uri(), ns.name()) {
            Ok(namespace) => declared.push(namespace),
            Err(err) => tracing::warn!(uri = ns.uri(), %err, "skipping namespace declaration"),
        }
    }
    declared
}

/// Prefix for a namespaced attribute. Attributes never use the default
/// namespace, so only prefixed bindings count.
fn attribute_prefix<'a>(node: roxmltree::Node<'a, '_>, uri: &str) -> Option<&'a str> {
    if uri == XML_NS {
        return Some(XML_PREFIX);
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
}

/// Resolve a `prefix:local` value against the bindings in scope at `node`
fn resolve_qname(node: roxmltree::Node<'_, '_>, value: &str) -> Option<QName> {
    let (prefix, local) = QName::split_prefixed(value.trim());
    if local.is_empty() {
        return None;
    }
    if prefix == Some(XML_PREFIX) {
        return Some(QName::new(Some(XML_NS), local, prefix));
    }
    match node.lookup_namespace_uri(prefix) {
        Some(uri) => Some(QName::new(Some(uri), local, prefix)),
        None if prefix.is_none() => Some(QName::local(local)),
        None => None,
    }
}

fn unresolved(value: &str) -> TreeError {
    let (prefix, _) = QName::split_prefixed(value);
    TreeError::UnresolvedPrefix {
        prefix: prefix.unwrap_or_default().to_string(),
        value: value.to_string(),
    }
}
