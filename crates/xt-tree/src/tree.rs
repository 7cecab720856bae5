//! XML Tree (arena-based allocation)
//!
//! Nodes live in a generational slot arena. Parents list their children and
//! children point back at their parent, both as [`NodeId`] handles.

use std::collections::HashMap;

use xt_core::{Namespace, NamespaceManager, QName, XML_NS, XML_PREFIX, xsi_type_name};

use crate::{NodeId, Result, TreeError, XmlObject};

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<XmlObject>,
}

/// Arena of XML objects
#[derive(Debug, Default)]
pub struct XmlTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
}

impl XmlTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Create a detached node
    pub fn create(&mut self, element_name: QName, schema_type: Option<QName>) -> NodeId {
        self.insert(XmlObject::new(element_name, schema_type))
    }

    /// Move an object into the arena as a detached node
    pub fn insert(&mut self, mut object: XmlObject) -> NodeId {
        object.parent = None;
        object.children.clear();
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&XmlObject> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_ref())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut XmlObject> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.object.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Like [`get`](Self::get) but reports unknown handles as errors
    pub fn object(&self, id: NodeId) -> Result<&XmlObject> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut XmlObject> {
        self.get_mut(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(XmlObject::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(XmlObject::children).unwrap_or(&[])
    }

    /// The node itself followed by its parent chain
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).map(|_| id),
        }
    }

    /// Preorder walk of the subtree rooted at `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.object(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children (clamped to the end)
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.object(parent)?;
        let existing = self.object(child)?.parent;
        if let Some(existing) = existing {
            return Err(TreeError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::CycleDetected { parent, child });
        }

        self.object_mut(child)?.parent = Some(parent);
        let children = &mut self.object_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        tracing::debug!(%parent, %child, index, "attached node");
        Ok(())
    }

    /// Remove `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let children = &mut self.object_mut(parent)?.children;
        let Some(position) = children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        children.remove(position);
        if let Some(object) = self.get_mut(child) {
            object.parent = None;
        }
        tracing::debug!(%parent, %child, "detached node");
        Ok(true)
    }

    /// Detach a node from its parent, if any
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.object(id)?.parent {
            self.remove_child(parent, id)?;
        }
        Ok(())
    }

    /// Detach and free a node with its whole subtree
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        self.detach(id)?;
        let doomed = self.descendants(id);
        for node in &doomed {
            let slot = &mut self.slots[node.index as usize];
            slot.object = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(node.index);
        }
        self.len -= doomed.len();
        tracing::debug!(root = %id, nodes = doomed.len(), "destroyed subtree");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation shortcuts
    // ------------------------------------------------------------------

    pub fn set_schema_type(&mut self, id: NodeId, schema_type: Option<QName>) -> Result<()> {
        self.object_mut(id)?.set_schema_type(schema_type);
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) -> Result<()> {
        self.object_mut(id)?.set_text(text);
        Ok(())
    }

    pub fn set_qname_content(&mut self, id: NodeId, value: &QName) -> Result<()> {
        self.object_mut(id)?.set_qname_content(value);
        Ok(())
    }

    /// Set an attribute from its textual value.
    ///
    /// Values of QName attributes (and, when inference is on, any
    /// `prefix:local` value whose prefix is in scope) are resolved against
    /// the namespaces visible from `id` and registered as QName values.
    /// `xsi:type` sets the schema type instead of a stored attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: &str) -> Result<()> {
        let object = self.object(id)?;
        let attributes = object.attributes();
        let qname_attribute = attributes.is_qname_attribute(&name);
        let prefixed = QName::split_prefixed(value).0.is_some();
        let resolved = if qname_attribute || (prefixed && attributes.infer_qname_values()) {
            self.resolve_qname_value(id, value)
        } else {
            None
        };

        match resolved {
            Some(qname) if name == xsi_type_name() => {
                self.object_mut(id)?.set_schema_type(Some(qname));
            }
            Some(qname) => {
                self.object_mut(id)?.attributes_mut().put_qname(name, &qname);
            }
            None if qname_attribute => {
                let (prefix, _) = QName::split_prefixed(value);
                return Err(TreeError::UnresolvedPrefix {
                    prefix: prefix.unwrap_or_default().to_string(),
                    value: value.to_string(),
                });
            }
            None => {
                self.object_mut(id)?.attributes_mut().put(name, value);
            }
        }
        Ok(())
    }

    pub fn set_qname_attribute(&mut self, id: NodeId, name: QName, value: &QName) -> Result<()> {
        self.object_mut(id)?.attributes_mut().put_qname(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &QName) -> Result<Option<String>> {
        Ok(self.object_mut(id)?.attributes_mut().remove(name))
    }

    /// Register an explicit namespace declaration on a node
    pub fn declare_namespace(&mut self, id: NodeId, ns: &Namespace) -> Result<()> {
        self.object_mut(id)?
            .namespace_manager_mut()
            .register_namespace_declaration(ns);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Namespace queries
    // ------------------------------------------------------------------

    /// URI bound to `prefix` as seen from `id`, walking up the ancestors.
    ///
    /// An element without a namespace is written with an empty default
    /// namespace, so the default prefix never resolves past one.
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        if prefix == Some(XML_PREFIX) {
            return Some(XML_NS.to_string());
        }
        for node in self.ancestors(id) {
            let object = self.get(node)?;
            if prefix.is_none() && object.element_name().namespace_uri().is_none() {
                return None;
            }
            let bound = object
                .namespace_manager()
                .namespaces()
                .into_iter()
                .find(|ns| ns.prefix() == prefix);
            if let Some(ns) = bound {
                return Some(ns.uri().to_string());
            }
        }
        None
    }

    /// Prefix bound to `uri` as seen from `id`. `Some(None)` is the default
    /// namespace. Bindings shadowed closer to `id` are skipped.
    pub fn lookup_prefix(&self, id: NodeId, uri: &str) -> Option<Option<String>> {
        if uri == XML_NS {
            return Some(Some(XML_PREFIX.to_string()));
        }
        for node in self.ancestors(id) {
            let object = self.get(node)?;
            let found = object
                .namespace_manager()
                .namespaces()
                .into_iter()
                .filter(|ns| ns.uri() == uri)
                .find(|ns| self.lookup_namespace_uri(id, ns.prefix()).as_deref() == Some(uri));
            if let Some(ns) = found {
                return Some(ns.prefix().map(str::to_string));
            }
        }
        None
    }

    /// Every namespace used anywhere in the subtree rooted at `id`
    pub fn namespaces_in_subtree(&self, id: NodeId) -> Vec<Namespace> {
        let mut merged: Vec<Namespace> = Vec::new();
        for node in self.descendants(id) {
            let Some(object) = self.get(node) else {
                continue;
            };
            for ns in object.namespace_manager().namespaces() {
                match merged.iter_mut().find(|existing| **existing == ns) {
                    Some(existing) if ns.always_declare() => existing.set_always_declare(true),
                    Some(_) => {}
                    None => merged.push(ns),
                }
            }
        }
        merged
    }

    /// Namespaces referenced only from text within the subtree and not
    /// visibly used by the node or below on the way up
    pub fn non_visible_namespaces(&self, id: NodeId) -> Vec<Namespace> {
        let mut computed: HashMap<NodeId, Vec<Namespace>> = HashMap::new();
        // reversed preorder visits every child before its parent
        for node in self.descendants(id).into_iter().rev() {
            let Some(object) = self.get(node) else {
                continue;
            };
            let from_children: Vec<Vec<Namespace>> = object
                .children()
                .iter()
                .filter_map(|child| computed.remove(child))
                .collect();
            let namespaces = object
                .namespace_manager()
                .non_visible_namespaces(from_children);
            computed.insert(node, namespaces);
        }
        computed.remove(&id).unwrap_or_default()
    }

    /// Prefixes that an exclusive canonicalization of `id` would not see
    /// used, `#default` for the default namespace
    pub fn non_visible_namespace_prefixes(&self, id: NodeId) -> Vec<String> {
        NamespaceManager::prefixes_of(&self.non_visible_namespaces(id))
    }

    /// First node in the subtree rooted at `id` carrying the given ID value
    pub fn resolve_id(&self, id: NodeId, value: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|&node| {
            self.get(node)
                .is_some_and(|object| object.attributes().id_values().any(|v| v == value))
        })
    }

    fn resolve_qname_value(&self, id: NodeId, value: &str) -> Option<QName> {
        let (prefix, local) = QName::split_prefixed(value);
        if local.is_empty() {
            return None;
        }
        match self.lookup_namespace_uri(id, prefix) {
            Some(uri) => Some(QName::new(Some(&uri), local, prefix)),
            // unprefixed and no default namespace in scope
            None if prefix.is_none() => Some(QName::local(local)),
            None => None,
        }
    }
}

/// Iterator over a node and its ancestors
pub struct Ancestors<'a> {
    tree: &'a XmlTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
