//! XML Serializer
//!
//! Writes a subtree as XML text. Every element works out the prefix bindings
//! its own names and QName values rely on, then adds the namespaces its
//! manager reports: explicit declarations and non-visible prefixes are
//! always written on the element, anything else only when no enclosing
//! element already binds it. A prefix that is taken on the element by another
//! namespace is replaced with a generated `nsN` prefix.

use std::fmt::Write;

use xt_core::{DEFAULT_NS_TOKEN, QName, XML_NS, XML_PREFIX, XSI_TYPE_LOCAL_NAME, xsi_type_name};

use crate::{NodeId, Result, XmlObject, XmlTree};

/// Output options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshallOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub xml_declaration: bool,
    /// Indent nested elements by this many spaces
    pub indent: Option<usize>,
}

/// Serializes XML object trees
#[derive(Debug, Clone, Default)]
pub struct Marshaller {
    options: MarshallOptions,
}

/// Prefix bindings in effect, innermost last. An empty URI undeclares the
/// default namespace.
#[derive(Debug, Default)]
struct Scope {
    bindings: Vec<(Option<String>, String)>,
    generated: usize,
}

impl Scope {
    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn bind(&mut self, prefix: Option<&str>, uri: &str) {
        self.bindings.push((prefix.map(str::to_string), uri.to_string()));
    }

    fn truncate(&mut self, len: usize) {
        self.bindings.truncate(len);
    }

    /// Fresh `nsN` prefix not bound anywhere in scope
    fn generate_prefix(&mut self) -> String {
        loop {
            self.generated += 1;
            let prefix = format!("ns{}", self.generated);
            if self.lookup(Some(&prefix)).is_none() {
                return prefix;
            }
        }
    }
}

/// Bindings of one start tag while it is being assembled.
///
/// Declarations go into the shared scope above `mark`; `claimed` records
/// every binding a name on the element is written with, declared here or
/// inherited.
struct StartTag<'s> {
    scope: &'s mut Scope,
    mark: usize,
    claimed: Vec<(Option<String>, String)>,
}

impl<'s> StartTag<'s> {
    fn new(scope: &'s mut Scope) -> Self {
        let mark = scope.bindings.len();
        Self {
            scope,
            mark,
            claimed: Vec::new(),
        }
    }

    fn declared(&self, prefix: Option<&str>) -> Option<&str> {
        self.scope.bindings[self.mark..]
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn claimed(&self, prefix: Option<&str>) -> Option<&str> {
        self.claimed
            .iter()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Whether `prefix` can mean `uri` on this element
    fn available(&self, prefix: Option<&str>, uri: &str) -> bool {
        self.claimed(prefix).is_none_or(|bound| bound == uri)
            && self.declared(prefix).is_none_or(|bound| bound == uri)
    }

    fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        if self.declared(prefix) != Some(uri) {
            self.scope.bind(prefix, uri);
        }
    }

    fn claim(&mut self, prefix: Option<&str>, uri: &str) {
        if self.claimed(prefix).is_none() {
            self.claimed.push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    /// Keep the default namespace empty on this element
    fn claim_no_namespace(&mut self) {
        if self.scope.lookup(None).is_some_and(|uri| !uri.is_empty()) {
            self.declare(None, "");
        }
        self.claim(None, "");
    }

    /// Prefix to write `name` with, binding it on the element if needed.
    ///
    /// `allow_default` is false for attribute names, which never take the
    /// default namespace, and on elements that keep the default empty.
    fn prefix_for(&mut self, name: &QName, allow_default: bool) -> Option<String> {
        let uri = name.namespace_uri()?;
        if uri == XML_NS {
            return Some(XML_PREFIX.to_string());
        }

        let wanted = name.prefix();
        if (wanted.is_some() || allow_default) && self.available(wanted, uri) {
            if self.scope.lookup(wanted) != Some(uri) {
                self.declare(wanted, uri);
            }
            self.claim(wanted, uri);
            return wanted.map(str::to_string);
        }

        if let Some(prefix) = self.bound_prefix(uri, allow_default) {
            self.claim(prefix.as_deref(), uri);
            return prefix;
        }
        let prefix = self.scope.generate_prefix();
        tracing::debug!(uri, prefix = %prefix, "generated prefix");
        self.declare(Some(&prefix), uri);
        self.claim(Some(&prefix), uri);
        Some(prefix)
    }

    /// A binding of `uri` already in effect that is free to use here
    fn bound_prefix(&self, uri: &str, allow_default: bool) -> Option<Option<String>> {
        self.scope
            .bindings
            .iter()
            .rev()
            .filter(|(prefix, bound)| bound == uri && (allow_default || prefix.is_some()))
            .map(|(prefix, _)| prefix.clone())
            .find(|prefix| {
                self.scope.lookup(prefix.as_deref()) == Some(uri)
                    && self.available(prefix.as_deref(), uri)
            })
    }
}

/// Start tag content of one element
struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
}

enum Step {
    Open { id: NodeId, depth: usize },
    Close { name: String, depth: usize, mark: usize, nested: bool },
}

impl Marshaller {
    pub fn new(options: MarshallOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarshallOptions {
        &self.options
    }

    /// Serialize the subtree rooted at `root`
    pub fn marshall(&self, tree: &XmlTree, root: NodeId) -> Result<String> {
        tree.object(root)?;
        let mut out = String::new();
        if self.options.xml_declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
            if self.options.indent.is_some() {
                out.push('\n');
            }
        }

        let mut scope = Scope::default();
        let mut steps = vec![Step::Open { id: root, depth: 0 }];
        while let Some(step) = steps.pop() {
            match step {
                Step::Open { id, depth } => {
                    let object = tree.object(id)?;
                    if depth > 0 {
                        self.newline(depth, &mut out);
                    }
                    let mark = scope.bindings.len();
                    let element = open_element(object, &mut scope);
                    write_start_tag(&element, &scope.bindings[mark..], &mut out)?;

                    if element.text.is_none() && !object.has_children() {
                        out.push_str("/>");
                        scope.truncate(mark);
                        continue;
                    }
                    out.push('>');
                    if let Some(text) = &element.text {
                        escape_text(text, &mut out);
                    }
                    steps.push(Step::Close {
                        name: element.name,
                        depth,
                        mark,
                        nested: object.has_children(),
                    });
                    for &child in object.children().iter().rev() {
                        steps.push(Step::Open {
                            id: child,
                            depth: depth + 1,
                        });
                    }
                }
                Step::Close {
                    name,
                    depth,
                    mark,
                    nested,
                } => {
                    if nested {
                        self.newline(depth, &mut out);
                    }
                    write!(out, "</{name}>")?;
                    scope.truncate(mark);
                }
            }
        }
        tracing::debug!(%root, bytes = out.len(), "marshalled subtree");
        Ok(out)
    }

    fn newline(&self, depth: usize, out: &mut String) {
        if let Some(width) = self.options.indent {
            out.push('\n');
            out.extend(std::iter::repeat_n(' ', width * depth));
        }
    }
}

/// Bind the namespaces `object` needs in `scope` and render its names
fn open_element(object: &XmlObject, scope: &mut Scope) -> OpenElement {
    let manager = object.namespace_manager();
    let attributes = object.attributes();
    let element_name = object.element_name();
    let mut tag = StartTag::new(scope);

    let values_without_namespace = object
        .schema_type()
        .into_iter()
        .chain(attributes.names().filter_map(|name| attributes.qname_value(name)))
        .chain(object.qname_content())
        .any(|value| value.namespace_uri().is_none());
    let empty_default = element_name.namespace_uri().is_none() || values_without_namespace;
    if empty_default {
        tag.claim_no_namespace();
    }

    for ns in manager.namespace_declarations() {
        if ns.uri() == XML_NS {
            continue;
        }
        if tag.available(ns.prefix(), ns.uri()) {
            tag.declare(ns.prefix(), ns.uri());
        } else {
            tracing::warn!(
                element = %element_name,
                %ns,
                "declaration conflicts with a binding the element needs, skipped"
            );
        }
    }

    let prefix = tag.prefix_for(element_name, !empty_default);
    let name = prefixed(prefix.as_deref(), element_name.local_name());

    let mut rendered = Vec::with_capacity(attributes.len() + 1);
    if let Some(schema_type) = object.schema_type() {
        let attr_prefix = tag.prefix_for(&xsi_type_name(), false);
        let value_prefix = tag.prefix_for(schema_type, !empty_default);
        rendered.push((
            prefixed(attr_prefix.as_deref(), XSI_TYPE_LOCAL_NAME),
            prefixed(value_prefix.as_deref(), schema_type.local_name()),
        ));
    }
    for (attr, value) in attributes.iter() {
        let attr_prefix = tag.prefix_for(attr, false);
        let value = match attributes.qname_value(attr) {
            Some(qname) => {
                let value_prefix = tag.prefix_for(qname, !empty_default);
                prefixed(value_prefix.as_deref(), qname.local_name())
            }
            None => value.to_string(),
        };
        rendered.push((prefixed(attr_prefix.as_deref(), attr.local_name()), value));
    }
    let text = match object.qname_content() {
        Some(qname) => {
            let value_prefix = tag.prefix_for(qname, !empty_default);
            Some(prefixed(value_prefix.as_deref(), qname.local_name()))
        }
        None => object.text().map(str::to_string),
    };

    let non_visible = manager.non_visible_namespace_prefixes();
    for ns in manager.namespaces() {
        if ns.uri() == XML_NS || tag.declared(ns.prefix()) == Some(ns.uri()) {
            continue;
        }
        let token = ns.prefix().unwrap_or(DEFAULT_NS_TOKEN);
        let forced = non_visible.iter().any(|p| p == token);
        let written = tag.claimed.iter().any(|(_, uri)| uri == ns.uri());
        if forced {
            if tag.scope.bindings[tag.mark..].iter().any(|(_, uri)| uri == ns.uri()) {
                continue;
            }
        } else if written || tag.scope.lookup(ns.prefix()) == Some(ns.uri()) {
            continue;
        }
        if tag.available(ns.prefix(), ns.uri()) {
            tag.declare(ns.prefix(), ns.uri());
        } else {
            tracing::debug!(element = %element_name, %ns, "prefix taken on element, not declared");
        }
    }

    OpenElement {
        name,
        attributes: rendered,
        text: text.filter(|t| !t.is_empty()),
    }
}

fn write_start_tag(
    element: &OpenElement,
    declarations: &[(Option<String>, String)],
    out: &mut String,
) -> Result<()> {
    write!(out, "<{}", element.name)?;
    for (prefix, uri) in declarations {
        match prefix {
            Some(prefix) => write!(out, " xmlns:{prefix}=\"")?,
            None => out.push_str(" xmlns=\""),
        }
        escape_attribute(uri, out);
        out.push('"');
    }
    for (name, value) in &element.attributes {
        write!(out, " {name}=\"")?;
        escape_attribute(value, out);
        out.push('"');
    }
    Ok(())
}

fn prefixed(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local_name}"),
        None => local_name.to_string(),
    }
}

/// Escape text content
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\n' => output.push_str("&#10;"),
            '\t' => output.push_str("&#9;"),
            '\r' => output.push_str("&#13;"),
            _ => output.push(c),
        }
    }
}
