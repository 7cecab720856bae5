//! Well-known namespaces

use crate::{Namespace, QName};

/// The `xml` namespace, bound implicitly in every document
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XML_PREFIX: &str = "xml";

/// Namespace of `xmlns` declarations themselves
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";
pub const XMLNS_PREFIX: &str = "xmlns";

/// XML Schema instance namespace (`xsi:type`, `xsi:nil`, ...)
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSI_PREFIX: &str = "xsi";
pub const XSI_TYPE_LOCAL_NAME: &str = "type";

/// Token reported in prefix sets for the default (unprefixed) namespace
pub const DEFAULT_NS_TOKEN: &str = "#default";

/// `xml` namespace value
pub fn xml_namespace() -> Namespace {
    Namespace::well_known(XML_NS, XML_PREFIX)
}

/// `xsi` namespace value
pub fn xsi_namespace() -> Namespace {
    Namespace::well_known(XSI_NS, XSI_PREFIX)
}

/// Name of the `xsi:type` attribute
pub fn xsi_type_name() -> QName {
    QName::new(Some(XSI_NS), XSI_TYPE_LOCAL_NAME, Some(XSI_PREFIX))
}
