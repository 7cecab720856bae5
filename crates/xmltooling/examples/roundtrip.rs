//! Example: parse a document, edit it and write it back

use xmltooling::{Config, Context, MessageContext, QName, XmlTooling, XmlTree};

const DOCUMENT: &str = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r1"><saml:Issuer>https://idp.example.org</saml:Issuer></samlp:Response>"#;

fn main() -> anyhow::Result<()> {
    let mut config = Config::default();
    config.marshall.indent = Some(2);
    xmltooling::init_logging(&config)?;

    let tooling = XmlTooling::new(config);
    let mut tree = XmlTree::new();
    let root = tooling.parse(&mut tree, DOCUMENT)?;

    // QName-valued status code pulls its namespace along
    let status = tree.create(
        QName::new(Some("urn:oasis:names:tc:SAML:2.0:protocol"), "StatusCode", Some("samlp")),
        None,
    );
    tree.set_qname_attribute(
        status,
        QName::local("Value"),
        &QName::new(Some("urn:example:status"), "Success", Some("st")),
    )?;
    tree.append_child(root, status)?;

    println!("non-visible prefixes: {:?}", tree.non_visible_namespace_prefixes(root));
    println!("{}", tooling.serialize(&tree, root)?);

    let mut context = tooling.message_context(Some(root));
    let inbound = context
        .subcontexts_mut()
        .get_subcontext_with::<MessageContext>(true)?;
    println!("inbound subcontext created: {}", inbound.is_some());
    Ok(())
}
