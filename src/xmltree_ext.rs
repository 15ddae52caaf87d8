use std::io::{Read, Write};

use xml::EmitterConfig;
use xml::common::XmlVersion;
use xml::writer::EventWriter;
use xml::writer::XmlEvent as XmlWEvent;
use xmltree::{Element, XMLNode};

use crate::errors::{DavError, DavResult};

pub(crate) const NS_DAV_URI: &str = "DAV:";

pub(crate) trait ElementExt {
    /// Create an element, "prefix:name" sets the prefix.
    fn new2<'a, E: Into<&'a str>>(e: E) -> Self;
    /// Create an element with text content.
    fn new_text<'a, E: Into<&'a str>, T: Into<String>>(e: E, t: T) -> Self;
    /// Parse, mapping errors to DavError.
    fn parse2<R: Read>(r: R) -> Result<Element, DavError>;
    fn push_element(&mut self, e: Element);
    fn child_elems(&self) -> impl Iterator<Item = &Element>;
    fn is_dav(&self, name: &str) -> bool;
}

impl ElementExt for Element {
    fn new2<'a, N: Into<&'a str>>(n: N) -> Element {
        let n = n.into();
        match n.split_once(':') {
            None => Element::new(n),
            Some((prefix, name)) => {
                let mut e = Element::new(name);
                e.prefix = Some(prefix.to_string());
                e
            },
        }
    }

    fn new_text<'a, N: Into<&'a str>, S: Into<String>>(n: N, t: S) -> Element {
        let mut e = Element::new2(n);
        e.children.push(XMLNode::Text(t.into()));
        e
    }

    fn parse2<R: Read>(r: R) -> Result<Element, DavError> {
        match Element::parse(r) {
            Ok(elems) => Ok(elems),
            Err(xmltree::ParseError::MalformedXml(_)) => Err(DavError::XmlParseError),
            Err(_) => Err(DavError::XmlReadError),
        }
    }

    fn push_element(&mut self, e: Element) {
        self.children.push(XMLNode::Element(e));
    }

    fn child_elems(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XMLNode::Element(e) => Some(e),
            _ => None,
        })
    }

    fn is_dav(&self, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(NS_DAV_URI)
    }
}

// write a simple element with optional text content.
pub(crate) fn write_elem<W: Write>(xw: &mut EventWriter<W>, name: &str, text: &str) -> DavResult<()> {
    xw.write(XmlWEvent::start_element(name))?;
    if !text.is_empty() {
        xw.write(XmlWEvent::characters(text))?;
    }
    xw.write(XmlWEvent::end_element())?;
    Ok(())
}

/// Write an xmltree Element. The namespace of the element is declared
/// on the element itself; attributes are not written.
pub(crate) fn write_element<W: Write>(xw: &mut EventWriter<W>, elem: &Element) -> DavResult<()> {
    let name = match elem.prefix {
        Some(ref p) => format!("{}:{}", p, elem.name),
        None => elem.name.clone(),
    };
    let mut start = XmlWEvent::start_element(name.as_str());
    if let Some(ref ns) = elem.namespace {
        start = match elem.prefix {
            Some(ref p) => start.ns(p.as_str(), ns.as_str()),
            None => start.default_ns(ns.as_str()),
        };
    }
    xw.write(start)?;
    for child in &elem.children {
        match child {
            XMLNode::Element(e) => write_element(xw, e)?,
            XMLNode::Text(t) | XMLNode::CData(t) => xw.write(XmlWEvent::characters(t))?,
            _ => {},
        }
    }
    xw.write(XmlWEvent::end_element())?;
    Ok(())
}

pub(crate) fn emitter<W: Write>(w: W) -> DavResult<EventWriter<W>> {
    let mut emitter = EventWriter::new_with_config(w, EmitterConfig::new().perform_indent(false));
    emitter.write(XmlWEvent::StartDocument {
        version:    XmlVersion::Version10,
        encoding:   Some("utf-8"),
        standalone: None,
    })?;
    Ok(emitter)
}
