use headers::HeaderMapExt;
use http::{Response, StatusCode};
use xml::writer::EventWriter;
use xml::writer::XmlEvent as XmlWEvent;

use crate::body::Body;
use crate::errors::DavResult;
use crate::props::PropStat;
use crate::xmltree_ext::{self, NS_DAV_URI};

/// One `D:response` of a multistatus document.
#[derive(Debug, Clone)]
enum Entry {
    Status(String, StatusCode),
    PropStat(String, Vec<PropStat>),
}

/// A `207 Multi-Status` response under construction. Entries are
/// only ever appended.
#[derive(Debug, Default)]
pub(crate) struct MultiStatus {
    entries: Vec<Entry>,
}

fn status_line(sc: StatusCode) -> String {
    format!("HTTP/1.1 {}", sc)
}

impl MultiStatus {
    pub fn new() -> MultiStatus {
        MultiStatus::default()
    }

    /// Add a response with the properties of `href`, grouped by status.
    pub fn add_propstat(&mut self, href: impl Into<String>, propstats: Vec<PropStat>) {
        self.entries.push(Entry::PropStat(href.into(), propstats));
    }

    /// Add a response with just a status for `href`.
    pub fn add_status(&mut self, href: impl Into<String>, status: StatusCode) {
        self.entries.push(Entry::Status(href.into(), status));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Serialize to an XML document.
    pub fn to_xml(&self) -> DavResult<Vec<u8>> {
        let mut xw = xmltree_ext::emitter(Vec::new())?;
        xw.write(XmlWEvent::start_element("D:multistatus").ns("D", NS_DAV_URI))?;
        for entry in &self.entries {
            xw.write(XmlWEvent::start_element("D:response"))?;
            match entry {
                Entry::Status(href, status) => {
                    xmltree_ext::write_elem(&mut xw, "D:href", href)?;
                    xmltree_ext::write_elem(&mut xw, "D:status", &status_line(*status))?;
                },
                Entry::PropStat(href, propstats) => {
                    xmltree_ext::write_elem(&mut xw, "D:href", href)?;
                    for propstat in propstats {
                        write_propstat(&mut xw, propstat)?;
                    }
                },
            }
            xw.write(XmlWEvent::end_element())?;
        }
        xw.write(XmlWEvent::end_element())?;
        Ok(xw.into_inner())
    }

    pub fn into_response(self) -> DavResult<Response<Body>> {
        let xml = self.to_xml()?;
        let mut resp = Response::builder()
            .status(StatusCode::MULTI_STATUS)
            .header("content-type", "application/xml; charset=utf-8")
            .body(Body::from(xml))
            .map_err(|_| crate::errors::DavError::XmlWriteError)?;
        resp.headers_mut().typed_insert(headers::Date::from(std::time::SystemTime::now()));
        Ok(resp)
    }
}

fn write_propstat(xw: &mut EventWriter<Vec<u8>>, propstat: &PropStat) -> DavResult<()> {
    xw.write(XmlWEvent::start_element("D:propstat"))?;
    xw.write(XmlWEvent::start_element("D:prop"))?;
    for prop in &propstat.props {
        xmltree_ext::write_element(xw, prop)?;
    }
    xw.write(XmlWEvent::end_element())?;
    xmltree_ext::write_elem(xw, "D:status", &status_line(propstat.status))?;
    xw.write(XmlWEvent::end_element())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::PropName;
    use crate::xmltree_ext::ElementExt;
    use xmltree::Element;

    fn parse(ms: &MultiStatus) -> Element {
        Element::parse(ms.to_xml().unwrap().as_slice()).unwrap()
    }

    #[test]
    fn status_entries() {
        let mut ms = MultiStatus::new();
        ms.add_status("/a/b", StatusCode::FORBIDDEN);
        ms.add_status("/a/c%20d", StatusCode::NOT_FOUND);
        assert_eq!(ms.len(), 2);

        let root = parse(&ms);
        assert!(root.is_dav("multistatus"));
        let responses = root.child_elems().collect::<Vec<_>>();
        assert_eq!(responses.len(), 2);
        let href = responses[1].get_child("href").unwrap();
        assert_eq!(href.get_text().unwrap(), "/a/c%20d");
        let status = responses[0].get_child("status").unwrap();
        assert_eq!(status.get_text().unwrap(), "HTTP/1.1 403 Forbidden");
    }

    #[test]
    fn propstat_entries() {
        let mut ms = MultiStatus::new();
        let ok = PropStat {
            status: StatusCode::OK,
            props:  vec![Element::new_text("D:displayname", "a & b")],
        };
        let missing = PropStat {
            status: StatusCode::NOT_FOUND,
            props:  vec![PropName::new(Some("urn:x"), "color").to_element()],
        };
        ms.add_propstat("/a", vec![ok, missing]);

        let root = parse(&ms);
        let response = root.child_elems().next().unwrap();
        let propstats = response.child_elems().filter(|e| e.is_dav("propstat")).collect::<Vec<_>>();
        assert_eq!(propstats.len(), 2);

        let prop = propstats[0].get_child("prop").unwrap();
        let name = prop.get_child("displayname").unwrap();
        assert!(name.is_dav("displayname"));
        assert_eq!(name.get_text().unwrap(), "a & b");

        let prop = propstats[1].get_child("prop").unwrap();
        let color = prop.child_elems().next().unwrap();
        assert_eq!(color.name, "color");
        assert_eq!(color.namespace.as_deref(), Some("urn:x"));
        let status = propstats[1].get_child("status").unwrap();
        assert_eq!(status.get_text().unwrap(), "HTTP/1.1 404 Not Found");
    }

    #[test]
    fn response() {
        let mut ms = MultiStatus::new();
        ms.add_status("/x", StatusCode::LOCKED);
        let resp = ms.into_response().unwrap();
        assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
        assert_eq!(resp.headers()["content-type"], "application/xml; charset=utf-8");
    }
}
