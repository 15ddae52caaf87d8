use std::io::Cursor;

use futures_util::StreamExt;
use headers::HeaderMapExt;
use http::{Request, Response};
use xmltree::Element;

use crate::body::Body;
use crate::conditional;
use crate::davhandler::DavInner;
use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::errors::*;
use crate::multistatus::MultiStatus;
use crate::props::{PropName, PropRequest};
use crate::xmltree_ext::ElementExt;

// Parse a PROPFIND request body. An empty body asks for all properties.
pub(crate) fn parse_propfind(xmldata: &[u8]) -> DavResult<PropRequest> {
    if xmldata.iter().all(|c| c.is_ascii_whitespace()) {
        return Ok(PropRequest::AllProp);
    }
    let tree = Element::parse2(Cursor::new(xmldata))?;
    if !tree.is_dav("propfind") {
        debug!("propfind: root element is {:?}", tree.name);
        return Err(DavError::XmlParseError);
    }

    let mut allprop = false;
    let mut propname = false;
    let mut props: Option<Vec<PropName>> = None;
    for elem in tree.child_elems() {
        if elem.is_dav("allprop") {
            allprop = true;
        } else if elem.is_dav("propname") {
            propname = true;
        } else if elem.is_dav("prop") {
            props
                .get_or_insert_with(Vec::new)
                .extend(elem.child_elems().map(PropName::from_element));
        }
    }

    match (allprop, propname, props) {
        (true, true, _) => Err(DavError::XmlParseError),
        (_, true, Some(_)) => Err(DavError::XmlParseError),
        (true, _, Some(p)) if !p.is_empty() => Err(DavError::XmlParseError),
        (_, true, None) => Ok(PropRequest::PropName),
        (_, _, Some(p)) if !p.is_empty() => Ok(PropRequest::Prop(p)),
        _ => Ok(PropRequest::AllProp),
    }
}

impl DavInner {
    pub(crate) async fn handle_propfind(
        &self,
        req: &Request<()>,
        path: &DavPath,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        let res = self.resource(path).await?;
        if !res.exists() {
            return Err(DavError::NotFound);
        }
        if !self.acl(&res).listing {
            debug!("handle_propfind: {}: listing not allowed", path);
            return Err(DavError::Forbidden);
        }
        conditional::check_preconditions(req, &res)?;

        let depth = match req.headers().typed_try_get::<Depth>() {
            Ok(Some(d)) => d,
            Ok(None) => Depth::Infinity,
            Err(_) => return Err(DavError::InvalidHeaderValue("Depth")),
        };
        let propreq = parse_propfind(xmldata)?;
        debug!("handle_propfind: {} depth {:?} {:?}", path, depth, propreq);

        let mut ms = MultiStatus::new();
        let mut members = self.fs.descendants(res.path(), depth);
        while let Some(member) = members.next().await {
            match member {
                Ok(member) => {
                    let propstats = self.props.propstat(&member, &propreq).await?;
                    ms.add_propstat(member.url(), propstats);
                },
                Err(e) => debug!("handle_propfind: {}: skipping member: {:?}", path, e),
            }
        }
        trace!("handle_propfind: {} responses", ms.len());
        ms.into_response()
    }

    pub(crate) async fn handle_proppatch(&self, req: &Request<()>, path: &DavPath) -> DavResult<Response<Body>> {
        let res = self.resource(path).await?;
        if !res.exists() {
            return Err(DavError::NotFound);
        }
        match req.headers().typed_try_get::<Depth>() {
            Ok(None) | Ok(Some(Depth::Zero)) => {},
            _ => return Err(DavError::InvalidHeaderValue("Depth")),
        }
        // property updates have no backend contract.
        debug!("handle_proppatch: {}: not implemented", path);
        Err(DavError::NotImplemented)
    }
}
