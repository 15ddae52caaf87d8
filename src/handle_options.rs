use std::time::SystemTime;

use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::DavInner;
use crate::davheaders;
use crate::davpath::DavPath;
use crate::errors::*;
use crate::util::DavMethod;
use crate::util::DavMethod as M;

const ON_MISSING: &[DavMethod] = &[M::Options, M::Put, M::MkCol];
const ON_COLLECTION: &[DavMethod] = &[
    M::Options,
    M::Head,
    M::Get,
    M::Delete,
    M::PropFind,
    M::PropPatch,
    M::Copy,
    M::Move,
    M::Lock,
    M::Unlock,
];
const ON_FILE: &[DavMethod] = &[
    M::Options,
    M::Head,
    M::Get,
    M::Put,
    M::Delete,
    M::PropFind,
    M::PropPatch,
    M::Copy,
    M::Move,
    M::Lock,
    M::Unlock,
];

impl DavInner {
    pub(crate) async fn handle_options(&self, _req: &Request<()>, path: &DavPath) -> DavResult<Response<Body>> {
        let mut resp = Response::new(Body::empty());
        {
            let h = resp.headers_mut();
            h.typed_insert(davheaders::Dav("1,2".to_string()));
            h.typed_insert(davheaders::MsAuthorVia("DAV".to_string()));
            h.typed_insert(headers::ContentLength(0));
            h.typed_insert(headers::Date::from(SystemTime::now()));
        }
        *resp.status_mut() = StatusCode::OK;

        // The server as a whole.
        if self.void || path.is_star() || path.is_root() {
            self.add_allow(&mut resp, ON_FILE);
            return Ok(resp);
        }

        let res = self.resource(path).await?;
        if !res.exists() {
            let parent = self.resource(&path.parent()).await?;
            if !parent.is_collection() {
                return Err(DavError::NotFound);
            }
            self.add_allow(&mut resp, ON_MISSING);
        } else if res.is_collection() {
            self.add_allow(&mut resp, ON_COLLECTION);
        } else {
            self.add_allow(&mut resp, ON_FILE);
            let h = resp.headers_mut();
            h.typed_insert(davheaders::AllowRanges("bytes".to_string()));
            h.typed_insert(headers::AcceptRanges::bytes());
        }
        Ok(resp)
    }

    // Allow: header, leaving out what is not in the allow-list.
    fn add_allow(&self, resp: &mut Response<Body>, methods: &[DavMethod]) {
        let allow = methods
            .iter()
            .filter(|m| self.allow.contains(**m))
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if let Ok(value) = http::HeaderValue::from_str(&allow) {
            resp.headers_mut().insert(http::header::ALLOW, value);
        }
    }
}
