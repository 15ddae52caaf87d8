use std::time::SystemTime;

use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davhandler::DavInner;
use crate::davpath::DavPath;
use crate::errors::*;

impl DavInner {
    pub(crate) async fn handle_mkcol(
        &self,
        req: &Request<()>,
        path: &DavPath,
        body: &[u8],
    ) -> DavResult<Response<Body>> {
        let res = self.resource(path).await?;
        if res.exists() {
            return Err(DavError::MethodNotAllowed);
        }
        let parent = self.resource(&path.parent()).await?;
        if !parent.is_collection() {
            return Err(DavError::Conflict);
        }

        // RFC 4918 9.3: MKCOL with a body we do not understand.
        let length = req.headers().typed_get::<headers::ContentLength>().map(|l| l.0);
        if !body.is_empty() || length.unwrap_or(0) > 0 {
            return Err(DavError::UnsupportedMediaType);
        }

        if !self.acl(&res).create {
            debug!("handle_mkcol: {}: create not allowed", path);
            return Err(DavError::Forbidden);
        }

        match self.fs.create_dir(path).await {
            // RFC 4918 9.3.1 MKCOL Status Codes.
            Err(crate::fs::FsError::Exists) => Err(DavError::MethodNotAllowed),
            Err(e) => Err(e.into()),
            Ok(()) => {
                let mut resp = Response::new(Body::empty());
                *resp.status_mut() = StatusCode::CREATED;
                resp.headers_mut().typed_insert(headers::Date::from(SystemTime::now()));
                Ok(resp)
            },
        }
    }
}
