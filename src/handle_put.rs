use std::error::Error as StdError;
use std::time::SystemTime;

use bytes::Buf;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::{self, Body};
use crate::conditional;
use crate::davhandler::DavInner;
use crate::davpath::DavPath;
use crate::errors::*;

impl DavInner {
    pub(crate) async fn handle_put<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        path: &DavPath,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let res = self.resource(path).await?;
        if res.is_collection() {
            return Err(DavError::MethodNotAllowed);
        }

        // the parent must be an existing collection.
        let parent = self.resource(&path.parent()).await?;
        if !parent.exists() {
            return Err(DavError::NotFound);
        }
        if !parent.is_collection() {
            return Err(DavError::Conflict);
        }

        if !self.acl(&res).write {
            debug!("handle_put: {}: write not allowed", path);
            return Err(DavError::Forbidden);
        }
        conditional::check_preconditions(req, &res)?;

        let created = !res.exists();
        self.fs.write(path, body::request_stream(body)).await?;
        debug!("handle_put: {} written (created: {})", path, created);

        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = if created {
            StatusCode::CREATED
        } else {
            StatusCode::NO_CONTENT
        };
        resp.headers_mut().typed_insert(headers::Date::from(SystemTime::now()));
        Ok(resp)
    }
}
