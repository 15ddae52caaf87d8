use std::time::SystemTime;

use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional;
use crate::davhandler::DavInner;
use crate::davpath::DavPath;
use crate::errors::*;

impl DavInner {
    pub(crate) async fn handle_delete(&self, req: &Request<()>, path: &DavPath) -> DavResult<Response<Body>> {
        let res = self.resource(path).await?;
        if !res.exists() {
            return Err(DavError::NotFound);
        }
        if !self.acl(&res).delete {
            debug!("handle_delete: {}: delete not allowed", path);
            return Err(DavError::Forbidden);
        }
        conditional::check_preconditions(req, &res)?;

        // locks, then properties, then the resource itself.
        if let Some(ref locksystem) = self.ls {
            if locksystem.delete(res.path()).await.is_err() {
                debug!("handle_delete: {}: failed to delete locks", path);
            }
        }
        self.props.remove_all(res.path()).await?;
        self.fs.remove(res.path()).await?;

        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::NO_CONTENT;
        resp.headers_mut().typed_insert(headers::Date::from(SystemTime::now()));
        Ok(resp)
    }
}
