use http::{Request, Response};

use crate::body::Body;
use crate::davhandler::DavInner;
use crate::davpath::DavPath;
use crate::errors::*;

impl DavInner {
    // Locks are only ever cleaned up, never taken. LOCK and UNLOCK
    // answer 501 whether or not a locksystem is configured.
    pub(crate) async fn handle_lock(&self, req: &Request<()>, path: &DavPath) -> DavResult<Response<Body>> {
        debug!("handle_lock: {} {}: not implemented", req.method(), path);
        if let Some(ref locksystem) = self.ls {
            if log_enabled!(log::Level::Trace) {
                let locks = locksystem.discover(path).await;
                trace!("handle_lock: {} current locks: {:?}", path, locks);
            }
        }
        Err(DavError::NotImplemented)
    }
}
