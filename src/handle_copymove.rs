use std::time::SystemTime;

use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional;
use crate::davhandler::DavInner;
use crate::davheaders::{self, Depth};
use crate::davpath::DavPath;
use crate::errors::*;
use crate::multistatus::MultiStatus;
use crate::util::DavMethod;

fn default_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

impl DavInner {
    // Scheme and authority of this request: from the request URI if it
    // is absolute, otherwise the configured scheme and the Host header.
    fn request_origin(&self, req: &Request<()>) -> Option<(String, http::uri::Authority)> {
        let scheme = req.uri().scheme_str().unwrap_or(&self.scheme).to_string();
        let authority = match req.uri().authority() {
            Some(a) => a.clone(),
            None => req
                .headers()
                .get(http::header::HOST)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.parse().ok())?,
        };
        Some((scheme, authority))
    }

    // Decode the Destination header into a path on this server.
    fn destination(&self, req: &Request<()>) -> DavResult<DavPath> {
        let dest = match req.headers().typed_try_get::<davheaders::Destination>() {
            Ok(Some(d)) if !d.0.is_empty() => d.0,
            Ok(_) => return Err(DavError::MissingDestination),
            Err(_) => return Err(DavError::InvalidHeaderValue("Destination")),
        };

        // an absolute path is always on this server.
        if dest.starts_with('/') {
            return Ok(DavPath::from_str(&dest, &self.prefix)?);
        }

        let url = url::Url::parse(&dest).map_err(|_| DavError::InvalidHeaderValue("Destination"))?;
        if let Some((scheme, authority)) = self.request_origin(req) {
            let same_scheme = url.scheme().eq_ignore_ascii_case(&scheme);
            let same_host = url
                .host_str()
                .is_some_and(|h| h.eq_ignore_ascii_case(authority.host()));
            let port = authority.port_u16().or_else(|| default_port(&scheme));
            if !same_scheme || !same_host || url.port_or_known_default() != port {
                debug!("destination {} is on a different server than {}://{}", url, scheme, authority);
                return Err(DavError::BadGateway);
            }
        }
        Ok(DavPath::from_url(&url, &self.prefix)?)
    }

    pub(crate) async fn handle_copymove(
        &self,
        req: &Request<()>,
        path: &DavPath,
        method: DavMethod,
    ) -> DavResult<Response<Body>> {
        let is_move = method == DavMethod::Move;

        let res = self.resource(path).await?;
        if !res.exists() {
            return Err(DavError::NotFound);
        }
        if !self.acl(&res).relocate {
            debug!("handle_copymove: {}: relocate not allowed", path);
            return Err(DavError::Forbidden);
        }
        conditional::check_preconditions(req, &res)?;

        // decode and validate destination.
        let dest = self.destination(req)?;
        if res.path().is_ancestor_of(&dest) || dest.is_ancestor_of(res.path()) {
            debug!("handle_copymove: {} and {} overlap", res.path(), dest);
            return Err(DavError::Forbidden);
        }

        // parent of the destination must exist.
        let dparent = self.resource(&dest.parent()).await?;
        if !dparent.is_collection() {
            return Err(DavError::Conflict);
        }

        // check if overwrite is "F"
        let overwrite = match req.headers().typed_try_get::<davheaders::Overwrite>() {
            Ok(o) => o.map(|o| o.0).unwrap_or(true),
            Err(_) => return Err(DavError::InvalidHeaderValue("Overwrite")),
        };
        let dres = self.resource(&dest).await?;
        let exists = dres.exists();
        if !overwrite && exists {
            return Err(DavError::PreconditionFailed);
        }

        let depth = match req.headers().typed_try_get::<Depth>() {
            Ok(None) | Ok(Some(Depth::Infinity)) => Depth::Infinity,
            Ok(Some(Depth::Zero)) if !is_move => Depth::Zero,
            _ => return Err(DavError::InvalidHeaderValue("Depth")),
        };

        // clear out the destination first, overwrite is "T" here.
        if exists {
            debug!("handle_copymove: deleting destination {}", dres.path());
            if let Some(ref locksystem) = self.ls {
                locksystem.delete(dres.path()).await.ok();
            }
            self.props.remove_all(dres.path()).await?;
            self.fs.remove(dres.path()).await?;
        }

        let failures = if is_move {
            self.fs.rename(res.path(), dres.path()).await?
        } else {
            self.fs.copy(res.path(), dres.path(), depth).await?
        };
        self.props.copy_all(res.path(), dres.path(), is_move).await?;
        if is_move {
            if let Some(ref locksystem) = self.ls {
                locksystem.delete(res.path()).await.ok();
            }
        }

        if !failures.is_empty() {
            debug!("handle_copymove: {} members failed", failures.len());
            let mut ms = MultiStatus::new();
            for f in &failures {
                ms.add_status(f.path.as_url_string_with_prefix(), fserror_to_status(&f.error));
            }
            return ms.into_response();
        }

        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = if exists {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        };
        resp.headers_mut().typed_insert(headers::Date::from(SystemTime::now()));
        Ok(resp)
    }
}
