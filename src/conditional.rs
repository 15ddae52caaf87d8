use http::{Method, StatusCode};

use headers::HeaderMapExt;

use crate::davheaders;
use crate::errors::{DavError, DavResult};
use crate::resource::DavResource;

type Request = http::Request<()>;

// Handle the if-headers: RFC 7232, HTTP/1.1 Conditional Requests.
//
// Returns None to proceed, or the status to answer with (304 or 412).
// The order of evaluation is fixed; the first failing condition wins.
pub(crate) fn http_if_match(req: &Request, res: &DavResource) -> Option<StatusCode> {
    if !res.exists() {
        return None;
    }
    let etag = res.etag_header();
    let mtime = res.mtime_stamp();
    let safe = req.method() == Method::GET || req.method() == Method::HEAD;

    if let Some(r) = req.headers().typed_get::<davheaders::IfMatch>() {
        let ok = match r.0 {
            davheaders::ETagList::Star => true,
            ref tags => etag.as_ref().is_some_and(|t| tags.matches(t)),
        };
        if !ok {
            debug!("precondition fail: If-Match {:?}", r);
            return Some(StatusCode::PRECONDITION_FAILED);
        }
    }

    // tentative, If-None-Match overrides it.
    let mut not_modified = match req.headers().typed_get::<davheaders::IfModifiedSince>() {
        Some(r) => mtime.is_some_and(|m| r.0 > m),
        None => false,
    };

    if let Some(r) = req.headers().typed_get::<davheaders::IfNoneMatch>() {
        if etag.as_ref().is_some_and(|t| r.0.matches(t)) {
            debug!("precondition fail: If-None-Match {:?}", r);
            return Some(if safe {
                StatusCode::NOT_MODIFIED
            } else {
                StatusCode::PRECONDITION_FAILED
            });
        }
        not_modified = false;
    }

    if let Some(r) = req.headers().typed_get::<davheaders::IfUnmodifiedSince>() {
        if mtime.is_some_and(|m| r.0 <= m) {
            debug!("precondition fail: If-Unmodified-Since {:?}", r.0);
            return Some(StatusCode::PRECONDITION_FAILED);
        }
    }

    if not_modified {
        debug!("not-modified If-Modified-Since");
        return Some(StatusCode::NOT_MODIFIED);
    }

    // TODO: evaluate the If header against the lock system once LOCK exists.
    if let Some(value) = req.headers().get(&davheaders::IF) {
        match req.headers().typed_get::<davheaders::If>() {
            Some(r) => debug!("If header ignored: {:?}", r),
            None => debug!("If header ignored (unparseable): {:?}", value),
        }
    }

    None
}

// As http_if_match, but as a DavResult for the handlers.
pub(crate) fn check_preconditions(req: &Request, res: &DavResource) -> DavResult<()> {
    match http_if_match(req, res) {
        None => Ok(()),
        Some(StatusCode::NOT_MODIFIED) => Err(DavError::NotModified),
        Some(_) => Err(DavError::PreconditionFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::davpath::DavPath;
    use crate::fs::{DavMetaData, FsResult};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    // mtime is Sun, 06 Nov 1994 08:49:37 GMT
    const MTIME: u64 = 784111777;

    #[derive(Debug, Clone)]
    struct Meta;

    // a backend that has no etag to offer.
    #[derive(Debug, Clone)]
    struct NoTag;

    impl DavMetaData for NoTag {
        fn len(&self) -> u64 {
            0
        }
        fn modified(&self) -> FsResult<SystemTime> {
            Ok(UNIX_EPOCH + Duration::from_secs(MTIME))
        }
        fn is_dir(&self) -> bool {
            false
        }
        fn etag(&self) -> Option<String> {
            None
        }
    }

    impl DavMetaData for Meta {
        fn len(&self) -> u64 {
            4
        }
        fn modified(&self) -> FsResult<SystemTime> {
            Ok(UNIX_EPOCH + Duration::from_secs(MTIME))
        }
        fn is_dir(&self) -> bool {
            false
        }
        fn etag(&self) -> Option<String> {
            Some("abc".to_string())
        }
    }

    fn res() -> DavResource {
        DavResource::new(DavPath::new("/f").unwrap(), Some(Box::new(Meta)))
    }

    fn req(method: &str, headers: &[(&str, &str)]) -> Request {
        let mut b = http::Request::builder().method(method).uri("/f");
        for (k, v) in headers {
            b = b.header(*k, *v);
        }
        b.body(()).unwrap()
    }

    const BEFORE: &str = "Sun, 06 Nov 1994 08:49:36 GMT";
    const AT: &str = "Sun, 06 Nov 1994 08:49:37 GMT";
    const AFTER: &str = "Sun, 06 Nov 1994 08:49:38 GMT";

    #[test]
    fn missing_resource_ignores_everything() {
        let missing = DavResource::new(DavPath::new("/nope").unwrap(), None);
        let r = req("PUT", &[("If-Match", "\"zzz\""), ("If-Unmodified-Since", BEFORE)]);
        assert_eq!(http_if_match(&r, &missing), None);
    }

    #[test]
    fn if_match() {
        let r = req("PUT", &[("If-Match", "\"zzz\"")]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::PRECONDITION_FAILED));
        let r = req("PUT", &[("If-Match", "\"zzz\", \"abc\"")]);
        assert_eq!(http_if_match(&r, &res()), None);
        let r = req("PUT", &[("If-Match", "*")]);
        assert_eq!(http_if_match(&r, &res()), None);
        let r = req("PUT", &[("If-Match", "W/\"abc\"")]);
        assert_eq!(http_if_match(&r, &res()), None);
    }

    #[test]
    fn if_match_star_without_etag() {
        let untagged = DavResource::new(DavPath::new("/f").unwrap(), Some(Box::new(NoTag)));
        let r = req("PUT", &[("If-Match", "*")]);
        assert_eq!(http_if_match(&r, &untagged), None);
        let r = req("PUT", &[("If-Match", "\"abc\"")]);
        assert_eq!(http_if_match(&r, &untagged), Some(StatusCode::PRECONDITION_FAILED));
    }

    #[test]
    fn if_none_match() {
        let r = req("GET", &[("If-None-Match", "\"abc\"")]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::NOT_MODIFIED));
        let r = req("HEAD", &[("If-None-Match", "*")]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::NOT_MODIFIED));
        let r = req("DELETE", &[("If-None-Match", "\"abc\"")]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::PRECONDITION_FAILED));
        let r = req("GET", &[("If-None-Match", "\"xyz\"")]);
        assert_eq!(http_if_match(&r, &res()), None);
    }

    #[test]
    fn if_none_match_discards_if_modified_since() {
        let r = req("GET", &[("If-None-Match", "\"xyz\""), ("If-Modified-Since", AFTER)]);
        assert_eq!(http_if_match(&r, &res()), None);
    }

    #[test]
    fn if_modified_since() {
        let r = req("GET", &[("If-Modified-Since", AFTER)]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::NOT_MODIFIED));
        let r = req("GET", &[("If-Modified-Since", AT)]);
        assert_eq!(http_if_match(&r, &res()), None);
        let r = req("GET", &[("If-Modified-Since", BEFORE)]);
        assert_eq!(http_if_match(&r, &res()), None);
        // applies to all methods.
        let r = req("PUT", &[("If-Modified-Since", AFTER)]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::NOT_MODIFIED));
        // unparseable is as good as absent.
        let r = req("GET", &[("If-Modified-Since", "whenever")]);
        assert_eq!(http_if_match(&r, &res()), None);
    }

    #[test]
    fn if_unmodified_since() {
        let r = req("PUT", &[("If-Unmodified-Since", AT)]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::PRECONDITION_FAILED));
        let r = req("PUT", &[("If-Unmodified-Since", AFTER)]);
        assert_eq!(http_if_match(&r, &res()), None);
        // 412 wins over a pending 304.
        let r = req("GET", &[("If-Modified-Since", AFTER), ("If-Unmodified-Since", BEFORE)]);
        assert_eq!(http_if_match(&r, &res()), Some(StatusCode::PRECONDITION_FAILED));
    }

    #[test]
    fn if_header_has_no_effect() {
        let r = req("PUT", &[("If", "(<urn:uuid:123>)")]);
        assert_eq!(http_if_match(&r, &res()), None);
        let r = req("PUT", &[("If", "garbage((")]);
        assert!(check_preconditions(&r, &res()).is_ok());
    }
}
