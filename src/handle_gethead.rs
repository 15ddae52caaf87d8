use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use headers::HeaderMapExt;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::conditional;
use crate::davhandler::DavInner;
use crate::davheaders::Depth;
use crate::davpath::DavPath;
use crate::errors::*;
use crate::resource::DavResource;

impl DavInner {
    pub(crate) async fn handle_get(&self, req: &Request<()>, path: &DavPath) -> DavResult<Response<Body>> {
        let head = req.method() == http::Method::HEAD;
        let res = self.resource(path).await?;
        if !res.exists() {
            return Err(DavError::NotFound);
        }
        let acl = self.acl(&res);

        // GET on a collection is a directory index.
        if res.is_collection() && !head {
            if !acl.listing {
                debug!("handle_get: {}: listing not allowed", path);
                return Err(DavError::Forbidden);
            }
            return self.handle_dirlist(&res).await;
        }

        if !acl.read {
            debug!("handle_get: {}: read not allowed", path);
            return Err(DavError::Forbidden);
        }
        conditional::check_preconditions(req, &res)?;

        let mut resp = Response::new(Body::empty());
        let mut send_length = true;
        if !head {
            match self.sendfile {
                Some((ref mode, ref root)) => {
                    let full_path = res.path().as_pathbuf_with_prefix(root);
                    debug!("handle_get: sendfile {:?}", full_path);
                    mode.add_headers(&full_path, resp.headers_mut());
                    send_length = false;
                },
                None => {
                    let strm = self.fs.read(res.path()).await?;
                    *resp.body_mut() = Body::from(strm);
                },
            }
        }

        let h = resp.headers_mut();
        let ctype = if res.is_collection() {
            "text/html; charset=utf-8"
        } else {
            res.path().get_mime_type_str()
        };
        h.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static(ctype));
        if send_length {
            h.typed_insert(headers::ContentLength(res.size()));
        }
        if let Some(mtime) = res.mtime() {
            h.typed_insert(headers::LastModified::from(mtime));
        }
        if let Some(etag) = res.etag_header() {
            h.typed_insert(etag);
        }
        h.typed_insert(headers::Date::from(SystemTime::now()));
        *resp.status_mut() = StatusCode::OK;
        Ok(resp)
    }

    // A minimal index of the direct members of a collection.
    pub(crate) async fn handle_dirlist(&self, res: &DavResource) -> DavResult<Response<Body>> {
        let upath = htmlescape::encode_minimal(&res.url());
        let mut w = String::new();
        w.push_str("<html><head>");
        w.push_str(&format!("<title>Index of {}</title>", upath));
        w.push_str("</head><body>");
        w.push_str(&format!("<h1>Index of {}</h1>", upath));
        w.push_str("<table>");
        w.push_str("<tr><th>Name</th><th>Last modified</th><th>Size</th></tr>");
        if !res.path().is_root() {
            w.push_str("<tr><td><a href=\"..\">Parent Directory</a></td><td></td><td>[DIR]</td></tr>");
        }

        // the first entry is the collection itself.
        let mut members = self.fs.descendants(res.path(), Depth::One).skip(1);
        while let Some(member) = members.next().await {
            let member = match member {
                Ok(m) => m,
                Err(e) => {
                    debug!("handle_dirlist: {}: {:?}", res.path(), e);
                    continue;
                },
            };
            let mut name = member.name();
            if member.is_collection() {
                name.push('/');
            }
            let modified = member
                .mtime()
                .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let size = match member.is_collection() {
                true => "[DIR]".to_string(),
                false => member.size().to_string(),
            };
            w.push_str(&format!(
                "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
                htmlescape::encode_attribute(&member.url()),
                htmlescape::encode_minimal(&name),
                modified,
                size
            ));
        }
        w.push_str("</table></body></html>");

        let mut resp = Response::new(Body::from(w));
        let h = resp.headers_mut();
        h.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/html; charset=utf-8"),
        );
        h.typed_insert(headers::Date::from(SystemTime::now()));
        Ok(resp)
    }
}
