use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::StreamExt;
use http::{Request, Response, StatusCode};

use dav_dispatch::acl::DavAcl;
use dav_dispatch::body::Body;
use dav_dispatch::davheaders::Depth;
use dav_dispatch::davpath::DavPath;
use dav_dispatch::fs::*;
use dav_dispatch::ls::{DavLock, DavLockSystem, LsFuture};
use dav_dispatch::memfs::MemFs;
use dav_dispatch::memls::MemLs;
use dav_dispatch::memprops::MemProps;
use dav_dispatch::props::{DavPropStore, PropName, PropRequest, PropStat};
use dav_dispatch::resource::DavResource;
use dav_dispatch::{DavConfig, DavHandler, DavMethod, DavMethodSet};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: String) {
    log.lock().unwrap().push(entry);
}

// Filesystem that logs every mutating call before passing it on.
#[derive(Clone)]
struct RecFs {
    inner: Box<MemFs>,
    log: Log,
}

impl DavFileSystem for RecFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        self.inner.metadata(path)
    }

    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        self.inner.read_dir(path)
    }

    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Bytes>> {
        self.inner.read(path)
    }

    fn write<'a>(&'a self, path: &'a DavPath, data: FsStream<Bytes>) -> FsFuture<'a, ()> {
        record(&self.log, format!("fs.write {}", path.as_url_string()));
        self.inner.write(path, data)
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        record(&self.log, format!("fs.create_dir {}", path.as_url_string()));
        self.inner.create_dir(path)
    }

    fn remove<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        record(&self.log, format!("fs.remove {}", path.as_url_string()));
        self.inner.remove(path)
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, depth: Depth) -> FsFuture<'a, Vec<FsFailure>> {
        record(
            &self.log,
            format!("fs.copy {} {} {:?}", from.as_url_string(), to.as_url_string(), depth),
        );
        self.inner.copy(from, to, depth)
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, Vec<FsFailure>> {
        record(
            &self.log,
            format!("fs.rename {} {}", from.as_url_string(), to.as_url_string()),
        );
        self.inner.rename(from, to)
    }
}

#[derive(Clone)]
struct RecProps {
    inner: Box<MemProps>,
    log: Log,
}

impl DavPropStore for RecProps {
    fn propstat<'a>(&'a self, res: &'a DavResource, req: &'a PropRequest) -> FsFuture<'a, Vec<PropStat>> {
        self.inner.propstat(res, req)
    }

    fn remove_all<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        record(&self.log, format!("props.remove_all {}", path.as_url_string()));
        self.inner.remove_all(path)
    }

    fn copy_all<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, is_move: bool) -> FsFuture<'a, ()> {
        let mode = if is_move { "move" } else { "copy" };
        record(
            &self.log,
            format!("props.copy_all {} {} {}", from.as_url_string(), to.as_url_string(), mode),
        );
        self.inner.copy_all(from, to, is_move)
    }
}

#[derive(Debug, Clone)]
struct RecLs {
    inner: Box<MemLs>,
    log: Log,
}

impl DavLockSystem for RecLs {
    fn discover<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Vec<DavLock>> {
        self.inner.discover(path)
    }

    fn delete<'a>(&'a self, path: &'a DavPath) -> LsFuture<'a, Result<(), ()>> {
        record(&self.log, format!("ls.delete {}", path.as_url_string()));
        self.inner.delete(path)
    }
}

// A handler on recording wrappers around the in-memory backends.
struct Setup {
    fs: Box<MemFs>,
    props: Box<MemProps>,
    ls: Box<MemLs>,
    log: Log,
}

impl Setup {
    fn new() -> Setup {
        Setup {
            fs: MemFs::new(),
            props: MemProps::new(),
            ls: MemLs::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn config(&self) -> DavConfig {
        DavHandler::builder()
            .filesystem(Box::new(RecFs {
                inner: self.fs.clone(),
                log: self.log.clone(),
            }))
            .propstore(Box::new(RecProps {
                inner: self.props.clone(),
                log: self.log.clone(),
            }))
            .locksystem(Box::new(RecLs {
                inner: self.ls.clone(),
                log: self.log.clone(),
            }))
    }

    fn handler(&self) -> DavHandler {
        self.config().access(Box::new(DavAcl::full())).build_handler()
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    async fn mkdir(&self, path: &str) {
        self.fs.create_dir(&DavPath::new(path).unwrap()).await.unwrap();
    }

    async fn file(&self, path: &str, data: &'static str) {
        let strm: FsStream<Bytes> = Box::pin(futures_util::stream::once(async move { Ok(Bytes::from(data)) }));
        self.fs.write(&DavPath::new(path).unwrap(), strm).await.unwrap();
    }

    async fn exists(&self, path: &str) -> bool {
        self.fs.metadata(&DavPath::new(path).unwrap()).await.is_ok()
    }
}

async fn resp_to_string(mut resp: Response<Body>) -> String {
    let mut data = Vec::new();
    let body = resp.body_mut();
    while let Some(b) = body.next().await {
        let b = b.expect("error reading response body");
        data.extend_from_slice(&b);
    }
    String::from_utf8(data).expect("response is not utf-8")
}

fn req(method: &str, uri: &str) -> http::request::Builder {
    Request::builder().method(method).uri(uri).header("host", "example.com")
}

async fn send(server: &DavHandler, req: http::request::Builder) -> Response<Body> {
    server.handle(req.body(Body::empty()).unwrap()).await
}

async fn put(server: &DavHandler, uri: &str, data: &'static str) -> Response<Body> {
    server.handle(req("PUT", uri).body(Body::from(data)).unwrap()).await
}

async fn get_string(server: &DavHandler, uri: &str) -> String {
    let resp = send(server, req("GET", uri)).await;
    assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    resp_to_string(resp).await
}

fn header<'a>(resp: &'a Response<Body>, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn get_and_head() {
    let s = Setup::new();
    s.file("/a.txt", "hello").await;
    let server = s.handler();

    let resp = send(&server, req("GET", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-type"), Some("text/plain"));
    assert_eq!(header(&resp, "content-length"), Some("5"));
    assert!(header(&resp, "etag").is_some_and(|e| e.starts_with('"')));
    assert!(header(&resp, "last-modified").is_some());
    assert!(header(&resp, "date").is_some());
    assert_eq!(resp_to_string(resp).await, "hello");

    let resp = send(&server, req("HEAD", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "content-length"), Some("5"));
    assert_eq!(resp_to_string(resp).await, "");

    let resp = send(&server, req("GET", "/missing.txt")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_needs_read_access() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.file("/a.txt", "hello").await;
    let server = s.config().access(Box::new(DavAcl::none())).build_handler();

    let resp = send(&server, req("GET", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&server, req("GET", "/dir/")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send(&server, req("HEAD", "/dir/")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn directory_listing() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.file("/dir/a&b.txt", "x").await;
    s.mkdir("/dir/sub").await;
    let server = s.handler();

    let resp = send(&server, req("GET", "/dir/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header(&resp, "content-type").is_some_and(|c| c.starts_with("text/html")));
    let html = resp_to_string(resp).await;
    assert!(html.contains("a&amp;b.txt"));
    assert!(html.contains("sub"));
}

#[tokio::test]
async fn conditional_get() {
    let s = Setup::new();
    s.file("/a.txt", "hello").await;
    let server = s.handler();

    let resp = send(&server, req("GET", "/a.txt")).await;
    let etag = header(&resp, "etag").unwrap().to_string();

    let resp = send(&server, req("GET", "/a.txt").header("if-none-match", etag.as_str())).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(resp_to_string(resp).await, "");

    let resp = send(&server, req("GET", "/a.txt").header("if-match", "\"nope\"")).await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

    let resp = send(&server, req("GET", "/a.txt").header("if-match", etag.as_str())).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn sendfile() {
    let s = Setup::new();
    s.file("/a.txt", "hello").await;
    let server = s
        .config()
        .sendfile("x-accel-redir /protected".parse().unwrap(), "/srv/dav")
        .build_handler();

    let resp = send(&server, req("GET", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-accel-redirect"), Some("/protected/srv/dav/a.txt"));
    assert!(header(&resp, "content-length").is_none());
    assert_eq!(resp_to_string(resp).await, "");
}

#[tokio::test]
async fn put_basic() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.file("/file", "x").await;
    let server = s.handler();

    let resp = put(&server, "/dir/a.txt", "one").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = put(&server, "/dir/a.txt", "two").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&server, req("GET", "/dir/a.txt")).await;
    assert_eq!(resp_to_string(resp).await, "two");

    assert_eq!(put(&server, "/dir", "x").await.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(put(&server, "/nodir/a.txt", "x").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(put(&server, "/file/a.txt", "x").await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn put_read_only() {
    let s = Setup::new();
    let server = s.config().build_handler();

    let r = req("PUT", "/a.txt").body(Body::from("data")).unwrap();
    assert_eq!(server.handle(r).await.status(), StatusCode::FORBIDDEN);
    assert!(s.calls().is_empty());
    assert!(!s.exists("/a.txt").await);
}

#[tokio::test]
async fn delete_missing_calls_nothing() {
    let s = Setup::new();
    let server = s.handler();

    let resp = send(&server, req("DELETE", "/a/b")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(s.calls().is_empty());
}

#[tokio::test]
async fn delete_forbidden() {
    let s = Setup::new();
    s.file("/a.txt", "x").await;
    let server = s.config().build_handler();

    let resp = send(&server, req("DELETE", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(s.calls().is_empty());
    assert!(s.exists("/a.txt").await);
}

#[tokio::test]
async fn delete_order() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.file("/dir/f", "x").await;
    let f = DavPath::new("/dir/f").unwrap();
    let color = PropName::new(Some("urn:x"), "color");
    s.ls.add(&f);
    s.props.set(&f, &color, "red");
    let server = s.handler();

    let resp = send(&server, req("DELETE", "/dir")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(header(&resp, "date").is_some());
    assert_eq!(
        s.calls(),
        vec!["ls.delete /dir/", "props.remove_all /dir/", "fs.remove /dir/"]
    );
    assert!(!s.exists("/dir/f").await);
    assert!(s.ls.discover(&f).await.is_empty());
    assert_eq!(s.props.get(&f, &color), None);
}

#[tokio::test]
async fn delete_precondition() {
    let s = Setup::new();
    s.file("/a.txt", "x").await;
    let server = s.handler();

    let resp = send(&server, req("DELETE", "/a.txt").header("if-match", "\"nope\"")).await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    assert!(s.calls().is_empty());

    let resp = send(&server, req("DELETE", "/a.txt").header("if-match", "*")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn mkcol() {
    let s = Setup::new();
    s.file("/file", "x").await;
    let server = s.handler();

    let resp = send(&server, req("MKCOL", "/new")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(s.exists("/new/").await);

    let resp = send(&server, req("MKCOL", "/new")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let resp = send(&server, req("MKCOL", "/x/y")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = send(&server, req("MKCOL", "/file/y")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let r = req("MKCOL", "/other").body(Body::from("abcd")).unwrap();
    assert_eq!(server.handle(r).await.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(!s.exists("/other").await);
}

#[tokio::test]
async fn mkcol_checks_body_before_access() {
    let s = Setup::new();
    let server = s.config().build_handler();

    let r = req("MKCOL", "/new").body(Body::from("abcd")).unwrap();
    assert_eq!(server.handle(r).await.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let resp = send(&server, req("MKCOL", "/new")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(s.calls().is_empty());
}

#[tokio::test]
async fn copy() {
    let s = Setup::new();
    s.mkdir("/src").await;
    s.file("/src/a.txt", "a").await;
    let color = PropName::new(Some("urn:x"), "color");
    s.props.set(&DavPath::new("/src/a.txt").unwrap(), &color, "red");
    let server = s.handler();

    let copy = |dest: &str| req("COPY", "/src").header("destination", dest);

    let resp = send(&server, copy("http://example.com/dst")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(get_string(&server, "/dst/a.txt").await, "a");
    assert!(s.exists("/src/a.txt").await);
    assert_eq!(
        s.props.get(&DavPath::new("/dst/a.txt").unwrap(), &color),
        Some("red".to_string())
    );

    // overwrite replaces the destination, it does not merge into it.
    s.file("/dst/stale.txt", "old").await;
    s.file("/dst/a.txt", "changed").await;
    let resp = send(&server, copy("/dst").header("overwrite", "T")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(!s.exists("/dst/stale.txt").await);
    assert_eq!(get_string(&server, "/dst/a.txt").await, "a");

    s.file("/dst/stale.txt", "old").await;
    let before = s.calls().len();
    let resp = send(&server, copy("/dst").header("overwrite", "F")).await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(s.calls().len(), before);
    assert_eq!(get_string(&server, "/dst/stale.txt").await, "old");
}

#[tokio::test]
async fn copy_over_existing() {
    let s = Setup::new();
    s.file("/a", "a").await;
    s.file("/b", "b").await;
    let server = s.handler();

    let resp = send(&server, req("COPY", "/a").header("destination", "/b")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        s.calls(),
        vec![
            "ls.delete /b",
            "props.remove_all /b",
            "fs.remove /b",
            "fs.copy /a /b Infinity",
            "props.copy_all /a /b copy",
        ]
    );
    assert_eq!(get_string(&server, "/b").await, "a");
}

#[tokio::test]
async fn copymove_overlap() {
    let s = Setup::new();
    s.mkdir("/a").await;
    s.mkdir("/a/b").await;
    s.file("/a/b/f.txt", "f").await;
    s.mkdir("/a/b/c").await;
    let server = s.handler();

    for method in ["COPY", "MOVE"] {
        // onto an ancestor.
        let resp = send(&server, req(method, "/a/b").header("destination", "/a")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} onto ancestor", method);
        let resp = send(&server, req(method, "/a/b/").header("destination", "/")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} onto root", method);
        // into its own subtree, onto an existing member.
        let resp = send(&server, req(method, "/a/b/").header("destination", "/a/b/c")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} onto descendant", method);
    }
    assert!(s.calls().is_empty());
    assert!(s.exists("/a/b/f.txt").await);
    assert!(s.exists("/a/b/c/").await);
}

// Filesystem whose copy reports a failed member below the destination.
#[derive(Clone)]
struct PartialFs {
    inner: Box<MemFs>,
}

impl DavFileSystem for PartialFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        self.inner.metadata(path)
    }

    fn read_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        self.inner.read_dir(path)
    }

    fn read<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, FsStream<Bytes>> {
        self.inner.read(path)
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath, depth: Depth) -> FsFuture<'a, Vec<FsFailure>> {
        Box::pin(async move {
            let mut failures = self.inner.copy(from, to, depth).await?;
            for (name, error) in [("locked.txt", FsError::Forbidden), ("gone.txt", FsError::NotFound)] {
                let mut member = to.clone();
                member.push_segment(name.as_bytes());
                failures.push(FsFailure::new(&member, error));
            }
            Ok(failures)
        })
    }
}

#[tokio::test]
async fn copy_partial_failure() {
    let fs = MemFs::new();
    fs.create_dir(&DavPath::new("/src").unwrap()).await.unwrap();
    let server = DavHandler::builder()
        .filesystem(Box::new(PartialFs { inner: fs }))
        .propstore(MemProps::new())
        .strip_prefix("/dav")
        .access(Box::new(DavAcl::full()))
        .build_handler();

    let resp = send(&server, req("COPY", "/dav/src").header("destination", "/dav/dst")).await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = resp_to_string(resp).await;
    assert_eq!(hrefs(&xml), vec!["/dav/dst/locked.txt", "/dav/dst/gone.txt"]);

    let root = xmltree::Element::parse(xml.as_bytes()).unwrap();
    let statuses = root
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .filter_map(|e| e.get_child("status"))
        .filter_map(|st| st.get_text())
        .map(|t| t.into_owned())
        .collect::<Vec<_>>();
    assert_eq!(statuses, vec!["HTTP/1.1 403 Forbidden", "HTTP/1.1 404 Not Found"]);
}

#[tokio::test]
async fn copy_depth_zero() {
    let s = Setup::new();
    s.mkdir("/src").await;
    s.file("/src/a.txt", "a").await;
    let server = s.handler();

    let resp = send(&server, req("COPY", "/src").header("destination", "/dst").header("depth", "0")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(s.exists("/dst/").await);
    assert!(!s.exists("/dst/a.txt").await);

    let resp = send(&server, req("COPY", "/src").header("destination", "/dst2").header("depth", "1")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn copymove_errors() {
    let s = Setup::new();
    s.file("/a", "a").await;
    s.file("/file", "x").await;
    let server = s.handler();

    let cases: &[(&str, Option<&str>, &[(&str, &str)], StatusCode)] = &[
        ("/missing", Some("/b"), &[], StatusCode::NOT_FOUND),
        ("/a", None, &[], StatusCode::BAD_REQUEST),
        ("/a", Some(""), &[], StatusCode::BAD_REQUEST),
        ("/a", Some("http://other.com/b"), &[], StatusCode::BAD_GATEWAY),
        ("/a", Some("https://example.com/b"), &[], StatusCode::BAD_GATEWAY),
        ("/a", Some("http://example.com:8080/b"), &[], StatusCode::BAD_GATEWAY),
        ("/a", Some("/a"), &[], StatusCode::FORBIDDEN),
        ("/a", Some("http://example.com/a"), &[], StatusCode::FORBIDDEN),
        ("/a", Some("/nodir/b"), &[], StatusCode::CONFLICT),
        ("/a", Some("/file/b"), &[], StatusCode::CONFLICT),
        ("/a", Some("/b"), &[("overwrite", "X")], StatusCode::BAD_REQUEST),
        ("/a", Some("/file"), &[("overwrite", "F")], StatusCode::PRECONDITION_FAILED),
        ("/a", Some("/b"), &[("depth", "0")], StatusCode::BAD_REQUEST),
        ("/a", Some("/b"), &[("depth", "1")], StatusCode::BAD_REQUEST),
    ];

    for (path, dest, extra, status) in cases {
        let mut r = req("MOVE", path);
        if let Some(dest) = dest {
            r = r.header("destination", *dest);
        }
        for (name, value) in extra.iter() {
            r = r.header(*name, *value);
        }
        let resp = send(&server, r).await;
        assert_eq!(resp.status(), *status, "MOVE {} -> {:?} {:?}", path, dest, extra);
    }
    assert!(s.calls().is_empty());
    assert!(s.exists("/a").await);
}

#[tokio::test]
async fn move_over_existing() {
    let s = Setup::new();
    s.file("/a", "a").await;
    s.file("/b", "b").await;
    s.ls.add(&DavPath::new("/a").unwrap());
    let server = s.handler();

    let resp = send(&server, req("MOVE", "/a").header("destination", "/b")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        s.calls(),
        vec![
            "ls.delete /b",
            "props.remove_all /b",
            "fs.remove /b",
            "fs.rename /a /b",
            "props.copy_all /a /b move",
            "ls.delete /a",
        ]
    );
    assert!(!s.exists("/a").await);
    assert!(s.ls.discover(&DavPath::new("/a").unwrap()).await.is_empty());

    let resp = send(&server, req("GET", "/b")).await;
    assert_eq!(resp_to_string(resp).await, "a");
}

#[tokio::test]
async fn move_needs_relocate() {
    let s = Setup::new();
    s.file("/a", "a").await;
    let acl = DavAcl {
        relocate: false,
        ..DavAcl::full()
    };
    let server = s.config().access(Box::new(acl)).build_handler();

    let resp = send(&server, req("MOVE", "/a").header("destination", "/b")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(s.calls().is_empty());
}

#[tokio::test]
async fn prefix() {
    let s = Setup::new();
    s.file("/a.txt", "hello").await;
    let server = s.config().strip_prefix("/dav").access(Box::new(DavAcl::full())).build_handler();

    let resp = send(&server, req("GET", "/dav/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&server, req("GET", "/other/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let resp = send(&server, req("COPY", "/dav/a.txt").header("destination", "/other/b.txt")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let resp = send(
        &server,
        req("COPY", "/dav/a.txt").header("destination", "http://example.com/dav/b.txt"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(s.exists("/b.txt").await);
}

#[tokio::test]
async fn options() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.file("/a.txt", "x").await;
    let server = s.handler();

    let resp = send(&server, req("OPTIONS", "/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "dav"), Some("1,2"));
    assert_eq!(header(&resp, "ms-author-via"), Some("DAV"));
    assert_eq!(header(&resp, "content-length"), Some("0"));

    let resp = send(&server, req("OPTIONS", "/a.txt")).await;
    assert_eq!(
        header(&resp, "allow"),
        Some("OPTIONS, HEAD, GET, PUT, DELETE, PROPFIND, PROPPATCH, COPY, MOVE, LOCK, UNLOCK")
    );
    assert_eq!(header(&resp, "allow-ranges"), Some("bytes"));
    assert_eq!(header(&resp, "accept-ranges"), Some("bytes"));

    let resp = send(&server, req("OPTIONS", "/dir/")).await;
    assert_eq!(
        header(&resp, "allow"),
        Some("OPTIONS, HEAD, GET, DELETE, PROPFIND, PROPPATCH, COPY, MOVE, LOCK, UNLOCK")
    );
    assert!(header(&resp, "allow-ranges").is_none());

    let resp = send(&server, req("OPTIONS", "/dir/new")).await;
    assert_eq!(header(&resp, "allow"), Some("OPTIONS, PUT, MKCOL"));

    let resp = send(&server, req("OPTIONS", "/nodir/new")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn allow_list() {
    let s = Setup::new();
    s.file("/a.txt", "x").await;
    let mut methods = DavMethodSet::all();
    methods.remove(DavMethod::Put);
    let server = s.config().access(Box::new(DavAcl::full())).methods(methods).build_handler();

    let r = req("PUT", "/a.txt").body(Body::from("y")).unwrap();
    assert_eq!(server.handle(r).await.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = send(&server, req("OPTIONS", "/a.txt")).await;
    let allow = header(&resp, "allow").unwrap();
    assert!(!allow.contains("PUT"));
    assert!(allow.contains("GET"));
}

#[tokio::test]
async fn unknown_methods() {
    let s = Setup::new();
    s.file("/a.txt", "x").await;
    let server = s.handler();

    for method in ["POST", "PATCH", "TRACE"] {
        let resp = send(&server, req(method, "/a.txt")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
    }
    for method in ["LOCK", "UNLOCK"] {
        let resp = send(&server, req(method, "/a.txt")).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED, "{}", method);
    }
}

#[tokio::test]
async fn no_filesystem() {
    let server = DavHandler::new();

    let resp = send(&server, req("GET", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let resp = send(&server, req("PROPFIND", "/")).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = send(&server, req("OPTIONS", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "allow"), Some("OPTIONS"));
}

#[tokio::test]
async fn proppatch() {
    let s = Setup::new();
    s.file("/a.txt", "x").await;
    let server = s.handler();

    let resp = send(&server, req("PROPPATCH", "/missing")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&server, req("PROPPATCH", "/a.txt").header("depth", "1")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&server, req("PROPPATCH", "/a.txt")).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
}

fn hrefs(xml: &str) -> Vec<String> {
    let root = xmltree::Element::parse(xml.as_bytes()).unwrap();
    root.children
        .iter()
        .filter_map(|n| n.as_element())
        .filter_map(|e| e.get_child("href"))
        .filter_map(|h| h.get_text())
        .map(|t| t.into_owned())
        .collect()
}

#[tokio::test]
async fn propfind_depth() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    s.mkdir("/dir/sub").await;
    s.file("/dir/sub/f.txt", "x").await;
    let server = s.handler();

    let resp = send(&server, req("PROPFIND", "/dir").header("depth", "0")).await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    assert_eq!(hrefs(&resp_to_string(resp).await), vec!["/dir/"]);

    let resp = send(&server, req("PROPFIND", "/dir/").header("depth", "1")).await;
    assert_eq!(hrefs(&resp_to_string(resp).await), vec!["/dir/", "/dir/sub/"]);

    let resp = send(&server, req("PROPFIND", "/dir/")).await;
    assert_eq!(
        hrefs(&resp_to_string(resp).await),
        vec!["/dir/", "/dir/sub/", "/dir/sub/f.txt"]
    );

    let resp = send(&server, req("PROPFIND", "/dir/").header("depth", "2")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = send(&server, req("PROPFIND", "/nope")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn propfind_props() {
    let s = Setup::new();
    s.file("/a.txt", "hello").await;
    let color = PropName::new(Some("urn:x"), "color");
    s.props.set(&DavPath::new("/a.txt").unwrap(), &color, "red");
    let server = s.handler();

    let body = r#"<?xml version="1.0" encoding="utf-8"?>
        <D:propfind xmlns:D="DAV:" xmlns:X="urn:x">
          <D:prop><D:getcontentlength/><X:color/><X:size/></D:prop>
        </D:propfind>"#;
    let r = req("PROPFIND", "/a.txt").header("depth", "0").body(Body::from(body)).unwrap();
    let resp = server.handle(r).await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    let xml = resp_to_string(resp).await;

    let root = xmltree::Element::parse(xml.as_bytes()).unwrap();
    let response = root.get_child("response").unwrap();
    let mut found = Vec::new();
    for propstat in response.children.iter().filter_map(|n| n.as_element()) {
        if propstat.name != "propstat" {
            continue;
        }
        let status = propstat.get_child("status").and_then(|s| s.get_text()).unwrap();
        let prop = propstat.get_child("prop").unwrap();
        for p in prop.children.iter().filter_map(|n| n.as_element()) {
            let text = p.get_text().map(|t| t.into_owned()).unwrap_or_default();
            found.push((p.name.clone(), status.contains("200"), text));
        }
    }
    found.sort();
    assert_eq!(
        found,
        vec![
            ("color".to_string(), true, "red".to_string()),
            ("getcontentlength".to_string(), true, "5".to_string()),
            ("size".to_string(), false, String::new()),
        ]
    );

    let body = r#"<D:propfind xmlns:D="DAV:"><D:allprop/><D:prop><D:getetag/></D:prop></D:propfind>"#;
    let r = req("PROPFIND", "/a.txt").body(Body::from(body)).unwrap();
    assert_eq!(server.handle(r).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn propfind_with_prefix() {
    let s = Setup::new();
    s.mkdir("/dir").await;
    let server = s.config().strip_prefix("/dav").build_handler();

    let resp = send(&server, req("PROPFIND", "/dav/dir/").header("depth", "0")).await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
    assert_eq!(hrefs(&resp_to_string(resp).await), vec!["/dav/dir/"]);
}
