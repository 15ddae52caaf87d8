//
// This module contains the main entry point of the library,
// DavHandler.
//
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Buf;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;

use crate::acl::{DavAccess, DavAcl};
use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::{DavError, DavResult};
use crate::fs::DavFileSystem;
use crate::ls::DavLockSystem;
use crate::props::{DavPropStore, LiveProps};
use crate::resource::DavResource;
use crate::sendfile::SendFile;
use crate::util::{DavMethod, DavMethodSet, dav_method};
use crate::voidfs::VoidFs;

/// WebDAV request handler.
///
/// The [`builder`](Self::builder) method is used to configure and
/// instantiate a handler, the [`handle`](Self::handle) method does the
/// actual work.
#[derive(Clone, Default)]
pub struct DavHandler {
    pub(crate) config: Arc<DavConfig>,
}

/// Configuration of the handler.
#[derive(Clone, Default)]
pub struct DavConfig {
    // Prefix to be stripped off when handling request.
    pub(crate) prefix:   Option<String>,
    // Resource backend.
    pub(crate) fs:       Option<Box<dyn DavFileSystem>>,
    // Property store, default is live properties only.
    pub(crate) props:    Option<Box<dyn DavPropStore>>,
    // Locksystem backend.
    pub(crate) ls:       Option<Box<dyn DavLockSystem>>,
    // Access control, default is read-only.
    pub(crate) access:   Option<Box<dyn DavAccess>>,
    // Set of allowed methods (None means "all methods")
    pub(crate) allow:    Option<DavMethodSet>,
    // Hand GET transfers off to the front-end server.
    pub(crate) sendfile: Option<(SendFile, PathBuf)>,
    // Scheme of this server, when the request URI does not carry one.
    pub(crate) scheme:   Option<String>,
}

impl DavConfig {
    /// Create a new configuration builder.
    pub fn new() -> DavConfig {
        DavConfig::default()
    }

    /// Use the configuration that was built to generate a [`DavHandler`].
    pub fn build_handler(self) -> DavHandler {
        DavHandler {
            config: Arc::new(self),
        }
    }

    /// Prefix to be stripped off before translating the rest of
    /// the request path to a resource path.
    pub fn strip_prefix(self, prefix: impl Into<String>) -> Self {
        let mut this = self;
        this.prefix = Some(prefix.into());
        this
    }

    /// Set the resource backend to use.
    pub fn filesystem(self, fs: Box<dyn DavFileSystem>) -> Self {
        let mut this = self;
        this.fs = Some(fs);
        this
    }

    /// Set the property store to use.
    pub fn propstore(self, props: Box<dyn DavPropStore>) -> Self {
        let mut this = self;
        this.props = Some(props);
        this
    }

    /// Set the locksystem to use.
    pub fn locksystem(self, ls: Box<dyn DavLockSystem>) -> Self {
        let mut this = self;
        this.ls = Some(ls);
        this
    }

    /// Set the access control to use. A plain [`DavAcl`] grants the same
    /// capabilities everywhere.
    pub fn access(self, access: Box<dyn DavAccess>) -> Self {
        let mut this = self;
        this.access = Some(access);
        this
    }

    /// Which methods to allow (default is all methods).
    pub fn methods(self, allow: DavMethodSet) -> Self {
        let mut this = self;
        this.allow = Some(allow);
        this
    }

    /// Answer GET on files with transfer headers instead of content.
    /// `root` is the directory the resource paths are relative to.
    pub fn sendfile(self, mode: SendFile, root: impl Into<PathBuf>) -> Self {
        let mut this = self;
        this.sendfile = Some((mode, root.into()));
        this
    }

    /// Scheme to assume when the request URI is not absolute (default "http").
    pub fn scheme(self, scheme: impl Into<String>) -> Self {
        let mut this = self;
        this.scheme = Some(scheme.into());
        this
    }
}

// The actual inner struct.
//
// At the start of the request, DavConfig is used to generate
// a DavInner struct. DavInner::handle then handles the request.
pub(crate) struct DavInner {
    pub prefix:   String,
    pub fs:       Box<dyn DavFileSystem>,
    pub void:     bool,
    pub props:    Box<dyn DavPropStore>,
    pub ls:       Option<Box<dyn DavLockSystem>>,
    pub access:   Box<dyn DavAccess>,
    pub allow:    DavMethodSet,
    pub sendfile: Option<(SendFile, PathBuf)>,
    pub scheme:   String,
}

impl DavHandler {
    /// Create a new `DavHandler`.
    ///
    /// This returns a DavHandler with an empty configuration, that
    /// only answers OPTIONS. Normally you should create a new `DavHandler`
    /// using `DavHandler::builder` and configure at least the filesystem.
    pub fn new() -> DavHandler {
        DavHandler::default()
    }

    /// Return a configuration builder.
    pub fn builder() -> DavConfig {
        DavConfig::new()
    }

    /// Process a WebDAV request.
    pub async fn handle<ReqBody, ReqData, ReqError>(&self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
    {
        let inner = DavInner::from(self.config.as_ref().clone());
        inner.handle(req).await
    }
}

impl From<DavConfig> for DavInner {
    fn from(cfg: DavConfig) -> Self {
        let DavConfig {
            prefix,
            fs,
            props,
            ls,
            access,
            allow,
            sendfile,
            scheme,
        } = cfg;
        let void = fs.is_none();
        DavInner {
            prefix: prefix.unwrap_or_default(),
            fs: fs.unwrap_or_else(|| VoidFs::new()),
            void,
            props: props.unwrap_or_else(|| LiveProps::new()),
            ls,
            access: access.unwrap_or_else(|| Box::new(DavAcl::read_only())),
            allow: allow.unwrap_or_default(),
            sendfile,
            scheme: scheme.unwrap_or_else(|| "http".to_string()),
        }
    }
}

impl DavInner {
    // helper.
    pub(crate) async fn resource(&self, path: &DavPath) -> DavResult<DavResource> {
        DavResource::lookup(self.fs.as_ref(), path).await
    }

    // helper.
    pub(crate) fn acl(&self, res: &DavResource) -> DavAcl {
        self.access.capabilities(res.path())
    }

    // drain request body and return it.
    pub(crate) async fn read_request<ReqBody, ReqData, ReqError>(
        &self,
        body: ReqBody,
        max_size: usize,
    ) -> DavResult<Vec<u8>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let mut data = Vec::new();
        let mut body = std::pin::pin!(body);

        while let Some(res) = body.frame().await {
            let mut data_frame = res.map_err(|_| {
                DavError::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "UnexpectedEof"))
            })?;

            let Some(buf) = data_frame.data_mut() else {
                continue;
            };

            while buf.has_remaining() {
                if data.len() + buf.remaining() > max_size {
                    return Err(DavError::Status(StatusCode::PAYLOAD_TOO_LARGE));
                }
                let b = buf.chunk();
                let l = b.len();
                data.extend_from_slice(b);
                buf.advance(l);
            }
        }
        Ok(data)
    }

    // internal dispatcher.
    async fn handle<ReqBody, ReqData, ReqError>(self, req: Request<ReqBody>) -> Response<Body>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        // Turn any DavError results into a HTTP error response.
        match self.handle2(req).await {
            Ok(resp) => {
                debug!("== END REQUEST result {}", resp.status());
                resp
            },
            Err(err) => {
                debug!("== END REQUEST result {:?}", err);
                let mut resp = Response::new(Body::empty());
                *resp.status_mut() = err.statuscode();
                resp.headers_mut()
                    .insert(http::header::CONTENT_LENGTH, http::HeaderValue::from_static("0"));
                resp
            },
        }
    }

    // internal dispatcher part 2.
    async fn handle2<ReqBody, ReqData, ReqError>(mut self, req: Request<ReqBody>) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError> + Send + 'static,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        let (req, body) = {
            let (parts, body) = req.into_parts();
            (Request::from_parts(parts, ()), body)
        };

        // translate HTTP method to Webdav method.
        let method = match dav_method(req.method()) {
            Ok(m) => m,
            Err(e) => {
                debug!("refusing method {} request {}", req.method(), req.uri());
                return Err(e);
            },
        };

        // See if method makes sense if we don't have a filesystem.
        if self.void {
            match method {
                DavMethod::Options => {
                    let options_allowed = self.allow.contains(DavMethod::Options);
                    self.allow = DavMethodSet::none();
                    if options_allowed {
                        self.allow.add(DavMethod::Options);
                    }
                },
                _ => {
                    debug!("no filesystem: method not allowed on request {}", req.uri());
                    return Err(DavError::MethodNotAllowed);
                },
            }
        }

        // see if method is allowed.
        if !self.allow.contains(method) {
            debug!("method {} not allowed on request {}", req.method(), req.uri());
            return Err(DavError::MethodNotAllowed);
        }

        // make sure the request path is valid.
        let path = DavPath::from_uri(req.uri(), &self.prefix)?;

        // PUT is the only handler that reads the body itself. All the
        // other handlers get a pre-read Vec<u8>.
        let (body_strm, body_data) = match method {
            DavMethod::Put => (Some(body), Vec::new()),
            _ => (None, self.read_request(body, 65536).await?),
        };

        debug!("== START REQUEST {:?} {}", method, path);

        match method {
            DavMethod::Options => self.handle_options(&req, &path).await,
            DavMethod::PropFind => self.handle_propfind(&req, &path, &body_data).await,
            DavMethod::PropPatch => self.handle_proppatch(&req, &path).await,
            DavMethod::MkCol => self.handle_mkcol(&req, &path, &body_data).await,
            DavMethod::Delete => self.handle_delete(&req, &path).await,
            DavMethod::Lock | DavMethod::Unlock => self.handle_lock(&req, &path).await,
            DavMethod::Head | DavMethod::Get => self.handle_get(&req, &path).await,
            DavMethod::Copy | DavMethod::Move => self.handle_copymove(&req, &path, method).await,
            DavMethod::Put => match body_strm {
                Some(body) => self.handle_put(&req, &path, body).await,
                None => Err(DavError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            },
        }
    }
}
