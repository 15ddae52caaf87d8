//! `Webdav` (RFC4918) is HTTP (GET/HEAD/PUT/DELETE) plus a bunch of extra methods.
//!
//! This crate implements the method dispatcher of a WebDAV server: it takes
//! an `http::Request`, works out what the client asks for, checks access
//! and preconditions, and drives a set of pluggable backends to produce
//! an `http::Response`.
//!
//! The backends are:
//!
//! - a [resource backend](fs::DavFileSystem) that stores files and collections
//! - a [property store](props::DavPropStore) that answers PROPFIND
//! - an optional [locksystem](ls::DavLockSystem). LOCK and UNLOCK themselves
//!   answer 501, but locks are cleaned up after DELETE and MOVE
//! - [access control](acl::DavAccess), read-only unless configured otherwise
//!
//! Implemented as well are the HTTP preconditions (If-Match, If-None-Match,
//! If-Modified-Since, If-Unmodified-Since), and handing GET transfers off
//! to the front-end server with `X-SendFile` or `X-Accel-Redirect`.
//!
//! With the `memfs` feature (on by default) in-memory backends are included:
//!
//! - memfs: ephemeral in-memory filesystem.
//! - memprops: live properties plus in-memory dead properties.
//! - memls: ephemeral in-memory locksystem.
//!
//! Example:
//!
//! ```no_run
//! use dav_dispatch::{DavHandler, acl::DavAcl, memfs::MemFs, memprops::MemProps};
//!
//! # async fn serve(req: http::Request<String>) -> http::Response<dav_dispatch::body::Body> {
//! let dav_server = DavHandler::builder()
//!     .filesystem(MemFs::new())
//!     .propstore(MemProps::new())
//!     .access(Box::new(DavAcl::full()))
//!     .build_handler();
//! dav_server.handle(req).await
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;

mod conditional;
mod davhandler;
mod errors;
mod handle_copymove;
mod handle_delete;
mod handle_gethead;
mod handle_lock;
mod handle_mkcol;
mod handle_options;
mod handle_props;
mod handle_put;
mod httpdate;
mod multistatus;
#[cfg(feature = "memfs")]
mod tree;
mod util;
mod voidfs;
mod xmltree_ext;

pub mod acl;
pub mod body;
pub mod davheaders;
pub mod davpath;
pub mod fs;
pub mod ls;
pub mod props;
pub mod resource;
pub mod sendfile;

#[cfg(feature = "memfs")]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memfs;
#[cfg(feature = "memfs")]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memls;
#[cfg(feature = "memfs")]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub mod memprops;

pub use crate::davhandler::{DavConfig, DavHandler};
pub use crate::util::{DavMethod, DavMethodSet};
