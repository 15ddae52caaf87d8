//! Utility module to handle the path part of an URL as a resource path.
//!
use std::error::Error;
use std::path::{Path, PathBuf};

use percent_encoding as pct;

/// Path information relative to a prefix.
#[derive(Clone)]
pub struct DavPath {
    pub(crate) path:   Vec<u8>,
    pub(crate) prefix: Vec<u8>,
}

// Encode all non-unreserved characters, except '/'.
// See RFC3986, and https://en.wikipedia.org/wiki/Percent-encoding .
const PATH_ENCODE_SET: &pct::AsciiSet = &pct::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

impl std::fmt::Display for DavPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.as_url_string_with_prefix())
    }
}

impl std::fmt::Debug for DavPath {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", &self.as_url_string_with_prefix_debug())
    }
}

/// Error returned by some of the DavPath methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// cannot parse
    InvalidPath,
    /// outside of prefix
    PrefixMismatch,
    /// too many dotdots
    ForbiddenPath,
}

impl Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// a decoded segment can contain any value except '/' or '\0'
fn valid_segment(src: &[u8]) -> Result<(), ParseError> {
    let mut p = pct::percent_decode(src);
    if p.any(|x| x == 0 || x == b'/') {
        return Err(ParseError::InvalidPath);
    }
    Ok(())
}

fn encode_path(src: &[u8]) -> String {
    pct::percent_encode(src, PATH_ENCODE_SET).to_string()
}

// make path safe:
// - raw path before decoding can contain only printable ascii
// - make sure path is absolute
// - remove query part (everything after ?)
// - merge consecutive slashes
// - process . and ..
// - decode percent encoded bytes, fail on invalid encodings.
// - do not allow NUL or '/' in segments.
fn normalize_path(rp: &[u8]) -> Result<Vec<u8>, ParseError> {
    if rp.iter().any(|&x| !(32..=126).contains(&x)) {
        return Err(ParseError::InvalidPath);
    }

    // don't allow fragments. query part gets deleted.
    let mut rawpath = rp;
    if let Some(pos) = rawpath.iter().position(|&x| x == b'?' || x == b'#') {
        if rawpath[pos] == b'#' {
            return Err(ParseError::InvalidPath);
        }
        rawpath = &rawpath[..pos];
    }

    if rawpath.first() != Some(&b'/') {
        return Err(ParseError::InvalidPath);
    }

    let isdir = rawpath.ends_with(b"/");
    let mut v: Vec<&[u8]> = Vec::new();
    for segment in rawpath.split(|c| *c == b'/') {
        match segment {
            b"." | b"" => {},
            b".." => {
                if v.len() < 2 {
                    return Err(ParseError::ForbiddenPath);
                }
                v.pop();
                v.pop();
            },
            s => {
                valid_segment(s)?;
                v.push(b"/");
                v.push(s);
            },
        }
    }
    if isdir || v.is_empty() {
        v.push(b"/");
    }
    Ok(v.iter().flat_map(|s| pct::percent_decode(s)).collect())
}

// path without a trailing slash, except for the root.
fn trim_slash(p: &[u8]) -> &[u8] {
    if p.len() > 1 && p.ends_with(b"/") {
        &p[..p.len() - 1]
    } else {
        p
    }
}

/// Comparision ignores any trailing slash, so /foo == /foo/
impl PartialEq for DavPath {
    fn eq(&self, rhs: &DavPath) -> bool {
        self.prefix == rhs.prefix && trim_slash(&self.path) == trim_slash(&rhs.path)
    }
}

impl Eq for DavPath {}

impl DavPath {
    /// Parse an URL encoded absolute path, without a prefix.
    pub fn new(src: &str) -> Result<DavPath, ParseError> {
        DavPath::from_str(src, "")
    }

    /// from URL encoded strings: path and prefix.
    pub(crate) fn from_str(src: &str, prefix: &str) -> Result<DavPath, ParseError> {
        let path = normalize_path(src.as_bytes())?;
        let mut prefix = prefix.as_bytes();
        if !path.starts_with(prefix) {
            return Err(ParseError::PrefixMismatch);
        }
        let pflen = prefix.len();
        if prefix.ends_with(b"/") {
            prefix = &prefix[..pflen - 1];
        } else if path.len() != pflen && path[pflen] != b'/' {
            return Err(ParseError::PrefixMismatch);
        }
        let mut path = path[prefix.len()..].to_vec();
        if path.is_empty() {
            path.push(b'/');
        }
        Ok(DavPath {
            path,
            prefix: prefix.to_vec(),
        })
    }

    /// from request.uri
    pub(crate) fn from_uri(uri: &http::uri::Uri, prefix: &str) -> Result<Self, ParseError> {
        match uri.path() {
            "*" => Ok(DavPath {
                prefix: b"".to_vec(),
                path:   b"*".to_vec(),
            }),
            path if path.starts_with('/') => DavPath::from_str(path, prefix),
            _ => Err(ParseError::InvalidPath),
        }
    }

    /// from url::Url and (not-url-encoded) prefix string.
    pub(crate) fn from_url(url: &url::Url, prefix: &str) -> Result<Self, ParseError> {
        DavPath::from_str(url.path(), prefix)
    }

    // is this a "star" request (only used with OPTIONS)
    pub(crate) fn is_star(&self) -> bool {
        self.path == b"*"
    }

    /// is this the root of the tree.
    pub fn is_root(&self) -> bool {
        self.path == b"/"
    }

    /// as URL encoded string, without prefix.
    pub fn as_url_string(&self) -> String {
        encode_path(&self.path)
    }

    /// as URL encoded string, with prefix.
    pub fn as_url_string_with_prefix(&self) -> String {
        let mut p = encode_path(&self.prefix);
        p.push_str(&encode_path(&self.path));
        p
    }

    fn as_url_string_with_prefix_debug(&self) -> String {
        if self.prefix.is_empty() {
            return encode_path(&self.path);
        }
        format!("{}[{}]", encode_path(&self.prefix), encode_path(&self.path))
    }

    /// as utf8 string, no prefix. uses String::from_utf8_lossy.
    pub fn as_utf8_string(&self) -> String {
        String::from_utf8_lossy(&self.path).to_string()
    }

    /// as raw bytes, not encoded, no prefix.
    pub fn as_bytes(&self) -> &[u8] {
        self.path.as_slice()
    }

    /// as raw bytes without a trailing slash (except for the root).
    pub(crate) fn as_trimmed_bytes(&self) -> &[u8] {
        trim_slash(&self.path)
    }

    /// prefix the DavPath with a Path and return a PathBuf
    pub(crate) fn as_pathbuf_with_prefix<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let mut p = path.as_ref().to_path_buf();
        p.push(self.as_rel_pathbuf());
        p
    }

    /// as Path, relative (remove first slash)
    pub(crate) fn as_rel_pathbuf(&self) -> PathBuf {
        let path = self.path.strip_prefix(b"/").unwrap_or(&self.path);
        let path = path.strip_suffix(b"/").unwrap_or(path);
        PathBuf::from(String::from_utf8_lossy(path).as_ref())
    }

    /// is this a collection i.e. does the original URL path end in "/".
    pub fn is_collection(&self) -> bool {
        self.path.ends_with(b"/")
    }

    /// return the URL prefix.
    pub fn prefix(&self) -> String {
        String::from_utf8_lossy(&self.prefix).to_string()
    }

    /// add a slash to the end of the path (if not already present).
    pub(crate) fn add_slash(&mut self) {
        if !self.is_collection() {
            self.path.push(b'/');
        }
    }

    // add a slash
    pub(crate) fn add_slash_if(&mut self, b: bool) {
        if b {
            self.add_slash();
        }
    }

    fn segments(&self) -> impl Iterator<Item = &[u8]> {
        self.path.split(|&c| c == b'/').filter(|e| !e.is_empty())
    }

    /// Get the parent collection. The parent of "/" is "/".
    pub fn parent(&self) -> DavPath {
        let mut segs = self.segments().collect::<Vec<&[u8]>>();
        segs.pop();
        let mut path = Vec::new();
        for seg in segs {
            path.push(b'/');
            path.extend_from_slice(seg);
        }
        path.push(b'/');
        DavPath {
            prefix: self.prefix.clone(),
            path,
        }
    }

    /// The filename is the last segment of the path. Can be empty.
    pub fn file_name(&self) -> &[u8] {
        self.segments().last().unwrap_or(b"")
    }

    /// Count the number of segments the path has. "/" has 0.
    #[cfg(test)]
    pub(crate) fn num_segments(&self) -> usize {
        self.segments().count()
    }

    /// Is `self` equal to `other`, or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &DavPath) -> bool {
        let a = trim_slash(&self.path);
        let b = trim_slash(&other.path);
        a == b"/" || a == b || (b.starts_with(a) && b[a.len()] == b'/')
    }

    /// Add a segment to the end of the path. The prefix is kept, so backends
    /// can name the members of a destination in a `FsFailure`.
    pub fn push_segment(&mut self, b: &[u8]) {
        if !self.is_collection() {
            self.path.push(b'/');
        }
        self.path.extend_from_slice(b);
    }

    /// Replace the leading `from` part of the path with `to`.
    /// `from` must be an ancestor of this path.
    pub(crate) fn rebase(&self, from: &DavPath, to: &DavPath) -> DavPath {
        let rest = &self.path[trim_slash(&from.path).len()..];
        let mut path = trim_slash(&to.path).to_vec();
        if path == b"/" && rest.starts_with(b"/") {
            path.clear();
        }
        path.extend_from_slice(rest);
        if path.is_empty() {
            path.push(b'/');
        }
        DavPath {
            prefix: to.prefix.clone(),
            path,
        }
    }

    pub(crate) fn get_mime_type_str(&self) -> &'static str {
        let name = self.file_name();
        let d = name.rsplitn(2, |&c| c == b'.').collect::<Vec<&[u8]>>();
        if d.len() > 1 {
            if let Ok(ext) = std::str::from_utf8(d[0]) {
                if let Some(t) = mime_guess::from_ext(ext).first_raw() {
                    return t;
                }
            }
        }
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        let p = DavPath::new("/a/./b//c/../d%20e").unwrap();
        assert_eq!(p.as_bytes(), b"/a/b/d e");
        assert_eq!(p.as_url_string(), "/a/b/d%20e");
        assert!(!p.is_collection());

        let p = DavPath::new("/a/b/?query=1").unwrap();
        assert_eq!(p.as_bytes(), b"/a/b/");
        assert!(p.is_collection());

        assert_eq!(DavPath::new("/../etc").unwrap_err(), ParseError::ForbiddenPath);
        assert_eq!(DavPath::new("a/b").unwrap_err(), ParseError::InvalidPath);
        assert_eq!(DavPath::new("/a#frag").unwrap_err(), ParseError::InvalidPath);
        assert_eq!(DavPath::new("/a%2fb").unwrap_err(), ParseError::InvalidPath);
    }

    #[test]
    fn prefix() {
        let p = DavPath::from_str("/dav/a/b", "/dav").unwrap();
        assert_eq!(p.as_bytes(), b"/a/b");
        assert_eq!(p.as_url_string_with_prefix(), "/dav/a/b");

        let p = DavPath::from_str("/dav", "/dav").unwrap();
        assert!(p.is_root());

        assert_eq!(DavPath::from_str("/davx/a", "/dav").unwrap_err(), ParseError::PrefixMismatch);
        assert_eq!(DavPath::from_str("/other", "/dav").unwrap_err(), ParseError::PrefixMismatch);
    }

    #[test]
    fn parent_and_name() {
        let p = DavPath::new("/a/b/c.txt").unwrap();
        assert_eq!(p.parent().as_bytes(), b"/a/b/");
        assert_eq!(p.file_name(), b"c.txt");
        assert_eq!(p.get_mime_type_str(), "text/plain");
        assert_eq!(DavPath::new("/a").unwrap().parent().as_bytes(), b"/");
        assert_eq!(DavPath::new("/").unwrap().parent().as_bytes(), b"/");
        assert_eq!(DavPath::new("/a/").unwrap().num_segments(), 1);
    }

    #[test]
    fn ancestry() {
        let a = DavPath::new("/a").unwrap();
        assert!(a.is_ancestor_of(&DavPath::new("/a/b").unwrap()));
        assert!(a.is_ancestor_of(&DavPath::new("/a/").unwrap()));
        assert!(!a.is_ancestor_of(&DavPath::new("/ab").unwrap()));
        assert!(DavPath::new("/").unwrap().is_ancestor_of(&a));

        let child = DavPath::new("/a/b/c").unwrap();
        let moved = child.rebase(&a, &DavPath::new("/x/y/").unwrap());
        assert_eq!(moved.as_bytes(), b"/x/y/b/c");
        let moved = child.rebase(&a, &DavPath::new("/").unwrap());
        assert_eq!(moved.as_bytes(), b"/b/c");
        assert_eq!(a.rebase(&a, &DavPath::new("/z").unwrap()).as_bytes(), b"/z");
    }

    #[test]
    fn pathbuf() {
        let p = DavPath::new("/a/b/").unwrap();
        assert_eq!(p.as_pathbuf_with_prefix("/srv"), PathBuf::from("/srv/a/b"));
    }
}
