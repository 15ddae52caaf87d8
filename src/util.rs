use http::method::InvalidMethod;

use crate::errors::{DavError, DavResult};

/// HTTP Methods supported by DavHandler.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[repr(u32)]
pub enum DavMethod {
    Head      = 0x0001,
    Get       = 0x0002,
    Put       = 0x0004,
    Options   = 0x0010,
    PropFind  = 0x0020,
    PropPatch = 0x0040,
    MkCol     = 0x0080,
    Copy      = 0x0100,
    Move      = 0x0200,
    Delete    = 0x0400,
    Lock      = 0x0800,
    Unlock    = 0x1000,
}

impl DavMethod {
    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            DavMethod::Head => "HEAD",
            DavMethod::Get => "GET",
            DavMethod::Put => "PUT",
            DavMethod::Options => "OPTIONS",
            DavMethod::PropFind => "PROPFIND",
            DavMethod::PropPatch => "PROPPATCH",
            DavMethod::MkCol => "MKCOL",
            DavMethod::Copy => "COPY",
            DavMethod::Move => "MOVE",
            DavMethod::Delete => "DELETE",
            DavMethod::Lock => "LOCK",
            DavMethod::Unlock => "UNLOCK",
        }
    }
}

// translate method into our own enum that has webdav methods as well.
// POST and PATCH are not part of the protocol surface.
pub(crate) fn dav_method(m: &http::Method) -> DavResult<DavMethod> {
    let m = match *m {
        http::Method::HEAD => DavMethod::Head,
        http::Method::GET => DavMethod::Get,
        http::Method::PUT => DavMethod::Put,
        http::Method::DELETE => DavMethod::Delete,
        http::Method::OPTIONS => DavMethod::Options,
        _ => match m.as_str() {
            "PROPFIND" => DavMethod::PropFind,
            "PROPPATCH" => DavMethod::PropPatch,
            "MKCOL" => DavMethod::MkCol,
            "COPY" => DavMethod::Copy,
            "MOVE" => DavMethod::Move,
            "LOCK" => DavMethod::Lock,
            "UNLOCK" => DavMethod::Unlock,
            _ => return Err(DavError::MethodNotAllowed),
        },
    };
    Ok(m)
}

// for external use.
impl std::convert::TryFrom<&http::Method> for DavMethod {
    type Error = InvalidMethod;

    fn try_from(value: &http::Method) -> Result<Self, Self::Error> {
        dav_method(value).map_err(|_| invalid_method())
    }
}

// A trick to get at the value of http::method::InvalidMethod.
fn invalid_method() -> InvalidMethod {
    match http::Method::from_bytes(b"") {
        Err(e) => e,
        Ok(_) => unreachable!(),
    }
}

/// A set of allowed [`DavMethod`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DavMethodSet(u32);

impl Default for DavMethodSet {
    fn default() -> Self {
        DavMethodSet::all()
    }
}

impl DavMethodSet {
    /// New set, all methods allowed.
    pub fn all() -> DavMethodSet {
        DavMethodSet(0xffffffff)
    }

    /// New empty set.
    pub fn none() -> DavMethodSet {
        DavMethodSet(0)
    }

    /// Add a method.
    pub fn add(&mut self, m: DavMethod) -> &Self {
        self.0 |= m as u32;
        self
    }

    /// Remove a method.
    pub fn remove(&mut self, m: DavMethod) -> &Self {
        self.0 &= !(m as u32);
        self
    }

    /// Check if a method is in the set.
    pub fn contains(&self, m: DavMethod) -> bool {
        self.0 & (m as u32) > 0
    }

    /// Generate an DavMethodSet from a list of words.
    pub fn from_vec(v: Vec<impl AsRef<str>>) -> Result<DavMethodSet, InvalidMethod> {
        const HTTP_RO: u32 = DavMethod::Get as u32 | DavMethod::Head as u32 | DavMethod::Options as u32;
        const HTTP_RW: u32 = HTTP_RO | DavMethod::Put as u32;
        const WEBDAV_RO: u32 = HTTP_RO | DavMethod::PropFind as u32;
        const WEBDAV_RW: u32 = 0xffffffff;

        let mut m: u32 = 0;
        for w in &v {
            m |= match w.as_ref().to_lowercase().as_str() {
                "head" => DavMethod::Head as u32,
                "get" => DavMethod::Get as u32,
                "put" => DavMethod::Put as u32,
                "delete" => DavMethod::Delete as u32,
                "options" => DavMethod::Options as u32,
                "propfind" => DavMethod::PropFind as u32,
                "proppatch" => DavMethod::PropPatch as u32,
                "mkcol" => DavMethod::MkCol as u32,
                "copy" => DavMethod::Copy as u32,
                "move" => DavMethod::Move as u32,
                "lock" => DavMethod::Lock as u32,
                "unlock" => DavMethod::Unlock as u32,
                "http-ro" => HTTP_RO,
                "http-rw" => HTTP_RW,
                "webdav-ro" => WEBDAV_RO,
                "webdav-rw" => WEBDAV_RW,
                _ => return Err(invalid_method()),
            };
        }
        Ok(DavMethodSet(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods() {
        let propfind = http::Method::from_bytes(b"PROPFIND").unwrap();
        assert_eq!(dav_method(&propfind).unwrap(), DavMethod::PropFind);
        assert!(dav_method(&http::Method::POST).is_err());
        assert!(dav_method(&http::Method::PATCH).is_err());
        let frob = http::Method::from_bytes(b"FROB").unwrap();
        assert!(dav_method(&frob).is_err());
    }

    #[test]
    fn method_set() {
        let set = DavMethodSet::from_vec(vec!["webdav-ro"]).unwrap();
        assert!(set.contains(DavMethod::PropFind));
        assert!(set.contains(DavMethod::Head));
        assert!(!set.contains(DavMethod::Put));
        assert!(DavMethodSet::from_vec(vec!["frob"]).is_err());

        let mut set = DavMethodSet::none();
        set.add(DavMethod::Get);
        assert!(set.contains(DavMethod::Get));
        set.remove(DavMethod::Get);
        assert!(!set.contains(DavMethod::Get));
    }
}
