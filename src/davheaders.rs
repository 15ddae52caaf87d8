use std::convert::TryFrom;
use std::fmt::Display;
use std::str::FromStr;

use headers::Header;
use http::header::{HeaderName, HeaderValue};

use crate::fs::DavMetaData;
use crate::httpdate;

pub static DEPTH: HeaderName = HeaderName::from_static("depth");
pub static OVERWRITE: HeaderName = HeaderName::from_static("overwrite");
pub static DESTINATION: HeaderName = HeaderName::from_static("destination");
pub static IF: HeaderName = HeaderName::from_static("if");

// helper.
fn one<'i, I>(values: &mut I) -> Result<&'i HeaderValue, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(invalid)?;
    if values.next().is_some() {
        Err(invalid())
    } else {
        Ok(v)
    }
}

// helper
fn invalid() -> headers::Error {
    headers::Error::invalid()
}

// helper
fn map_invalid(_e: impl std::error::Error) -> headers::Error {
    headers::Error::invalid()
}

// Plain string-valued headers. A value that cannot be represented as a
// HeaderValue is not sent.
macro_rules! header {
    ($tname:ident, $hname:ident, $sname:expr) => {
        pub static $hname: HeaderName = HeaderName::from_static($sname);

        #[derive(Debug, Clone, PartialEq)]
        pub struct $tname(pub String);

        impl Header for $tname {
            fn name() -> &'static HeaderName {
                &$hname
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
            where
                I: Iterator<Item = &'i HeaderValue>,
            {
                one(values)?
                    .to_str()
                    .map(|x| $tname(x.to_owned()))
                    .map_err(map_invalid)
            }

            fn encode<E>(&self, values: &mut E)
            where
                E: Extend<HeaderValue>,
            {
                if let Ok(value) = HeaderValue::from_str(&self.0) {
                    values.extend(std::iter::once(value))
                }
            }
        }
    };
}

header!(Dav, DAV, "dav");
header!(MsAuthorVia, MS_AUTHOR_VIA, "ms-author-via");
header!(AllowRanges, ALLOW_RANGES, "allow-ranges");
header!(XSendFile, X_SENDFILE, "x-sendfile");
header!(XAccelRedirect, X_ACCEL_REDIRECT, "x-accel-redirect");
header!(XAccelCharset, X_ACCEL_CHARSET, "x-accel-charset");

/// Depth: header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    /// Does this depth include resources `level` steps below the start.
    pub fn includes(self, level: u32) -> bool {
        match self {
            Depth::Zero => level == 0,
            Depth::One => level <= 1,
            Depth::Infinity => true,
        }
    }
}

impl Header for Depth {
    fn name() -> &'static HeaderName {
        &DEPTH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?.to_str().map_err(map_invalid)?.trim();
        match value {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            v if v.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
            _ => Err(invalid()),
        }
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match *self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}

/// Destination: header, unparsed. It is either an absolute URI
/// or an absolute path.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination(pub String);

impl Header for Destination {
    fn name() -> &'static HeaderName {
        &DESTINATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let s = one(values)?.to_str().map_err(map_invalid)?.trim();
        Ok(Destination(s.to_string()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overwrite(pub bool);

impl Header for Overwrite {
    fn name() -> &'static HeaderName {
        &OVERWRITE
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let line = one(values)?;
        match line.as_bytes() {
            b"F" => Ok(Overwrite(false)),
            b"T" => Ok(Overwrite(true)),
            _ => Err(invalid()),
        }
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match self.0 {
            true => "T",
            false => "F",
        };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}

/// Entity tag. `tag` is the opaque part, without quotes.
#[derive(Debug, Clone)]
pub struct ETag {
    tag:  String,
    weak: bool,
}

impl ETag {
    pub fn new(weak: bool, t: impl Into<String>) -> Result<ETag, headers::Error> {
        let tag = t.into();
        if tag.contains('\"') {
            Err(invalid())
        } else {
            Ok(ETag { tag, weak })
        }
    }

    pub fn from_meta(meta: &dyn DavMetaData) -> Option<ETag> {
        ETag::new(false, meta.etag()?).ok()
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Weak comparison: only the opaque tags are compared.
    pub fn weak_eq(&self, other: &ETag) -> bool {
        self.tag == other.tag
    }
}

impl FromStr for ETag {
    type Err = headers::Error;

    fn from_str(t: &str) -> Result<Self, Self::Err> {
        let (weak, s) = match t.strip_prefix("W/") {
            Some(s) => (true, s),
            None => (false, t),
        };
        if s.len() >= 2 && s.starts_with('\"') && s.ends_with('\"') && !s[1..s.len() - 1].contains('\"') {
            Ok(ETag {
                tag: s[1..s.len() - 1].to_owned(),
                weak,
            })
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<&HeaderValue> for ETag {
    type Error = headers::Error;

    fn try_from(value: &HeaderValue) -> Result<Self, Self::Error> {
        let s = value.to_str().map_err(map_invalid)?;
        ETag::from_str(s)
    }
}

impl Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.tag)
        } else {
            write!(f, "\"{}\"", self.tag)
        }
    }
}

/// Strong comparison.
impl PartialEq for ETag {
    fn eq(&self, other: &Self) -> bool {
        !self.weak && !other.weak && self.tag == other.tag
    }
}

impl Header for ETag {
    fn name() -> &'static HeaderName {
        &http::header::ETAG
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?;
        ETag::try_from(value)
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(value) = HeaderValue::from_str(&self.to_string()) {
            values.extend(std::iter::once(value))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ETagList {
    Tags(Vec<ETag>),
    Star,
}

impl ETagList {
    /// `*` matches any tag, otherwise tags are compared weakly.
    pub fn matches(&self, etag: &ETag) -> bool {
        match self {
            ETagList::Star => true,
            ETagList::Tags(tags) => tags.iter().any(|t| t.weak_eq(etag)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfMatch(pub ETagList);

#[derive(Debug, Clone, PartialEq)]
pub struct IfNoneMatch(pub ETagList);

// Decode a list of etags. This is not entirely correct, we should
// actually use a real parser. E.g. we don't handle comma's in
// etags correctly - but we never generated those anyway.
fn decode_etaglist<'i, I>(values: &mut I) -> Result<ETagList, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let mut v = Vec::new();
    let mut count = 0usize;
    for value in values {
        let s = value.to_str().map_err(map_invalid)?;
        if s.trim() == "*" {
            return Ok(ETagList::Star);
        }
        for t in s.split(',') {
            // Simply skip misformed etags, they will never match.
            if let Ok(t) = ETag::from_str(t.trim()) {
                v.push(t);
            }
        }
        count += 1;
    }
    if count != 0 {
        Ok(ETagList::Tags(v))
    } else {
        Err(invalid())
    }
}

fn encode_etaglist<E>(m: &ETagList, values: &mut E)
where
    E: Extend<HeaderValue>,
{
    let value = match *m {
        ETagList::Star => "*".to_string(),
        ETagList::Tags(ref t) => t.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        values.extend(std::iter::once(value))
    }
}

impl Header for IfMatch {
    fn name() -> &'static HeaderName {
        &http::header::IF_MATCH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        Ok(IfMatch(decode_etaglist(values)?))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_etaglist(&self.0, values)
    }
}

impl Header for IfNoneMatch {
    fn name() -> &'static HeaderName {
        &http::header::IF_NONE_MATCH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        Ok(IfNoneMatch(decode_etaglist(values)?))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        encode_etaglist(&self.0, values)
    }
}

// The date conditionals are parsed leniently and kept as unix
// timestamps; `headers::IfModifiedSince` only accepts the three
// HTTP/1.1 formats.
macro_rules! date_header {
    ($tname:ident, $hname:path) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $tname(pub i64);

        impl Header for $tname {
            fn name() -> &'static HeaderName {
                &$hname
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
            where
                I: Iterator<Item = &'i HeaderValue>,
            {
                let s = one(values)?.to_str().map_err(map_invalid)?;
                httpdate::parse_http_date(s).map($tname).ok_or_else(invalid)
            }

            fn encode<E>(&self, values: &mut E)
            where
                E: Extend<HeaderValue>,
            {
                if let Some(s) = httpdate::timestamp_to_httpdate(self.0) {
                    if let Ok(value) = HeaderValue::from_str(&s) {
                        values.extend(std::iter::once(value))
                    }
                }
            }
        }
    };
}

date_header!(IfModifiedSince, http::header::IF_MODIFIED_SINCE);
date_header!(IfUnmodifiedSince, http::header::IF_UNMODIFIED_SINCE);

/// `If:` header (RFC 4918 10.4). The header holds if any of its lists
/// holds, a list holds if all of its conditions do.
#[derive(Debug, Clone, PartialEq)]
pub struct If(pub Vec<IfList>);

#[derive(Debug, Clone, PartialEq)]
pub struct IfList {
    /// Resource the list is about. `None` means the request target.
    pub resource_tag: Option<url::Url>,
    pub conditions:   Vec<IfCondition>,
}

/// `[Not] <state-token>` or `[Not] [etag]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfCondition {
    pub not:  bool,
    pub item: IfItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IfItem {
    StateToken(String),
    ETag(ETag),
}

struct IfParser<'a> {
    rest: &'a str,
}

impl<'a> IfParser<'a> {
    fn peek(&mut self) -> Option<char> {
        self.rest = self.rest.trim_start_matches([' ', '\t', '\r', '\n']);
        self.rest.chars().next()
    }

    fn eat(&mut self, word: &str) -> bool {
        self.peek();
        match self.rest.strip_prefix(word) {
            Some(rest) => {
                self.rest = rest;
                true
            },
            None => false,
        }
    }

    // text between `open` and `close`, which may not contain whitespace.
    fn delimited(&mut self, open: &str, close: char) -> Result<&'a str, headers::Error> {
        if !self.eat(open) {
            return Err(invalid());
        }
        let end = self.rest.find(close).ok_or_else(invalid)?;
        let inner = &self.rest[..end];
        if inner.is_empty() || inner.contains(char::is_whitespace) {
            return Err(invalid());
        }
        self.rest = &self.rest[end + 1..];
        Ok(inner)
    }

    fn list(&mut self, resource_tag: Option<url::Url>) -> Result<IfList, headers::Error> {
        if !self.eat("(") {
            return Err(invalid());
        }
        let mut conditions = Vec::new();
        loop {
            let not = self.eat("Not");
            let item = match self.peek() {
                Some('<') => {
                    let token = self.delimited("<", '>')?;
                    // a Coded-URL, so at least a scheme.
                    if !token.contains(':') {
                        return Err(invalid());
                    }
                    IfItem::StateToken(token.to_string())
                },
                Some('[') => IfItem::ETag(self.delimited("[", ']')?.parse()?),
                Some(')') if !not => break,
                _ => return Err(invalid()),
            };
            conditions.push(IfCondition { not, item });
        }
        self.eat(")");
        if conditions.is_empty() {
            return Err(invalid());
        }
        Ok(IfList {
            resource_tag,
            conditions,
        })
    }
}

impl Header for If {
    fn name() -> &'static HeaderName {
        &IF
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let mut parser = IfParser {
            rest: one(values)?.to_str().map_err(map_invalid)?,
        };
        let mut lists = Vec::new();
        while let Some(c) = parser.peek() {
            let tag = match c {
                '<' => Some(url::Url::parse(parser.delimited("<", '>')?).map_err(map_invalid)?),
                _ => None,
            };
            lists.push(parser.list(tag)?);
        }
        if lists.is_empty() {
            return Err(invalid());
        }
        Ok(If(lists))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        if let Ok(value) = HeaderValue::from_str(&self.to_string()) {
            values.extend(std::iter::once(value))
        }
    }
}

impl Display for If {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, list) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if let Some(ref tag) = list.resource_tag {
                write!(f, "<{}> ", tag)?;
            }
            write!(f, "(")?;
            for (j, cond) in list.conditions.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                if cond.not {
                    write!(f, "Not ")?;
                }
                match cond.item {
                    IfItem::StateToken(ref t) => write!(f, "<{}>", t)?,
                    IfItem::ETag(ref t) => write!(f, "[{}]", t)?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
