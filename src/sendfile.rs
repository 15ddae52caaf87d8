//! Accelerated transfer through the front-end web server.
//!
//! Instead of streaming file content, a GET can answer with an empty body
//! and a header telling the front-end server (Apache mod_xsendfile, or
//! nginx) which file to send.
use std::error::Error;
use std::path::Path;
use std::str::FromStr;

use headers::HeaderMapExt;
use http::HeaderMap;
use percent_encoding as pct;

use crate::davheaders::{XAccelCharset, XAccelRedirect, XSendFile};

/// How to hand off file transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFile {
    /// `X-SendFile: <absolute path>`, optionally percent-escaped.
    XSendFile { escape: bool },
    /// `X-Accel-Redirect: <prefix><absolute path>`.
    XAccelRedirect { prefix: String },
}

/// Error returned when a sendfile setting is not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSendFile(String);

impl Error for InvalidSendFile {}

impl std::fmt::Display for InvalidSendFile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "invalid sendfile setting: {:?}", self.0)
    }
}

// like PATH_ENCODE_SET, but '~' is escaped as well.
const ESCAPE_SET: &pct::AsciiSet = &pct::NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'/');

/// Parses the setting strings `"x-sendfile"`, `"x-sendfile escape"`
/// and `"x-accel-redir <prefix>"`. The keyword is case-insensitive.
impl FromStr for SendFile {
    type Err = InvalidSendFile;

    fn from_str(s: &str) -> Result<SendFile, InvalidSendFile> {
        let words = s.split_whitespace().collect::<Vec<_>>();
        match words.as_slice() {
            [kw] if kw.eq_ignore_ascii_case("x-sendfile") => Ok(SendFile::XSendFile { escape: false }),
            [kw, "escape"] if kw.eq_ignore_ascii_case("x-sendfile") => Ok(SendFile::XSendFile { escape: true }),
            [kw, prefix] if kw.eq_ignore_ascii_case("x-accel-redir") => Ok(SendFile::XAccelRedirect {
                prefix: prefix.to_string(),
            }),
            _ => Err(InvalidSendFile(s.to_string())),
        }
    }
}

impl SendFile {
    /// Add the transfer headers for the file at `full_path`.
    pub(crate) fn add_headers(&self, full_path: &Path, headers: &mut HeaderMap) {
        let full_path = full_path.to_string_lossy();
        match self {
            SendFile::XSendFile { escape } => {
                let value = if *escape {
                    pct::utf8_percent_encode(&full_path, ESCAPE_SET).to_string()
                } else {
                    full_path.to_string()
                };
                headers.typed_insert(XSendFile(value));
            },
            SendFile::XAccelRedirect { prefix } => {
                let value = format!("{}{}", prefix.trim_end_matches('/'), full_path);
                headers.typed_insert(XAccelRedirect(value));
                headers.typed_insert(XAccelCharset("utf-8".to_string()));
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!("x-sendfile".parse::<SendFile>().unwrap(), SendFile::XSendFile { escape: false });
        assert_eq!("X-SendFile escape".parse::<SendFile>().unwrap(), SendFile::XSendFile { escape: true });
        assert_eq!(
            " x-accel-redir   /protected/ ".parse::<SendFile>().unwrap(),
            SendFile::XAccelRedirect {
                prefix: "/protected/".to_string()
            }
        );
        assert!("x-accel-redir".parse::<SendFile>().is_err());
        assert!("".parse::<SendFile>().is_err());
        assert!("x-sendfile now".parse::<SendFile>().is_err());
    }

    #[test]
    fn headers() {
        let mut h = HeaderMap::new();
        SendFile::XSendFile { escape: true }.add_headers(Path::new("/srv/a b~.txt"), &mut h);
        assert_eq!(h.get("x-sendfile").unwrap(), "/srv/a%20b%7E.txt");

        let mut h = HeaderMap::new();
        let sf = SendFile::XAccelRedirect {
            prefix: "/protected/".to_string(),
        };
        sf.add_headers(Path::new("/srv/a.txt"), &mut h);
        assert_eq!(h.get("x-accel-redirect").unwrap(), "/protected/srv/a.txt");
        assert_eq!(h.get("x-accel-charset").unwrap(), "utf-8");
    }
}
