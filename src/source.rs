//! Raw text acquisition.
//!
//! A ledger arrives from a local file, stdin (`-`), or an HTTP(S) URL. This is
//! the only blocking boundary of a load; there is no retry and no partial
//! result. Any failure is reported as [`LoadError::SourceUnavailable`].

use std::{
    fmt,
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Stdin,
    Url(String),
}

impl Source {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed == "-" {
            Source::Stdin
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Source::Url(trimmed.to_string())
        } else {
            Source::Path(PathBuf::from(trimmed))
        }
    }

    /// Path used for extension-based delimiter detection, if any.
    pub fn path_hint(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path.as_path()),
            Source::Url(url) => Some(Path::new(url.rsplit('/').next().unwrap_or(url.as_str()))),
            Source::Stdin => None,
        }
    }

    pub fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        debug!("Fetching ledger from {self}");
        match self {
            Source::Path(path) => {
                fs::read(path).map_err(|err| LoadError::unavailable(self.to_string(), err))
            }
            Source::Stdin => {
                let mut buf = Vec::new();
                std::io::stdin()
                    .lock()
                    .read_to_end(&mut buf)
                    .map_err(|err| LoadError::unavailable(self.to_string(), err))?;
                Ok(buf)
            }
            Source::Url(url) => fetch_url(url),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Stdin => f.write_str("stdin"),
            Source::Url(url) => f.write_str(url),
        }
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>, LoadError> {
    let response = reqwest::blocking::get(url).map_err(|err| LoadError::unavailable(url, err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::unavailable(url, format!("HTTP status {status}")));
    }
    let body = response
        .bytes()
        .map_err(|err| LoadError::unavailable(url, err))?;
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_each_kind() {
        assert_eq!(Source::parse("-"), Source::Stdin);
        assert_eq!(
            Source::parse("https://example.com/ledger.csv"),
            Source::Url("https://example.com/ledger.csv".to_string())
        );
        assert_eq!(
            Source::parse("exports/ledger.tsv"),
            Source::Path(PathBuf::from("exports/ledger.tsv"))
        );
    }

    #[test]
    fn url_path_hint_uses_last_segment() {
        let source = Source::parse("https://example.com/files/ledger.tsv");
        assert_eq!(source.path_hint(), Some(Path::new("ledger.tsv")));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let source = Source::parse("/definitely/not/here/ledger.csv");
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("ledger.csv"));
    }
}
