//! Error types for a sync run.
//!
//! Every variant is terminal for the run: nothing is retried, and mutations
//! already applied to the destination folder are left in place.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::frontmatter::FrontMatterError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Duplicate names detected: {}", .0.join(", "))]
    DuplicateNames(Vec<String>),

    #[error("contact {uid} has no display name")]
    MissingName { uid: String },

    #[error("contacts `{first}` and `{second}` would both be written as `{stem}`")]
    FileNameClash {
        stem: String,
        first: String,
        second: String,
    },

    #[error("failed to fetch address book from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("CardDAV server at {url} answered with status {status}{}", auth_hint(.status))]
    FetchStatus { url: String, status: u16 },

    #[error("malformed CardDAV response: {0}")]
    MalformedResponse(String),

    #[error("failed to decode vCard data: {0}")]
    Decode(String),

    #[error("invalid front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("uid {uid} is used by both {first} and {second}")]
    DuplicateLocalUid {
        uid: String,
        first: String,
        second: String,
    },

    #[error("refusing to overwrite {}, which belongs to another contact", .path.display())]
    NameTaken { path: PathBuf },

    #[error("cannot create {filename} for contact {uid}: the file still belongs to contact {holder}")]
    NameHeld {
        filename: String,
        uid: String,
        holder: String,
    },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn auth_hint(status: &u16) -> &'static str {
    match *status {
        401 | 403 => "; check the CARDDAV_USER and CARDDAV_PW credentials",
        _ => "",
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> String {
        Error::FetchStatus {
            url: "https://dav.example.com/".into(),
            status: code,
        }
        .to_string()
    }

    #[test]
    fn test_auth_failures_mention_credentials() {
        for code in [401, 403] {
            let message = status(code);
            assert!(message.contains(&code.to_string()), "{message}");
            assert!(message.contains("CARDDAV_USER"), "{message}");
            assert!(message.contains("CARDDAV_PW"), "{message}");
        }
    }

    #[test]
    fn test_other_statuses_have_no_hint() {
        assert_eq!(
            status(500),
            "CardDAV server at https://dav.example.com/ answered with status 500"
        );
    }
}
