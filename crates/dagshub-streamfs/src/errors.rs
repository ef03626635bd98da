// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

/// We're using a custom error enum instead of `Box<dyn Error>` because callers need to
/// distinguish the handful of error kinds the rest of the crate cares about (not-found,
/// auth, mount conflicts) from everything else, and `Box<dyn Error>` makes it too easy to
/// accidentally bubble up a library error without wrapping it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found")]
    NotFound,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Mount(#[from] MountError),

    #[error("could not detect the cache directory")]
    CouldNotDetectCacheDirectory,

    #[error("creating `{}`", .0.display())]
    Create(PathBuf, #[source] std::io::Error),
    #[error("writing to `{}`", .0.display())]
    Write(PathBuf, #[source] std::io::Error),
    #[error("reading from `{}`", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> std::io::Error {
        match err {
            Error::NotFound => std::io::Error::new(std::io::ErrorKind::NotFound, err),
            Error::Remote(RemoteError::NotFound) => {
                std::io::Error::new(std::io::ErrorKind::NotFound, err)
            }
            Error::Credential(_) => {
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, err)
            }
            Error::Io(inner) => inner,
            other => std::io::Error::other(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network request failed")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("malformed response body")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("revision `{0}` does not exist on the remote")]
    RevisionNotFound(String),
    #[error("path does not exist at this revision")]
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no valid token found for host `{0}`")]
    NoToken(String),
    #[error("token failed validation against the remote")]
    InvalidToken,
    #[error("interactive authentication is unavailable")]
    NoInteractiveAuth,
    #[error("token cache at `{}` uses an unsupported schema version `{1}`", .0.display())]
    UnsupportedCacheVersion(PathBuf, String),
    #[error("failed to read token cache at `{}`", .0.display())]
    CacheRead(PathBuf, #[source] std::io::Error),
    #[error("failed to write token cache at `{}`", .0.display())]
    CacheWrite(PathBuf, #[source] std::io::Error),
    #[error("failed to parse token cache at `{}`", .0.display())]
    CacheParse(PathBuf, #[source] serde_yaml::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("a filesystem is already mounted at `{}`", .0.display())]
    AlreadyMountedHere(PathBuf),
    #[error("path `{}` is not below any mounted filesystem", .0.display())]
    NotMounted(PathBuf),
    #[error("no git repository found at or above `{}`", .0.display())]
    NoGitRepository(PathBuf),
    #[error("no DagsHub remote configured and none detected in `.git/config`")]
    NoRemoteConfigured,
}
