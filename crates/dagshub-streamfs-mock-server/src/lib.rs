// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

mod handlers;
mod server;

pub use crate::server::MockServer;
use std::collections::HashMap;

#[derive(Clone)]
pub struct RemoteEntry {
    pub path: String,
    pub kind: &'static str,
    pub size: Option<u64>,
}

pub struct Data {
    pub owner: String,
    pub repo: String,
    pub revision: String,
    /// Known-good bearer tokens mapped to the login they authenticate as.
    pub tokens: HashMap<String, String>,
    /// Directory contents keyed by relative path (empty string is the repo root).
    pub listings: HashMap<String, Vec<RemoteEntry>>,
    /// Raw file contents keyed by relative path.
    pub files: HashMap<String, Vec<u8>>,
    /// Branches resolvable to a commit id.
    pub branches: HashMap<String, String>,
    /// Tokens that still pass `/api/v1/user` but are rejected by `content`/`raw`, so tests
    /// can exercise a 401 surfacing from an in-flight remote operation rather than from the
    /// credential store's own up-front validation call.
    pub revoked_for_content: std::collections::HashSet<String>,
}

pub fn new(owner: &str, repo: &str, revision: &str) -> Builder {
    Builder {
        data: Data {
            owner: owner.to_string(),
            repo: repo.to_string(),
            revision: revision.to_string(),
            tokens: HashMap::new(),
            listings: HashMap::new(),
            files: HashMap::new(),
            branches: HashMap::new(),
            revoked_for_content: std::collections::HashSet::new(),
        },
    }
}

pub struct Builder {
    data: Data,
}

impl Builder {
    pub fn add_token(mut self, token: &str, login: &str) -> Self {
        self.data.tokens.insert(token.into(), login.into());
        self
    }

    pub fn add_file(mut self, relpath: &str, contents: impl Into<Vec<u8>>) -> Self {
        let contents = contents.into();
        let dir = parent_of(relpath);
        self.data
            .listings
            .entry(dir)
            .or_default()
            .push(RemoteEntry {
                path: relpath.to_string(),
                kind: "file",
                size: Some(contents.len() as u64),
            });
        self.data.files.insert(relpath.to_string(), contents);
        self
    }

    pub fn add_dir(mut self, relpath: &str) -> Self {
        let dir = parent_of(relpath);
        self.data
            .listings
            .entry(dir)
            .or_default()
            .push(RemoteEntry {
                path: relpath.to_string(),
                kind: "dir",
                size: None,
            });
        self.data.listings.entry(relpath.to_string()).or_default();
        self
    }

    pub fn add_branch(mut self, name: &str, commit: &str) -> Self {
        self.data.branches.insert(name.into(), commit.into());
        self
    }

    pub fn start(self) -> MockServer {
        MockServer::spawn(self.data)
    }
}

fn parent_of(relpath: &str) -> String {
    match relpath.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}
