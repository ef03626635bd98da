// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin client over the remote content-addressed repository API: branch/commit resolution,
//! directory listing, and raw file download, all scoped to a single fixed revision.

use crate::errors::RemoteError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

pub struct RemoteClient {
    host: String,
    owner: String,
    repo: String,
    client: Client,
    listing_cache: Mutex<HashMap<(String, bool), Vec<RemoteEntry>>>,
}

impl RemoteClient {
    pub fn new(host: String, owner: String, repo: String) -> Self {
        RemoteClient {
            host,
            owner,
            repo,
            client: Client::builder()
                .user_agent("dagshub-streamfs")
                .build()
                .expect("failed to configure http client"),
            listing_cache: Mutex::new(HashMap::new()),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/repos/{}/{}{}",
            self.host.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }

    fn authed(&self, url: &str, token: &str) -> reqwest::blocking::RequestBuilder {
        self.client.get(url).bearer_auth(token)
    }

    #[tracing::instrument(level = "trace", skip(self, token))]
    pub fn resolve_branch(&self, branch: &str, token: &str) -> Result<String, RemoteError> {
        let url = self.api_url(&format!("/branches/{branch}"));
        let resp = self.authed(&url, token).send()?;
        if resp.status() != StatusCode::OK {
            return Err(RemoteError::RevisionNotFound(branch.to_string()));
        }
        let bytes = resp.bytes()?;
        let body: BranchResponse =
            serde_json::from_slice(&bytes).map_err(RemoteError::MalformedResponse)?;
        Ok(body.commit.id)
    }

    #[tracing::instrument(level = "trace", skip(self, token))]
    pub fn commit_exists(&self, sha: &str, token: &str) -> Result<bool, RemoteError> {
        let url = self.api_url(&format!("/commits/{sha}"));
        let resp = self.authed(&url, token).send()?;
        Ok(resp.status() == StatusCode::OK)
    }

    /// Lists the contents of `relpath` at `revision`. Responses are cached by
    /// `(relpath, include_size)`; a previously cached `include_size=true` listing also
    /// satisfies a later `include_size=false` request for the same path, since it is strictly
    /// a superset of the information needed.
    #[tracing::instrument(level = "trace", skip(self, token))]
    pub fn list_dir(
        &self,
        revision: &str,
        relpath: &str,
        include_size: bool,
        token: &str,
    ) -> Result<Vec<RemoteEntry>, RemoteError> {
        {
            let mut cache = self.listing_cache.lock().unwrap();
            if !include_size {
                if let Some(with_size) = cache.get(&(relpath.to_string(), true)).cloned() {
                    cache.insert((relpath.to_string(), false), with_size);
                }
            }
            if let Some(cached) = cache.get(&(relpath.to_string(), include_size)) {
                return Ok(cached.clone());
            }
        }

        let mut url = self.api_url(&format!("/content/{revision}/{relpath}"));
        if include_size {
            url.push_str("?include_size=true");
        }
        let resp = self.authed(&url, token).send()?;
        let entries = match resp.status() {
            StatusCode::OK => {
                let bytes = resp.bytes()?;
                serde_json::from_slice::<Vec<RemoteEntry>>(&bytes)
                    .map_err(RemoteError::MalformedResponse)?
            }
            StatusCode::NOT_FOUND => return Err(RemoteError::NotFound),
            status => return Err(RemoteError::UnexpectedStatus(status)),
        };

        self.listing_cache
            .lock()
            .unwrap()
            .insert((relpath.to_string(), include_size), entries.clone());
        Ok(entries)
    }

    /// Downloads the raw bytes of `relpath` at `revision`. Returns `Ok(None)` on 404.
    #[tracing::instrument(level = "trace", skip(self, token))]
    pub fn fetch_file(
        &self,
        revision: &str,
        relpath: &str,
        token: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        let url = self.api_url(&format!("/raw/{revision}/{relpath}"));
        let resp = self.authed(&url, token).send()?;
        match resp.status() {
            StatusCode::OK => Ok(Some(resp.bytes()?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(RemoteError::UnexpectedStatus(status)),
        }
    }
}

#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    id: String,
}
