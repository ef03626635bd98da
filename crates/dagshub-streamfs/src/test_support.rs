// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a mock remote server, a scratch credential cache, and an installed
//! [`Mount`] together, so end-to-end tests can exercise the virtual filesystem without a real
//! network or a real `~/.cache` directory.

use crate::credentials::CredentialStore;
use crate::mount::{Mount, RevisionSpec};
use dagshub_streamfs_mock_server::MockServer;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) const OWNER: &str = "owner";
pub(crate) const REPO: &str = "repo";
pub(crate) const REVISION: &str = "0123456789abcdef0123456789abcdef01234567";
pub(crate) const TOKEN: &str = "test-token";

pub(crate) struct TestEnvironment {
    root: TempDir,
    _cache_dir: TempDir,
    server: MockServer,
    mount: Arc<Mount>,
}

impl TestEnvironment {
    pub(crate) fn with() -> TestEnvironmentBuilder {
        TestEnvironmentBuilder {
            builder: dagshub_streamfs_mock_server::new(OWNER, REPO, REVISION).add_token(TOKEN, "tester"),
        }
    }

    pub(crate) fn prepare() -> Self {
        Self::with().prepare()
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    pub(crate) fn server(&self) -> &MockServer {
        &self.server
    }

    pub(crate) fn credentials(&self) -> &'static CredentialStore {
        self.mount.credentials_for_test()
    }
}

pub(crate) struct TestEnvironmentBuilder {
    builder: dagshub_streamfs_mock_server::Builder,
}

impl TestEnvironmentBuilder {
    pub(crate) fn file(mut self, path: &str, contents: &str) -> Self {
        self.builder = self.builder.add_file(path, contents);
        self
    }

    pub(crate) fn dir(mut self, path: &str) -> Self {
        self.builder = self.builder.add_dir(path);
        self
    }

    pub(crate) fn branch(mut self, name: &str, commit: &str) -> Self {
        self.builder = self.builder.add_branch(name, commit);
        self
    }

    pub(crate) fn prepare(self) -> TestEnvironment {
        let server = self.builder.start();
        let root = tempfile::tempdir().expect("create mount root");
        let cache_dir = tempfile::tempdir().expect("create cache dir");

        let credentials: &'static CredentialStore = Box::leak(Box::new(CredentialStore::new(
            cache_dir.path().join("tokens.yml"),
            server.url(),
        )));
        credentials
            .add_app_token(TOKEN, &server.url())
            .expect("seed test token");

        let mount = Mount::with_credentials(
            root.path().to_path_buf(),
            server.url(),
            OWNER.to_string(),
            REPO.to_string(),
            RevisionSpec::Commit(REVISION.to_string()),
            credentials,
        );
        mount.install().expect("install test mount");

        TestEnvironment {
            root,
            _cache_dir: cache_dir,
            server,
            mount,
        }
    }
}
