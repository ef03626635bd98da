// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The virtual filesystem instance: one per mounted repository revision. Owns the local mount
//! root, the resolved revision, and the directory-listing snapshot that `listdir`/`scandir`
//! populate and `stat`/`open` consult.

use crate::credentials::CredentialStore;
use crate::errors::{Error, MountError, RemoteError};
use crate::remote::{EntryKind, RemoteClient, RemoteEntry};
use crate::sentinel;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Lifecycle of a [`Mount`], tracked to make repeated install/uninstall calls idempotent and
/// to reject operations on a mount that was never installed or already torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    RevisionResolved,
    HooksInstalled,
    HooksUninstalled,
}

/// How a revision was specified when the mount was created.
pub enum RevisionSpec {
    /// Track a named branch, re-resolved to its current tip commit at install time.
    Branch(String),
    /// Pin to a fixed commit SHA.
    Commit(String),
    /// Resolve from the local repository's current `HEAD`, following a symbolic ref to a
    /// branch when possible and falling back to the detached SHA otherwise.
    LocalHead,
}

pub struct Mount {
    root: PathBuf,
    host: String,
    owner: String,
    repo: String,
    revision_spec: RevisionSpec,
    remote: RemoteClient,
    credentials: &'static CredentialStore,
    revision: Mutex<Option<String>>,
    lifecycle: Mutex<Lifecycle>,
    dir_snapshot: Mutex<HashMap<PathBuf, Vec<DirEntryInfo>>>,
}

impl Mount {
    /// Creates a mount backed by the process-wide credential store. This is the entry point
    /// application code normally calls.
    pub fn new(
        root: PathBuf,
        host: String,
        owner: String,
        repo: String,
        revision_spec: RevisionSpec,
    ) -> Arc<Mount> {
        Self::with_credentials(root, host, owner, repo, revision_spec, crate::credentials::global())
    }

    /// Creates a mount against an explicit credential store, so tests can point a mount at a
    /// store backed by a mock server and a scratch cache directory instead of the real
    /// process-wide singleton.
    pub fn with_credentials(
        root: PathBuf,
        host: String,
        owner: String,
        repo: String,
        revision_spec: RevisionSpec,
        credentials: &'static CredentialStore,
    ) -> Arc<Mount> {
        let remote = RemoteClient::new(host.clone(), owner.clone(), repo.clone());
        Arc::new(Mount {
            root,
            host,
            owner,
            repo,
            revision_spec,
            remote,
            credentials,
            revision: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
            dir_snapshot: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub(crate) fn credentials_for_test(&self) -> &'static CredentialStore {
        self.credentials
    }

    /// Resolves the revision (following the configured [`RevisionSpec`]) and registers this
    /// mount with the process-wide path router. Calling this twice on the same instance is a
    /// no-op.
    #[tracing::instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    pub fn install(self: &Arc<Self>) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if *lifecycle != Lifecycle::Uninitialized {
            return Ok(());
        }

        let revision = self.resolve_revision()?;
        *self.revision.lock().unwrap() = Some(revision);
        *lifecycle = Lifecycle::RevisionResolved;

        crate::router::register(&self.root, self)?;
        *lifecycle = Lifecycle::HooksInstalled;
        Ok(())
    }

    /// Unregisters this mount from the router. Idempotent: uninstalling a mount that was
    /// never installed, or is already uninstalled, is not an error.
    pub fn uninstall(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if *lifecycle == Lifecycle::HooksInstalled {
            crate::router::unregister(&self.root);
        }
        *lifecycle = Lifecycle::HooksUninstalled;
    }

    fn revision(&self) -> String {
        self.revision
            .lock()
            .unwrap()
            .clone()
            .expect("mount must be installed before use")
    }

    fn token(&self) -> Result<String, Error> {
        Ok(self.credentials.get_token(&self.host, false)?)
    }

    /// Runs `op` with the current token; on a `401` response, invalidates that token and
    /// retries exactly once with a freshly acquired one before giving up.
    fn with_reauth<T>(&self, op: impl Fn(&str) -> Result<T, RemoteError>) -> Result<T, Error> {
        let token = self.token()?;
        match op(&token) {
            Err(RemoteError::UnexpectedStatus(status))
                if status == reqwest::StatusCode::UNAUTHORIZED =>
            {
                self.credentials.invalidate(&self.host, &token)?;
                let fresh = self.token()?;
                Ok(op(&fresh)?)
            }
            other => Ok(other?),
        }
    }

    /// Resolves `path` to the path relative to this mount's root, or `None` if `path` falls
    /// outside it (pass-through case: the caller should fall back to the real primitive).
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root).ok().map(PathBuf::from)
    }

    fn passthrough_path(&self, relpath: &Path) -> PathBuf {
        self.root.join(relpath)
    }

    fn resolve_revision(&self) -> Result<String, Error> {
        let token = self.token()?;
        match &self.revision_spec {
            RevisionSpec::Commit(sha) => {
                if self.remote.commit_exists(sha, &token)? {
                    Ok(sha.clone())
                } else {
                    Err(RemoteError::RevisionNotFound(sha.clone()).into())
                }
            }
            RevisionSpec::Branch(branch) => {
                Ok(self.remote.resolve_branch(branch, &token)?)
            }
            RevisionSpec::LocalHead => {
                let head = read_local_head(&self.root)?;
                match head {
                    LocalHead::Branch(branch) => Ok(self.remote.resolve_branch(&branch, &token)?),
                    LocalHead::Detached(sha) => {
                        if self.remote.commit_exists(&sha, &token)? {
                            Ok(sha)
                        } else {
                            Err(RemoteError::RevisionNotFound(sha).into())
                        }
                    }
                }
            }
        }
    }

    /// Opens `relpath` for reading, materializing it from the remote on first access. Write
    /// modes and the sentinel's own backing file are never proxied to the remote: a write-mode
    /// `open` is handed the real local path directly, since the remote has no write-back path.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn open(&self, relpath: &Path, opts: &OpenOptions) -> Result<OpenedFile, Error> {
        if sentinel::is_sentinel(relpath) {
            return Ok(OpenedFile::Sentinel(Cursor::new(sentinel::PAYLOAD)));
        }

        let local_path = self.passthrough_path(relpath);

        if is_reserved(relpath) || !opts.is_read_only() || local_path.exists() {
            return open_std(&local_path, opts).map(OpenedFile::Real);
        }

        let relpath_str = relpath.to_string_lossy().replace('\\', "/");
        let revision = self.revision();
        let bytes = self
            .with_reauth(|token| self.remote.fetch_file(&revision, &relpath_str, token))?
            .ok_or(Error::NotFound)?;

        crate::utils::write_atomic(&local_path, &bytes)?;
        open_std(&local_path, opts).map(OpenedFile::Real)
    }

    /// Returns metadata for `relpath` without requiring the file's bytes to be materialized
    /// locally first. A name discovered only via a cached directory listing reports the size
    /// (when known) or, for a directory entry, a directory-mode synthetic stat.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn stat(&self, relpath: &Path) -> Result<StatInfo, Error> {
        if sentinel::is_sentinel(relpath) {
            return Ok(StatInfo::Synthetic(SyntheticStat {
                is_dir: false,
                size: sentinel::PAYLOAD.len() as u64,
            }));
        }

        let local_path = self.passthrough_path(relpath);
        if let Ok(metadata) = fs::metadata(&local_path) {
            return Ok(StatInfo::Real(metadata));
        }

        if is_reserved(relpath) {
            return Err(Error::NotFound);
        }

        if let Some(entry) = self.cached_entry(relpath) {
            return Ok(StatInfo::Synthetic(SyntheticStat {
                is_dir: entry.is_dir,
                size: entry.size.unwrap_or(0),
            }));
        }

        let relpath_str = relpath.to_string_lossy().replace('\\', "/");
        let (parent, name) = split_parent(&relpath_str);
        let revision = self.revision();
        let entries = match self
            .with_reauth(|token| self.remote.list_dir(&revision, parent, true, token))
        {
            Ok(entries) => entries,
            Err(Error::Remote(RemoteError::NotFound)) => return Err(Error::NotFound),
            Err(e) => return Err(e),
        };
        let found = entries
            .iter()
            .find(|e| e.name() == name)
            .ok_or(Error::NotFound)?;

        Ok(StatInfo::Synthetic(SyntheticStat {
            is_dir: found.is_dir(),
            size: found.size.unwrap_or(0),
        }))
    }

    /// Lists `relpath`, unioning local entries (files already materialized, directories
    /// created for `chdir`) with the remote listing. Populates the directory snapshot used by
    /// `stat` for names that only exist remotely.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn listdir(&self, relpath: &Path, include_size: bool) -> Result<Vec<DirEntryInfo>, Error> {
        let local_path = self.passthrough_path(relpath);
        let mut by_name: HashMap<String, DirEntryInfo> = HashMap::new();
        let mut local_ok = false;

        if let Ok(read_dir) = fs::read_dir(&local_path) {
            local_ok = true;
            for entry in read_dir.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                let size = if is_dir {
                    None
                } else {
                    entry.metadata().ok().map(|m| m.len())
                };
                by_name.insert(name.clone(), DirEntryInfo { name, is_dir, size });
            }
        }

        let remote_entries = if is_reserved(relpath) {
            Vec::new()
        } else {
            let relpath_str = relpath.to_string_lossy().replace('\\', "/");
            let revision = self.revision();
            match self.with_reauth(|token| {
                self.remote
                    .list_dir(&revision, &relpath_str, include_size, token)
            }) {
                Ok(entries) => entries,
                // Both attempts failed: only an error if local listing didn't succeed either.
                Err(_) if local_ok => Vec::new(),
                Err(Error::Remote(RemoteError::NotFound)) => return Err(Error::NotFound),
                Err(e) => return Err(e),
            }
        };

        for remote_entry in &remote_entries {
            by_name
                .entry(remote_entry.name().to_string())
                .or_insert_with(|| DirEntryInfo {
                    name: remote_entry.name().to_string(),
                    is_dir: remote_entry.is_dir(),
                    size: remote_entry.size,
                });
        }

        if relpath.as_os_str().is_empty() {
            by_name.insert(
                sentinel::NAME.to_string(),
                DirEntryInfo {
                    name: sentinel::NAME.to_string(),
                    is_dir: false,
                    size: Some(sentinel::PAYLOAD.len() as u64),
                },
            );
        }

        let mut entries: Vec<DirEntryInfo> = by_name.into_values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let directory_typed: Vec<RemoteEntry> = remote_entries
            .into_iter()
            .filter(|e| e.kind == EntryKind::Dir)
            .collect();
        self.dir_snapshot.lock().unwrap().insert(
            relpath.to_path_buf(),
            directory_typed
                .iter()
                .map(|e| DirEntryInfo {
                    name: e.name().to_string(),
                    is_dir: true,
                    size: e.size,
                })
                .collect(),
        );

        Ok(entries)
    }

    /// Identical contract to `listdir`; kept as a separate entry point so callers mirroring a
    /// `scandir`-style streaming API (one entry fetched at a time in the original) have a name
    /// matching that intent even though this implementation returns the full vector eagerly.
    pub fn scandir(&self, relpath: &Path, include_size: bool) -> Result<Vec<DirEntryInfo>, Error> {
        self.listdir(relpath, include_size)
    }

    /// Materializes `relpath` as a local directory (creating it if only the remote knows about
    /// it) so that `std::env::set_current_dir` succeeds afterward.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn chdir(&self, relpath: &Path) -> Result<(), Error> {
        let local_path = self.passthrough_path(relpath);
        if local_path.is_dir() {
            return Ok(());
        }

        match self.stat(relpath) {
            Ok(StatInfo::Synthetic(SyntheticStat { is_dir: true, .. })) => {
                fs::create_dir_all(&local_path)
                    .map_err(|e| Error::Create(local_path.clone(), e))?;
                Ok(())
            }
            Ok(_) => Err(MountError::NotMounted(local_path).into()),
            Err(e) => Err(e),
        }
    }

    fn cached_entry(&self, relpath: &Path) -> Option<DirEntryInfo> {
        let name = relpath.file_name()?.to_string_lossy().to_string();
        let parent = relpath.parent().unwrap_or_else(|| Path::new(""));
        self.dir_snapshot
            .lock()
            .unwrap()
            .get(parent)
            .and_then(|entries| entries.iter().find(|e| e.name == name).cloned())
    }
}

/// Paths under these prefixes are never fetched from the remote, even on a local miss: they
/// belong to tooling (a local git checkout, a DVC cache) that has no remote-content
/// counterpart at this revision.
const RESERVED_PREFIXES: [&str; 2] = [".git/", ".dvc/"];

fn is_reserved(relpath: &Path) -> bool {
    let s = relpath.to_string_lossy().replace('\\', "/");
    RESERVED_PREFIXES.iter().any(|prefix| s.starts_with(prefix))
}

fn split_parent(relpath: &str) -> (&str, &str) {
    match relpath.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", relpath),
    }
}

enum LocalHead {
    Branch(String),
    Detached(String),
}

/// Reads `.git/HEAD` above `root`, following a symbolic ref (`ref: refs/heads/<branch>`) to
/// its branch name, or returning the literal SHA for a detached checkout.
fn read_local_head(root: &Path) -> Result<LocalHead, Error> {
    let git_dir = find_git_dir(root).ok_or_else(|| MountError::NoGitRepository(root.to_path_buf()))?;
    let head_path = git_dir.join("HEAD");
    let contents = fs::read_to_string(&head_path)
        .map_err(|e| Error::Read(head_path.clone(), e))?;
    let trimmed = contents.trim();

    if let Some(refname) = trimmed.strip_prefix("ref: ") {
        let branch = refname
            .strip_prefix("refs/heads/")
            .unwrap_or(refname)
            .to_string();
        Ok(LocalHead::Branch(branch))
    } else {
        Ok(LocalHead::Detached(trimmed.to_string()))
    }
}

fn find_git_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Mirrors the subset of `std::fs::OpenOptions` the virtual filesystem needs to tell apart,
/// since `std::fs::OpenOptions` itself has no introspection API to ask "is this read-only".
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenOptions {
    pub fn read_only() -> Self {
        OpenOptions {
            read: true,
            ..Default::default()
        }
    }

    pub fn is_read_only(&self) -> bool {
        !(self.write || self.append || self.truncate || self.create || self.create_new)
    }

    pub(crate) fn to_std(self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }
}

fn open_std(path: &Path, opts: &OpenOptions) -> Result<fs::File, Error> {
    opts.to_std()
        .open(path)
        .map_err(|e| Error::Read(path.to_path_buf(), e))
}

/// A file handle returned by [`Mount::open`]: either a real file on disk, or the sentinel's
/// fixed in-memory payload, which is never written to disk.
pub enum OpenedFile {
    Real(fs::File),
    Sentinel(Cursor<&'static [u8]>),
}

impl Read for OpenedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OpenedFile::Real(file) => file.read(buf),
            OpenedFile::Sentinel(cursor) => cursor.read(buf),
        }
    }
}

/// Metadata for a path: either real `std::fs` metadata for a materialized file, or a
/// synthesized stat for a path known only from a remote listing.
pub enum StatInfo {
    Real(fs::Metadata),
    Synthetic(SyntheticStat),
}

impl StatInfo {
    pub fn is_dir(&self) -> bool {
        match self {
            StatInfo::Real(metadata) => metadata.is_dir(),
            StatInfo::Synthetic(synthetic) => synthetic.is_dir,
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            StatInfo::Real(metadata) => metadata.len(),
            StatInfo::Synthetic(synthetic) => synthetic.size,
        }
    }
}

/// A stat synthesized from remote listing metadata rather than backed by a real local file.
/// Callers that need an exact size must `open()` the path first to materialize it.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticStat {
    pub is_dir: bool,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    /// Remote-reported size, when the listing that produced this entry requested it. `None`
    /// for locally-sourced entries and for remote entries fetched without `include_size`.
    pub size: Option<u64>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A mount with no real remote backing, for router tests that only exercise
    /// registration bookkeeping and never call a method that touches the network.
    pub(crate) fn dummy_mount() -> Arc<Mount> {
        Arc::new(Mount {
            root: std::env::temp_dir().join(format!("dummy-mount-{:p}", &())),
            host: "https://dagshub.com".to_string(),
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            revision_spec: RevisionSpec::Commit("0".repeat(40)),
            remote: RemoteClient::new(
                "https://dagshub.com".to_string(),
                "owner".to_string(),
                "repo".to_string(),
            ),
            credentials: crate::credentials::global(),
            revision: Mutex::new(Some("0".repeat(40))),
            lifecycle: Mutex::new(Lifecycle::HooksInstalled),
            dir_snapshot: Mutex::new(HashMap::new()),
        })
    }
}

/// End-to-end scenarios against the mock remote server, one per invariant/scenario listed
/// for the virtual filesystem layer: lazy materialization, not-found on both sides, listing
/// union, the sentinel file, and auth renegotiation on a 401 from a remote operation.
#[cfg(test)]
mod e2e_tests {
    use super::*;
    use crate::credentials::CredentialStore;
    use crate::errors::CredentialError;
    use crate::test_support::{TestEnvironment, TOKEN};
    use std::io::Read;

    fn read_to_string(mut file: OpenedFile) -> String {
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn lazy_read_materializes_then_serves_locally_without_further_requests() {
        let env = TestEnvironment::with().file("a/b.txt", "hello").prepare();
        let mount = env.mount();

        let file = mount.open(Path::new("a/b.txt"), &OpenOptions::read_only()).unwrap();
        assert_eq!(read_to_string(file), "hello");
        assert!(env.root().join("a/b.txt").is_file());

        let before = env.server().served_requests_count();
        let file = mount.open(Path::new("a/b.txt"), &OpenOptions::read_only()).unwrap();
        assert_eq!(read_to_string(file), "hello");
        assert_eq!(env.server().served_requests_count(), before);
    }

    #[test]
    fn path_absent_locally_and_remotely_is_not_found() {
        let env = TestEnvironment::prepare();
        let mount = env.mount();

        assert!(matches!(
            mount.open(Path::new("nope.txt"), &OpenOptions::read_only()),
            Err(Error::NotFound)
        ));
        assert!(matches!(mount.stat(Path::new("nope.txt")), Err(Error::NotFound)));
    }

    #[test]
    fn listdir_unions_local_and_remote_entries_with_no_duplicates() {
        let env = TestEnvironment::with().file("y.txt", "remote").prepare();
        std::fs::write(env.root().join("x.txt"), b"local").unwrap();

        let entries = env.mount().listdir(Path::new(""), false).unwrap();
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec![".dagshub-streaming", "x.txt", "y.txt"]);
    }

    #[test]
    fn sentinel_is_present_in_root_listing_and_reads_fixed_payload() {
        let env = TestEnvironment::prepare();
        let mount = env.mount();

        let entries = mount.listdir(Path::new(""), false).unwrap();
        assert!(entries.iter().any(|e| e.name == sentinel::NAME));

        let file = mount
            .open(Path::new(sentinel::NAME), &OpenOptions::read_only())
            .unwrap();
        assert_eq!(read_to_string(file), "v0\n");

        let stat = mount.stat(Path::new(sentinel::NAME)).unwrap();
        assert_eq!(stat.len(), 3);
        assert!(!env.root().join(sentinel::NAME).exists());
    }

    #[test]
    fn stat_of_remote_only_directory_discovered_via_listdir_is_directory_mode() {
        let env = TestEnvironment::with().dir("data").file("data/a.txt", "x").prepare();
        let mount = env.mount();

        mount.listdir(Path::new(""), false).unwrap();
        let stat = mount.stat(Path::new("data")).unwrap();
        assert!(stat.is_dir());
    }

    #[test]
    fn chdir_materializes_a_remote_only_directory() {
        let env = TestEnvironment::with().dir("data").file("data/a.txt", "x").prepare();
        let mount = env.mount();

        mount.listdir(Path::new(""), false).unwrap();
        mount.chdir(Path::new("data")).unwrap();
        assert!(env.root().join("data").is_dir());
    }

    #[test]
    fn a_401_from_a_remote_operation_invalidates_the_token_and_retries_with_a_fresh_one() {
        let env = TestEnvironment::with().file("remote.txt", "data").prepare();
        env.server().edit_data(|d| {
            d.revoked_for_content.insert(TOKEN.to_string());
        });

        env.server().edit_data(|d| {
            d.tokens.insert("second-token".to_string(), "tester".to_string());
        });
        let credentials: &'static CredentialStore = env.credentials();
        credentials
            .add_app_token("second-token", &env.server().url())
            .expect("seed replacement token");

        let stat = env.mount().stat(Path::new("remote.txt")).unwrap();
        assert_eq!(stat.len(), 4);
    }

    #[test]
    fn a_401_with_no_replacement_token_surfaces_as_no_interactive_auth() {
        let env = TestEnvironment::with().file("remote.txt", "data").prepare();
        env.server().edit_data(|d| {
            d.revoked_for_content.insert(TOKEN.to_string());
        });

        let err = env.mount().stat(Path::new("remote.txt")).unwrap_err();
        assert!(matches!(
            err,
            Error::Credential(CredentialError::NoInteractiveAuth)
        ));
    }

    #[test]
    fn installing_with_a_commit_absent_on_the_remote_is_revision_not_found() {
        let server = dagshub_streamfs_mock_server::new(
            crate::test_support::OWNER,
            crate::test_support::REPO,
            crate::test_support::REVISION,
        )
        .add_token(TOKEN, "tester")
        .start();

        let cache_dir = tempfile::tempdir().unwrap();
        let credentials: &'static CredentialStore = Box::leak(Box::new(CredentialStore::new(
            cache_dir.path().join("tokens.yml"),
            server.url(),
        )));
        credentials.add_app_token(TOKEN, &server.url()).unwrap();

        let root = tempfile::tempdir().unwrap();
        let mount = Mount::with_credentials(
            root.path().to_path_buf(),
            server.url(),
            crate::test_support::OWNER.to_string(),
            crate::test_support::REPO.to_string(),
            RevisionSpec::Commit("f".repeat(40)),
            credentials,
        );

        let err = mount.install().unwrap_err();
        assert!(matches!(err, Error::Remote(RemoteError::RevisionNotFound(_))));
    }

    #[test]
    fn nested_mounts_resolve_to_the_innermost_by_longest_prefix_regardless_of_install_order() {
        use crate::hooks;

        let outer_root = tempfile::tempdir().unwrap();
        let revision = "1".repeat(40);

        let server_outer = dagshub_streamfs_mock_server::new("owner", "outer", &revision)
            .add_token(TOKEN, "tester")
            .add_file("repo2/a/b.txt", "FAIL")
            .start();
        let server_inner = dagshub_streamfs_mock_server::new("owner", "inner", &revision)
            .add_token(TOKEN, "tester")
            .add_file("a/b.txt", "OK")
            .start();

        let cache_dir = tempfile::tempdir().unwrap();
        let creds_outer: &'static CredentialStore = Box::leak(Box::new(CredentialStore::new(
            cache_dir.path().join("outer.yml"),
            server_outer.url(),
        )));
        creds_outer.add_app_token(TOKEN, &server_outer.url()).unwrap();
        let creds_inner: &'static CredentialStore = Box::leak(Box::new(CredentialStore::new(
            cache_dir.path().join("inner.yml"),
            server_inner.url(),
        )));
        creds_inner.add_app_token(TOKEN, &server_inner.url()).unwrap();

        let mount_outer = Mount::with_credentials(
            outer_root.path().to_path_buf(),
            server_outer.url(),
            "owner".to_string(),
            "outer".to_string(),
            RevisionSpec::Commit(revision.clone()),
            creds_outer,
        );
        mount_outer.install().unwrap();

        let inner_root = outer_root.path().join("repo2");
        let mount_inner = Mount::with_credentials(
            inner_root.clone(),
            server_inner.url(),
            "owner".to_string(),
            "inner".to_string(),
            RevisionSpec::Commit(revision),
            creds_inner,
        );
        mount_inner.install().unwrap();

        let full_path = inner_root.join("a/b.txt");
        let file = hooks::open(&full_path, OpenOptions::read_only()).unwrap();
        assert_eq!(read_to_string(file), "OK");

        mount_outer.uninstall();
        mount_inner.uninstall();
    }
}
