// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide registry mapping canonical filesystem paths to the [`Mount`] that owns them.
//!
//! Registrations are held as [`Weak`] references: a `Mount` going out of scope removes itself
//! from resolution automatically, without requiring an explicit unregister call from a
//! caller that simply dropped its handle.

use crate::errors::MountError;
use crate::mount::Mount;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, Weak};

static ROUTER: Lazy<RwLock<HashMap<PathBuf, Weak<Mount>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `mount` at `root`. Fails if a live mount is already registered at the exact same
/// canonical root; nesting one mount's root inside another's is permitted, since resolution is
/// by longest matching prefix.
pub fn register(root: &Path, mount: &std::sync::Arc<Mount>) -> Result<(), MountError> {
    let mut table = ROUTER.write().unwrap();
    prune_dead(&mut table);
    if table.contains_key(root) {
        return Err(MountError::AlreadyMountedHere(root.to_path_buf()));
    }
    table.insert(root.to_path_buf(), std::sync::Arc::downgrade(mount));
    Ok(())
}

/// Removes the registration at `root`, if any. Idempotent: unregistering a path that isn't
/// registered (or whose mount already dropped) is not an error.
pub fn unregister(root: &Path) {
    ROUTER.write().unwrap().remove(root);
}

/// Resolves `path` to the mount whose root is the longest prefix of `path`, if any live mount
/// claims it.
pub fn resolve(path: &Path) -> Option<std::sync::Arc<Mount>> {
    let table = ROUTER.read().unwrap();
    table
        .iter()
        .filter(|(root, _)| path.starts_with(root))
        .max_by_key(|(root, _)| root.as_os_str().len())
        .and_then(|(_, weak)| weak.upgrade())
}

/// True if any live mount is registered at exactly `root`.
pub fn is_mounted_at(root: &Path) -> bool {
    ROUTER
        .read()
        .unwrap()
        .get(root)
        .map(|weak| weak.strong_count() > 0)
        .unwrap_or(false)
}

fn prune_dead(table: &mut HashMap<PathBuf, Weak<Mount>>) {
    table.retain(|_, weak| weak.strong_count() > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::test_support::dummy_mount;

    #[test]
    fn resolves_longest_prefix() {
        let outer = dummy_mount();
        let inner = dummy_mount();
        register(Path::new("/repos/a"), &outer).unwrap();
        register(Path::new("/repos/a/nested"), &inner).unwrap();

        let resolved = resolve(Path::new("/repos/a/nested/file.txt")).unwrap();
        assert!(std::sync::Arc::ptr_eq(&resolved, &inner));

        unregister(Path::new("/repos/a"));
        unregister(Path::new("/repos/a/nested"));
    }

    #[test]
    fn exact_root_conflict_is_rejected() {
        let first = dummy_mount();
        let second = dummy_mount();
        register(Path::new("/repos/b"), &first).unwrap();
        assert!(matches!(
            register(Path::new("/repos/b"), &second),
            Err(MountError::AlreadyMountedHere(_))
        ));
        unregister(Path::new("/repos/b"));
    }

    #[test]
    fn unmounted_path_resolves_to_none() {
        assert!(resolve(Path::new("/totally/unrelated/path")).is_none());
    }

    #[test]
    fn dropped_mount_is_pruned_on_next_register() {
        let root = Path::new("/repos/c");
        {
            let mount = dummy_mount();
            register(root, &mount).unwrap();
            assert!(is_mounted_at(root));
        }
        // `mount` has been dropped; the weak reference is now dead.
        assert!(resolve(root).is_none());
        let replacement = dummy_mount();
        register(root, &replacement).unwrap();
        unregister(root);
    }
}
