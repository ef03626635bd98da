// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed marker file exposed at the root of every mount, used by callers to detect that a
//! given directory is a live mount point without depending on any other observable behavior.

use std::path::Path;

/// Name of the marker file, visible only directly under a mount's root.
pub const NAME: &str = ".dagshub-streaming";

/// Fixed payload served for the marker file. Never written to disk.
pub const PAYLOAD: &[u8] = b"v0\n";

/// True if `relpath` (relative to a mount root) names the marker file.
pub fn is_sentinel(relpath: &Path) -> bool {
    relpath == Path::new(NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_only_the_exact_root_level_name() {
        assert!(is_sentinel(Path::new(NAME)));
        assert!(!is_sentinel(Path::new("subdir").join(NAME).as_path()));
        assert!(!is_sentinel(Path::new("other-file")));
    }

    #[test]
    fn payload_is_fixed() {
        assert_eq!(PAYLOAD, b"v0\n");
    }
}
