// SPDX-FileCopyrightText: The Ferrocene Developers
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transparent lazy-materialization filesystem layer over a remote content-addressed
//! repository: reads against paths that don't exist locally are fetched over HTTP, written to
//! disk, and directory listings fuse local and remote state.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod hooks;
pub mod mount;
pub mod oauth;
pub mod remote;
pub mod router;
pub mod sentinel;
pub mod token;

mod utils;

#[cfg(test)]
mod test_support;

pub use errors::Error;
pub use mount::{Mount, RevisionSpec};

/// Installs a `tracing-subscriber` reading its filter from `RUST_LOG`. Opt-in only: this crate
/// never initializes a global subscriber on its own, since a library must not install global
/// loggers implicitly on behalf of the binary embedding it.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
