//! The driving crate: the `Host` contract, logging, package/version
//! resolution, the import resolver, and the program loader built on top of
//! `cadl_compiler`'s scanner/parser/binder/checker. The `cadlc` binary
//! (`src/bin/cadlc.rs`) is the thinnest possible consumer of this crate.

pub mod fs_host;
pub mod host;
pub mod logging;
pub mod options;
pub mod package;
pub mod program;
pub mod resolver;
pub mod version;

#[cfg(any(test, feature = "test-util"))]
pub mod test_host;
