//! # Gadget Locator
//!
//! Resolves analyzer-reported locations to real files of the current
//! submission.
//!
//! ## Strategies
//!
//! ```text
//! PHP raw path
//!     ├─ 1. absolute + contains /<hash>/ + exists
//!     ├─ 2. canonical `uploads/…` form → storage root
//!     ├─ 3. `/<hash>/` anchor anywhere → submission root
//!     └─ 4. relative to submission root
//!   (every candidate must canonicalize inside the submission root)
//!
//! Java class path
//!     ├─ 1. submission decompiled tree   (sorted walk, suffix match)
//!     └─ 2. shared runtime cache          (built once, under lock)
//! ```
//!
//! Lookups only read the filesystem. The shared runtime cache is the one
//! writer, and it builds into a temp dir and publishes with a rename while
//! holding an exclusive lock.

mod error;
mod guard;
mod java;
mod locator;
mod php;
mod runtime_cache;
mod scanner;

pub use error::{LocatorError, Result};
pub use guard::contain;
pub use java::{java_search_needle, JavaLocator};
pub use locator::{Locators, PathOrigin, Resolution, ResolvedPath, SourceLocator};
pub use php::PhpLocator;
pub use runtime_cache::{DecompilerCommand, RuntimeCache, RuntimeCacheConfig};
pub use scanner::SourceScanner;
