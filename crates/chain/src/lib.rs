//! # Gadget Chain
//!
//! Turns raw gadget-chain analyzer output into canonical, renderable chains.
//!
//! ## Architecture
//!
//! ```text
//! raw blob + Language
//!     │
//!     ├──> ChainFormat (one per language)
//!     │      ├─ PHP: newline-delimited {funcStack, callStack}
//!     │      └─ Java: [entry…] | {chains: [entry…]}
//!     │
//!     ├──> RawChain (labels + aligned positions + edge annotations)
//!     │
//!     └──> Chain { nodes: n0..nK, edges: n(i) -> n(i+1) }
//!            └─ positions kept out-of-band, index-aligned with nodes
//! ```
//!
//! Normalization never fails as a whole: malformed records are logged and
//! skipped, and the caller gets whatever chains could be built.

mod error;
mod format;
mod java;
mod merge;
mod normalizer;
mod php;

pub use error::RecordError;
pub use format::{format_for, ChainFormat, RawChain, RawStep};
pub use java::{java_method_ref, JavaFormat, JavaMethodRef};
pub use merge::{merge_chains, MergedGraph};
pub use normalizer::{NormalizedChain, Normalizer};
pub use php::PhpFormat;
