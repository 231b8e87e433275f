//! # Gadget Extractor
//!
//! Finds the function or method enclosing a source line and returns its body
//! for human review.
//!
//! This is a bounded heuristic, not a parser:
//!
//! ```text
//! line ──> scan back ≤ window lines for a signature (regex per language)
//!            ├─ none  → fixed window around the line
//!            └─ found → scan ≤ 20 lines for `{`
//!                         ├─ none  → small window around the signature
//!                         └─ found → balance braces until depth hits 0
//!                                    (clipped at a fixed offset)
//! ```
//!
//! Every path yields a snippet; callers never see a "not found" from here.

mod block;
mod config;
mod error;
mod signature;

pub use block::{read_source_lines, BlockExtractor, BlockKind, FunctionBlock};
pub use config::ExtractorConfig;
pub use error::{ExtractorError, Result};
pub use signature::signature_name;
