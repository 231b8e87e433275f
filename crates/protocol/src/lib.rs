//! # Gadget Protocol
//!
//! Data model shared by the normalizer, the locator, the extractor and the
//! audit builder.
//!
//! ```text
//! raw analyzer blob ──> Chain { nodes, edges } + FilePosition[]
//!                                   │
//!                                   └──> AuditContext { meta, steps: AuditStep[] }
//! ```

mod audit;
mod chain;
mod language;
mod layout;
mod submission;

pub use audit::{AuditContext, AuditMeta, AuditStep};
pub use chain::{Chain, Edge, FilePosition, Node, NodeType};
pub use language::{Language, UnknownLanguage};
pub use layout::{is_content_hash, StorageLayout, DEFAULT_DECOMPILED_DIR, DEFAULT_PSEUDO_ROOT};
pub use submission::{Submission, SubmissionStatus};
