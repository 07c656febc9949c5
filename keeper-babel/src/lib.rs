//! Conversion between knowledge-base exports
//!
//!     This crate reads hierarchical knowledge-base exports into one canonical model, writes the
//!     model back out in any supported format, runs chains of such conversions and measures what
//!     a chain lost.
//!
//!     This is a pure lib, that is, it powers keeper-cli but is shell agnostic: no code here
//!     should suppose a shell environment, be it printing to stdout, env vars etc. Progress goes
//!     through `tracing`, lossy decisions come back as warnings in an [`Outcome`].
//!
//! Architecture
//!
//!     Every format maps to and from the same snapshot type, [`model::ConversionData`]. Page
//!     bodies are held in the content IR (./ir/nodes.rs), so the markdown dialects and the typed
//!     JSON nodes only ever convert between their own syntax and the IR. Code shared by several
//!     formats (ids, names, links, callout markers, CSV tables, directory listings) lives in
//!     ./common.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── diagnostics.rs          # Warnings and Outcome
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── chain.rs                # Multi-hop conversion runner
//!     ├── diff                    # Structural diff and its text report
//!     ├── model                   # Resources, tables, the snapshot and its builder
//!     ├── ir                      # Content IR and normalization
//!     ├── common                  # Shared mapping code
//!     └── formats
//!         ├── markdown            # Both markdown dialects, comrak based
//!         ├── notion              # Tree of `<Name> <id>.md` pages and CSV pairs
//!         ├── lk_json             # Single structured JSON document
//!         └── lk_md               # Markdown folder with YAML frontmatter
//!
//! Round trips
//!
//!     No two formats store exactly the same things. A chain such as `notion->lk-json->notion`
//!     exports and re-parses at every hop, and [`diff::compare`] then aligns the first and last
//!     snapshots and classifies every difference as minor or significant. Content no format
//!     construct covers is kept as a raw node and re-emitted unchanged, so it survives every hop.

pub mod chain;
pub mod common;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod model;
pub mod registry;

pub use chain::{run_chain, Chain, ChainError, ChainOptions, ChainRun, Stage};
pub use diagnostics::{Outcome, Warning, WarningKind};
pub use diff::{compare, DiffReport, Severity};
pub use error::FormatError;
pub use format::Format;
pub use model::{ConversionData, Resource};
pub use registry::FormatRegistry;
