//! MiniScript editor support.
//!
//! Hosts documents and drives them through their lifecycle phases, with the
//! type checker attached to the `Linked` phase, and answers editor queries
//! over the results:
//!
//! - **Diagnostics**: link errors and type diagnostics as LSP diagnostics
//! - **Inlay hints**: inferred types of variables declared without one
//! - **Hover**: type of the declaration or reference under the cursor
//!
//! Positions follow the LSP conventions (0-based lines, UTF-16 columns).

pub mod analysis;
pub mod workspace;

pub use workspace::{Document, DocumentBuilder, Workspace};
