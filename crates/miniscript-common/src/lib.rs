//! Shared types for the MiniScript toolchain.
//!
//! Every crate reports positions as byte [`Span`]s into the document text;
//! [`LineIndex`] turns them into line/column pairs on demand.

pub mod span;

pub use span::{LineIndex, Span};
