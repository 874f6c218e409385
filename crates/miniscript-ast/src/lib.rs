//! MiniScript syntax trees.
//!
//! The grammar and parser live outside this workspace; this crate is the
//! shape of the tree they hand over. Trees are arenas of kind-tagged nodes
//! addressed by [`NodeId`], built bottom-up with [`AstBuilder`], rendered to
//! canonical text (which assigns every span), and linked by [`link`].
//!
//! # Architecture
//!
//! - [`node`]: `Ast`, `Node`, `NodeKind`, `NodeId`, operators and `Property`
//! - [`builder`]: `AstBuilder`
//! - [`link`]: lexical name resolution and `LinkError`

pub mod builder;
pub mod link;
pub mod node;
mod printer;

pub use builder::AstBuilder;
pub use link::{is_builtin_type_name, link, LinkError};
pub use node::{Ast, InfixOp, Node, NodeId, NodeKind, PrefixOp, Property};
