//! The Nada front-end compiler.
//!
//! Programs are built as a typed graph through a [`Context`]: declare
//! [`Party`]s and inputs, combine [`Value`]s with the operator methods and
//! the collection handles, then lower the graph reachable from a list of
//! [`Output`]s into [`Mir`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::arithmetic_side_effects)]

mod arena;
mod collections;
mod compile;
mod context;
mod decl;
mod error;
mod function;
mod lower;
mod node;
mod registry;
mod source;
mod tests;
pub mod types;
mod value;

pub use collections::*;
pub use compile::*;
pub use context::*;
pub use decl::*;
pub use error::*;
pub use function::{Function, Param};
pub use nada_mir::{self, BaseType, BinaryOp, LiteralValue, Mir, Mode, NadaType, UnaryOp};
pub use node::*;
pub use source::*;
pub use types::TypeError;
pub use value::*;
