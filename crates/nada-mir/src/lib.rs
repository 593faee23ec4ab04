//! Nada MIR
//!
//! Defines the mid-level intermediate representation produced by the Nada
//! compiler front-end and consumed by the execution compiler.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::arithmetic_side_effects)]

mod display;
mod literal;
mod operation;
mod program;
mod source;
mod types;

pub use literal::*;
pub use operation::*;
pub use program::*;
pub use source::*;
pub use types::*;
