//! Human-readable views: diagnostics (through [`std::fmt::Display`] on
//! [`Spanned`](crate::token::Spanned) errors) and the AST tree dump.

pub mod error;
pub mod tree;
