//! Tree intermediate representation for the Sable compiler.
//!
//! This crate provides:
//!
//! - **Interned names** ([`Name`], [`StringInterner`]) — compact 32-bit
//!   identifiers for every binding and instruction name.
//! - **The expression tree** ([`ExprArena`], [`ExprId`], [`ExprKind`]) —
//!   a flat, handle-addressed arena of immutable expression nodes in
//!   continuation/lambda style: nested lets, local function definitions
//!   (`Code`), curried applications, conditionals.
//! - **Primitive operators** ([`UnaryOp`], [`BinaryOp`]) with their
//!   printable forms.
//!
//! The CFG lowering pass (`sable_cfg`) consumes this IR and produces an
//! explicit control-flow graph.

mod expr;
mod name;
mod ops;

pub use expr::{ExprArena, ExprId, ExprKind, LitValue};
pub use name::{Name, StringInterner};
pub use ops::{BinaryOp, UnaryOp};
