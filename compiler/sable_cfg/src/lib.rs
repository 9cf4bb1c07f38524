//! CFG construction and normalization for the Sable compiler.
//!
//! This crate takes the tree-shaped IR from `sable_ir` and produces an
//! explicit control-flow graph ready for SSA insertion:
//!
//! - [`lower::lower_function`] rewrites a function body into basic
//!   blocks, turning local function definitions into blocks and their
//!   (tail) calls into gotos, with phis at merge points.
//! - [`normalize::normalize`] removes unreachable blocks, orders blocks
//!   topologically with dense IDs, and builds dominator and
//!   post-dominator trees with O(1) ancestor queries
//!   ([`Cfg::dominates`], [`Cfg::post_dominates`]).
//!
//! Lowering normalizes its output, so most callers only need
//! [`lower_function`].

pub mod cfg;
mod display;
mod error;
pub mod lower;
pub mod normalize;

#[cfg(test)]
mod test_helpers;

pub use cfg::{Block, BlockId, Cfg, Terminator, TreeNode, Value, ValueId, ValueKind};
pub use display::CfgDisplay;
pub use error::CfgError;
pub use lower::{lower_function, LowerProblem, Lowered, ResolvePolicy};
pub use normalize::normalize;
