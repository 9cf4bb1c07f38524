//! Tree-shaped expression IR.
//!
//! Expressions live in an [`ExprArena`] and reference each other through
//! [`ExprId`] handles, so the whole tree is a flat table with no owned
//! nesting. Nodes are immutable once allocated.
//!
//! This is the continuation/lambda-style input to CFG lowering: control
//! flow is implicit (nested lets, local function definitions, calls,
//! conditionals) and becomes explicit only in the lowered form.

use crate::name::Name;
use crate::ops::{BinaryOp, UnaryOp};

/// Expression handle within an [`ExprArena`].
///
/// IDs are allocated sequentially starting from 0. [`ExprId::NONE`] is a
/// sentinel for "no expression".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Sentinel for "no expression".
    pub const NONE: ExprId = ExprId(u32::MAX);

    /// Create a new expression ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        ExprId(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` unless this is the [`ExprId::NONE`] sentinel.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

/// Literal value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LitValue {
    Int(i64),
    Bool(bool),
    Str(Name),
    Unit,
}

/// A single expression node.
///
/// This is a closed set: every consumer matches exhaustively, so adding
/// a variant is a compile error at each consumption site rather than a
/// runtime downcast failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// A literal constant.
    Lit(LitValue),

    /// An identifier, unresolved until lowering looks it up in scope.
    Ident(Name),

    /// Partial application: supply one argument to `func`.
    ///
    /// Calls are curried — `f(a, b)` is `Call(Apply(Apply(f, a), b))`.
    Apply { func: ExprId, arg: ExprId },

    /// Invoke a fully applied chain.
    Call { target: ExprId },

    /// Local function definition.
    ///
    /// Lowering turns this into a basic block (one phi argument per
    /// function parameter in scope at the definition site) and defers
    /// the body until a call determines the block's continuation.
    Code { body: ExprId },

    /// Non-recursive binding: `let name = def in body`.
    Let {
        name: Name,
        def: ExprId,
        body: ExprId,
    },

    /// Recursive binding: `name` is in scope inside its own definition.
    Letrec {
        name: Name,
        def: ExprId,
        body: ExprId,
    },

    /// Two-way conditional.
    If {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },

    /// Primitive unary operation.
    Unary { op: UnaryOp, arg: ExprId },

    /// Primitive binary operation.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
}

/// Flat arena owning every expression node of one tree.
///
/// All nodes for one lowering are allocated here and released together
/// when the arena is dropped; there is no per-node deallocation.
#[derive(Default)]
pub struct ExprArena {
    exprs: Vec<ExprKind>,
}

impl ExprArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Returns `true` if no nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Allocate a node and return its handle.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "expression counts never exceed u32"
    )]
    pub fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(kind);
        id
    }

    /// Get a node by handle.
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()]
    }

    // Convenience constructors, used heavily by tests and frontends.

    /// Allocate a literal.
    pub fn lit(&mut self, value: LitValue) -> ExprId {
        self.alloc(ExprKind::Lit(value))
    }

    /// Allocate an integer literal.
    pub fn int(&mut self, value: i64) -> ExprId {
        self.lit(LitValue::Int(value))
    }

    /// Allocate a boolean literal.
    pub fn bool(&mut self, value: bool) -> ExprId {
        self.lit(LitValue::Bool(value))
    }

    /// Allocate an identifier reference.
    pub fn ident(&mut self, name: Name) -> ExprId {
        self.alloc(ExprKind::Ident(name))
    }

    /// Allocate a partial application.
    pub fn apply(&mut self, func: ExprId, arg: ExprId) -> ExprId {
        self.alloc(ExprKind::Apply { func, arg })
    }

    /// Allocate a call of a fully applied chain.
    pub fn call(&mut self, target: ExprId) -> ExprId {
        self.alloc(ExprKind::Call { target })
    }

    /// Allocate `Call(Apply(...Apply(func, args[0])..., args[n-1]))`.
    pub fn call_with(&mut self, func: ExprId, args: &[ExprId]) -> ExprId {
        let mut chain = func;
        for &arg in args {
            chain = self.apply(chain, arg);
        }
        self.call(chain)
    }

    /// Allocate a local function definition.
    pub fn code(&mut self, body: ExprId) -> ExprId {
        self.alloc(ExprKind::Code { body })
    }

    /// Allocate a non-recursive let binding.
    pub fn let_in(&mut self, name: Name, def: ExprId, body: ExprId) -> ExprId {
        self.alloc(ExprKind::Let { name, def, body })
    }

    /// Allocate a recursive let binding.
    pub fn letrec_in(&mut self, name: Name, def: ExprId, body: ExprId) -> ExprId {
        self.alloc(ExprKind::Letrec { name, def, body })
    }

    /// Allocate a conditional.
    pub fn if_else(&mut self, cond: ExprId, then_expr: ExprId, else_expr: ExprId) -> ExprId {
        self.alloc(ExprKind::If {
            cond,
            then_expr,
            else_expr,
        })
    }

    /// Allocate a unary operation.
    pub fn unary(&mut self, op: UnaryOp, arg: ExprId) -> ExprId {
        self.alloc(ExprKind::Unary { op, arg })
    }

    /// Allocate a binary operation.
    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.alloc(ExprKind::Binary { op, lhs, rhs })
    }
}
