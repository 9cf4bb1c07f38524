//! Lexical scope for lowering.
//!
//! The scope is a persistent cons list: pushing a binding allocates one
//! node, and cloning shares the tail. Deferred local-function bodies
//! snapshot the scope at their definition site for O(1), and the
//! snapshot stays valid no matter what the main traversal pushes or
//! pops afterwards.

use std::rc::Rc;

use sable_ir::Name;

use crate::cfg::ValueId;

/// What a name is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// Non-recursive let binding, resolved to its reduced definition.
    Let(ValueId),
    /// Recursive let binding, resolved to its reduced definition.
    Letrec(ValueId),
    /// Function parameter. Forking a scope for a basic block replaces
    /// each of these with the block's corresponding phi.
    Param(ValueId),
}

impl BindingKind {
    /// The bound value, regardless of binding form.
    pub fn value(self) -> ValueId {
        match self {
            BindingKind::Let(v) | BindingKind::Letrec(v) | BindingKind::Param(v) => v,
        }
    }
}

struct Node {
    name: Name,
    kind: BindingKind,
    next: Option<Rc<Node>>,
}

/// A persistent lexical scope.
///
/// Lookup walks from the most recent binding outward, so shadowing
/// falls out of insertion order.
#[derive(Clone, Default)]
pub struct Scope {
    head: Option<Rc<Node>>,
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a binding. Empty names (anonymous bindings) are not entered.
    pub fn push(&mut self, name: Name, kind: BindingKind) {
        if name.is_empty() {
            return;
        }
        self.head = Some(Rc::new(Node {
            name,
            kind,
            next: self.head.take(),
        }));
    }

    /// Remove the most recent binding for `name`, if it is on top.
    ///
    /// Bindings are strictly nested, so the binding being closed is
    /// always the head (unless it was anonymous and never entered).
    pub fn pop(&mut self, name: Name) {
        if name.is_empty() {
            return;
        }
        let Some(head) = self.head.take() else {
            debug_assert!(false, "pop on empty scope");
            return;
        };
        debug_assert_eq!(head.name, name, "pop out of nesting order");
        self.head = head.next.clone();
    }

    /// Find the binding for `name`, most recent first.
    pub fn lookup(&self, name: Name) -> Option<BindingKind> {
        let mut cur = self.head.as_deref();
        while let Some(node) = cur {
            if node.name == name {
                return Some(node.kind);
            }
            cur = node.next.as_deref();
        }
        None
    }

    /// All parameter bindings currently in scope, outermost first.
    ///
    /// The result is the phi signature a basic block created at this
    /// point receives: one phi per in-scope parameter, in declaration
    /// order.
    pub fn param_values(&self) -> Vec<(Name, ValueId)> {
        let mut params = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(node) = cur {
            if let BindingKind::Param(v) = node.kind {
                params.push((node.name, v));
            }
            cur = node.next.as_deref();
        }
        params.reverse();
        params
    }

    /// Rebuild this scope with each parameter binding replaced by the
    /// corresponding value from `phis` (outermost parameter first).
    ///
    /// Non-parameter bindings are carried over unchanged. This is the
    /// scope a deferred block body is lowered under: references to the
    /// enclosing parameters resolve to the block's own phis.
    pub fn fork_with_params(&self, phis: &[ValueId]) -> Scope {
        let mut nodes: Vec<(Name, BindingKind)> = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(node) = cur {
            nodes.push((node.name, node.kind));
            cur = node.next.as_deref();
        }

        let mut forked = Scope::new();
        let mut next_phi = phis.iter().copied();
        for &(name, kind) in nodes.iter().rev() {
            let kind = match kind {
                BindingKind::Param(_) => match next_phi.next() {
                    Some(phi) => BindingKind::Param(phi),
                    None => {
                        debug_assert!(false, "fewer phis than in-scope parameters");
                        kind
                    }
                },
                other => other,
            };
            forked.push(name, kind);
        }
        debug_assert!(next_phi.next().is_none(), "more phis than in-scope parameters");
        forked
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn n(raw: u32) -> Name {
        Name::from_raw(raw)
    }

    fn v(raw: u32) -> ValueId {
        ValueId::new(raw)
    }

    #[test]
    fn lookup_finds_most_recent_binding() {
        let mut scope = Scope::new();
        scope.push(n(1), BindingKind::Let(v(10)));
        scope.push(n(2), BindingKind::Let(v(20)));
        scope.push(n(1), BindingKind::Let(v(30)));

        assert_eq!(scope.lookup(n(1)), Some(BindingKind::Let(v(30))));
        assert_eq!(scope.lookup(n(2)), Some(BindingKind::Let(v(20))));
        assert_eq!(scope.lookup(n(3)), None);

        scope.pop(n(1));
        assert_eq!(scope.lookup(n(1)), Some(BindingKind::Let(v(10))));
    }

    #[test]
    fn clone_is_a_snapshot() {
        let mut scope = Scope::new();
        scope.push(n(1), BindingKind::Param(v(10)));
        let snapshot = scope.clone();

        scope.push(n(2), BindingKind::Let(v(20)));
        scope.pop(n(2));
        scope.pop(n(1));

        assert_eq!(snapshot.lookup(n(1)), Some(BindingKind::Param(v(10))));
        assert_eq!(scope.lookup(n(1)), None);
    }

    #[test]
    fn param_values_outermost_first() {
        let mut scope = Scope::new();
        scope.push(n(1), BindingKind::Param(v(10)));
        scope.push(n(2), BindingKind::Let(v(20)));
        scope.push(n(3), BindingKind::Param(v(30)));

        assert_eq!(scope.param_values(), vec![(n(1), v(10)), (n(3), v(30))]);
    }

    #[test]
    fn fork_rebinds_params_and_keeps_lets() {
        let mut scope = Scope::new();
        scope.push(n(1), BindingKind::Param(v(10)));
        scope.push(n(2), BindingKind::Let(v(20)));
        scope.push(n(3), BindingKind::Param(v(30)));

        let forked = scope.fork_with_params(&[v(100), v(300)]);
        assert_eq!(forked.lookup(n(1)), Some(BindingKind::Param(v(100))));
        assert_eq!(forked.lookup(n(2)), Some(BindingKind::Let(v(20))));
        assert_eq!(forked.lookup(n(3)), Some(BindingKind::Param(v(300))));
    }
}
