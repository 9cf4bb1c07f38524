//! Human-readable CFG printing, mainly for tests and debugging.

use std::fmt;

use sable_ir::{LitValue, StringInterner};

use crate::cfg::{Block, Cfg, Terminator, ValueId, ValueKind};

impl Cfg {
    /// Render the CFG, resolving names through `interner`.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> CfgDisplay<'a> {
        CfgDisplay {
            cfg: self,
            interner,
        }
    }
}

/// Borrowed display adapter returned by [`Cfg::display`].
pub struct CfgDisplay<'a> {
    cfg: &'a Cfg,
    interner: &'a StringInterner,
}

impl fmt::Display for CfgDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cfg entry={} exit={}", self.cfg.entry(), self.cfg.exit())?;
        for block in self.cfg.blocks() {
            self.fmt_block(f, block)?;
        }
        Ok(())
    }
}

impl CfgDisplay<'_> {
    fn fmt_block(&self, f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
        write!(f, "{}:", block.id)?;
        if !block.preds.is_empty() {
            write!(f, " ; preds:")?;
            for pred in &block.preds {
                write!(f, " {pred}")?;
            }
        }
        writeln!(f)?;

        for &phi in &block.args {
            write!(f, "  %{} = phi", self.cfg.value(phi).instr_id)?;
            if let ValueKind::Phi { values } = &self.cfg.value(phi).kind {
                for &slot in values {
                    write!(f, " ")?;
                    self.fmt_operand(f, slot)?;
                }
            }
            writeln!(f)?;
        }
        for &instr in &block.instrs {
            write!(f, "  %{} = ", self.cfg.value(instr).instr_id)?;
            self.fmt_instr(f, instr)?;
            writeln!(f)?;
        }
        match block.terminator {
            Some(Terminator::Goto { target }) => writeln!(f, "  goto {target}"),
            Some(Terminator::Branch {
                cond,
                then_block,
                else_block,
            }) => {
                write!(f, "  branch ")?;
                self.fmt_operand(f, cond)?;
                writeln!(f, " ? {then_block} : {else_block}")
            }
            None => writeln!(f, "  return"),
        }
    }

    fn fmt_instr(&self, f: &mut fmt::Formatter<'_>, instr: ValueId) -> fmt::Result {
        match &self.cfg.value(instr).kind {
            ValueKind::Unary { op, arg } => {
                write!(f, "{op}")?;
                self.fmt_operand(f, *arg)
            }
            ValueKind::Binary { op, lhs, rhs } => {
                self.fmt_operand(f, *lhs)?;
                write!(f, " {op} ")?;
                self.fmt_operand(f, *rhs)
            }
            ValueKind::Call { target } => {
                write!(f, "call ")?;
                self.fmt_operand(f, *target)
            }
            other => {
                debug_assert!(false, "unplaced value in instruction list: {other:?}");
                write!(f, "{other:?}")
            }
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, value: ValueId) -> fmt::Result {
        if !value.is_valid() {
            return f.write_str("<unset>");
        }
        let v = self.cfg.value(value);
        // Placed values are referenced by their instruction ID.
        if v.instr_id != 0 {
            return write!(f, "%{}", v.instr_id);
        }
        match &v.kind {
            ValueKind::Lit(LitValue::Int(i)) => write!(f, "{i}"),
            ValueKind::Lit(LitValue::Bool(b)) => write!(f, "{b}"),
            ValueKind::Lit(LitValue::Str(s)) => write!(f, "{:?}", self.interner.resolve(*s)),
            ValueKind::Lit(LitValue::Unit) => f.write_str("()"),
            ValueKind::Arg { index } => {
                if v.name.is_empty() {
                    write!(f, "$arg{index}")
                } else {
                    write!(f, "${}", self.interner.resolve(v.name))
                }
            }
            ValueKind::Unresolved(name) => write!(f, "?{}", self.interner.resolve(*name)),
            ValueKind::CodeRef { pending } => write!(f, "code#{pending}"),
            ValueKind::Apply { func, arg } => {
                f.write_str("(")?;
                self.fmt_operand(f, *func)?;
                f.write_str(" ")?;
                self.fmt_operand(f, *arg)?;
                f.write_str(")")
            }
            ValueKind::Phi { .. }
            | ValueKind::Unary { .. }
            | ValueKind::Binary { .. }
            | ValueKind::Call { .. } => write!(f, "%v{}", value.raw()),
        }
    }
}
