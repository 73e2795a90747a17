//! Instructions of the three-address code.

use crate::ir::{BlockId, Expression, NameId, Operand};

/// The shape of an instruction.
///
/// Only [`Unary`](Self::Unary) and [`Binary`](Self::Binary) define a result;
/// they are the members of the `definitions` table. Branch targets and labels
/// refer to interned label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// `result = operand`
    Unary {
        /// Assigned operand (scalar or array element).
        result: Operand,
        /// Assigned value.
        operand: Operand,
    },
    /// `result = lhs op rhs`
    Binary {
        /// Assigned operand (scalar or array element).
        result: Operand,
        /// Computed right-hand side.
        expr: Expression,
    },
    /// `ifTrue lhs op rhs goto on_true else goto on_false`
    Cond {
        /// The branch condition.
        expr: Expression,
        /// Label taken when the condition holds.
        on_true: NameId,
        /// Label taken otherwise.
        on_false: NameId,
    },
    /// `goto target`
    Uncond {
        /// Jump target label.
        target: NameId,
    },
    /// `name:`
    Label {
        /// The declared label.
        name: NameId,
    },
    /// `return operand`
    Return {
        /// Returned value.
        operand: Operand,
    },
}

/// An instruction together with the block that lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// What the instruction does.
    pub kind: InstructionKind,
    /// The block whose instruction list contains this instruction.
    pub(crate) owner: BlockId,
}

impl Instruction {
    pub(crate) fn new(kind: InstructionKind, owner: BlockId) -> Self {
        Self { kind, owner }
    }

    /// Returns the block that lists this instruction.
    #[must_use]
    pub const fn owner(&self) -> BlockId {
        self.owner
    }

    /// Returns `true` for `Unary` and `Binary` instructions.
    #[must_use]
    pub const fn is_definition(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Unary { .. } | InstructionKind::Binary { .. }
        )
    }

    /// Returns the assigned operand of a definition.
    #[must_use]
    pub const fn result(&self) -> Option<&Operand> {
        match &self.kind {
            InstructionKind::Unary { result, .. } | InstructionKind::Binary { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// Returns the variable written by a definition.
    ///
    /// Writing an array element counts as a write of the array base.
    #[must_use]
    pub fn defined_var(&self) -> Option<NameId> {
        self.result().and_then(Operand::base)
    }

    /// Returns the binary expression of a `Binary` instruction.
    #[must_use]
    pub const fn binary_expr(&self) -> Option<&Expression> {
        match &self.kind {
            InstructionKind::Binary { expr, .. } => Some(expr),
            _ => None,
        }
    }

    /// Returns `(x, y)` if the instruction is the simple copy `x = y`.
    #[must_use]
    pub const fn copy_pair(&self) -> Option<(NameId, NameId)> {
        match &self.kind {
            InstructionKind::Unary {
                result: Operand::Var(x),
                operand: Operand::Var(y),
            } => Some((*x, *y)),
            _ => None,
        }
    }

    /// Returns every variable the instruction reads, without duplicates.
    ///
    /// Reads are the right-hand side operands (array bases and subscripts
    /// included), the condition of a branch, the returned operand, and the
    /// subscript of an array-element result.
    #[must_use]
    pub fn used_vars(&self) -> Vec<NameId> {
        let mut vars = Vec::new();
        match &self.kind {
            InstructionKind::Unary { result, operand } => {
                vars.extend(operand.read_vars());
                vars.extend(result.subscript_var());
            }
            InstructionKind::Binary { result, expr } => {
                vars.extend(expr.read_vars());
                vars.extend(result.subscript_var());
            }
            InstructionKind::Cond { expr, .. } => vars.extend(expr.read_vars()),
            InstructionKind::Return { operand } => vars.extend(operand.read_vars()),
            InstructionKind::Uncond { .. } | InstructionKind::Label { .. } => {}
        }

        let mut unique = Vec::with_capacity(vars.len());
        for var in vars {
            if !unique.contains(&var) {
                unique.push(var);
            }
        }
        unique
    }

    /// Returns `true` if the instruction reads `var`.
    #[must_use]
    pub fn uses(&self, var: NameId) -> bool {
        self.used_vars().contains(&var)
    }

    /// Rewrites every read of `before` into a read of `after`.
    ///
    /// The written variable of a definition is left alone; only the subscript
    /// of an array-element result counts as a read.
    pub fn replace_use(&mut self, before: NameId, after: NameId) {
        match &mut self.kind {
            InstructionKind::Unary { result, operand } => {
                result.replace_var(before, after, false);
                operand.replace_var(before, after, true);
            }
            InstructionKind::Binary { result, expr } => {
                result.replace_var(before, after, false);
                expr.lhs.replace_var(before, after, true);
                expr.rhs.replace_var(before, after, true);
            }
            InstructionKind::Cond { expr, .. } => {
                expr.lhs.replace_var(before, after, true);
                expr.rhs.replace_var(before, after, true);
            }
            InstructionKind::Return { operand } => operand.replace_var(before, after, true),
            InstructionKind::Uncond { .. } | InstructionKind::Label { .. } => {}
        }
    }
}
