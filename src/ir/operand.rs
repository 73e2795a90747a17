//! Operands, operators and expressions of the three-address code.
//!
//! All three types compare structurally: two operands are equal when their
//! tags and payloads match, and two expressions are equal when operator and
//! both operands match. The `expressions` table relies on this (plus
//! [`Hash`]) to give syntactically identical right-hand sides one identity.

use std::{fmt, str::FromStr};

use strum::{EnumCount, EnumIter, EnumString};

use crate::{ir::NameId, Error, Result};

/// The index part of an array operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscript {
    /// `a[3]`
    Const(i64),
    /// `a[i]`
    Var(NameId),
}

impl Subscript {
    /// Returns the subscript variable, if the subscript is not constant.
    #[must_use]
    pub const fn var(self) -> Option<NameId> {
        match self {
            Subscript::Var(name) => Some(name),
            Subscript::Const(_) => None,
        }
    }
}

/// A single operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Integer immediate.
    Const(i64),
    /// Scalar variable.
    Var(NameId),
    /// Array element `base[index]`.
    Array {
        /// The array variable.
        base: NameId,
        /// The element index.
        index: Subscript,
    },
}

impl Operand {
    /// Returns `true` for an immediate.
    #[must_use]
    pub const fn is_const(&self) -> bool {
        matches!(self, Operand::Const(_))
    }

    /// Returns the immediate value, if any.
    #[must_use]
    pub const fn as_const(&self) -> Option<i64> {
        match self {
            Operand::Const(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the variable of a plain `Var` operand.
    #[must_use]
    pub const fn as_var(&self) -> Option<NameId> {
        match self {
            Operand::Var(name) => Some(*name),
            _ => None,
        }
    }

    /// Returns the variable an assignment to this operand writes.
    ///
    /// For an array element this is the array base: `a[i] = x` counts as a
    /// definition of `a`.
    #[must_use]
    pub const fn base(&self) -> Option<NameId> {
        match self {
            Operand::Var(name) | Operand::Array { base: name, .. } => Some(*name),
            Operand::Const(_) => None,
        }
    }

    /// Returns the variable used as an array subscript, if any.
    #[must_use]
    pub const fn subscript_var(&self) -> Option<NameId> {
        match self {
            Operand::Array { index, .. } => index.var(),
            _ => None,
        }
    }

    /// Returns every variable read when this operand is evaluated as a value.
    ///
    /// `a[i]` reads both `a` and `i`.
    #[must_use]
    pub fn read_vars(&self) -> Vec<NameId> {
        match self {
            Operand::Const(_) => Vec::new(),
            Operand::Var(name) => vec![*name],
            Operand::Array { base, index } => {
                let mut vars = vec![*base];
                if let Some(var) = index.var() {
                    vars.push(var);
                }
                vars
            }
        }
    }

    /// Returns `true` if evaluating this operand reads `var`.
    #[must_use]
    pub fn mentions(&self, var: NameId) -> bool {
        self.read_vars().contains(&var)
    }

    /// Renames `before` to `after`.
    ///
    /// The subscript of an array operand is always renamed. The operand's own
    /// variable (the scalar, or the array base) is only renamed when
    /// `rename_base` is set; results pass `false` so a write target is never
    /// redirected, only the variables it reads.
    pub fn replace_var(&mut self, before: NameId, after: NameId, rename_base: bool) {
        match self {
            Operand::Const(_) => {}
            Operand::Var(name) => {
                if rename_base && *name == before {
                    *name = after;
                }
            }
            Operand::Array { base, index } => {
                if rename_base && *base == before {
                    *base = after;
                }
                if *index == Subscript::Var(before) {
                    *index = Subscript::Var(after);
                }
            }
        }
    }
}

/// Binary operators of the IR.
///
/// The string forms are the textual symbols of the IR, so an external parser
/// can map tokens with [`BinaryOp::from_symbol`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, EnumString,
)]
pub enum BinaryOp {
    /// `+`
    #[strum(serialize = "+")]
    Add,
    /// `-`
    #[strum(serialize = "-")]
    Sub,
    /// `/`
    #[strum(serialize = "/")]
    Div,
    /// `*`
    #[strum(serialize = "*")]
    Mul,
    /// `=`
    #[strum(serialize = "=")]
    Eq,
    /// `!=`
    #[strum(serialize = "!=")]
    Ne,
    /// `<`
    #[strum(serialize = "<")]
    Lt,
    /// `>`
    #[strum(serialize = ">")]
    Gt,
    /// `>=`
    #[strum(serialize = ">=")]
    Ge,
    /// `<=`
    #[strum(serialize = "<=")]
    Le,
}

impl BinaryOp {
    /// Returns the textual symbol of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Div => "/",
            BinaryOp::Mul => "*",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
        }
    }

    /// Parses an operator symbol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralInput`] for an unknown symbol.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        BinaryOp::from_str(symbol)
            .map_err(|_| Error::StructuralInput(format!("unknown operator '{symbol}'")))
    }

    /// Returns `true` for `+ - * /`.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A binary right-hand side `lhs op rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expression {
    /// The operator.
    pub op: BinaryOp,
    /// Left operand.
    pub lhs: Operand,
    /// Right operand.
    pub rhs: Operand,
}

impl Expression {
    /// Creates a new expression.
    #[must_use]
    pub const fn new(op: BinaryOp, lhs: Operand, rhs: Operand) -> Self {
        Self { op, lhs, rhs }
    }

    /// Returns `true` if evaluating the expression reads `var`.
    #[must_use]
    pub fn mentions(&self, var: NameId) -> bool {
        self.lhs.mentions(var) || self.rhs.mentions(var)
    }

    /// Returns every variable the expression reads, left operand first.
    #[must_use]
    pub fn read_vars(&self) -> Vec<NameId> {
        let mut vars = self.lhs.read_vars();
        vars.extend(self.rhs.read_vars());
        vars
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_operator_symbols_roundtrip() {
        for op in BinaryOp::iter() {
            assert_eq!(BinaryOp::from_symbol(op.symbol()).unwrap(), op);
            assert_eq!(op.to_string(), op.symbol());
        }
        assert_eq!(BinaryOp::COUNT, 10);
    }

    #[test]
    fn test_unknown_operator_is_structural_error() {
        assert!(matches!(
            BinaryOp::from_symbol("=>"),
            Err(Error::StructuralInput(_))
        ));
        assert!(BinaryOp::from_symbol("%").is_err());
    }

    #[test]
    fn test_operand_vars() {
        let a = NameId::new(0);
        let i = NameId::new(1);
        let elem = Operand::Array {
            base: a,
            index: Subscript::Var(i),
        };
        assert_eq!(elem.read_vars(), vec![a, i]);
        assert_eq!(elem.base(), Some(a));
        assert_eq!(elem.subscript_var(), Some(i));
        assert!(Operand::Const(4).read_vars().is_empty());
        assert_eq!(Operand::Const(4).base(), None);
    }

    #[test]
    fn test_replace_var_respects_base_flag() {
        let a = NameId::new(0);
        let x = NameId::new(1);
        let y = NameId::new(2);

        let mut result = Operand::Array {
            base: x,
            index: Subscript::Var(x),
        };
        result.replace_var(x, y, false);
        assert_eq!(
            result,
            Operand::Array {
                base: x,
                index: Subscript::Var(y)
            }
        );

        let mut scalar = Operand::Var(x);
        scalar.replace_var(x, y, false);
        assert_eq!(scalar, Operand::Var(x));
        scalar.replace_var(x, y, true);
        assert_eq!(scalar, Operand::Var(y));

        let mut untouched = Operand::Var(a);
        untouched.replace_var(x, y, true);
        assert_eq!(untouched, Operand::Var(a));
    }

    #[test]
    fn test_expression_structural_equality() {
        let a = Operand::Var(NameId::new(0));
        let b = Operand::Var(NameId::new(1));
        let e1 = Expression::new(BinaryOp::Add, a, b);
        let e2 = Expression::new(BinaryOp::Add, a, b);
        let e3 = Expression::new(BinaryOp::Add, b, a);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
        assert!(e1.mentions(NameId::new(1)));
        assert!(!e1.mentions(NameId::new(2)));
    }
}
