//! Compiled expression trees.

use std::fmt;

use pricing_core::Value;
use pricing_core::token::Operator;

/// A binary operator with its precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    /// Maps an operator token to a binary operator. Parentheses have no
    /// binary form.
    pub fn from_operator(op: Operator) -> Option<Self> {
        let bin = match op {
            Operator::Add => Self::Add,
            Operator::Sub => Self::Sub,
            Operator::Mul => Self::Mul,
            Operator::Div => Self::Div,
            Operator::Gt => Self::Gt,
            Operator::Lt => Self::Lt,
            Operator::Ge => Self::Ge,
            Operator::Le => Self::Le,
            Operator::Eq => Self::Eq,
            Operator::Ne => Self::Ne,
            Operator::And => Self::And,
            Operator::Or => Self::Or,
            Operator::LParen | Operator::RParen => return None,
        };
        Some(bin)
    }

    /// Binding strength; higher binds tighter. All levels are
    /// left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Gt | Self::Lt | Self::Ge | Self::Le => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Const(Value),
    /// A variable or calculation name.
    Ref(String),
    /// Unary minus.
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Names referenced anywhere in the tree, left to right.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Const(_) => {}
            Self::Ref(name) => out.push(name),
            Self::Neg(inner) => inner.collect_refs(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }
}

/// Fully parenthesized rendering, useful for checking precedence.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(Value::Text(s)) => write!(f, "'{}'", s),
            Self::Const(v) => write!(f, "{}", v),
            Self::Ref(name) => f.write_str(name),
            Self::Neg(inner) => write!(f, "(-{})", inner),
            Self::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.as_str(), rhs),
        }
    }
}
