use std::fmt;

use crate::lang::value::Kind;

#[derive(Debug, PartialEq, Hash, PartialOrd, Ord, Eq, Clone)]
pub struct Identifier(pub String);

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq)]
pub enum Literal {
    /// `[1, 2, 3]`
    Vector(Vec<i64>),
    /// `[[1, 2], [3, 4]]`
    Matrix(Vec<Vec<i64>>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// `+`
    Plus,
    /// `*`
    Multiply,
}

impl BinaryOp {
    pub fn op_str(&self) -> &str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Multiply => "*",
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    /// Literal and the line it starts on
    Literal(Literal, usize),
    Identifier(Identifier, usize),
    Paren(Box<Expression>),
    /// `head op operand op operand ...`, applied left to right
    ///
    /// Kept flat instead of as nested binary nodes so long chains do not turn into deep trees.
    /// Each operand carries the line of the operator in front of it.
    BinaryExpression(Box<Expression>, Vec<(BinaryOp, Expression, usize)>),
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    /// `vector <ident> = <expr>` or `matrix <ident> = <expr>`
    Assign {
        kind: Kind,
        ident: Identifier,
        expr: Expression,
        line: usize,
    },
    /// `print(<ident>)`
    Print { ident: Identifier, line: usize },
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::Assign { line, .. } | Statement::Print { line, .. } => *line,
        }
    }
}
