use std::fmt;
use std::io;

use crate::lang::value::{Kind, Shape};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while lexing, parsing or evaluating a program
///
/// Every variant except `Io` carries the 1-based source line it was detected on.
#[derive(Debug)]
pub enum Error {
    /// A character no lexer rule accepts
    Lex { found: char, line: usize },
    /// A token where no grammar production could continue
    Syntax { found: String, line: usize },
    /// Lookup of a name that was never assigned
    UndefinedVariable { name: String, line: usize },
    /// Operand shapes are incompatible for `op`
    Shape {
        op: &'static str,
        left: Shape,
        right: Shape,
        line: usize,
    },
    /// A value of the wrong kind showed up in `context`
    KindMismatch {
        context: String,
        expected: Kind,
        found: Kind,
        line: usize,
    },
    /// Integer overflow while evaluating `op`
    Overflow { op: &'static str, line: usize },
    /// Writing program output failed
    Io(io::Error),
}

impl Error {
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Lex { line, .. }
            | Error::Syntax { line, .. }
            | Error::UndefinedVariable { line, .. }
            | Error::Shape { line, .. }
            | Error::KindMismatch { line, .. }
            | Error::Overflow { line, .. } => Some(*line),
            Error::Io(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex { found, line } => {
                write!(f, "Error on line {}: Unrecognized character '{}'", line, found)
            }
            Error::Syntax { found, line } => {
                write!(f, "Error on line {}: Unexpected {}", line, found)
            }
            Error::UndefinedVariable { name, line } => {
                write!(f, "Error on line {}: Unknown variable: {}", line, name)
            }
            Error::Shape {
                op,
                left,
                right,
                line,
            } => write!(
                f,
                "Error on line {}: Incompatible shapes for {}: {} and {}",
                line, op, left, right
            ),
            Error::KindMismatch {
                context,
                expected,
                found,
                line,
            } => write!(
                f,
                "Error on line {}: Expected {} in {}, got {}",
                line, expected, context, found
            ),
            Error::Overflow { op, line } => write!(f, "Error on line {}: {} overflows", line, op),
            Error::Io(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[test]
fn test_display() {
    let data = vec![
        (
            Error::Lex {
                found: '$',
                line: 3,
            },
            "Error on line 3: Unrecognized character '$'",
        ),
        (
            Error::UndefinedVariable {
                name: "v9".to_string(),
                line: 1,
            },
            "Error on line 1: Unknown variable: v9",
        ),
        (
            Error::Shape {
                op: "`+`",
                left: Shape::Vector(3),
                right: Shape::Matrix(2, 2),
                line: 4,
            },
            "Error on line 4: Incompatible shapes for `+`: (3,) and (2, 2)",
        ),
        (
            Error::KindMismatch {
                context: "declaration of `m`".to_string(),
                expected: Kind::Matrix,
                found: Kind::Vector,
                line: 2,
            },
            "Error on line 2: Expected matrix in declaration of `m`, got vector",
        ),
        (
            Error::Overflow { op: "`*`", line: 7 },
            "Error on line 7: `*` overflows",
        ),
    ];

    for (err, expected) in data {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn test_line() {
    let err = Error::Syntax {
        found: "']'".to_string(),
        line: 12,
    };
    assert_eq!(err.line(), Some(12));

    let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
    assert_eq!(err.line(), None);
}
