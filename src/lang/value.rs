use std::fmt;

use ndarray::{Array1, Array2, ArrayView1};

use crate::lang::error::{Error, Result};

/// The two kinds of value a program can hold. Also names the declaration keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Vector,
    Matrix,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Vector => "vector",
            Kind::Matrix => "matrix",
        };

        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// (length)
    Vector(usize),
    /// (rows, columns)
    Matrix(usize, usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Vector(len) => write!(f, "({},)", len),
            Shape::Matrix(rows, cols) => write!(f, "({}, {})", rows, cols),
        }
    }
}

/// Runtime value
///
/// `Value::matrix` guarantees a rectangular matrix. Neither constructor checks for emptiness:
/// the grammar requires at least one element per literal, so values built from a program are
/// never empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Vector(Array1<i64>),
    Matrix(Array2<i64>),
}

impl Value {
    pub fn vector(elements: Vec<i64>) -> Self {
        Value::Vector(Array1::from(elements))
    }

    /// Build a matrix from its rows, rejecting ragged input
    pub fn matrix(rows: Vec<Vec<i64>>, line: usize) -> Result<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != ncols) {
            return Err(Error::Shape {
                op: "matrix rows",
                left: Shape::Vector(ncols),
                right: Shape::Vector(bad.len()),
                line,
            });
        }

        let nrows = rows.len();
        let cells = rows.concat();
        let matrix = Array2::from_shape_vec((nrows, ncols), cells).map_err(|_| Error::Shape {
            op: "matrix rows",
            left: Shape::Matrix(nrows, ncols),
            right: Shape::Matrix(nrows, ncols),
            line,
        })?;

        Ok(Value::Matrix(matrix))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Vector(_) => Kind::Vector,
            Value::Matrix(_) => Kind::Matrix,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Vector(v) => Shape::Vector(v.len()),
            Value::Matrix(m) => Shape::Matrix(m.nrows(), m.ncols()),
        }
    }

    /// Elementwise sum of two values with the same kind and shape
    pub fn add(&self, rhs: &Value, line: usize) -> Result<Value> {
        let mismatch = || Error::Shape {
            op: "`+`",
            left: self.shape(),
            right: rhs.shape(),
            line,
        };
        let overflow = || Error::Overflow { op: "`+`", line };

        match (self, rhs) {
            (Value::Vector(l), Value::Vector(r)) => {
                if l.len() != r.len() {
                    return Err(mismatch());
                }

                let mut sum = l.clone();
                for (out, r) in sum.iter_mut().zip(r.iter()) {
                    *out = out.checked_add(*r).ok_or_else(overflow)?;
                }

                Ok(Value::Vector(sum))
            }
            (Value::Matrix(l), Value::Matrix(r)) => {
                if l.dim() != r.dim() {
                    return Err(mismatch());
                }

                let mut sum = l.clone();
                for (out, r) in sum.iter_mut().zip(r.iter()) {
                    *out = out.checked_add(*r).ok_or_else(overflow)?;
                }

                Ok(Value::Matrix(sum))
            }
            _ => Err(mismatch()),
        }
    }

    /// Matrix product. Vectors are rejected outright rather than treated as row or column
    /// matrices
    pub fn matmul(&self, rhs: &Value, line: usize) -> Result<Value> {
        let (l, r) = match (self, rhs) {
            (Value::Matrix(l), Value::Matrix(r)) => (l, r),
            _ => {
                return Err(Error::KindMismatch {
                    context: format!("`*` ({} * {})", self.kind(), rhs.kind()),
                    expected: Kind::Matrix,
                    found: Kind::Vector,
                    line,
                })
            }
        };

        if l.ncols() != r.nrows() {
            return Err(Error::Shape {
                op: "`*`",
                left: self.shape(),
                right: rhs.shape(),
                line,
            });
        }

        let mut product = Array2::zeros((l.nrows(), r.ncols()));
        for ((i, j), cell) in product.indexed_iter_mut() {
            *cell = dot(l.row(i), r.column(j)).ok_or(Error::Overflow { op: "`*`", line })?;
        }

        Ok(Value::Matrix(product))
    }
}

/// Checked dot product. `None` on overflow
fn dot(row: ArrayView1<i64>, column: ArrayView1<i64>) -> Option<i64> {
    row.iter()
        .zip(column.iter())
        .try_fold(0i64, |acc, (x, y)| x.checked_mul(*y)?.checked_add(acc))
}

fn write_elements<'a>(
    f: &mut fmt::Formatter<'_>,
    elements: impl Iterator<Item = &'a i64>,
) -> fmt::Result {
    write!(f, "[")?;
    for (i, e) in elements.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", e)?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Vector(v) => write_elements(f, v.iter()),
            Value::Matrix(m) => {
                write!(f, "[")?;
                for (i, row) in m.outer_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_elements(f, row.iter())?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
fn matrix(rows: Vec<Vec<i64>>) -> Value {
    Value::matrix(rows, 1).expect("Failed to build matrix")
}

#[test]
fn test_display() {
    assert_eq!(Value::vector(vec![1, 2, 3]).to_string(), "[1, 2, 3]");
    assert_eq!(Value::vector(vec![42]).to_string(), "[42]");
    assert_eq!(
        matrix(vec![vec![1, 2], vec![3, 4]]).to_string(),
        "[[1, 2], [3, 4]]"
    );
    assert_eq!(matrix(vec![vec![7]]).to_string(), "[[7]]");
}

#[test]
fn test_shape() {
    assert_eq!(Value::vector(vec![1, 2, 3]).shape(), Shape::Vector(3));
    assert_eq!(
        matrix(vec![vec![1, 2, 3], vec![4, 5, 6]]).shape(),
        Shape::Matrix(2, 3)
    );
    assert_eq!(Shape::Vector(3).to_string(), "(3,)");
    assert_eq!(Shape::Matrix(2, 3).to_string(), "(2, 3)");
}

#[test]
fn test_ragged_matrix() {
    match Value::matrix(vec![vec![1, 2], vec![3]], 5) {
        Err(Error::Shape {
            left, right, line, ..
        }) => {
            assert_eq!(left, Shape::Vector(2));
            assert_eq!(right, Shape::Vector(1));
            assert_eq!(line, 5);
        }
        _ => panic!("Ragged matrix accepted"),
    }
}

#[test]
fn test_add() {
    let data = vec![
        (
            Value::vector(vec![1, 2, 3]),
            Value::vector(vec![4, 5, 6]),
            Value::vector(vec![5, 7, 9]),
        ),
        (
            Value::vector(vec![-1, 0]),
            Value::vector(vec![1, 10]),
            Value::vector(vec![0, 10]),
        ),
        (
            matrix(vec![vec![1, 2], vec![3, 4]]),
            matrix(vec![vec![10, 20], vec![30, 40]]),
            matrix(vec![vec![11, 22], vec![33, 44]]),
        ),
    ];

    for (lhs, rhs, expected) in data {
        let sum = lhs.add(&rhs, 1).expect("Failed to add");
        assert_eq!(sum, expected);
        // Addition commutes
        assert_eq!(rhs.add(&lhs, 1).expect("Failed to add"), sum);
    }
}

#[test]
fn test_add_mismatch() {
    let data = vec![
        (Value::vector(vec![1, 2, 3]), Value::vector(vec![1, 2])),
        (
            Value::vector(vec![1, 2]),
            matrix(vec![vec![1, 2], vec![3, 4]]),
        ),
        (
            matrix(vec![vec![1, 2], vec![3, 4]]),
            Value::vector(vec![1, 2]),
        ),
        (
            matrix(vec![vec![1, 2], vec![3, 4]]),
            matrix(vec![vec![1, 2, 3], vec![4, 5, 6]]),
        ),
    ];

    for (lhs, rhs) in data {
        match lhs.add(&rhs, 9) {
            Err(Error::Shape {
                left, right, line, ..
            }) => {
                assert_eq!(left, lhs.shape());
                assert_eq!(right, rhs.shape());
                assert_eq!(line, 9);
            }
            _ => panic!("{} + {} should fail with a shape error", lhs, rhs),
        }
    }
}

#[test]
fn test_add_overflow() {
    let lhs = Value::vector(vec![i64::MAX, 1]);
    let rhs = Value::vector(vec![1, 1]);
    assert!(matches!(lhs.add(&rhs, 1), Err(Error::Overflow { .. })));
}

#[test]
fn test_matmul() {
    let lhs = matrix(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
    let rhs = matrix(vec![vec![5, 6, 7], vec![7, 8, 9]]);
    let product = lhs.matmul(&rhs, 1).expect("Failed to multiply");

    assert_eq!(product.shape(), Shape::Matrix(3, 3));
    assert_eq!(
        product,
        matrix(vec![vec![19, 22, 25], vec![43, 50, 57], vec![67, 78, 89]])
    );

    // (1 x 3) * (3 x 1)
    let lhs = matrix(vec![vec![1, 2, 3]]);
    let rhs = matrix(vec![vec![4], vec![5], vec![6]]);
    assert_eq!(
        lhs.matmul(&rhs, 1).expect("Failed to multiply"),
        matrix(vec![vec![32]])
    );

    // Every cell is the dot product of a row and a column
    let lhs = matrix(vec![vec![2, 0, 1], vec![1, 3, 2]]);
    let rhs = matrix(vec![vec![1, 1], vec![0, 2], vec![4, 1]]);
    let product = match lhs.matmul(&rhs, 1).expect("Failed to multiply") {
        Value::Matrix(m) => m,
        v => panic!("Expected matrix, got {}", v),
    };
    let (l, r) = match (&lhs, &rhs) {
        (Value::Matrix(l), Value::Matrix(r)) => (l, r),
        _ => unreachable!(),
    };
    assert_eq!(product.dim(), (2, 2));
    for ((i, j), cell) in product.indexed_iter() {
        let expected: i64 = (0..3).map(|k| l[[i, k]] * r[[k, j]]).sum();
        assert_eq!(*cell, expected);
    }
}

#[test]
fn test_matmul_mismatch() {
    let lhs = matrix(vec![vec![1, 2], vec![3, 4]]);
    let rhs = matrix(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
    match lhs.matmul(&rhs, 2) {
        Err(Error::Shape { left, right, .. }) => {
            assert_eq!(left, Shape::Matrix(2, 2));
            assert_eq!(right, Shape::Matrix(3, 2));
        }
        _ => panic!("Inner dimension mismatch accepted"),
    }

    let data = vec![
        (Value::vector(vec![1, 2]), Value::vector(vec![1, 2])),
        (Value::vector(vec![1, 2]), lhs.clone()),
        (lhs.clone(), Value::vector(vec![1, 2])),
    ];
    for (l, r) in data {
        match l.matmul(&r, 2) {
            Err(Error::KindMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, Kind::Matrix);
                assert_eq!(found, Kind::Vector);
            }
            _ => panic!("{} * {} should fail with a kind mismatch", l, r),
        }
    }
}

#[test]
fn test_matmul_overflow() {
    let lhs = matrix(vec![vec![i64::MAX, 2]]);
    let rhs = matrix(vec![vec![2], vec![1]]);
    assert!(matches!(
        lhs.matmul(&rhs, 1),
        Err(Error::Overflow { .. })
    ));
}
