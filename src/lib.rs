//! vecmat: a tiny language for declaring vectors and matrices, adding them, multiplying matrices
//! and printing the results.
//!
//! ```text
//! vector v1 = [1, 2, 3]
//! vector v2 = [4, 5, 6]
//! vector v3 = v1 + v2
//! print(v3)
//! ```
//!
//! prints `[5, 7, 9]`.

pub mod lang;

pub use lang::error::{Error, Result};
pub use lang::runtime::{run, Runtime};
