use std::io::Write;

use log::debug;

use crate::lang::ast::*;
use crate::lang::error::{Error, Result};
use crate::lang::value::Value;
use crate::lang::variables::Variables;

pub struct Eval<'a> {
    /// Where `print` output goes
    sink: &'a mut dyn Write,
    variables: Variables<Value>,
}

impl<'a> Eval<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Self {
            sink,
            variables: Variables::new(),
        }
    }

    pub fn variables(&self) -> &Variables<Value> {
        &self.variables
    }

    fn lookup(&self, ident: &Identifier, line: usize) -> Result<&Value> {
        self.variables
            .get(ident)
            .ok_or_else(|| Error::UndefinedVariable {
                name: ident.to_string(),
                line,
            })
    }

    fn eval_literal(&self, literal: &Literal, line: usize) -> Result<Value> {
        match literal {
            Literal::Vector(elements) => Ok(Value::vector(elements.clone())),
            Literal::Matrix(rows) => Value::matrix(rows.clone(), line),
        }
    }

    /// Fold the operands into `head` from left to right
    fn eval_binop_expr(
        &self,
        head: &Expression,
        rest: &[(BinaryOp, Expression, usize)],
    ) -> Result<Value> {
        let mut acc = self.eval_expr(head)?;
        for (op, operand, line) in rest {
            let rhs = self.eval_expr(operand)?;
            acc = match op {
                BinaryOp::Plus => acc.add(&rhs, *line)?,
                BinaryOp::Multiply => acc.matmul(&rhs, *line)?,
            };
            debug!("line {}: `{}` produced shape {}", line, op.op_str(), acc.shape());
        }

        Ok(acc)
    }

    fn eval_expr(&self, expr: &Expression) -> Result<Value> {
        match expr {
            Expression::Literal(literal, line) => self.eval_literal(literal, *line),
            Expression::Identifier(ident, line) => self.lookup(ident, *line).map(Clone::clone),
            Expression::Paren(expr) => self.eval_expr(expr),
            Expression::BinaryExpression(head, rest) => self.eval_binop_expr(head, rest),
        }
    }

    /// Run a single statement
    ///
    /// Everything that can fail is checked before the variable table or the sink is touched, so
    /// a failed statement leaves no trace.
    fn eval_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign {
                kind,
                ident,
                expr,
                line,
            } => {
                let val = self.eval_expr(expr)?;
                if val.kind() != *kind {
                    return Err(Error::KindMismatch {
                        context: format!("declaration of `{}`", ident),
                        expected: *kind,
                        found: val.kind(),
                        line: *line,
                    });
                }

                debug!("line {}: {} {} = {}", line, kind, ident, val);
                self.variables.insert(ident.clone(), val);
            }
            Statement::Print { ident, line } => {
                let rendered = self.lookup(ident, *line)?.to_string();
                writeln!(self.sink, "{}", rendered)?;
            }
        }

        Ok(())
    }

    /// Run statements in order, stopping at the first failure
    ///
    /// Statements before the failing one stay applied.
    pub fn eval(&mut self, stmts: &[Statement]) -> Result<()> {
        for stmt in stmts {
            if let Err(e) = self.eval_statement(stmt) {
                debug!("statement on line {} failed: {}", stmt.line(), e);
                return Err(e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
use crate::lang::{lex::tokenize, parse::parse};

#[cfg(test)]
fn parse_str(input: &str) -> Vec<Statement> {
    parse(&tokenize(input).expect("Failed to tokenize")).expect("Failed to parse")
}

#[test]
fn test_expression() {
    {
        let tests = vec![
            ("vector v = [1, 2, 3] print(v)", "[1, 2, 3]\n"),
            ("vector v = [0] print(v)", "[0]\n"),
            ("vector v = [1, 2] + [10, 20] print(v)", "[11, 22]\n"),
            ("vector v = [1] + [1] + [1] print(v)", "[3]\n"),
            ("matrix m = [[1, 2], [3, 4]] print(m)", "[[1, 2], [3, 4]]\n"),
            (
                "matrix m = [[1, 2], [3, 4]] + [[1, 1], [1, 1]] print(m)",
                "[[2, 3], [4, 5]]\n",
            ),
            (
                "matrix m = [[1, 2], [3, 4]] * [[1, 0], [0, 1]] print(m)",
                "[[1, 2], [3, 4]]\n",
            ),
            (
                "matrix i = [[1, 0], [0, 1]] matrix m = [[2, 3], [4, 5]] matrix m = i * m + i print(m)",
                "[[3, 3], [4, 6]]\n",
            ),
            // Left to right: ([[1]] + [[1]]) * [[3]]
            ("matrix m = [[1]] + [[1]] * [[3]] print(m)", "[[6]]\n"),
            ("matrix m = [[1]] + ([[1]] * [[3]]) print(m)", "[[4]]\n"),
            (
                "vector a = [1, 2] vector b = a vector a = [5, 5] print(a) print(b)",
                "[5, 5]\n[1, 2]\n",
            ),
        ];

        for (input, expected) in tests {
            let mut output = Vec::new();
            let mut eval = Eval::new(&mut output);
            if let Err(e) = eval.eval(&parse_str(input)) {
                panic!("Failed to eval '{}': {}", input, e);
            }
            assert_eq!(
                String::from_utf8(output).expect("Output not utf-8"),
                expected
            );
        }
    }
    {
        let tests = vec![
            "print(nope)",
            "vector v = nope",
            "vector v = [1] + nope",
            "vector v = [1, 2] + [1, 2, 3]",
            "vector v = [1, 2] + [[1, 2]]",
            "matrix m = [[1, 2], [3, 4]] + [[1, 2, 3], [4, 5, 6]]",
            "matrix m = [[1, 2]] * [[1, 2]]",
            "matrix m = [[1, 2], [3]]",
            "vector v = [1] * [1]",
            "matrix m = [1, 2] * [[1], [2]]",
            "vector v = [[1, 2]]",
            "matrix m = [1, 2]",
        ];

        for input in tests {
            let mut output = Vec::new();
            let mut eval = Eval::new(&mut output);
            match eval.eval(&parse_str(input)) {
                Err(_) => (),
                Ok(_) => panic!("Eval of '{}' succeeded when should have failed", input),
            };
            assert!(eval.variables().is_empty());
        }
    }
}

#[test]
fn test_errors() {
    let tests = vec![
        ("print(nope)", "UndefinedVariable", 1),
        ("vector v = [1]\n\nvector w = v + u", "UndefinedVariable", 3),
        ("vector v = [1, 2]\n+ [1, 2, 3]", "Shape", 2),
        ("vector v = [1, 2] + [[1, 2]]", "Shape", 1),
        ("matrix m = [[1, 2],\n[3]]", "Shape", 1),
        ("matrix m = [[1, 2]] * [[1, 2]]", "Shape", 1),
        ("vector v = [1] * [1]", "KindMismatch", 1),
        ("\nvector v = [[1]]", "KindMismatch", 2),
        ("matrix m = [1]", "KindMismatch", 1),
        ("vector v = [9223372036854775807] + [1]", "Overflow", 1),
    ];

    for (input, expected_kind, expected_line) in tests {
        let mut output = Vec::new();
        let mut eval = Eval::new(&mut output);
        let err = match eval.eval(&parse_str(input)) {
            Err(e) => e,
            Ok(_) => panic!("Eval of '{}' succeeded when should have failed", input),
        };

        let kind = match err {
            Error::UndefinedVariable { .. } => "UndefinedVariable",
            Error::Shape { .. } => "Shape",
            Error::KindMismatch { .. } => "KindMismatch",
            Error::Overflow { .. } => "Overflow",
            _ => "other",
        };
        assert_eq!(kind, expected_kind, "input: {}", input);
        assert_eq!(err.line(), Some(expected_line), "input: {}", input);
    }
}

#[test]
fn test_failed_statement_is_atomic() {
    let mut output = Vec::new();
    let mut eval = Eval::new(&mut output);

    let stmts = parse_str("vector v = [1, 2] print(v) vector v = v + [1] print(v)");
    assert!(matches!(eval.eval(&stmts), Err(Error::Shape { .. })));

    // First assignment and print happened, the failed reassignment did not
    assert_eq!(eval.variables().len(), 1);
    assert_eq!(
        eval.variables().get(&Identifier("v".to_string())),
        Some(&Value::vector(vec![1, 2]))
    );

    // An undefined name never creates an entry either
    assert!(eval.eval(&parse_str("vector w = missing")).is_err());
    assert_eq!(eval.variables().get(&Identifier("w".to_string())), None);

    drop(eval);
    assert_eq!(String::from_utf8(output).expect("Output not utf-8"), "[1, 2]\n");
}

#[test]
fn test_long_chain() {
    let mut input = String::from("vector v = [1]\nvector w = v");
    for _ in 0..10_000 {
        input.push_str(" + v");
    }
    input.push_str("\nprint(w)");

    let mut output = Vec::new();
    let mut eval = Eval::new(&mut output);
    if let Err(e) = eval.eval(&parse_str(&input)) {
        panic!("Failed to eval long chain: {}", e);
    }
    drop(eval);
    assert_eq!(String::from_utf8(output).expect("Output not utf-8"), "[10001]\n");
}

#[test]
fn test_print_undefined_writes_nothing() {
    let mut output = Vec::new();
    let mut eval = Eval::new(&mut output);
    assert!(matches!(
        eval.eval(&parse_str("print(v)")),
        Err(Error::UndefinedVariable { .. })
    ));
    drop(eval);
    assert!(output.is_empty());
}
