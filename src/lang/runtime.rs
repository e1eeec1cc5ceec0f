use std::io::Write;

use log::{debug, info};

use crate::lang::error::Result;
use crate::lang::eval::Eval;
use crate::lang::lex::tokenize;
use crate::lang::parse::parse;
use crate::lang::value::Value;
use crate::lang::variables::Variables;

pub struct Runtime<'a> {
    eval: Eval<'a>,
}

impl<'a> Runtime<'a> {
    /// Create a new `Runtime` instance
    ///
    /// `sink` is where output should be written. eg. result of `print` statements
    pub fn new(sink: &'a mut dyn Write) -> Self {
        Self {
            eval: Eval::new(sink),
        }
    }

    /// Run a chunk of source against this runtime's variables
    ///
    /// The whole chunk is tokenized and parsed before anything runs, so a lex or syntax error
    /// means no statement in `source` takes effect. Evaluation stops at the first failing
    /// statement.
    pub fn eval(&mut self, source: &str) -> Result<()> {
        let tokens = tokenize(source)?;
        debug!("{} tokens", tokens.len());

        let stmts = parse(&tokens)?;
        info!("running {} statement(s)", stmts.len());

        self.eval.eval(&stmts)
    }

    pub fn variables(&self) -> &Variables<Value> {
        self.eval.variables()
    }
}

/// Run a complete program in a fresh runtime
pub fn run(source: &str, sink: &mut dyn Write) -> Result<()> {
    Runtime::new(sink).eval(source)
}

#[cfg(test)]
use crate::lang::error::Error;

#[cfg(test)]
fn run_to_string(source: &str) -> (Result<()>, String) {
    let mut output = Vec::new();
    let res = run(source, &mut output);
    (res, String::from_utf8(output).expect("Output not utf-8"))
}

#[test]
fn test_syntax_error_runs_nothing() {
    let (res, output) = run_to_string("vector v = [1]\nprint(v)\nvector w [2]\nprint(v)");
    match res {
        Err(Error::Syntax { line, .. }) => assert_eq!(line, 3),
        r => panic!("Expected syntax error, got {:?}", r),
    }
    assert_eq!(output, "");

    let (res, output) = run_to_string("vector v = [1]\nprint(v)\n?");
    assert!(matches!(res, Err(Error::Lex { found: '?', line: 3 })));
    assert_eq!(output, "");
}

#[test]
fn test_eval_error_stops_program() {
    let (res, output) = run_to_string("vector v = [1]\nprint(v)\nprint(w)\nprint(v)");
    match res {
        Err(Error::UndefinedVariable { name, line }) => {
            assert_eq!(name, "w");
            assert_eq!(line, 3);
        }
        r => panic!("Expected undefined variable, got {:?}", r),
    }
    assert_eq!(output, "[1]\n");
}

#[test]
fn test_variables_persist() {
    let mut output = Vec::new();
    let mut runtime = Runtime::new(&mut output);

    assert!(runtime.eval("vector a = [1, 1]").is_ok());
    assert!(runtime.eval("print(missing)").is_err());
    assert!(runtime.eval("vector b = a + a").is_ok());
    assert!(runtime.eval("print(b)").is_ok());
    assert_eq!(runtime.variables().len(), 2);

    drop(runtime);
    assert_eq!(String::from_utf8(output).expect("Output not utf-8"), "[2, 2]\n");
}

#[test]
fn test_independent_runtimes() {
    let mut out_a = Vec::new();
    let mut out_b = Vec::new();
    let mut a = Runtime::new(&mut out_a);
    let mut b = Runtime::new(&mut out_b);

    assert!(a.eval("vector x = [1]").is_ok());
    assert!(matches!(
        b.eval("print(x)"),
        Err(Error::UndefinedVariable { .. })
    ));
    assert!(b.variables().is_empty());
    assert_eq!(a.variables().len(), 1);
}
