use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Completer, Helper, Highlighter, Hinter, Result};

/// Helper that extends editor
///
/// Only implements the `Validator` trait. Editing goes multiline when a `\` is seen at the end of
/// a line or while brackets are still open, so a matrix literal can be typed one row per line.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        ReplHelper {}
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> Result<ValidationResult> {
        if is_incomplete(ctx.input()) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// More `[` or `(` opened than closed, or a trailing line continuation
fn is_incomplete(input: &str) -> bool {
    let mut depth: i64 = 0;
    for c in input.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            _ => (),
        }
    }

    depth > 0 || input.ends_with('\\')
}

/// Fixup input so the lexer is happy
///
/// Removes the multiline escape created by `ReplHelper`. `\` is not part of the language.
pub fn fixup_input(input: &str) -> String {
    input.replace("\\\n", " ")
}

#[test]
fn test_is_incomplete() {
    let data = vec![
        ("vector v = [1, 2]", false),
        ("print(v)", false),
        ("matrix m = [[1, 2],", true),
        ("matrix m = [[1, 2],\n[3, 4]]", false),
        ("print(", true),
        ("vector v = [1] \\", true),
        // Too many closers is a syntax error for the parser to report, not more input
        ("vector v = [1]]", false),
    ];

    for (input, expected) in data {
        assert_eq!(is_incomplete(input), expected, "input: {}", input);
    }
}

#[test]
fn test_fixup_input() {
    assert_eq!(fixup_input("vector v = \\\n[1]"), "vector v =  [1]");
    assert_eq!(fixup_input("print(v) \\ \nprint(v)"), "print(v) \\ \nprint(v)");
    assert_eq!(fixup_input("print(v)"), "print(v)");
}
