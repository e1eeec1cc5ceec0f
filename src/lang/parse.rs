//! Parser for the vector/matrix language.
//!
//! The grammar is a PEG over the token stream produced by `lex`. It is small enough to list in
//! full:
//!
//! ```text
//! program        <- statement* EOF
//! statement      <- (VECTOR_ID | MATRIX_ID) '=' expression
//!                 / PRINT '(' IDENTIFIER ')'
//! expression     <- term (('+' / '*') term)*
//! term           <- matrix_literal / vector_literal / IDENTIFIER / '(' expression ')'
//! matrix_literal <- '[' row (',' row)* ']'
//! row            <- '[' NUMBER (',' NUMBER)* ']'
//! vector_literal <- '[' NUMBER (',' NUMBER)* ']'
//! ```
//!
//! Developer notes:
//!
//! * Vector and matrix literals share the opening `[`. The matrix rule is tried first; it fails
//!   on the first number it sees, after which the vector rule gets its turn.
//!
//! * `+` and `*` share a single precedence level and associate to the left, so `a + b * c` is
//!   `(a + b) * c`. Use parentheses for anything else. The operators cannot be written as the
//!   left recursive `expression <- expression '+' expression` (PEGs loop forever on left
//!   recursion), so the rule takes a head term and folds the repetition left.
//!
//! * Statements are dispatched on their first token rather than through an ordered choice.
//!   This way an error deep inside an assignment is reported where it happened instead of at the
//!   start of the statement.
//!
//! * Parentheses are the only construct the parser (and later the evaluator) recurses on. Their
//!   nesting is capped at `MAX_NESTING` so a pathological program is a syntax error instead of a
//!   stack overflow.

use pom::parser::{call, Parser};
use pom::Error as PomError;

use crate::lang::ast::*;
use crate::lang::error::{Error, Result};
use crate::lang::lex::{Token, TokenKind};
use crate::lang::value::Kind;

/// How deep parentheses may nest inside one statement
pub const MAX_NESTING: usize = 64;

fn error_position(e: &PomError) -> Option<usize> {
    match e {
        PomError::Mismatch { position, .. }
        | PomError::Conversion { position, .. }
        | PomError::Expect { position, .. }
        | PomError::Custom { position, .. } => Some(*position),
        _ => None,
    }
}

/// Build the user facing error for a failure at token index `pos`
///
/// Running into end of input is blamed on the line of the last real token, not on whatever
/// trailing blank lines follow it.
fn syntax_error(tokens: &[Token], pos: usize) -> Error {
    let pos = pos.min(tokens.len().saturating_sub(1));
    match tokens.get(pos) {
        Some(token) => {
            let line = match (&token.kind, pos.checked_sub(1)) {
                (TokenKind::Eof, Some(prev)) => tokens[prev].line,
                _ => token.line,
            };

            Error::Syntax {
                found: token.to_string(),
                line,
            }
        }
        None => Error::Syntax {
            found: "end of input".to_string(),
            line: 1,
        },
    }
}

/// Match a single token and extract something from it with `f`
fn select<'a, O: 'a>(expected: &'static str, f: fn(&Token) -> Option<O>) -> Parser<'a, Token, O> {
    Parser::new(move |input: &'a [Token], start: usize| match input.get(start) {
        Some(token) => match f(token) {
            Some(out) => Ok((out, start + 1)),
            None => Err(PomError::Mismatch {
                message: format!("expect {}, found {}", expected, token),
                position: start,
            }),
        },
        None => Err(PomError::Incomplete),
    })
}

/// Match a token without payload. Yields the token's line
fn punct<'a>(expected: TokenKind) -> Parser<'a, Token, usize> {
    Parser::new(move |input: &'a [Token], start: usize| match input.get(start) {
        Some(token) if token.kind == expected => Ok((token.line, start + 1)),
        Some(token) => Err(PomError::Mismatch {
            message: format!("expect {:?}, found {}", expected, token),
            position: start,
        }),
        None => Err(PomError::Incomplete),
    })
}

/// Ordered choice that, when every alternative fails, reports the failure that got furthest
fn choice<'a, O: 'a>(alternatives: Vec<Parser<'a, Token, O>>) -> Parser<'a, Token, O> {
    Parser::new(move |input: &'a [Token], start: usize| {
        let mut furthest: Option<PomError> = None;
        for parser in &alternatives {
            match parser.parse_at(input, start) {
                Ok(out) => return Ok(out),
                Err(e) => {
                    let further = furthest
                        .as_ref()
                        .map_or(true, |f| error_position(&e) > error_position(f));
                    if further {
                        furthest = Some(e);
                    }
                }
            }
        }

        Err(furthest.unwrap_or(PomError::Incomplete))
    })
}

fn number<'a>() -> Parser<'a, Token, i64> {
    select("number", |t| match &t.kind {
        TokenKind::Number(n) => Some(*n),
        _ => None,
    })
}

fn ident<'a>() -> Parser<'a, Token, (Identifier, usize)> {
    select("identifier", |t| match &t.kind {
        TokenKind::Identifier(name) => Some((Identifier(name.clone()), t.line)),
        _ => None,
    })
}

/// `print` is a keyword, so a variable by that name could never be read back
fn declaration<'a>() -> Parser<'a, Token, (Kind, Identifier, usize)> {
    select("declaration", |t| match &t.kind {
        TokenKind::VectorId(name) | TokenKind::MatrixId(name) if name == "print" => None,
        TokenKind::VectorId(name) => Some((Kind::Vector, Identifier(name.clone()), t.line)),
        TokenKind::MatrixId(name) => Some((Kind::Matrix, Identifier(name.clone()), t.line)),
        _ => None,
    })
}

/// One or more comma separated numbers
fn numbers<'a>() -> Parser<'a, Token, Vec<i64>> {
    let numbers = number() + (punct(TokenKind::Comma) * number()).repeat(0..);
    numbers.map(|(first, mut rest)| {
        rest.insert(0, first);
        rest
    })
}

fn row<'a>() -> Parser<'a, Token, Vec<i64>> {
    punct(TokenKind::LBracket) * numbers() - punct(TokenKind::RBracket)
}

fn matrix_literal<'a>() -> Parser<'a, Token, Expression> {
    let rows = row() + (punct(TokenKind::Comma) * row()).repeat(0..);
    let matrix = punct(TokenKind::LBracket) + rows - punct(TokenKind::RBracket);

    matrix.map(|(line, (first, mut rest))| {
        rest.insert(0, first);
        Expression::Literal(Literal::Matrix(rest), line)
    })
}

fn vector_literal<'a>() -> Parser<'a, Token, Expression> {
    let vector = punct(TokenKind::LBracket) + numbers() - punct(TokenKind::RBracket);
    vector.map(|(line, elements)| Expression::Literal(Literal::Vector(elements), line))
}

fn term<'a>() -> Parser<'a, Token, Expression> {
    let ident = ident().map(|(ident, line)| Expression::Identifier(ident, line));
    let paren = (punct(TokenKind::LParen) * call(expr) - punct(TokenKind::RParen))
        .map(|e| Expression::Paren(Box::new(e)));

    // NB: matrix literal must come before vector literal
    choice(vec![matrix_literal(), vector_literal(), ident, paren])
}

/// Parse an expression
///
/// The operators are kept in source order; the evaluator applies them left to right, ie.
/// `a + b * c + d` is `((a + b) * c) + d`.
fn expr<'a>() -> Parser<'a, Token, Expression> {
    let op = punct(TokenKind::Plus).map(|line| (BinaryOp::Plus, line))
        | punct(TokenKind::Multiply).map(|line| (BinaryOp::Multiply, line));
    let parser = call(term) + (op + call(term)).repeat(0..);

    parser.map(|(head, rest)| {
        if rest.is_empty() {
            return head;
        }

        let rest = rest
            .into_iter()
            .map(|((op, line), operand)| (op, operand, line))
            .collect();
        Expression::BinaryExpression(Box::new(head), rest)
    })
}

fn assign_stmt<'a>() -> Parser<'a, Token, Statement> {
    let assignment = declaration() - punct(TokenKind::Equals) + expr();
    assignment.map(|((kind, ident, line), expr)| Statement::Assign {
        kind,
        ident,
        expr,
        line,
    })
}

fn print_stmt<'a>() -> Parser<'a, Token, Statement> {
    let print = punct(TokenKind::Print) - punct(TokenKind::LParen) + ident()
        - punct(TokenKind::RParen);
    print.map(|(line, (ident, _))| Statement::Print { ident, line })
}

/// Reject parentheses nested deeper than `MAX_NESTING` in the statement starting at `start`
fn check_nesting(tokens: &[Token], start: usize) -> Result<()> {
    let mut depth = 0usize;
    for (pos, token) in tokens.iter().enumerate().skip(start) {
        match &token.kind {
            TokenKind::LParen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(syntax_error(tokens, pos));
                }
            }
            TokenKind::RParen => depth = depth.saturating_sub(1),
            // Start of the next statement
            TokenKind::VectorId(_) | TokenKind::MatrixId(_) | TokenKind::Print | TokenKind::Eof
                if pos > start =>
            {
                break
            }
            _ => (),
        }
    }

    Ok(())
}

/// Parse a complete program
///
/// `tokens` is expected to end with an `Eof` token, as produced by `lex::tokenize`. Parsing
/// stops at the first syntax error.
pub fn parse(tokens: &[Token]) -> Result<Vec<Statement>> {
    let mut stmts = Vec::new();
    let mut pos = 0;

    while let Some(token) = tokens.get(pos) {
        check_nesting(tokens, pos)?;

        let parsed = match token.kind {
            TokenKind::Eof => break,
            TokenKind::VectorId(_) | TokenKind::MatrixId(_) => assign_stmt().parse_at(tokens, pos),
            TokenKind::Print => print_stmt().parse_at(tokens, pos),
            _ => return Err(syntax_error(tokens, pos)),
        };

        match parsed {
            Ok((stmt, end)) => {
                stmts.push(stmt);
                pos = end;
            }
            Err(e) => {
                let failed_at = error_position(&e).unwrap_or_else(|| tokens.len());
                return Err(syntax_error(tokens, failed_at));
            }
        }
    }

    Ok(stmts)
}

#[cfg(test)]
use crate::lang::lex::tokenize;

#[cfg(test)]
fn parse_str(input: &str) -> Result<Vec<Statement>> {
    parse(&tokenize(input).expect("Failed to tokenize"))
}

#[cfg(test)]
fn ident_expr(name: &str, line: usize) -> Expression {
    Expression::Identifier(Identifier(name.to_string()), line)
}

#[cfg(test)]
fn chain(head: Expression, rest: Vec<(BinaryOp, Expression)>) -> Expression {
    let rest = rest.into_iter().map(|(op, e)| (op, e, 1)).collect();
    Expression::BinaryExpression(Box::new(head), rest)
}

#[test]
fn test_literal() {
    let data = vec![
        ("[7]", Expression::Literal(Literal::Vector(vec![7]), 1)),
        (
            "[1, 2, 3]",
            Expression::Literal(Literal::Vector(vec![1, 2, 3]), 1),
        ),
        (
            "[[1, 2], [3, 4]]",
            Expression::Literal(Literal::Matrix(vec![vec![1, 2], vec![3, 4]]), 1),
        ),
        (
            "[[5]]",
            Expression::Literal(Literal::Matrix(vec![vec![5]]), 1),
        ),
        // Ragged rows parse fine, the shape check happens on evaluation
        (
            "[[1, 2],\n [3]]",
            Expression::Literal(Literal::Matrix(vec![vec![1, 2], vec![3]]), 1),
        ),
    ];

    for (input, expected) in data {
        let tokens = tokenize(input).expect("Failed to tokenize");
        assert_eq!(expr().parse(&tokens), Ok(expected));
    }
}

#[test]
fn test_arith_expr() {
    let data = vec![
        ("a", ident_expr("a", 1)),
        (
            "a + b",
            chain(ident_expr("a", 1), vec![(BinaryOp::Plus, ident_expr("b", 1))]),
        ),
        (
            "a * b",
            chain(ident_expr("a", 1), vec![(BinaryOp::Multiply, ident_expr("b", 1))]),
        ),
        (
            "a + b * c",
            chain(
                ident_expr("a", 1),
                vec![
                    (BinaryOp::Plus, ident_expr("b", 1)),
                    (BinaryOp::Multiply, ident_expr("c", 1)),
                ],
            ),
        ),
        (
            "a * b + c",
            chain(
                ident_expr("a", 1),
                vec![
                    (BinaryOp::Multiply, ident_expr("b", 1)),
                    (BinaryOp::Plus, ident_expr("c", 1)),
                ],
            ),
        ),
        (
            "a + (b * c)",
            chain(
                ident_expr("a", 1),
                vec![(
                    BinaryOp::Plus,
                    Expression::Paren(Box::new(chain(
                        ident_expr("b", 1),
                        vec![(BinaryOp::Multiply, ident_expr("c", 1))],
                    ))),
                )],
            ),
        ),
        (
            "[1] +\n[2]",
            Expression::BinaryExpression(
                Box::new(Expression::Literal(Literal::Vector(vec![1]), 1)),
                vec![(
                    BinaryOp::Plus,
                    Expression::Literal(Literal::Vector(vec![2]), 2),
                    1,
                )],
            ),
        ),
    ];

    for (input, expected) in data {
        let tokens = tokenize(input).expect("Failed to tokenize");
        assert_eq!(expr().parse(&tokens), Ok(expected));
    }
}

#[test]
fn test_long_chain_stays_flat() {
    let mut input = String::from("v");
    for _ in 0..10_000 {
        input.push_str(" + v");
    }

    let tokens = tokenize(&input).expect("Failed to tokenize");
    match expr().parse(&tokens) {
        Ok(Expression::BinaryExpression(head, rest)) => {
            assert_eq!(*head, ident_expr("v", 1));
            assert_eq!(rest.len(), 10_000);
            assert!(rest.iter().all(|(op, _, _)| *op == BinaryOp::Plus));
        }
        r => panic!("Expected a flat chain, got {:?}", r),
    };
}

#[test]
fn test_nesting_limit() {
    let nested = |depth: usize| {
        format!(
            "vector a = [1]\nvector v = {}a{}",
            "(".repeat(depth),
            ")".repeat(depth)
        )
    };

    assert_eq!(
        parse_str(&nested(MAX_NESTING))
            .expect("Failed to parse")
            .len(),
        2
    );
    // The limit is per statement
    let twice = format!("{}\n{}", nested(MAX_NESTING), nested(MAX_NESTING));
    assert_eq!(parse_str(&twice).expect("Failed to parse").len(), 4);
    let siblings = format!("vector v = {}", vec!["(a)"; 1000].join(" + "));
    assert_eq!(parse_str(&siblings).expect("Failed to parse").len(), 1);

    for depth in vec![MAX_NESTING + 1, 10_000] {
        match parse_str(&nested(depth)) {
            Err(Error::Syntax { found, line }) => {
                assert_eq!(found, "'('");
                assert_eq!(line, 2);
            }
            r => panic!("Nesting {} deep should have failed, got {:?}", depth, r),
        }
    }
}

#[test]
fn test_assign_stmt() {
    let data = vec![
        (
            "vector v1 = [1, 2, 3]",
            Statement::Assign {
                kind: Kind::Vector,
                ident: Identifier("v1".to_string()),
                expr: Expression::Literal(Literal::Vector(vec![1, 2, 3]), 1),
                line: 1,
            },
        ),
        (
            "matrix m3 = m1 * m2",
            Statement::Assign {
                kind: Kind::Matrix,
                ident: Identifier("m3".to_string()),
                expr: chain(
                    ident_expr("m1", 1),
                    vec![(BinaryOp::Multiply, ident_expr("m2", 1))],
                ),
                line: 1,
            },
        ),
        // Declared kind is not checked by the parser
        (
            "vector v = [[1]]",
            Statement::Assign {
                kind: Kind::Vector,
                ident: Identifier("v".to_string()),
                expr: Expression::Literal(Literal::Matrix(vec![vec![1]]), 1),
                line: 1,
            },
        ),
        // Only the exact keyword is reserved
        (
            "vector printer = [1]",
            Statement::Assign {
                kind: Kind::Vector,
                ident: Identifier("printer".to_string()),
                expr: Expression::Literal(Literal::Vector(vec![1]), 1),
                line: 1,
            },
        ),
    ];

    for (input, expected) in data {
        assert_eq!(parse_str(input).expect("Failed to parse"), vec![expected]);
    }
}

#[test]
fn test_print_stmt() {
    assert_eq!(
        parse_str("print(v3)").expect("Failed to parse"),
        vec![Statement::Print {
            ident: Identifier("v3".to_string()),
            line: 1,
        }]
    );
    assert_eq!(
        parse_str("print ( v3 )").expect("Failed to parse"),
        vec![Statement::Print {
            ident: Identifier("v3".to_string()),
            line: 1,
        }]
    );
}

#[test]
fn test_program() {
    let input = r#"
vector v1 = [1, 2, 3]
vector v2 = [4, 5, 6]
vector v3 = v1 + v2
print(v3)
"#;
    let stmts = parse_str(input).expect("Failed to parse");
    let lines: Vec<usize> = stmts.iter().map(Statement::line).collect();
    assert_eq!(lines, vec![2, 3, 4, 5]);
    assert_eq!(
        stmts[2],
        Statement::Assign {
            kind: Kind::Vector,
            ident: Identifier("v3".to_string()),
            expr: Expression::BinaryExpression(
                Box::new(ident_expr("v1", 4)),
                vec![(BinaryOp::Plus, ident_expr("v2", 4), 4)],
            ),
            line: 4,
        }
    );

    // No terminators needed
    assert_eq!(
        parse_str("vector a = [1] print(a) print(a)")
            .expect("Failed to parse")
            .len(),
        3
    );
    assert!(parse_str("").expect("Failed to parse").is_empty());
    assert!(parse_str("\n\n").expect("Failed to parse").is_empty());
}

#[test]
fn test_syntax_error() {
    let data = vec![
        // Missing `=`
        ("vector v = [1]\nvector w [1]", "'['", 2),
        // Unmatched bracket
        ("vector v = [1, 2", "end of input", 1),
        ("vector v = [1, 2\nprint(v)", "'print'", 2),
        ("matrix m = [[1, 2], [3, 4]", "end of input", 1),
        ("vector v = [1, 2]]", "']'", 1),
        // Empty literal
        ("vector v = []", "']'", 1),
        ("vector v = [1,]", "','", 1),
        ("matrix m = [[]]", "']'", 1),
        ("matrix m = [[1], []]", "','", 1),
        // `print` cannot be declared
        ("vector print = [1]", "'vector print'", 1),
        ("vector a = [1]\nmatrix print = [[1]]", "'matrix print'", 2),
        // Statement cannot start with an expression
        ("v + w", "'v'", 1),
        ("\n\n42", "'42'", 3),
        ("print(v", "end of input", 1),
        ("print v", "'v'", 1),
        ("print([1])", "'['", 1),
        ("vector v = ", "end of input", 1),
        ("vector v = [1] +", "'+'", 1),
        ("vector v = (a + b", "end of input", 1),
    ];

    for (input, expected_found, expected_line) in data {
        match parse_str(input) {
            Err(Error::Syntax { found, line }) => {
                assert_eq!(found, expected_found, "input: {}", input);
                assert_eq!(line, expected_line, "input: {}", input);
            }
            r => panic!("Parsing '{}' should have failed, got {:?}", input, r),
        }
    }
}
