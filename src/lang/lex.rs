//! Tokenizer for the vector/matrix language.
//!
//! Each token is recognized by a small PEG built with `pom` over the source characters. Like any
//! PEG the rules are order sensitive: the declaration rule (`vector x`, `matrix m`) must be tried
//! before the plain identifier rule, otherwise `vector` is taken as an identifier and the parser
//! sees two identifiers in a row.
//!
//! Tokens are produced lazily, one `parse_at` per call to `next()`.

use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

use pom::parser::{is_a, one_of, sym, tag, Parser};

use crate::lang::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(i64),
    /// `vector <name>`
    VectorId(String),
    /// `matrix <name>`
    MatrixId(String),
    /// `+`
    Plus,
    /// `*`
    Multiply,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `=`
    Equals,
    /// `print`
    Print,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text the token was matched from
    pub lexeme: String,
    pub line: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

/// Result of one lexer step. Only `Token` is handed out
enum Lexeme {
    Blank,
    Newline,
    Token(TokenKind),
    /// Digits that do not fit in an `i64`
    NumberTooLarge,
}

fn blank<'a>() -> Parser<'a, char, ()> {
    one_of(" \t").repeat(1..).discard()
}

fn name<'a>() -> Parser<'a, char, String> {
    (is_a(|c: char| c.is_ascii_alphabetic() || c == '_')
        + is_a(|c: char| c.is_ascii_alphanumeric() || c == '_').repeat(0..))
    .collect()
    .map(String::from_iter)
}

/// NB: must be tried before `word`
fn declaration<'a>() -> Parser<'a, char, TokenKind> {
    let vector = (tag("vector") * blank() * name()).map(TokenKind::VectorId);
    let matrix = (tag("matrix") * blank() * name()).map(TokenKind::MatrixId);

    vector | matrix
}

/// Identifier or the `print` keyword
///
/// Matching the whole word first keeps `printer` an identifier.
fn word<'a>() -> Parser<'a, char, TokenKind> {
    name().map(|name| {
        if name == "print" {
            TokenKind::Print
        } else {
            TokenKind::Identifier(name)
        }
    })
}

fn number<'a>() -> Parser<'a, char, Lexeme> {
    one_of("0123456789")
        .repeat(1..)
        .collect()
        .map(String::from_iter)
        .map(|digits| match i64::from_str(&digits) {
            Ok(n) => Lexeme::Token(TokenKind::Number(n)),
            Err(_) => Lexeme::NumberTooLarge,
        })
}

fn punctuation<'a>() -> Parser<'a, char, TokenKind> {
    sym('+').map(|_| TokenKind::Plus)
        | sym('*').map(|_| TokenKind::Multiply)
        | sym('(').map(|_| TokenKind::LParen)
        | sym(')').map(|_| TokenKind::RParen)
        | sym('[').map(|_| TokenKind::LBracket)
        | sym(']').map(|_| TokenKind::RBracket)
        | sym(',').map(|_| TokenKind::Comma)
        | sym('=').map(|_| TokenKind::Equals)
}

fn lexeme<'a>() -> Parser<'a, char, Lexeme> {
    let blank = blank().map(|_| Lexeme::Blank);
    let newline = (tag("\r\n") | tag("\n") | tag("\r")).map(|_| Lexeme::Newline);
    let token = (declaration() | word() | punctuation()).map(Lexeme::Token);

    blank | newline | token | number()
}

/// Lazy token stream over a source string
///
/// Yields exactly one `Eof` token after the last real token. After an error or `Eof` the
/// iterator is exhausted. Clone it before iterating to replay the stream.
#[derive(Clone)]
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    done: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            done: false,
        }
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.pos >= self.input.len() {
                self.done = true;
                return Some(Ok(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    line: self.line,
                }));
            }

            let start = self.pos;
            let (lexeme, end) = match lexeme().parse_at(&self.input, start) {
                Ok(parsed) => parsed,
                Err(_) => {
                    self.done = true;
                    return Some(Err(Error::Lex {
                        found: self.input[start],
                        line: self.line,
                    }));
                }
            };
            self.pos = end;

            match lexeme {
                Lexeme::Blank => (),
                Lexeme::Newline => self.line += 1,
                Lexeme::Token(kind) => {
                    return Some(Ok(Token {
                        kind,
                        lexeme: String::from_iter(&self.input[start..end]),
                        line: self.line,
                    }))
                }
                Lexeme::NumberTooLarge => {
                    self.done = true;
                    return Some(Err(Error::Overflow {
                        op: "integer literal",
                        line: self.line,
                    }));
                }
            }
        }
    }
}

/// Tokenize all of `input`, stopping at the first error
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).collect()
}

#[cfg(test)]
fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .expect("Failed to tokenize")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("+ * ( ) [ ] , ="),
        vec![
            TokenKind::Plus,
            TokenKind::Multiply,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Comma,
            TokenKind::Equals,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_words() {
    let data = vec![
        ("x", vec![TokenKind::Identifier("x".to_string())]),
        ("_a1_b2", vec![TokenKind::Identifier("_a1_b2".to_string())]),
        ("print", vec![TokenKind::Print]),
        ("printer", vec![TokenKind::Identifier("printer".to_string())]),
        ("print_x", vec![TokenKind::Identifier("print_x".to_string())]),
        ("vector v1", vec![TokenKind::VectorId("v1".to_string())]),
        ("matrix \t m", vec![TokenKind::MatrixId("m".to_string())]),
        // No whitespace, so not a declaration
        ("vectorx", vec![TokenKind::Identifier("vectorx".to_string())]),
        (
            "matrix",
            vec![TokenKind::Identifier("matrix".to_string())],
        ),
        (
            "vector = x",
            vec![
                TokenKind::Identifier("vector".to_string()),
                TokenKind::Equals,
                TokenKind::Identifier("x".to_string()),
            ],
        ),
        (
            "vector x vector y",
            vec![
                TokenKind::VectorId("x".to_string()),
                TokenKind::VectorId("y".to_string()),
            ],
        ),
    ];

    for (input, mut expected) in data {
        expected.push(TokenKind::Eof);
        assert_eq!(kinds(input), expected, "input: {}", input);
    }
}

#[test]
fn test_numbers() {
    assert_eq!(
        kinds("0 7 0042 123456"),
        vec![
            TokenKind::Number(0),
            TokenKind::Number(7),
            TokenKind::Number(42),
            TokenKind::Number(123456),
            TokenKind::Eof,
        ]
    );
    assert_eq!(
        kinds(&i64::MAX.to_string()),
        vec![TokenKind::Number(i64::MAX), TokenKind::Eof]
    );

    match tokenize("vector v = [99999999999999999999]") {
        Err(Error::Overflow { line, .. }) => assert_eq!(line, 1),
        _ => panic!("Oversized literal accepted"),
    }
}

#[test]
fn test_statement() {
    let tokens = tokenize("vector v1 = [1, 2]").expect("Failed to tokenize");
    let expected = vec![
        (TokenKind::VectorId("v1".to_string()), "vector v1"),
        (TokenKind::Equals, "="),
        (TokenKind::LBracket, "["),
        (TokenKind::Number(1), "1"),
        (TokenKind::Comma, ","),
        (TokenKind::Number(2), "2"),
        (TokenKind::RBracket, "]"),
        (TokenKind::Eof, ""),
    ];

    assert_eq!(tokens.len(), expected.len());
    for (token, (kind, lexeme)) in tokens.iter().zip(expected) {
        assert_eq!(token.kind, kind);
        assert_eq!(token.lexeme, lexeme);
        assert_eq!(token.line, 1);
    }
}

#[test]
fn test_lines() {
    let tokens = tokenize("vector a = [1]\n\nprint(a)\r\nprint(a)\r").expect("Failed to tokenize");
    let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
    assert_eq!(
        lines,
        vec![1, 1, 1, 1, 1, 3, 3, 3, 3, 4, 4, 4, 4, 5]
    );
}

#[test]
fn test_lex_error() {
    let data = vec![
        ("vector a = [1] $", '$', 1),
        ("print(a)\n\nx - y", '-', 3),
        ("#comment", '#', 1),
        ("vector a = [1.5]", '.', 1),
    ];

    for (input, expected_char, expected_line) in data {
        match tokenize(input) {
            Err(Error::Lex { found, line }) => {
                assert_eq!(found, expected_char);
                assert_eq!(line, expected_line);
            }
            _ => panic!("Lexing should have failed: {}", input),
        }
    }
}

#[test]
fn test_lazy_and_restartable() {
    let mut lexer = Lexer::new("print(x) @ print(y)");
    let replay = lexer.clone();

    // Tokens before the bad character are handed out before the error
    assert!(matches!(
        lexer.next(),
        Some(Ok(Token {
            kind: TokenKind::Print,
            ..
        }))
    ));
    assert_eq!(lexer.by_ref().take_while(|t| t.is_ok()).count(), 3);
    assert!(lexer.next().is_none());

    // The clone starts over from the beginning
    let replayed: Vec<Result<Token>> = replay.collect();
    assert_eq!(replayed.len(), 5);
    assert!(matches!(replayed[4], Err(Error::Lex { found: '@', .. })));
}
