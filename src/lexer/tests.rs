//! Unit tests for the lexer module.
//!
//! Covers keywords, literals, operators, positions and the
//! indentation tokens.

use super::{lexer::tokenize, tokens::TokenKind};
use crate::Position;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let tokens = tokenize("def class return if elif else while pass and or not is True False None").unwrap();

    let expected = vec![
        TokenKind::Def,
        TokenKind::Class,
        TokenKind::Return,
        TokenKind::If,
        TokenKind::Elif,
        TokenKind::Else,
        TokenKind::While,
        TokenKind::Pass,
        TokenKind::And,
        TokenKind::Or,
        TokenKind::Not,
        TokenKind::Is,
        TokenKind::True,
        TokenKind::False,
        TokenKind::None,
        TokenKind::Newline,
        TokenKind::EOF,
    ];

    assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), expected);
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo baz_123 _under CamelCase").unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[1].value, "baz_123");
    assert_eq!(tokens[2].value, "_under");
    assert_eq!(tokens[3].value, "CamelCase");
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 0 128").unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].value, "0");
    assert_eq!(tokens[2].value, "128");
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("+ - * // % < <= > >= == != = -> . : ,"),
        vec![
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::DoubleSlash,
            TokenKind::Percent,
            TokenKind::Less,
            TokenKind::LessEquals,
            TokenKind::Greater,
            TokenKind::GreaterEquals,
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::Assignment,
            TokenKind::Arrow,
            TokenKind::Dot,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_strings_with_escapes() {
    let tokens = tokenize(r#"s: str = "a\tb\n" + 'it\'s'"#).unwrap();

    assert_eq!(tokens[4].kind, TokenKind::String);
    assert_eq!(tokens[4].value, "a\tb\n");
    assert_eq!(tokens[6].value, "it's");
}

#[test]
fn test_unterminated_string() {
    let error = tokenize("x: str = \"abc").unwrap_err();
    assert_eq!(error.get_error_name(), "ParseError");
    assert_eq!(error.get_position().col, 9);
}

#[test]
fn test_comments_and_blank_lines() {
    assert_eq!(
        kinds("# header\n\nx = 1  # trailing\n   \n"),
        vec![
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_indent_and_dedent() {
    let source = "while x:\n    x = 1\n    if y:\n        pass\nz\n";

    assert_eq!(
        kinds(source),
        vec![
            TokenKind::While,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::If,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Pass,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Dedent,
            TokenKind::Identifier,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_dedents_closed_at_eof() {
    let tokens = kinds("def f():\n    pass");
    let tail = &tokens[tokens.len() - 3..];
    assert_eq!(tail, &[TokenKind::Newline, TokenKind::Dedent, TokenKind::EOF]);
}

#[test]
fn test_tab_indentation() {
    // A tab reaches column 8, the same as eight spaces
    let source = "if x:\n\tpass\n        pass\n";
    let tokens = kinds(source);
    assert_eq!(
        tokens.iter().filter(|k| **k == TokenKind::Indent).count(),
        1
    );
}

#[test]
fn test_inconsistent_dedent() {
    let error = tokenize("if x:\n    pass\n  pass\n").unwrap_err();
    assert_eq!(error.get_error_name(), "ParseError");
    assert_eq!(error.get_position().line, 3);
}

#[test]
fn test_newlines_inside_parens_are_ignored() {
    assert_eq!(
        kinds("f(1,\n  2)\n"),
        vec![
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Number,
            TokenKind::Comma,
            TokenKind::Number,
            TokenKind::CloseParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_token_positions() {
    let tokens = tokenize("a: int = 10\n  \nbb = a").unwrap();

    assert_eq!(tokens[0].position, Position::new(1, 0, 1));
    assert_eq!(tokens[4].position, Position::new(1, 9, 2));
    assert_eq!(tokens[6].position, Position::new(3, 0, 2));
}

#[test]
fn test_unrecognised_token() {
    let error = tokenize("x = 1 @ 2").unwrap_err();
    assert_eq!(error.get_error_name(), "ParseError");
    assert_eq!(error.get_position().col, 6);
}
