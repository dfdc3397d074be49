use crate::{ast::types::SymbolType, errors::errors::Error, lexer::tokens::TokenKind};

use super::parser::Parser;

/// Parses a type annotation: a name such as `int` or `Point`, or `None`.
///
/// Whether the name denotes a type is decided by the type checker.
pub fn parse_type(parser: &mut Parser) -> Result<SymbolType, Error> {
    match parser.current_token_kind() {
        TokenKind::Identifier | TokenKind::None => {
            let token = parser.advance();
            Ok(SymbolType::new(token.value, token.position))
        }
        _ => Err(parser.unexpected(Some("expected a type"))),
    }
}
