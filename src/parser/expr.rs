use crate::{
    ast::{
        ast::{BinOp, Name, UnaryOp},
        expressions::{Expr, ExprKind},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let nud = match parser.get_nud_lookup().get(&token_kind) {
        Some(nud) => *nud,
        None => return Err(parser.unexpected(None)),
    };

    let mut left = nud(parser)?;

    // While the next operator binds tighter than `bp`, keep extending the lhs
    while parser.binding_power(parser.current_token_kind()) > bp {
        let token_kind = parser.current_token_kind();
        let led = match parser.get_led_lookup().get(&token_kind) {
            Some(led) => *led,
            None => return Err(parser.unexpected(None)),
        };

        left = led(parser, left, parser.binding_power(token_kind))?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance();

    let kind = match token.kind {
        TokenKind::Number => match token.value.parse::<i64>() {
            Ok(value) => ExprKind::Number(value),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.position,
                ))
            }
        },
        TokenKind::Identifier => ExprKind::Identifier(token.value),
        TokenKind::String => ExprKind::Str(token.value),
        TokenKind::True => ExprKind::Bool(true),
        TokenKind::False => ExprKind::Bool(false),
        TokenKind::None => ExprKind::None,
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: token.describe(),
                },
                token.position,
            ))
        }
    };

    Ok(Expr::new(kind, token.position))
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = BinOp::from_token(operator_token.kind).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: operator_token.describe(),
            },
            operator_token.position,
        )
    })?;

    let right = parse_expr(parser, bp)?;
    let position = left.position.to(&right.position);

    Ok(Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        position,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let (operator, bp) = match operator_token.kind {
        TokenKind::Not => (UnaryOp::Not, BindingPower::LogicalNot),
        _ => (UnaryOp::Neg, BindingPower::Unary),
    };

    let operand = parse_expr(parser, bp)?;
    let position = operator_token.position.to(&operand.position);

    Ok(Expr::new(
        ExprKind::Unary {
            operator,
            operand: Box::new(operand),
        },
        position,
    ))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect_error(TokenKind::CloseParen, Some("expected `)`"))?;

    Ok(expr)
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let mut args = vec![];

    while parser.current_token_kind() != TokenKind::CloseParen {
        args.push(parse_expr(parser, BindingPower::Default)?);

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect_error(TokenKind::Comma, Some("expected `,` or `)` in argument list"))?;
        }
    }

    let close = parser.expect(TokenKind::CloseParen)?;
    let position = left.position.to(&close.position);

    Ok(Expr::new(
        ExprKind::Call {
            callee: Box::new(left),
            args,
        },
        position,
    ))
}

pub fn parse_member_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let member = parser.expect_error(TokenKind::Identifier, Some("expected member name after `.`"))?;
    let position = left.position.to(&member.position);

    Ok(Expr::new(
        ExprKind::Member {
            object: Box::new(left),
            member: Name::new(member.value, member.position),
        },
        position,
    ))
}

/// `s[i]`, `s[a:b]` and `s[a:b:c]`; every slice bound may be omitted.
pub fn parse_index_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let start = parse_slice_bound(parser)?;

    if parser.current_token_kind() != TokenKind::Colon {
        let index = start.ok_or_else(|| parser.unexpected(Some("expected an index")))?;
        let close = parser.expect_error(TokenKind::CloseBracket, Some("expected `]`"))?;
        let position = left.position.to(&close.position);

        return Ok(Expr::new(
            ExprKind::Index {
                object: Box::new(left),
                index,
            },
            position,
        ));
    }

    parser.advance();
    let stop = parse_slice_bound(parser)?;

    let step = if parser.current_token_kind() == TokenKind::Colon {
        parser.advance();
        parse_slice_bound(parser)?
    } else {
        None
    };

    let close = parser.expect_error(TokenKind::CloseBracket, Some("expected `]`"))?;
    let position = left.position.to(&close.position);

    Ok(Expr::new(
        ExprKind::Slice {
            object: Box::new(left),
            start,
            stop,
            step,
        },
        position,
    ))
}

fn parse_slice_bound(parser: &mut Parser) -> Result<Option<Box<Expr>>, Error> {
    match parser.current_token_kind() {
        TokenKind::Colon | TokenKind::CloseBracket => Ok(None),
        _ => Ok(Some(Box::new(parse_expr(parser, BindingPower::Default)?))),
    }
}
