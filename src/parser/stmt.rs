use std::rc::Rc;

use crate::{
    ast::{
        ast::Name,
        expressions::{Expr, ExprKind},
        statements::{ClassDecl, ElifBranch, FunctionDecl, Param, Stmt, StmtKind, VarDecl},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let kind = parser.current_token_kind();

    if let Some(handler) = parser.get_stmt_lookup().get(&kind).copied() {
        return handler(parser);
    }

    if kind == TokenKind::Identifier && parser.peek_kind() == TokenKind::Colon {
        return parse_var_decl_stmt(parser);
    }

    let expr = parse_expr(parser, BindingPower::Default)?;

    if parser.current_token_kind() == TokenKind::Assignment {
        parser.advance();

        if !matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: String::from("="),
                    message: String::from("can only assign to a variable or a member"),
                },
                expr.position,
            ));
        }

        let value = parse_expr(parser, BindingPower::Default)?;
        expect_end_of_line(parser)?;

        let position = expr.position.to(&value.position);
        return Ok(Stmt::new(
            StmtKind::Assign {
                target: expr,
                value,
            },
            position,
        ));
    }

    expect_end_of_line(parser)?;

    let position = expr.position;
    Ok(Stmt::new(StmtKind::Expression(expr), position))
}

fn expect_end_of_line(parser: &mut Parser) -> Result<(), Error> {
    parser.expect_error(TokenKind::Newline, Some("expected end of line"))?;
    Ok(())
}

/// Parses `: NEWLINE INDENT stmt+ DEDENT`, or a single statement on the same line.
pub fn parse_block(parser: &mut Parser) -> Result<Vec<Stmt>, Error> {
    parser.expect_error(TokenKind::Colon, Some("expected `:`"))?;

    if parser.current_token_kind() != TokenKind::Newline {
        return Ok(vec![parse_stmt(parser)?]);
    }

    parser.advance();
    parser.expect_error(TokenKind::Indent, Some("expected an indented block"))?;

    let mut body = vec![];
    while !matches!(
        parser.current_token_kind(),
        TokenKind::Dedent | TokenKind::EOF
    ) {
        body.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::Dedent)?;
    Ok(body)
}

pub fn parse_pass_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let token = parser.advance();
    expect_end_of_line(parser)?;

    Ok(Stmt::new(StmtKind::Pass, token.position))
}

fn parse_var_decl(parser: &mut Parser) -> Result<VarDecl, Error> {
    let name = parser.expect_error(
        TokenKind::Identifier,
        Some("expected identifier during variable declaration"),
    )?;
    parser.expect(TokenKind::Colon)?;
    let annotation = parse_type(parser)?;

    parser.expect_error(
        TokenKind::Assignment,
        Some("variable declarations need an initial value"),
    )?;
    let value = parse_expr(parser, BindingPower::Default)?;
    expect_end_of_line(parser)?;

    Ok(VarDecl {
        name: Name::new(name.value, name.position),
        annotation,
        value,
    })
}

pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let decl = parse_var_decl(parser)?;
    let position = decl.name.position.to(&decl.value.position);

    Ok(Stmt::new(StmtKind::Define(decl), position))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance();
    let condition = parse_expr(parser, BindingPower::Default)?;
    let then_body = parse_block(parser)?;

    let mut branches = vec![];
    while parser.current_token_kind() == TokenKind::Elif {
        parser.advance();
        let condition = parse_expr(parser, BindingPower::Default)?;
        let body = parse_block(parser)?;
        branches.push(ElifBranch { condition, body });
    }

    let else_body = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        parse_block(parser)?
    } else {
        vec![]
    };

    let position = start.position.to(&condition.position);
    Ok(Stmt::new(
        StmtKind::If {
            condition,
            then_body,
            branches,
            else_body,
        },
        position,
    ))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance();
    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;

    let position = start.position.to(&condition.position);
    Ok(Stmt::new(StmtKind::While { condition, body }, position))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance();

    let value: Option<Expr> = if parser.current_token_kind() == TokenKind::Newline {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    expect_end_of_line(parser)?;

    let position = match &value {
        Some(value) => start.position.to(&value.position),
        None => start.position,
    };
    Ok(Stmt::new(StmtKind::Return(value), position))
}

fn parse_fn_decl(parser: &mut Parser) -> Result<FunctionDecl, Error> {
    let start = parser.advance();
    let name = parser.expect_error(TokenKind::Identifier, Some("expected function name"))?;

    parser.expect(TokenKind::OpenParen)?;

    let mut params = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        let param = parser.expect_error(TokenKind::Identifier, Some("expected parameter name"))?;
        parser.expect_error(
            TokenKind::Colon,
            Some("parameters need a type annotation"),
        )?;
        let annotation = parse_type(parser)?;

        params.push(Param {
            name: Name::new(param.value, param.position),
            annotation,
        });

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect_error(TokenKind::Comma, Some("expected `,` or `)` in parameter list"))?;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let return_type = if parser.current_token_kind() == TokenKind::Arrow {
        parser.advance();
        Some(parse_type(parser)?)
    } else {
        None
    };

    let body = parse_block(parser)?;

    Ok(FunctionDecl {
        position: start.position.to(&name.position),
        name: Name::new(name.value, name.position),
        params,
        return_type,
        body,
    })
}

pub fn parse_fn_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let decl = parse_fn_decl(parser)?;
    let position = decl.position;

    Ok(Stmt::new(StmtKind::Function(Rc::new(decl)), position))
}

pub fn parse_class_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance();
    let name = parser.expect_error(TokenKind::Identifier, Some("expected class name"))?;

    if parser.current_token_kind() == TokenKind::OpenParen {
        parser.advance();
        let base = parser.expect_error(TokenKind::Identifier, Some("expected `object`"))?;
        if base.value != "object" {
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: base.value,
                    message: String::from("classes may only inherit from `object`"),
                },
                base.position,
            ));
        }
        parser.expect(TokenKind::CloseParen)?;
    }

    parser.expect_error(TokenKind::Colon, Some("expected `:`"))?;

    let mut fields = vec![];
    let mut methods = vec![];

    if parser.current_token_kind() == TokenKind::Newline {
        parser.advance();
        parser.expect_error(TokenKind::Indent, Some("expected an indented class body"))?;

        while !matches!(
            parser.current_token_kind(),
            TokenKind::Dedent | TokenKind::EOF
        ) {
            parse_class_member(parser, &mut fields, &mut methods)?;
        }

        parser.expect(TokenKind::Dedent)?;
    } else {
        parse_class_member(parser, &mut fields, &mut methods)?;
    }

    let position = start.position.to(&name.position);
    Ok(Stmt::new(
        StmtKind::Class(Rc::new(ClassDecl {
            name: Name::new(name.value, name.position),
            fields,
            methods,
            position,
        })),
        position,
    ))
}

fn parse_class_member(
    parser: &mut Parser,
    fields: &mut Vec<VarDecl>,
    methods: &mut Vec<Rc<FunctionDecl>>,
) -> Result<(), Error> {
    match parser.current_token_kind() {
        TokenKind::Pass => {
            parse_pass_stmt(parser)?;
        }
        TokenKind::Def => methods.push(Rc::new(parse_fn_decl(parser)?)),
        TokenKind::Identifier if parser.peek_kind() == TokenKind::Colon => {
            fields.push(parse_var_decl(parser)?)
        }
        _ => {
            return Err(parser.unexpected(Some(
                "a class body may only contain fields, methods and `pass`",
            )))
        }
    }

    Ok(())
}
