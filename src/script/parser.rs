//! Parser for the script language
//!
//! Built from chumsky combinators over the logos token stream. Statements are
//! separated by newlines or `;`; expressions never span a newline.
//!
//! Expression precedence, loosest first:
//! `or`, `and`, `not`, comparisons, `..`, `|`, `^`, `&`, shifts, `+ -`,
//! `* / %`, unary `- ~`, `**` (right associative), postfix call/index/member.

use super::ast::{AssignOp, BinaryOp, Expr, FunctionDef, Literal, Stmt, UnaryOp};
use super::tokens::{tokenize, Token};
use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Type alias for parser error
type ParserError = Simple<Token>;

/// Errors raised while turning script text into a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("unrecognized input at offset {}", .span.start)]
    Lex { span: Range<usize> },

    #[error("syntax error: {message}")]
    Parse { message: String, span: Range<usize> },
}

impl ScriptError {
    /// Byte span of the offending input.
    pub fn span(&self) -> &Range<usize> {
        match self {
            ScriptError::Lex { span } | ScriptError::Parse { span, .. } => span,
        }
    }
}

enum Postfix {
    Call(Vec<Expr>),
    Index(Expr),
    Member(String),
}

fn ident() -> impl Parser<Token, String, Error = ParserError> + Clone {
    select! { Token::Ident(name) => name }
}

/// Left-associative binary level over `operand`.
fn infix<P, O>(operand: P, op: O) -> impl Parser<Token, Expr, Error = ParserError> + Clone
where
    P: Parser<Token, Expr, Error = ParserError> + Clone,
    O: Parser<Token, BinaryOp, Error = ParserError> + Clone,
{
    operand
        .clone()
        .then(op.then(operand).repeated())
        .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

pub(crate) fn expr_parser() -> impl Parser<Token, Expr, Error = ParserError> + Clone {
    recursive(|expr| {
        let literal = select! {
            Token::Int(n) => Expr::Literal(Literal::Int(n)),
            Token::Str(s) => Expr::Literal(Literal::Str(s)),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::NoneLiteral => Expr::Literal(Literal::None),
        };

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing();

        let atom = choice((
            literal,
            ident().map(Expr::Var),
            expr.clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
            items
                .clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(Expr::List),
        ));

        let postfix = atom
            .then(
                choice((
                    items
                        .delimited_by(just(Token::LParen), just(Token::RParen))
                        .map(Postfix::Call),
                    expr.clone()
                        .delimited_by(just(Token::LBracket), just(Token::RBracket))
                        .map(Postfix::Index),
                    just(Token::Dot).ignore_then(ident()).map(Postfix::Member),
                ))
                .repeated(),
            )
            .foldl(|base, op| match op {
                Postfix::Call(args) => Expr::Call(Box::new(base), args),
                Postfix::Index(index) => Expr::Index(Box::new(base), Box::new(index)),
                Postfix::Member(name) => Expr::Member(Box::new(base), name),
            })
            .boxed();

        let power = postfix
            .clone()
            .then(just(Token::StarStar).ignore_then(postfix).repeated())
            .map(|(base, mut exponents)| {
                let Some(mut acc) = exponents.pop() else {
                    return base;
                };
                while let Some(lhs) = exponents.pop() {
                    acc = Expr::binary(BinaryOp::Pow, lhs, acc);
                }
                Expr::binary(BinaryOp::Pow, base, acc)
            });

        let unary = choice((
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Tilde).to(UnaryOp::BitNot),
        ))
        .repeated()
        .then(power)
        .foldr(|op, operand| Expr::unary(op, operand))
        .boxed();

        let product = infix(
            unary,
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
                just(Token::Percent).to(BinaryOp::Mod),
            )),
        );
        let sum = infix(
            product,
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            )),
        );
        let shift = infix(
            sum,
            choice((
                just(Token::Shl).to(BinaryOp::Shl),
                just(Token::Shr).to(BinaryOp::Shr),
            )),
        )
        .boxed();
        let bit_and = infix(shift, just(Token::Amp).to(BinaryOp::BitAnd));
        let bit_xor = infix(bit_and, just(Token::Caret).to(BinaryOp::BitXor));
        let bit_or = infix(bit_xor, just(Token::Pipe).to(BinaryOp::BitOr)).boxed();

        let range = bit_or
            .clone()
            .then(just(Token::DotDot).ignore_then(bit_or).or_not())
            .map(|(lo, hi)| match hi {
                Some(hi) => Expr::binary(BinaryOp::Range, lo, hi),
                None => lo,
            });

        let comparison = infix(
            range,
            choice((
                just(Token::EqEq).to(BinaryOp::Eq),
                just(Token::NotEq).to(BinaryOp::Ne),
                just(Token::Le).to(BinaryOp::Le),
                just(Token::Ge).to(BinaryOp::Ge),
                just(Token::Lt).to(BinaryOp::Lt),
                just(Token::Gt).to(BinaryOp::Gt),
            )),
        )
        .boxed();

        let negation = just(Token::Not)
            .repeated()
            .then(comparison)
            .foldr(|_, operand| Expr::unary(UnaryOp::Not, operand));
        let conjunction = infix(negation, just(Token::And).to(BinaryOp::And));
        infix(conjunction, just(Token::Or).to(BinaryOp::Or))
    })
}

fn program_parser() -> impl Parser<Token, Vec<Stmt>, Error = ParserError> {
    let expr = expr_parser();
    let separators = filter(|t: &Token| t.is_separator()).repeated();

    let statements = recursive(|statements| {
        let block = statements
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .boxed();

        let params = ident()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let fn_def = just(Token::Fn)
            .ignore_then(ident())
            .then(params)
            .then(block.clone())
            .map(|((name, params), body)| {
                Stmt::FnDef(Arc::new(FunctionDef { name, params, body }))
            });

        let ret = just(Token::Return)
            .ignore_then(expr.clone().or_not())
            .map(Stmt::Return);

        let if_stmt = recursive(|if_stmt| {
            just(Token::If)
                .ignore_then(expr.clone())
                .then(block.clone())
                .then(
                    separators
                        .clone()
                        .ignore_then(just(Token::Else))
                        .ignore_then(if_stmt.map(|stmt| vec![stmt]).or(block.clone()))
                        .or_not(),
                )
                .map(|((cond, then_body), else_body)| Stmt::If {
                    cond,
                    then_body,
                    else_body,
                })
        });

        let for_stmt = just(Token::For)
            .ignore_then(ident())
            .then_ignore(just(Token::In))
            .then(expr.clone())
            .then(block)
            .map(|((var, iter), body)| Stmt::For { var, iter, body });

        let assign_op = choice((
            just(Token::Assign).to(AssignOp::Set),
            just(Token::PlusAssign).to(AssignOp::Add),
            just(Token::MinusAssign).to(AssignOp::Sub),
            just(Token::StarAssign).to(AssignOp::Mul),
        ));
        let assign = ident()
            .then(assign_op)
            .then(expr.clone())
            .map(|((name, op), value)| Stmt::Assign { name, op, value });

        let stmt = choice((
            fn_def,
            ret,
            if_stmt,
            for_stmt,
            assign,
            expr.clone().map(Stmt::Expr),
        ));

        let separator = filter(|t: &Token| t.is_separator()).repeated().at_least(1);
        separators
            .clone()
            .ignore_then(stmt.separated_by(separator).allow_trailing())
    });

    statements.then_ignore(end())
}

fn lex(source: &str) -> Result<Vec<(Token, Range<usize>)>, ScriptError> {
    tokenize(source).map_err(|span| ScriptError::Lex { span })
}

/// Parse a sequence of statements.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let tokens = lex(source)?;
    let eoi = source.len()..source.len() + 1;
    program_parser()
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map_err(to_script_error)
}

/// Parse a single expression, as found between inline delimiters.
pub fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    let tokens = lex(source)?;
    let eoi = source.len()..source.len() + 1;
    let newlines = just(Token::Newline).repeated();
    newlines
        .clone()
        .ignore_then(expr_parser())
        .then_ignore(newlines)
        .then_ignore(end())
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map_err(to_script_error)
}

fn to_script_error(errors: Vec<ParserError>) -> ScriptError {
    match errors.into_iter().next() {
        Some(error) => ScriptError::Parse {
            message: describe(&error),
            span: error.span(),
        },
        None => ScriptError::Parse {
            message: "invalid syntax".to_string(),
            span: 0..0,
        },
    }
}

fn describe(error: &ParserError) -> String {
    if let SimpleReason::Custom(message) = error.reason() {
        return message.clone();
    }

    let found = error
        .found()
        .map(|t| format!("'{t}'"))
        .unwrap_or_else(|| "end of input".to_string());
    let mut expected: Vec<String> = error
        .expected()
        .map(|t| match t {
            Some(t) => format!("'{t}'"),
            None => "end of input".to_string(),
        })
        .collect();
    expected.sort();
    expected.dedup();

    match error.reason() {
        SimpleReason::Unclosed { delimiter, .. } => format!("unclosed '{delimiter}'"),
        _ if expected.is_empty() => format!("unexpected {found}"),
        _ => format!("unexpected {found}, expected {}", expected.join(" or ")),
    }
}
