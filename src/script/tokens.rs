//! Token definitions for the svmacro script language
//!
//! Tokens are produced by the logos derive macro. Spaces, tabs and `#` comments
//! are skipped; newlines are kept because they separate statements.

use logos::Logos;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("\n")]
    Newline,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| parse_radix(&lex.slice()[2..], 16))]
    #[regex(r"0[bB][01_]+", |lex| parse_radix(&lex.slice()[2..], 2))]
    #[regex(r"0[oO][0-7_]+", |lex| parse_radix(&lex.slice()[2..], 8))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_radix(lex.slice(), 10))]
    Int(i64),
    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| unescape(lex.slice()))]
    Str(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("fn")]
    Fn,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("none")]
    NoneLiteral,
    #[token("and")]
    #[token("&&")]
    And,
    #[token("or")]
    #[token("||")]
    Or,
    #[token("not")]
    #[token("!")]
    Not,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("..")]
    DotDot,

    // Punctuation
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

impl Token {
    /// Check if this token separates statements
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Newline => "newline",
            Token::Int(n) => return write!(f, "{n}"),
            Token::Str(s) => return write!(f, "{s:?}"),
            Token::Ident(name) => return write!(f, "{name}"),
            Token::If => "if",
            Token::Else => "else",
            Token::For => "for",
            Token::In => "in",
            Token::Fn => "fn",
            Token::Return => "return",
            Token::True => "true",
            Token::False => "false",
            Token::NoneLiteral => "none",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::StarStar => "**",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::DotDot => "..",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
        };
        f.write_str(text)
    }
}

/// Parse an integer literal body, ignoring `_` separators.
pub(crate) fn parse_radix(digits: &str, radix: u32) -> Option<i64> {
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() {
        return None;
    }
    i64::from_str_radix(&digits, radix).ok()
}

/// Strip the quotes of a string literal and resolve its escapes.
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }
    Some(out)
}

/// Tokenize a source string, keeping byte spans.
///
/// Returns the span of the first unrecognized input on failure.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, Range<usize>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(lexer.span()),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(
            kinds("42 0x2A 0b10_10 0o17 1_000"),
            vec![
                Token::Int(42),
                Token::Int(42),
                Token::Int(10),
                Token::Int(15),
                Token::Int(1000)
            ]
        );
    }

    #[test]
    fn test_range_operator() {
        assert_eq!(
            kinds("0..4"),
            vec![Token::Int(0), Token::DotDot, Token::Int(4)]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\\c\n""#),
            vec![Token::Str("a\"b\\c\n".to_string())]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("for item in items"),
            vec![
                Token::For,
                Token::Ident("item".to_string()),
                Token::In,
                Token::Ident("items".to_string())
            ]
        );
        assert_eq!(kinds("format"), vec![Token::Ident("format".to_string())]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a ** 2 <= b << 1 && !c"),
            vec![
                Token::Ident("a".to_string()),
                Token::StarStar,
                Token::Int(2),
                Token::Le,
                Token::Ident("b".to_string()),
                Token::Shl,
                Token::Int(1),
                Token::And,
                Token::Not,
                Token::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        assert_eq!(
            kinds("x = 1 # set x\ny = 2"),
            vec![
                Token::Ident("x".to_string()),
                Token::Assign,
                Token::Int(1),
                Token::Newline,
                Token::Ident("y".to_string()),
                Token::Assign,
                Token::Int(2),
            ]
        );
    }

    #[test]
    fn test_unrecognized_input() {
        assert_eq!(tokenize("a @ b"), Err(2..3));
        assert!(tokenize("\"open").is_err());
    }
}
