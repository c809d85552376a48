//! Lexer for pscript source text, driven by logos.
//!
//! Comments (`// …`) and whitespace are dropped; every remaining token
//! carries its source text and 1-based line/column so the parser can stamp
//! positions onto AST nodes.

use logos::Logos;

use super::token::{Token, TokenKind};

/// Raw token as recognized by logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    // Keywords
    #[token("let")]
    Let,
    #[token("fn")]
    Fn,
    #[token("extern")]
    Extern,
    #[token("struct")]
    Struct,
    #[token("import")]
    Import,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("namespace")]
    Namespace,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Built-in type names
    #[token("int")]
    IntType,
    #[token("uint")]
    UintType,
    #[token("float")]
    FloatType,
    #[token("str")]
    StrType,
    #[token("list")]
    ListType,
    #[token("any")]
    AnyType,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("!")]
    Bang,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+")]
    Real,
    #[regex(r"[0-9]+u")]
    Uint,
    #[regex(r"[0-9]+")]
    Int,
    // Double-quoted, no escape processing.
    #[regex(r#""[^"]*""#)]
    Str,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Lexer over a single source string.
pub struct Lexer<'src> {
    source: &'src str,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer { source }
    }

    /// Lex the whole source, ending with an `Eof` token.
    pub fn lex_all(&self) -> Vec<Token> {
        let line_starts = line_starts(self.source);
        let mut tokens = Vec::new();
        let mut lexer = RawToken::lexer(self.source);

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let slice = lexer.slice();
            let (line, column) = position(&line_starts, span.start);
            match result {
                Ok(RawToken::LineComment) => continue,
                Ok(raw) => {
                    let kind = convert(raw);
                    let text = match raw {
                        // Strip the quotes; the grammar has no escapes.
                        RawToken::Str => &slice[1..slice.len() - 1],
                        _ => slice,
                    };
                    tokens.push(Token::new(kind, text, line, column));
                }
                Err(()) => {
                    tokens.push(Token::new(TokenKind::Error, slice, line, column));
                }
            }
        }

        let (line, column) = position(&line_starts, self.source.len());
        tokens.push(Token::new(TokenKind::Eof, "", line, column));
        tokens
    }
}

fn convert(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Let => TokenKind::Let,
        RawToken::Fn => TokenKind::Fn,
        RawToken::Extern => TokenKind::Extern,
        RawToken::Struct => TokenKind::Struct,
        RawToken::Import => TokenKind::Import,
        RawToken::Return => TokenKind::Return,
        RawToken::If => TokenKind::If,
        RawToken::Else => TokenKind::Else,
        RawToken::While => TokenKind::While,
        RawToken::For => TokenKind::For,
        RawToken::Namespace => TokenKind::Namespace,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::IntType => TokenKind::IntType,
        RawToken::UintType => TokenKind::UintType,
        RawToken::FloatType => TokenKind::FloatType,
        RawToken::StrType => TokenKind::StrType,
        RawToken::ListType => TokenKind::ListType,
        RawToken::AnyType => TokenKind::AnyType,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Assign => TokenKind::Assign,
        RawToken::PlusAssign => TokenKind::PlusAssign,
        RawToken::MinusAssign => TokenKind::MinusAssign,
        RawToken::StarAssign => TokenKind::StarAssign,
        RawToken::SlashAssign => TokenKind::SlashAssign,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,
        RawToken::Bang => TokenKind::Bang,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::Real => TokenKind::Real,
        RawToken::Uint => TokenKind::Uint,
        RawToken::Int => TokenKind::Int,
        RawToken::Str => TokenKind::Str,
        RawToken::Ident => TokenKind::Ident,
        RawToken::LineComment => TokenKind::Error,
    }
}

/// Byte offsets where each line begins.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based (line, column) of a byte offset.
fn position(line_starts: &[usize], offset: usize) -> (u32, u32) {
    let line = line_starts.partition_point(|&start| start <= offset);
    let column = offset - line_starts[line - 1] + 1;
    (line as u32, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_declaration() {
        let tokens = Lexer::new("let x = 42;").lex_all();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[3].text, "42");
    }

    #[test]
    fn test_lex_literals() {
        let tokens = Lexer::new(r#"1 2u 3.5 "abc" true false"#).lex_all();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Uint,
                TokenKind::Real,
                TokenKind::Str,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "2u");
        assert_eq!(tokens[3].text, "abc");
    }

    #[test]
    fn test_lex_two_char_operators() {
        let tokens = Lexer::new("== != <= >= << >> && || += -> ++").lex_all();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::PlusAssign,
                TokenKind::Arrow,
                TokenKind::PlusPlus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_skips_comments() {
        let tokens = Lexer::new("let x = 1; // trailing comment\nlet y = 2;").lex_all();
        let idents: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(idents, vec!["x", "y"]);
    }

    #[test]
    fn test_lex_positions() {
        let tokens = Lexer::new("let x = 1;\nlet y = 2;").lex_all();
        let y = tokens.iter().find(|t| t.text == "y").expect("y token");
        assert_eq!(y.line, 2);
        assert_eq!(y.column, 5);
    }

    #[test]
    fn test_lex_keyword_prefix_identifiers() {
        let tokens = Lexer::new("lettuce iffy form internal").lex_all();
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Ident));
    }

    #[test]
    fn test_lex_builtin_markers() {
        let tokens = Lexer::new("__print(x)").lex_all();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text, "__print");
    }
}
