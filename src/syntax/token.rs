//! Tokens produced by the lexer.

/// Kind of a lexed token. Identifier and literal tokens carry their source
/// text on the [`Token`] itself.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TokenKind {
    // Keywords
    Let,
    Fn,
    Extern,
    Struct,
    Import,
    Return,
    If,
    Else,
    While,
    For,
    Namespace,
    True,
    False,

    // Built-in type names
    IntType,
    UintType,
    FloatType,
    StrType,
    ListType,
    AnyType,

    // Identifiers and literals (text on the token)
    Ident,
    Int,
    Uint,
    Real,
    Str,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Arrow,

    // Operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    AmpAmp,
    PipePipe,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Shl,
    Shr,
    Bang,
    PlusPlus,
    MinusMinus,

    Error,
    Eof,
}

impl TokenKind {
    /// Canonical source symbol for operator tokens, used as the operator
    /// node text in the AST.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Amp => "&",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Bang => "!",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            _ => "",
        }
    }

    /// Whether this token names a built-in type.
    pub fn is_builtin_type(self) -> bool {
        matches!(
            self,
            TokenKind::IntType
                | TokenKind::UintType
                | TokenKind::FloatType
                | TokenKind::StrType
                | TokenKind::ListType
                | TokenKind::AnyType
        )
    }
}

/// A single token with its source text and position (1-based).
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}
