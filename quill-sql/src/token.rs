use quill_common::error::Position;
use std::fmt;

/// One lexical token plus the position of its first character.
///
/// Ported from `original_source/parser/token.go`'s `token` struct; the Go
/// source's bare `tokenType` enum with a parallel `tokensName` map becomes
/// `TokenKind` with a `Display` impl carrying the same names.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Token { kind, position }
    }
}

/// Every token kind the lexer produces.
///
/// `Function` and `Name` both carry the identifier's original-case text;
/// which one a bare identifier becomes is decided at lex time by looking
/// its lowercased spelling up in `quill_expr::functions::kind` (see
/// `Lexer::ident`).
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Function(String),
    IntLit(i64),
    FloatLit(f64),
    StringLit(String),
    BooleanLit(bool),
    Comma,
    Name(String),

    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // keywords
    Select,
    From,
    Where,
    Cast,
    As,
    Left,
    Join,
    Full,
    Outer,
    Right,
    Bigint,
    Double,
    StringKw,
    On,
    Order,
    Group,
    By,
    Case,
    When,
    Then,
    Else,
    End,
    If,
    Distinct,
    In,
    Is,
    Not,
    Null,
    Or,
    And,
    Union,
    All,
    Limit,
    Asc,
    Desc,
    True,
    False,
    Like,
}

impl TokenKind {
    /// Operator precedence used by the shunting-yard expression parser;
    /// `or`(1) < `and`(2) < comparisons(3) < `+ -`(4) < `* / %`(5),
    /// matching `original_source/parser/token.go::opPriority`. Non-operator
    /// kinds return 0 and never compare greater than anything.
    pub fn precedence(&self) -> u8 {
        match self {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq => 3,
            TokenKind::Plus | TokenKind::Minus => 4,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 5,
            _ => 0,
        }
    }

    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::And
                | TokenKind::Or
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Eof => "EOF",
            TokenKind::Function(name) => return write!(f, "function '{name}'"),
            TokenKind::IntLit(_) => "intLit",
            TokenKind::FloatLit(_) => "floatLit",
            TokenKind::StringLit(_) => "stringLit",
            TokenKind::BooleanLit(_) => "booleanLit",
            TokenKind::Comma => ",",
            TokenKind::Name(name) => return write!(f, "name '{name}'"),
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Select => "select",
            TokenKind::From => "from",
            TokenKind::Where => "where",
            TokenKind::Cast => "cast",
            TokenKind::As => "as",
            TokenKind::Left => "left",
            TokenKind::Join => "join",
            TokenKind::Full => "full",
            TokenKind::Outer => "outer",
            TokenKind::Right => "right",
            TokenKind::Bigint => "bigint",
            TokenKind::Double => "double",
            TokenKind::StringKw => "string",
            TokenKind::On => "on",
            TokenKind::Order => "order",
            TokenKind::Group => "group",
            TokenKind::By => "by",
            TokenKind::Case => "case",
            TokenKind::When => "when",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::End => "end",
            TokenKind::If => "if",
            TokenKind::Distinct => "distinct",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Not => "not",
            TokenKind::Null => "null",
            TokenKind::Or => "or",
            TokenKind::And => "and",
            TokenKind::Union => "union",
            TokenKind::All => "all",
            TokenKind::Limit => "limit",
            TokenKind::Asc => "asc",
            TokenKind::Desc => "desc",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Like => "like",
        };
        f.write_str(s)
    }
}

/// Case-insensitive keyword lookup, mirroring `original_source/parser/
/// token.go::keywordMap`. `true`/`false` are handled separately by the
/// caller since they become `BooleanLit`, not a bare keyword token.
pub fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "select" => TokenKind::Select,
        "from" => TokenKind::From,
        "where" => TokenKind::Where,
        "cast" => TokenKind::Cast,
        "as" => TokenKind::As,
        "left" => TokenKind::Left,
        "join" => TokenKind::Join,
        "full" => TokenKind::Full,
        "outer" => TokenKind::Outer,
        "right" => TokenKind::Right,
        "bigint" => TokenKind::Bigint,
        "double" => TokenKind::Double,
        "string" => TokenKind::StringKw,
        "on" => TokenKind::On,
        "order" => TokenKind::Order,
        "group" => TokenKind::Group,
        "by" => TokenKind::By,
        "case" => TokenKind::Case,
        "when" => TokenKind::When,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "end" => TokenKind::End,
        "if" => TokenKind::If,
        "distinct" => TokenKind::Distinct,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "not" => TokenKind::Not,
        "null" => TokenKind::Null,
        "or" => TokenKind::Or,
        "and" => TokenKind::And,
        "union" => TokenKind::Union,
        "all" => TokenKind::All,
        "limit" => TokenKind::Limit,
        "asc" => TokenKind::Asc,
        "desc" => TokenKind::Desc,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "like" => TokenKind::Like,
        _ => return None,
    })
}
