use crate::token::{keyword, Token, TokenKind};
use quill_common::error::Position;
use quill_common::{Error, Result};

/// Converts SQL source text into a token sequence.
///
/// Ported from `original_source/parser/scanner.go`. The Go source scans a
/// `[]rune` with a single cursor and explicit `getr`/`ungetr`, backing off
/// one character after every identifier/number run and recomputing the
/// column by rescanning to the previous newline. Here `peek_char` gives
/// the same one-character lookahead without ever needing to back off: runs
/// stop as soon as the next character fails the predicate, rather than
/// consuming it and ungetting.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    row: usize,
    col: usize,
    start_row: usize,
    start_col: usize,
}

impl Lexer {
    /// Tabs become four spaces; each line's leading/trailing whitespace is
    /// trimmed before the lines are rejoined with `\n`, matching
    /// `newScanner`'s preprocessing.
    pub fn new(source: &str) -> Self {
        let normalized = source
            .replace('\t', "    ")
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");
        Lexer {
            source: normalized.chars().collect(),
            pos: 0,
            row: 1,
            col: 0,
            start_row: 1,
            start_col: 0,
        }
    }

    /// Scans the whole source up front into a token vector, skipping line
    /// comments, matching `scanner.tokens()`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += 1;
        if c == '\n' {
            self.row += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn mark_start(&mut self) {
        self.start_row = self.row;
        self.start_col = self.col;
    }

    fn start_position(&self) -> Position {
        Position {
            row: self.start_row,
            col: self.start_col,
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            let c = match self.advance() {
                Some(c) => c,
                None => return Ok(Token::new(TokenKind::Eof, self.start_position())),
            };
            if c.is_whitespace() {
                continue;
            }
            self.mark_start();

            if is_ident_start(c) {
                return self.ident(c);
            }
            if c.is_ascii_digit() {
                return self.number(c);
            }
            return match c {
                '\'' | '"' => self.string_literal(c),
                '-' => {
                    if self.peek_char() == Some('-') {
                        self.advance();
                        self.line_comment()?;
                        continue;
                    }
                    Ok(self.simple(TokenKind::Minus))
                }
                ',' => Ok(self.simple(TokenKind::Comma)),
                '(' => Ok(self.simple(TokenKind::LParen)),
                ')' => Ok(self.simple(TokenKind::RParen)),
                '+' => Ok(self.simple(TokenKind::Plus)),
                '*' => Ok(self.simple(TokenKind::Star)),
                '/' => Ok(self.simple(TokenKind::Slash)),
                '%' => Ok(self.simple(TokenKind::Percent)),
                '=' => Ok(self.simple(TokenKind::Eq)),
                '!' => {
                    if self.advance() != Some('=') {
                        return Err(Error::lex("unknown symbol '!'", self.start_position()));
                    }
                    Ok(self.simple(TokenKind::NotEq))
                }
                '>' => {
                    if self.peek_char() == Some('=') {
                        self.advance();
                        Ok(self.simple(TokenKind::GtEq))
                    } else {
                        Ok(self.simple(TokenKind::Gt))
                    }
                }
                '<' => {
                    if self.peek_char() == Some('=') {
                        self.advance();
                        Ok(self.simple(TokenKind::LtEq))
                    } else {
                        Ok(self.simple(TokenKind::Lt))
                    }
                }
                other => Err(Error::lex(
                    format!("unknown character '{other}'"),
                    self.start_position(),
                )),
            };
        }
    }

    fn simple(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.start_position())
    }

    fn ident(&mut self, first: char) -> Result<Token> {
        let mut lit = String::from(first);
        let mut has_dot = false;
        while let Some(c) = self.peek_char() {
            if is_ident_part(c) || (!has_dot && c == '.') {
                if c == '.' {
                    has_dot = true;
                }
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let lower = lit.to_lowercase();
        let kind = if let Some(kw) = keyword(&lower) {
            match kw {
                TokenKind::True => TokenKind::BooleanLit(true),
                TokenKind::False => TokenKind::BooleanLit(false),
                other => other,
            }
        } else if quill_expr::functions::kind(&lower).is_some() {
            TokenKind::Function(lit)
        } else {
            TokenKind::Name(lit)
        };
        Ok(self.simple(kind))
    }

    fn number(&mut self, first: char) -> Result<Token> {
        let mut lit = String::from(first);
        let mut has_dot = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || (!has_dot && c == '.') {
                if c == '.' {
                    has_dot = true;
                }
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if lit.ends_with('.') {
            return Err(Error::lex(
                format!("'{lit}' is not a valid number"),
                self.start_position(),
            ));
        }
        let kind = if has_dot {
            TokenKind::FloatLit(lit.parse().map_err(|_| {
                Error::lex(format!("'{lit}' is not a valid number"), self.start_position())
            })?)
        } else {
            TokenKind::IntLit(lit.parse().map_err(|_| {
                Error::lex(format!("'{lit}' is not a valid number"), self.start_position())
            })?)
        };
        Ok(self.simple(kind))
    }

    fn string_literal(&mut self, quote: char) -> Result<Token> {
        let mut lit = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some(c) => lit.push(c),
                None => {
                    return Err(Error::lex(
                        format!("string not terminated: {lit}"),
                        self.start_position(),
                    ))
                }
            }
        }
        Ok(self.simple(TokenKind::StringLit(lit)))
    }

    fn line_comment(&mut self) -> Result<()> {
        loop {
            match self.peek_char() {
                Some('\n') | None => break,
                Some(_) => {
                    self.advance();
                }
            }
        }
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        Lexer::tokenize(sql)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_simple_select() {
        let kinds = kinds("select a, b from t");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Select,
                TokenKind::Name("a".into()),
                TokenKind::Comma,
                TokenKind::Name("b".into()),
                TokenKind::From,
                TokenKind::Name("t".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_function_from_name() {
        let kinds = kinds("count(x)");
        assert_eq!(kinds[0], TokenKind::Function("count".into()));
    }

    #[test]
    fn dotted_name_is_single_token() {
        let kinds = kinds("select t.a from t");
        assert_eq!(kinds[1], TokenKind::Name("t.a".into()));
    }

    #[test]
    fn skips_line_comments() {
        let kinds = kinds("select a -- comment\nfrom t");
        assert!(!kinds.iter().any(|k| matches!(k, TokenKind::Name(n) if n.contains("comment"))));
    }

    #[test]
    fn rejects_trailing_dot_number() {
        let err = Lexer::tokenize("select 1. from t").unwrap_err();
        assert!(matches!(err, Error::Lex(_)));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Lexer::tokenize("select 'abc from t").unwrap_err();
        assert!(matches!(err, Error::Lex(_)));
    }

    #[test]
    fn float_literal_has_dot() {
        let kinds = kinds("select 1.5");
        assert_eq!(kinds[1], TokenKind::FloatLit(1.5));
    }

    #[test]
    fn boolean_literals() {
        let kinds = kinds("select true, false");
        assert_eq!(kinds[1], TokenKind::BooleanLit(true));
        assert_eq!(kinds[3], TokenKind::BooleanLit(false));
    }

    #[test]
    fn reports_row_and_col() {
        let tokens = Lexer::tokenize("select a\nfrom t").unwrap();
        let from = tokens.iter().find(|t| t.kind == TokenKind::From).unwrap();
        assert_eq!(from.position.row, 2);
    }

    #[rstest::rstest]
    #[case("select", TokenKind::Select)]
    #[case("SELECT", TokenKind::Select)]
    #[case("Where", TokenKind::Where)]
    #[case("group", TokenKind::Group)]
    #[case("union", TokenKind::Union)]
    #[case("desc", TokenKind::Desc)]
    #[case("like", TokenKind::Like)]
    fn keyword_lookup_is_case_insensitive(#[case] word: &str, #[case] expected: TokenKind) {
        assert_eq!(kinds(word)[0], expected);
    }

    #[rstest::rstest]
    #[case("+", TokenKind::Plus)]
    #[case("-", TokenKind::Minus)]
    #[case("*", TokenKind::Star)]
    #[case("/", TokenKind::Slash)]
    #[case("%", TokenKind::Percent)]
    #[case("=", TokenKind::Eq)]
    #[case("!=", TokenKind::NotEq)]
    #[case("<", TokenKind::Lt)]
    #[case("<=", TokenKind::LtEq)]
    #[case(">", TokenKind::Gt)]
    #[case(">=", TokenKind::GtEq)]
    fn lexes_every_operator_symbol(#[case] symbol: &str, #[case] expected: TokenKind) {
        assert_eq!(kinds(&format!("a {symbol} b"))[1], expected);
    }
}
