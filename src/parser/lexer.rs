//! Lexer (tokenizer) for script source
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Each token records whether a line break preceded it, which the parser
//! needs for automatic semicolon insertion.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(String),

    // Identifiers
    Ident(String),

    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    Throw,
    Try,
    Catch,
    Finally,
    True,
    False,
    Null,
    Typeof,
    Void,

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,     // ==
    NotEq,    // !=
    EqEqEq,   // ===
    NotEqEq,  // !==
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Bitwise
    Amp,    // &
    Pipe,   // |
    Caret,  // ^
    Tilde,  // ~
    LtLt,   // <<
    GtGt,   // >>
    GtGtGt, // >>>

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=
    AmpEq,     // &=
    PipeEq,    // |=
    CaretEq,   // ^=
    LtLtEq,    // <<=
    GtGtEq,    // >>=
    GtGtGtEq,  // >>>=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    Dot,      // .
    Question, // ?
    Colon,    // :

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    Eof,
}

/// A token with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Str(s) => write!(f, "string {:?}", s),
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Var => write!(f, "'var'"),
            TokenKind::Let => write!(f, "'let'"),
            TokenKind::Const => write!(f, "'const'"),
            TokenKind::Function => write!(f, "'function'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::Do => write!(f, "'do'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::Break => write!(f, "'break'"),
            TokenKind::Continue => write!(f, "'continue'"),
            TokenKind::Throw => write!(f, "'throw'"),
            TokenKind::Try => write!(f, "'try'"),
            TokenKind::Catch => write!(f, "'catch'"),
            TokenKind::Finally => write!(f, "'finally'"),
            TokenKind::True => write!(f, "'true'"),
            TokenKind::False => write!(f, "'false'"),
            TokenKind::Null => write!(f, "'null'"),
            TokenKind::Typeof => write!(f, "'typeof'"),
            TokenKind::Void => write!(f, "'void'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::EqEqEq => write!(f, "'==='"),
            TokenKind::NotEqEq => write!(f, "'!=='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Amp => write!(f, "'&'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::Caret => write!(f, "'^'"),
            TokenKind::Tilde => write!(f, "'~'"),
            TokenKind::LtLt => write!(f, "'<<'"),
            TokenKind::GtGt => write!(f, "'>>'"),
            TokenKind::GtGtGt => write!(f, "'>>>'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::AmpEq => write!(f, "'&='"),
            TokenKind::PipeEq => write!(f, "'|='"),
            TokenKind::CaretEq => write!(f, "'^='"),
            TokenKind::LtLtEq => write!(f, "'<<='"),
            TokenKind::GtGtEq => write!(f, "'>>='"),
            TokenKind::GtGtGtEq => write!(f, "'>>>='"),
            TokenKind::PlusPlus => write!(f, "'++'"),
            TokenKind::MinusMinus => write!(f, "'--'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
    /// The input ended inside a construct that more input could complete.
    pub at_end: bool,
}

/// Lexer for script source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    offset: usize,
    line: usize,
    column: usize,
    let_keywords: bool,
}

impl Lexer {
    /// Create a lexer whose first line is numbered `start_line`.
    pub fn new(input: &str, start_line: usize) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            offset: 0,
            line: start_line,
            column: 1,
            let_keywords: true,
        }
    }

    /// Treat `let` and `const` as keywords (they are plain identifiers in
    /// older language versions).
    pub fn with_let_keywords(mut self, enabled: bool) -> Self {
        self.let_keywords = enabled;
        self
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let newline_before = self.skip_whitespace_and_comments()?;
            let location = self.current_location();

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location,
                    newline_before,
                });
                break;
            }

            let kind = self.next_token()?;
            tokens.push(Token {
                kind,
                location,
                newline_before,
            });
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of input".to_string(),
            location: loc,
            at_end: true,
        })?;

        let kind = match ch {
            '"' | '\'' => self.string_literal(ch, loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)?
            }
            c if c == '_' || c == '$' || c.is_alphabetic() => {
                self.identifier_or_keyword(ch)
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => self.with_eq(TokenKind::StarEq, TokenKind::Star),
            '/' => self.with_eq(TokenKind::SlashEq, TokenKind::Slash),
            '%' => self.with_eq(TokenKind::PercentEq, TokenKind::Percent),
            '^' => self.with_eq(TokenKind::CaretEq, TokenKind::Caret),
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.eat('<') {
                    self.with_eq(TokenKind::LtLtEq, TokenKind::LtLt)
                } else if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        self.with_eq(TokenKind::GtGtGtEq, TokenKind::GtGtGt)
                    } else {
                        self.with_eq(TokenKind::GtGtEq, TokenKind::GtGt)
                    }
                } else if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else {
                    self.with_eq(TokenKind::AmpEq, TokenKind::Amp)
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else {
                    self.with_eq(TokenKind::PipeEq, TokenKind::Pipe)
                }
            }
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            _ => {
                return Err(LexError {
                    message: "illegal character".to_string(),
                    location: loc,
                    at_end: false,
                })
            }
        };

        Ok(kind)
    }

    fn with_eq(&mut self, assign: TokenKind, plain: TokenKind) -> TokenKind {
        if self.eat('=') {
            assign
        } else {
            plain
        }
    }

    fn string_literal(
        &mut self,
        quote: char,
        start: SourceLocation,
    ) -> Result<TokenKind, LexError> {
        let mut value = String::new();
        let unterminated = |at_end| LexError {
            message: "unterminated string literal".to_string(),
            location: start,
            at_end,
        };

        loop {
            match self.advance() {
                None => return Err(unterminated(false)),
                Some('\n') => return Err(unterminated(false)),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = self.advance().ok_or_else(|| unterminated(false))?;
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        '\n' => {}
                        'x' => value.push(self.hex_escape(2, start)?),
                        'u' => value.push(self.hex_escape(4, start)?),
                        other => value.push(other),
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(TokenKind::Str(value))
    }

    fn hex_escape(
        &mut self,
        digits: usize,
        start: SourceLocation,
    ) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| LexError {
                    message: "malformed escape sequence".to_string(),
                    location: start,
                    at_end: false,
                })?;
            self.advance();
            code = code * 16 + digit;
        }
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn number_literal(
        &mut self,
        first: char,
        start: SourceLocation,
    ) -> Result<TokenKind, LexError> {
        let value = if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit()) {
                digits.push(c);
                self.advance();
            }
            if digits.is_empty() {
                return Err(LexError {
                    message: "missing hexadecimal digits after '0x'".to_string(),
                    location: start,
                    at_end: false,
                });
            }
            digits
                .chars()
                .filter_map(|c| c.to_digit(16))
                .fold(0.0, |acc, d| acc * 16.0 + d as f64)
        } else {
            let mut text = String::new();
            text.push(first);
            self.take_digits(&mut text);
            if first != '.' && self.peek() == Some('.') {
                text.push('.');
                self.advance();
                self.take_digits(&mut text);
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let sign = self.peek_ahead(1);
                let exponent_digit = match sign {
                    Some('+' | '-') => self.peek_ahead(2),
                    other => other,
                };
                if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
                    text.push('e');
                    self.advance();
                    if let Some(s @ ('+' | '-')) = self.peek() {
                        text.push(s);
                        self.advance();
                    }
                    self.take_digits(&mut text);
                }
            }
            text.parse::<f64>().map_err(|_| LexError {
                message: "malformed number literal".to_string(),
                location: start,
                at_end: false,
            })?
        };

        if self
            .peek()
            .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
        {
            return Err(LexError {
                message: "identifier starts immediately after numeric literal"
                    .to_string(),
                location: self.current_location(),
                at_end: false,
            });
        }

        Ok(TokenKind::Number(value))
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            text.push(c);
            self.advance();
        }
    }

    fn identifier_or_keyword(&mut self, first: char) -> TokenKind {
        let mut ident = String::new();
        ident.push(first);

        while let Some(c) = self
            .peek()
            .filter(|c| *c == '_' || *c == '$' || c.is_alphanumeric())
        {
            ident.push(c);
            self.advance();
        }

        match ident.as_str() {
            "var" => TokenKind::Var,
            "let" if self.let_keywords => TokenKind::Let,
            "const" if self.let_keywords => TokenKind::Const,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "throw" => TokenKind::Throw,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "typeof" => TokenKind::Typeof,
            "void" => TokenKind::Void,
            _ => TokenKind::Ident(ident),
        }
    }

    /// Skips whitespace and comments, returning whether a line break was crossed.
    fn skip_whitespace_and_comments(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n' | '\r') => {
                    newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_ahead(1) == Some('*') => {
                    let start = self.current_location();
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            None => {
                                return Err(LexError {
                                    message: "unterminated comment".to_string(),
                                    location: start,
                                    at_end: true,
                                })
                            }
                            Some('\n') => newline = true,
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, 1)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("var x = 0x1f;");
        assert_eq!(tokens[0], TokenKind::Var);
        assert!(matches!(tokens[1], TokenKind::Ident(ref s) if s == "x"));
        assert_eq!(tokens[2], TokenKind::Eq);
        assert_eq!(tokens[3], TokenKind::Number(31.0));
        assert_eq!(tokens[4], TokenKind::Semicolon);
        assert_eq!(tokens[5], TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("=== !== >>> >>>= <<= ++ -- && ||");
        assert_eq!(
            tokens[..9],
            [
                TokenKind::EqEqEq,
                TokenKind::NotEqEq,
                TokenKind::GtGtGt,
                TokenKind::GtGtGtEq,
                TokenKind::LtLtEq,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::AndAnd,
                TokenKind::OrOr,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let tokens = Lexer::new("a // c\nb /* x\ny */ c", 1).tokenize().unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(tokens[2].newline_before);
        assert_eq!(tokens[2].location.line, 3);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r#"'a\tb\x41B'"#);
        assert_eq!(tokens[0], TokenKind::Str("a\tbAB".to_string()));
    }

    #[test]
    fn test_offsets_and_start_line() {
        let tokens = Lexer::new("x\n  y", 7).tokenize().unwrap();
        assert_eq!(tokens[1].location, SourceLocation::new(8, 3, 4));
    }

    #[test]
    fn test_unterminated_comment_is_incomplete() {
        let err = Lexer::new("/* open", 1).tokenize().unwrap_err();
        assert!(err.at_end);
        let err = Lexer::new("'open\n", 1).tokenize().unwrap_err();
        assert!(!err.at_end);
    }

    #[test]
    fn test_let_as_identifier() {
        let tokens = Lexer::new("let", 1)
            .with_let_keywords(false)
            .tokenize()
            .unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Ident(ref s) if s == "let"));
    }
}
