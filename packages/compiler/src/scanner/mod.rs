//! Scanner: UTF-8 byte stream to token stream.
//!
//! A hand-rolled character cursor over the source text, cut down to CADL's
//! much smaller grammar: no HTML tags, ICU expansion forms, or entity
//! decoding.

mod token;

pub use token::{Keyword, Punctuation, Token, TokenKind, TriviaKind};

use crate::chars;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticTarget, Span};

pub struct Scanner<'a> {
    text: &'a str,
    chars: Vec<(u32, char)>,
    pos: usize,
    file_path: &'a str,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    pub fn new(file_path: &'a str, text: &'a str) -> Self {
        let chars: Vec<(u32, char)> = text
            .char_indices()
            .map(|(i, c)| (i as u32, c))
            .collect();
        Scanner {
            text,
            chars,
            pos: 0,
            file_path,
            diagnostics: Vec::new(),
        }
    }

    fn offset_at(&self, idx: usize) -> u32 {
        self.chars.get(idx).map(|(o, _)| *o).unwrap_or(self.text.len() as u32)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&mut self, code: DiagnosticCode, msg: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(
            code,
            msg,
            DiagnosticTarget::span(self.file_path, span),
        ));
    }

    /// Produce every token, including trivia, in source order.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        if self.pos == 0 && self.peek() == Some('#') && self.peek_at(1) == Some('!') {
            let start = self.offset_at(self.pos);
            while let Some(c) = self.peek() {
                if chars::is_line_break(c) {
                    break;
                }
                self.advance();
            }
            let end = self.offset_at(self.pos);
            tokens.push(Token::new(TokenKind::Trivia(TriviaKind::Shebang), Span::new(start, end)));
        }
        loop {
            let token = self.scan_one();
            let is_eof = matches!(token.kind, TokenKind::EndOfFile);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn scan_one(&mut self) -> Token {
        let start = self.offset_at(self.pos);
        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::EndOfFile, Span::empty_at(start));
        };

        if chars::is_line_break(ch) {
            self.advance();
            if ch == '\r' && self.peek() == Some('\n') {
                self.advance();
            }
            return Token::new(TokenKind::Newline, Span::new(start, self.offset_at(self.pos)));
        }

        if chars::is_white_space(ch) {
            while let Some(c) = self.peek() {
                if chars::is_white_space(c) {
                    self.advance();
                } else {
                    break;
                }
            }
            return Token::new(
                TokenKind::Trivia(TriviaKind::Whitespace),
                Span::new(start, self.offset_at(self.pos)),
            );
        }

        if ch == '/' && self.peek_at(1) == Some('/') {
            while let Some(c) = self.peek() {
                if chars::is_line_break(c) {
                    break;
                }
                self.advance();
            }
            return Token::new(
                TokenKind::Trivia(TriviaKind::SingleLineComment),
                Span::new(start, self.offset_at(self.pos)),
            );
        }

        if ch == '/' && self.peek_at(1) == Some('*') {
            self.advance();
            self.advance();
            let mut closed = false;
            while let Some(c) = self.peek() {
                if c == '*' && self.peek_at(1) == Some('/') {
                    self.advance();
                    self.advance();
                    closed = true;
                    break;
                }
                self.advance();
            }
            let span = Span::new(start, self.offset_at(self.pos));
            if !closed {
                self.error(DiagnosticCode::UnterminatedLiteral, "Unterminated multi-line comment.", span);
            }
            return Token::new(TokenKind::Trivia(TriviaKind::MultiLineComment), span);
        }

        if ch == '"' {
            return self.scan_string(start);
        }

        if chars::is_digit(ch) || (ch == '-' && self.peek_at(1).is_some_and(chars::is_digit)) {
            return self.scan_number(start);
        }

        if chars::is_identifier_start(ch) {
            return self.scan_identifier_or_keyword(start);
        }

        if let Some(tok) = self.scan_punctuation(start) {
            return tok;
        }

        self.advance();
        let span = Span::new(start, self.offset_at(self.pos));
        self.error(DiagnosticCode::MissingToken, format!("Unexpected character '{ch}'."), span);
        // Re-enter the loop at the next character; callers only ever see a
        // well-formed token stream, never a scanner panic.
        self.scan_one()
    }

    fn scan_string(&mut self, start: u32) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        let mut closed = false;
        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance();
                closed = true;
                break;
            }
            if chars::is_line_break(c) {
                break;
            }
            if c == '\\' {
                self.advance();
                match self.peek() {
                    Some('"') => {
                        value.push('"');
                        self.advance();
                    }
                    Some('\\') => {
                        value.push('\\');
                        self.advance();
                    }
                    Some('n') => {
                        value.push('\n');
                        self.advance();
                    }
                    Some('r') => {
                        value.push('\r');
                        self.advance();
                    }
                    Some('t') => {
                        value.push('\t');
                        self.advance();
                    }
                    Some('$') if self.peek_at(1) == Some('{') => {
                        value.push_str("${");
                        self.advance();
                        self.advance();
                    }
                    Some(other) => {
                        value.push(other);
                        self.advance();
                    }
                    None => {}
                }
                continue;
            }
            value.push(c);
            self.advance();
        }
        let span = Span::new(start, self.offset_at(self.pos));
        if !closed {
            self.error(DiagnosticCode::UnterminatedLiteral, "Unterminated string literal.", span);
        }
        Token::new(TokenKind::StringLiteral(value), span)
    }

    fn scan_number(&mut self, start: u32) -> Token {
        if self.peek() == Some('-') {
            self.advance();
        }
        while self.peek().is_some_and(chars::is_digit) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(chars::is_digit) {
            self.advance();
            while self.peek().is_some_and(chars::is_digit) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(chars::is_digit) {
                for _ in 0..=lookahead {
                    self.advance();
                }
                while self.peek().is_some_and(chars::is_digit) {
                    self.advance();
                }
            }
        }
        let span = Span::new(start, self.offset_at(self.pos));
        Token::new(TokenKind::NumericLiteral(self.text[span.pos as usize..span.end as usize].to_string()), span)
    }

    fn scan_identifier_or_keyword(&mut self, start: u32) -> Token {
        while let Some(c) = self.peek() {
            if chars::is_identifier_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let span = Span::new(start, self.offset_at(self.pos));
        let text = &self.text[span.pos as usize..span.end as usize];
        let kind = match Keyword::from_str(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(text.to_string()),
        };
        Token::new(kind, span)
    }

    fn scan_punctuation(&mut self, start: u32) -> Option<Token> {
        use Punctuation::*;
        let ch = self.peek()?;
        let (len, punct) = match ch {
            '{' => (1, OpenBrace),
            '}' => (1, CloseBrace),
            '(' => (1, OpenParen),
            ')' => (1, CloseParen),
            '[' => (1, OpenBracket),
            ']' => (1, CloseBracket),
            '<' => (1, LessThan),
            '>' => (1, GreaterThan),
            ',' => (1, Comma),
            ';' => (1, Semicolon),
            ':' => (1, Colon),
            '?' => (1, Question),
            '=' => (1, Equals),
            '|' => (1, Bar),
            '&' => (1, Ampersand),
            '@' => (1, At),
            '#' => (1, Hash),
            '*' => (1, Star),
            '.' if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') => (3, Ellipsis),
            '.' => (1, Dot),
            _ => return None,
        };
        for _ in 0..len {
            self.advance();
        }
        let span = Span::new(start, self.offset_at(self.pos));
        Some(Token::new(TokenKind::Punctuation(punct), span))
    }
}

/// Convenience wrapper that scans and drops the diagnostics; callers that
/// need the diagnostics use `Scanner::new(..).tokenize()` directly.
pub fn tokenize(file_path: &str, text: &str) -> Vec<Token> {
    Scanner::new(file_path, text).tokenize().0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize("t.cadl", text).into_iter().filter(|t| !t.is_trivia()).map(|t| t.kind).collect()
    }

    #[test]
    fn scans_model_declaration() {
        let ks = kinds("model Foo { x: int32 }");
        assert_eq!(
            ks,
            vec![
                TokenKind::Keyword(Keyword::Model),
                TokenKind::Identifier("Foo".into()),
                TokenKind::Punctuation(Punctuation::OpenBrace),
                TokenKind::Identifier("x".into()),
                TokenKind::Punctuation(Punctuation::Colon),
                TokenKind::Identifier("int32".into()),
                TokenKind::Punctuation(Punctuation::CloseBrace),
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        let ks = kinds(r#""a\nb""#);
        assert_eq!(ks, vec![TokenKind::StringLiteral("a\nb".into()), TokenKind::EndOfFile]);
    }

    #[test]
    fn reports_unterminated_string_but_still_yields_a_token() {
        let (tokens, diags) = Scanner::new("t.cadl", "\"abc").tokenize();
        assert!(!diags.is_empty());
        assert!(matches!(tokens[0].kind, TokenKind::StringLiteral(_)));
    }

    #[test]
    fn scans_negative_and_exponent_numbers() {
        let ks = kinds("-1.5e10");
        assert_eq!(ks, vec![TokenKind::NumericLiteral("-1.5e10".into()), TokenKind::EndOfFile]);
    }

    #[test]
    fn ellipsis_is_not_three_dots() {
        let ks = kinds("...a");
        assert_eq!(ks[0], TokenKind::Punctuation(Punctuation::Ellipsis));
    }

    #[test]
    fn shebang_only_recognized_at_file_start() {
        let (tokens, _) = Scanner::new("t.cadl", "#!shebang\nmodel").tokenize();
        assert!(matches!(tokens[0].kind, TokenKind::Trivia(TriviaKind::Shebang)));
    }
}
