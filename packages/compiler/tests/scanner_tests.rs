//! Black-box scanner coverage, complementing the inline
//! unit tests in `src/scanner/mod.rs` with the scenarios that only make
//! sense from outside the module: full keyword coverage and directive
//! newline-sensitivity (which the parser, not the scanner, enforces, but
//! depends on the scanner emitting `Newline` as its own token kind).

use cadl_compiler::scanner::{Keyword, Punctuation, Scanner, TokenKind, TriviaKind};

fn kinds(text: &str) -> Vec<TokenKind> {
    Scanner::new("t.cadl", text)
        .tokenize()
        .0
        .into_iter()
        .filter(|t| !t.is_trivia())
        .map(|t| t.kind)
        .collect()
}

#[test]
fn every_keyword_is_recognized() {
    let text = "import model namespace using op interface union enum alias extends is true false";
    let ks = kinds(text);
    assert_eq!(
        ks,
        vec![
            TokenKind::Keyword(Keyword::Import),
            TokenKind::Keyword(Keyword::Model),
            TokenKind::Keyword(Keyword::Namespace),
            TokenKind::Keyword(Keyword::Using),
            TokenKind::Keyword(Keyword::Op),
            TokenKind::Keyword(Keyword::Interface),
            TokenKind::Keyword(Keyword::Union),
            TokenKind::Keyword(Keyword::Enum),
            TokenKind::Keyword(Keyword::Alias),
            TokenKind::Keyword(Keyword::Extends),
            TokenKind::Keyword(Keyword::Is),
            TokenKind::Keyword(Keyword::True),
            TokenKind::Keyword(Keyword::False),
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn mixes_is_a_plain_identifier_not_a_keyword() {
    let ks = kinds("mixes");
    assert_eq!(ks, vec![TokenKind::Identifier("mixes".into()), TokenKind::EndOfFile]);
}

#[test]
fn newline_is_its_own_token_not_trivia() {
    let (tokens, _) = Scanner::new("t.cadl", "a\nb").tokenize();
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Newline)));
}

#[test]
fn every_punctuation_is_recognized() {
    let ks = kinds("{}()[]<>,;:.?=|&@#*");
    assert_eq!(
        ks,
        vec![
            TokenKind::Punctuation(Punctuation::OpenBrace),
            TokenKind::Punctuation(Punctuation::CloseBrace),
            TokenKind::Punctuation(Punctuation::OpenParen),
            TokenKind::Punctuation(Punctuation::CloseParen),
            TokenKind::Punctuation(Punctuation::OpenBracket),
            TokenKind::Punctuation(Punctuation::CloseBracket),
            TokenKind::Punctuation(Punctuation::LessThan),
            TokenKind::Punctuation(Punctuation::GreaterThan),
            TokenKind::Punctuation(Punctuation::Comma),
            TokenKind::Punctuation(Punctuation::Semicolon),
            TokenKind::Punctuation(Punctuation::Colon),
            TokenKind::Punctuation(Punctuation::Dot),
            TokenKind::Punctuation(Punctuation::Question),
            TokenKind::Punctuation(Punctuation::Equals),
            TokenKind::Punctuation(Punctuation::Bar),
            TokenKind::Punctuation(Punctuation::Ampersand),
            TokenKind::Punctuation(Punctuation::At),
            TokenKind::Punctuation(Punctuation::Hash),
            TokenKind::Punctuation(Punctuation::Star),
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn single_and_multi_line_comments_are_trivia() {
    let (tokens, _) = Scanner::new("t.cadl", "// a\nmodel /* b */ Foo").tokenize();
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Trivia(TriviaKind::SingleLineComment))));
    assert!(tokens.iter().any(|t| matches!(t.kind, TokenKind::Trivia(TriviaKind::MultiLineComment))));
}

#[test]
fn plain_integer_literal_is_lexed_without_fraction() {
    let ks = kinds("42");
    assert_eq!(ks, vec![TokenKind::NumericLiteral("42".into()), TokenKind::EndOfFile]);
}
