use super::*;

fn lex(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .expect("Failed to tokenize")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_lex_keywords_and_idents() {
    let kinds = lex("func foo struct Bar protocol");
    assert_eq!(
        kinds,
        vec![
            TokenKind::KwFunc,
            TokenKind::Ident("foo".into()),
            TokenKind::KwStruct,
            TokenKind::Ident("Bar".into()),
            TokenKind::KwProtocol,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_int_and_float_literals() {
    let kinds = lex("42 3.25");
    assert_eq!(
        kinds,
        vec![
            TokenKind::IntLit(42),
            TokenKind::FloatLit(3.25),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_lex_member_access_on_int_literal() {
    // `1.foo` must lex as IntLit Dot Ident, not a float.
    let kinds = lex("1.foo");
    assert_eq!(
        kinds,
        vec![
            TokenKind::IntLit(1),
            TokenKind::Dot,
            TokenKind::Ident("foo".into()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_lex_operators_glue() {
    let kinds = lex("a >>= b");
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Operator(">>=".into()),
            TokenKind::Ident("b".into()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_lex_arrow_and_assign() {
    let kinds = lex("-> = ==");
    assert_eq!(
        kinds,
        vec![
            TokenKind::Arrow,
            TokenKind::Assign,
            TokenKind::Operator("==".into()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_lex_string_with_escapes() {
    let kinds = lex(r#""a\nb""#);
    assert_eq!(
        kinds,
        vec![TokenKind::StringLit("a\nb".into()), TokenKind::Eof]
    );
}

#[test]
fn test_lex_unterminated_string() {
    let err = Lexer::new("\"abc").tokenize().unwrap_err();
    assert!(matches!(err.kind(), LexErrorKind::UnterminatedString));
}

#[test]
fn test_lex_line_comment() {
    let kinds = lex("1 // comment\n2");
    assert_eq!(
        kinds,
        vec![TokenKind::IntLit(1), TokenKind::IntLit(2), TokenKind::Eof]
    );
}

#[test]
fn test_lex_spans_track_lines() {
    let tokens = Lexer::new("a\nbb").tokenize().expect("Failed to tokenize");
    assert_eq!(tokens[0].span.start.line, 1);
    assert_eq!(tokens[1].span.start.line, 2);
    assert_eq!(tokens[1].span.start.column, 1);
    assert_eq!(tokens[1].span.end.column, 3);
}

#[test]
fn test_lex_unexpected_char() {
    let err = Lexer::new("§").tokenize().unwrap_err();
    assert!(matches!(err.kind(), LexErrorKind::UnexpectedChar('§')));
}
