#[cfg(test)]
mod scanner_tests {
    use rox as lox;

    use lox::diagnostics::Reporter;
    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn single_number(source: &str) -> Number {
        let mut reporter = Reporter::default();
        let tokens = Scanner::new(source).process(&mut reporter);

        assert!(!reporter.is_error(), "unexpected error for {:?}", source);
        assert_eq!(tokens.len(), 2);

        match &tokens[0].token_type {
            TokenType::NUMBER(n) => *n,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    fn errors_of(source: &str) -> Vec<String> {
        Scanner::new(source)
            .filter_map(|r| r.err())
            .map(|e| e.message())
            .collect()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "== != <= >= += -= *= /= %= => ? :",
            &[
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::PLUS_EQUAL, "+="),
                (TokenType::MINUS_EQUAL, "-="),
                (TokenType::STAR_EQUAL, "*="),
                (TokenType::SLASH_EQUAL, "/="),
                (TokenType::PERCENTAGE_EQUAL, "%="),
                (TokenType::ARROW, "=>"),
                (TokenType::QUESTION_MARK, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "const x = typeof not println_ _y1",
            &[
                (TokenType::CONST, "const"),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::TYPEOF, "typeof"),
                (TokenType::NOT, "not"),
                (TokenType::IDENTIFIER, "println_"),
                (TokenType::IDENTIFIER, "_y1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_are_skipped() {
        let source = "a // line\n/* block\nspanning */ b";
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_radix_literals() {
        assert_eq!(single_number("0xFF"), Number::Int(255));
        assert_eq!(single_number("0b101"), Number::Int(5));
        assert_eq!(single_number("0o17"), Number::Int(15));
    }

    #[test]
    fn test_decimal_literals() {
        assert_eq!(single_number("42"), Number::Int(42));
        assert_eq!(single_number("1e3"), Number::Float(1000.0));
        assert_eq!(single_number("2.5"), Number::Float(2.5));
        assert_eq!(single_number("1.5e-1"), Number::Float(0.15));
    }

    #[test]
    fn test_oversized_integer_becomes_float() {
        match single_number("99999999999999999999") {
            Number::Float(f) => assert!(f > 9.9e19),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_string_keeps_inner_text() {
        let source = "\"ab\nc\" x";
        let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "ab\nc"),
            other => panic!("expected string, got {:?}", other),
        }

        // The identifier after the string sits on the second line.
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        let tokens: Vec<Token> = Scanner::new(r#""say \"hi\"""#)
            .filter_map(Result::ok)
            .collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, r#"say \"hi\""#),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#\n;").collect();

        // COMMA, DOT, error for '$' (rest of line skipped), SEMICOLON, EOF
        assert_eq!(results.len(), 5);
        assert!(results[2].is_err());

        let kinds: Vec<TokenType> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|t| t.token_type.clone())
            .collect();

        assert_eq!(
            kinds,
            vec![
                TokenType::COMMA,
                TokenType::DOT,
                TokenType::SEMICOLON,
                TokenType::EOF
            ]
        );
    }

    #[test]
    fn test_lexical_error_messages() {
        assert_eq!(errors_of("\"open"), vec!["Unterminated string literal"]);
        assert_eq!(errors_of("/* never closed"), vec!["Unterminated block comment"]);
        assert_eq!(
            errors_of("1e;"),
            vec!["Invalid numeric literal, no number following 'e'"]
        );
        assert_eq!(errors_of("0x;"), vec!["Incomplete hexadecimal literal 0x"]);
        assert_eq!(
            errors_of("12abc"),
            vec!["Invalid character in decimal literal 'a'"]
        );
        assert_eq!(errors_of("é"), vec!["Invalid character 'é'"]);
    }

    #[test]
    fn test_error_token_carries_span() {
        let err = Scanner::new("x @")
            .find_map(|r| r.err())
            .expect("an error");

        let token = err.token().expect("a token");
        assert_eq!(token.token_type, TokenType::UNKNOWN);
        assert_eq!(token.span, 2..3);
    }

    #[test]
    fn test_process_reports_and_always_ends_with_eof() {
        let mut reporter = Reporter::default();
        let tokens = Scanner::new("var a = 1;\n#\nprint a;").process(&mut reporter);

        assert!(reporter.is_error());
        assert_eq!(reporter.messages().len(), 1);
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
        assert_eq!(tokens.len(), 9);
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(_))));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
