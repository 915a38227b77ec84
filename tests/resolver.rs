#[cfg(test)]
mod resolver_tests {
    use std::collections::HashMap;

    use rox as lox;

    use lox::ast::ExprId;
    use lox::config::Flags;
    use lox::diagnostics::{Level, Reporter};
    use lox::natives;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;

    fn new_resolver(flags: Flags) -> Resolver {
        let names: Vec<&'static str> = natives::standard().iter().map(|n| n.name).collect();
        Resolver::new(names, flags)
    }

    fn resolve_in(
        resolver: &mut Resolver,
        source: &str,
    ) -> (Option<HashMap<ExprId, usize>>, Reporter) {
        let mut reporter = Reporter::default();
        let tokens = Scanner::new(source).process(&mut reporter);
        let statements = Parser::new(&tokens)
            .parse(&mut reporter)
            .expect("source should parse");

        let locals = resolver.resolve(&statements, &mut reporter);
        (locals, reporter)
    }

    fn resolve(source: &str) -> (Option<HashMap<ExprId, usize>>, Reporter) {
        resolve_in(&mut new_resolver(Flags::quiet()), source)
    }

    fn error_messages(reporter: &Reporter) -> Vec<String> {
        reporter
            .messages()
            .iter()
            .filter(|d| d.level == Level::Error)
            .map(|d| d.message.clone())
            .collect()
    }

    fn assert_single_error(source: &str, fragment: &str) {
        let (locals, reporter) = resolve(source);
        let errors = error_messages(&reporter);

        assert!(locals.is_none(), "expected failure for {:?}", source);
        assert_eq!(errors.len(), 1, "errors: {:?}", errors);
        assert!(
            errors[0].contains(fragment),
            "expected {:?} in {:?}",
            fragment,
            errors[0]
        );
    }

    #[test]
    fn test_distances_follow_block_nesting() {
        let (locals, reporter) = resolve("var a = 1; { var b = 2; { print a + b; } }");

        assert!(!reporter.is_error());

        let mut hops: Vec<usize> = locals.expect("resolves").into_values().collect();
        hops.sort_unstable();

        // `b` is one block out, the global `a` two.
        assert_eq!(hops, vec![1, 2]);
    }

    #[test]
    fn test_natives_are_visible() {
        let (locals, reporter) = resolve("print clock();");

        assert!(!reporter.is_error());
        assert_eq!(locals.map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_undefined_variable() {
        assert_single_error("print nope;", "\"nope\" was not found in current scope");
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_single_error(
            "{ var a = 1; var a = 2; print a; }",
            "variable \"a\" has already been declared in this scope",
        );
    }

    #[test]
    fn test_use_in_own_initializer() {
        assert_single_error(
            "{ var a = 1; { var a = a; } }",
            "Variable \"a\" is being used in its own initializer",
        );
    }

    #[test]
    fn test_read_before_initialization() {
        assert_single_error("var x; print x;", "Variable \"x\" is not initialized");
    }

    #[test]
    fn test_assignment_initializes() {
        let (locals, reporter) = resolve("var x; x = 1; print x;");

        assert!(locals.is_some());
        assert!(!reporter.is_error());
    }

    #[test]
    fn test_const_cannot_be_reassigned() {
        assert_single_error(
            "const a = 1; a = 2;",
            "Variable \"a\" is declared const, and cannot be modified",
        );
    }

    #[test]
    fn test_function_cannot_be_reassigned() {
        assert_single_error("fun f() {} f = 1;", "function \"f\" cannot be assigned to");
    }

    #[test]
    fn test_parameters_are_mutable() {
        let (locals, _) = resolve("fun f(a) { a = a + 1; return a; }");

        assert!(locals.is_some());
    }

    #[test]
    fn test_return_outside_function() {
        assert_single_error("return 1;", "\"return\" statement outside a function");
    }

    #[test]
    fn test_value_return_in_constructor() {
        assert_single_error(
            "class A { init() { return 1; } }",
            "Cannot return a value inside a constructor",
        );
    }

    #[test]
    fn test_bare_return_in_constructor_is_fine() {
        let (locals, _) = resolve("class A { init() { return; } }");

        assert!(locals.is_some());
    }

    #[test]
    fn test_this_outside_class() {
        assert_single_error("print this;", "\"this\" expression outside a class");
    }

    #[test]
    fn test_super_without_base_class() {
        assert_single_error(
            "class A { f() { return super.f(); } }",
            "inside class that does not have a base class",
        );
    }

    #[test]
    fn test_class_inherits_from_itself() {
        assert_single_error("class A < A {}", "class A inherits from itself");
    }

    #[test]
    fn test_static_init_rejected() {
        assert_single_error("class A { class init() {} }", "init method cannot be static");
    }

    #[test]
    fn test_getter_init_rejected() {
        assert_single_error("class A { init { return 1; } }", "init method cannot be a getter");
    }

    #[test]
    fn test_reports_every_error_in_one_pass() {
        let (locals, reporter) = resolve("print a; print b; print c;");

        assert!(locals.is_none());
        assert_eq!(error_messages(&reporter).len(), 3);
    }

    #[test]
    fn test_unused_local_warning() {
        let mut resolver = new_resolver(Flags::default());
        let (locals, reporter) = resolve_in(&mut resolver, "{ var unused = 1; }");

        assert!(locals.is_some());
        assert!(reporter.is_warn());
        assert!(!reporter.is_error());
        assert_eq!(
            reporter.messages()[0].message,
            "[line 1] Warning: -Wunused: Unused variable \"unused\""
        );
    }

    #[test]
    fn test_shadow_warning_points_at_both_declarations() {
        let mut resolver = new_resolver(Flags::default());
        let (_, reporter) = resolve_in(&mut resolver, "var a = 1;\n{ var a = 2; print a; }");

        let warnings: Vec<_> = reporter
            .messages()
            .iter()
            .filter(|d| d.level == Level::Warn)
            .collect();

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].message.contains("-Wshadow: Declaration of \"a\""));
        assert_eq!(warnings[0].token.as_ref().map(|t| t.line), Some(2));
        assert!(warnings[1].message.contains("previously declared here"));
        assert_eq!(warnings[1].token.as_ref().map(|t| t.line), Some(1));
    }

    #[test]
    fn test_lints_can_be_disabled() {
        let (_, reporter) = resolve("var a = 1; { var a = 2; var b = 3; }");

        assert!(!reporter.is_warn());
    }

    #[test]
    fn test_failed_line_rolls_back_globals() {
        let mut resolver = new_resolver(Flags::quiet());

        let (first, _) = resolve_in(&mut resolver, "var a = 1; print nope;");
        assert!(first.is_none());

        // `a` was never committed, so it is still undefined.
        let (second, reporter) = resolve_in(&mut resolver, "print a;");
        assert!(second.is_none());
        assert!(error_messages(&reporter)[0].contains("\"a\" was not found"));

        let (third, _) = resolve_in(&mut resolver, "var a = 2;");
        assert!(third.is_some());

        let (fourth, _) = resolve_in(&mut resolver, "print a;");
        assert!(fourth.is_some());
        assert!(resolver.globals().any(|name| name == "a"));
    }
}
