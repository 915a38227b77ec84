#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox as lox;

    use lox::config::Flags;
    use lox::diagnostics::Level;
    use lox::lox::Lox;
    use lox::natives::IoProvider;

    /// Output sink the test keeps a handle on.
    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Capture {
        fn take(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.borrow_mut());
            String::from_utf8(bytes).expect("output is utf-8")
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Fixed clock and scripted input.
    struct ScriptedIo {
        lines: VecDeque<String>,
    }

    impl IoProvider for ScriptedIo {
        fn clock(&mut self) -> f64 {
            42.5
        }

        fn read_line(&mut self) -> Option<String> {
            self.lines.pop_front()
        }
    }

    fn session_with_input(lines: &[&str]) -> (Lox, Capture) {
        let capture = Capture::default();
        let io = ScriptedIo {
            lines: lines.iter().map(|l| l.to_string()).collect(),
        };

        let session = Lox::with_io(Flags::quiet(), Box::new(io), Box::new(capture.clone()));
        (session, capture)
    }

    fn session() -> (Lox, Capture) {
        session_with_input(&[])
    }

    /// Run a program that must succeed and return what it printed.
    fn output_of(source: &str) -> String {
        let (mut lox, out) = session();
        let ok = lox.run(source);

        assert!(ok, "diagnostics: {:?}", lox.diagnostics());
        out.take()
    }

    /// Run a program that must fail; returns (output, first error message).
    fn failure_of(source: &str) -> (String, String) {
        let (mut lox, out) = session();

        assert!(!lox.run(source), "expected an error in {:?}", source);
        assert_eq!(lox.exit_code(), 1);

        let message = lox
            .diagnostics()
            .iter()
            .find(|d| d.level == Level::Error)
            .map(|d| d.message.clone())
            .unwrap_or_default();

        (out.take(), message)
    }

    // ───────────────────────── closures ────────────────────────────

    #[test]
    fn test_counters_are_isolated() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    println i;
                }
                return count;
            }

            var counter1 = makeCounter();
            var counter2 = makeCounter();

            counter1(); counter1(); counter1();
            counter2(); counter2(); counter2(); counter2();
            counter1();
            counter2();
        "#;

        assert_eq!(output_of(source), "1\n2\n3\n1\n2\n3\n4\n4\n5\n");
    }

    #[test]
    fn test_closure_sees_later_assignment() {
        let source = r#"
            var x = "before";
            fun show() { println x; }
            x = "after";
            show();
        "#;

        assert_eq!(output_of(source), "after\n");
    }

    #[test]
    fn test_closures_bind_lexically() {
        let source = r#"
            var a = "global";
            {
                fun show() { println a; }
                show();
                var a = "block";
                show();
                println a;
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
            println fib(15);
        "#;

        assert_eq!(output_of(source), "610\n");
    }

    #[test]
    fn test_arrow_functions_capture() {
        let source = r#"
            fun adder(n) { return (x) => x + n; }
            var add2 = adder(2);
            println add2(40);

            var block = (a, b) => { var s = a * b; return s; };
            println block(3, 4);
            println (() => nil)();
        "#;

        assert_eq!(output_of(source), "42\n12\nnil\n");
    }

    // ───────────────────────── numbers and operators ───────────────

    #[test]
    fn test_numeric_semantics() {
        let source = r#"
            println 3 == 3.0;
            println 5 / 2;
            println 5 % 3;
            println 10 / 5;
            println 2.0 * 3;
            println -7 % 3;
            println 7 % -3;
            println 9223372036854775807 + 1 == 9223372036854775808.0;
            println 0xFF + 0b1 + 0o10;
            println 1e3;
        "#;

        assert_eq!(
            output_of(source),
            "true\n2.5\n2\n2.0\n6.0\n2\n-2\ntrue\n264\n1000.0\n"
        );
    }

    #[test]
    fn test_comparisons_and_equality() {
        let source = r#"
            println 1 < 2.5;
            println "a" < "b";
            println 2 >= 2;
            println nil == nil;
            println 1 == "1";
            println "x" != "y";
            println true == true;
        "#;

        assert_eq!(
            output_of(source),
            "true\ntrue\ntrue\ntrue\nfalse\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_strings_and_natives() {
        let source = r#"
            println "ab" + "cd";
            println len("héllo");
            println floor(2.7);
            println parse_int("12") + 1;
            println parse_int("twelve");
            println parse_float("2.5");
            println to_string(12) + "!";
        "#;

        assert_eq!(output_of(source), "abcd\n5\n2\n13\nnil\n2.5\n12!\n");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let source = r#"
            fun loud() { println "evaluated"; return true; }
            println false and loud();
            println true or loud();
            println nil or "fallback";
            println not nil;
            println !0;
        "#;

        assert_eq!(output_of(source), "false\ntrue\nfallback\ntrue\nfalse\n");
    }

    #[test]
    fn test_typeof() {
        let source = r#"
            println typeof 1;
            println typeof 1.5;
            println typeof "s";
            println typeof nil;
            println typeof true;
            println typeof clock;
            class A {}
            println typeof A;
        "#;

        assert_eq!(
            output_of(source),
            "number\nnumber\nstr\nnil\nbool\nfunction\nfunction\n"
        );
    }

    #[test]
    fn test_ternary_comma_and_compound_assignment() {
        let source = r#"
            println 1 < 2 ? "yes" : "no";
            println (1, 2);
            var x = 5;
            x += 2;
            x *= 3;
            x -= 1;
            x %= 7;
            println x;
        "#;

        assert_eq!(output_of(source), "yes\n2\n6\n");
    }

    #[test]
    fn test_value_display() {
        let source = r#"
            fun f() {}
            class C {}
            println f;
            println C;
            println C();
            println clock;
            println (x) => x;
        "#;

        assert_eq!(
            output_of(source),
            "<function f>\n<class C>\n<C instance>\n<native function clock>\n<arrow function>\n"
        );
    }

    // ───────────────────────── statements ──────────────────────────

    #[test]
    fn test_print_has_no_newline() {
        assert_eq!(output_of("print 1; print 2; println 3;"), "123\n");
    }

    #[test]
    fn test_for_break_and_continue() {
        let source = r#"
            for var x = 0; x < 5; x = x + 1 {
                if (x == 2) continue;
                if (x == 3) break;
                print x;
            }
        "#;

        assert_eq!(output_of(source), "01");
    }

    #[test]
    fn test_while_with_signals() {
        let source = r#"
            var i = 0;
            while i < 10 {
                i += 1;
                if i % 2 == 0 continue;
                if i > 7 break;
                print i;
            }
        "#;

        assert_eq!(output_of(source), "1357");
    }

    #[test]
    fn test_return_from_inside_loop() {
        let source = r#"
            fun first_over(limit) {
                for var i = 0; ; i += 1 {
                    while true {
                        if i > limit return i;
                        break;
                    }
                }
            }
            println first_over(3);
        "#;

        assert_eq!(output_of(source), "4\n");
    }

    #[test]
    fn test_if_else_chain() {
        let source = r#"
            fun grade(n) {
                if n > 90 return "A";
                else if n > 80 return "B";
                else return "C";
            }
            println grade(95);
            println grade(85);
            println grade(10);
        "#;

        assert_eq!(output_of(source), "A\nB\nC\n");
    }

    #[test]
    fn test_assert_passes_silently() {
        assert_eq!(output_of("assert 1 + 1 == 2, \"math\"; println \"ok\";"), "ok\n");
    }

    // ───────────────────────── classes ─────────────────────────────

    #[test]
    fn test_fields_methods_and_this() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            p.x = 10;
            println p.sum();
            var m = p.sum;
            println m();
        "#;

        assert_eq!(output_of(source), "12\n12\n");
    }

    #[test]
    fn test_init_returns_instance() {
        let source = r#"
            class A { init() { this.v = 1; return; } }
            var a = A();
            println a.init() == a;
        "#;

        assert_eq!(output_of(source), "true\n");
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = r#"
            class A {
                init() { println "A.init"; }
                speak() { return "A"; }
                only_base() { return "base"; }
            }
            class B < A {
                init() { super.init(); println "B.init"; }
                speak() { return "B+" + super.speak(); }
            }
            var b = B();
            println b.speak();
            println b.only_base();
        "#;

        assert_eq!(output_of(source), "A.init\nB.init\nB+A\nbase\n");
    }

    #[test]
    fn test_inherited_constructor() {
        let source = r#"
            class A { init(x) { this.x = x; } }
            class B < A {}
            var b = B(3);
            println b.x;
        "#;

        assert_eq!(output_of(source), "3\n");
    }

    #[test]
    fn test_getters_statics_and_class_fields() {
        let source = r#"
            class Square {
                init(side) { this.side = side; }
                area { return this.side * this.side; }
                class of(side) { return Square(side); }
            }
            println Square.of(3).area;

            Square.created = 1;
            println Square.created;
            println Square(2).created;
        "#;

        assert_eq!(output_of(source), "9\n1\n1\n");
    }

    #[test]
    fn test_static_methods_are_inherited() {
        let source = r#"
            class A { class make() { return "made"; } }
            class B < A {}
            println B.make();
        "#;

        assert_eq!(output_of(source), "made\n");
    }

    // ───────────────────────── run‑time errors ─────────────────────

    #[test]
    fn test_type_mismatch() {
        let (_, message) = failure_of("print 1 + \"a\";");

        assert!(message.contains("Type Error"), "{}", message);
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        let (_, message) = failure_of("print 1 / 0;");
        assert!(message.contains("Runtime Error: Division by zero"), "{}", message);

        let (_, message) = failure_of("print 1 % 0;");
        assert!(message.contains("Runtime Error"), "{}", message);
    }

    #[test]
    fn test_execution_stops_at_first_error() {
        let (output, _) = failure_of("print 1; print 1 / 0; print 2;");

        assert_eq!(output, "1");
    }

    #[test]
    fn test_static_error_prevents_any_output() {
        let (output, message) = failure_of("print 1; print undefined_name;");

        assert_eq!(output, "");
        assert!(message.contains("Name Error"), "{}", message);
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, message) = failure_of("fun f(a) {} f();");
        assert!(message.contains("Too few arguments"), "{}", message);

        let (_, message) = failure_of("fun f(a) {} f(1, 2);");
        assert!(message.contains("Too many arguments"), "{}", message);
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, message) = failure_of("var x = 1; x();");

        assert!(message.contains("Type Error"), "{}", message);
    }

    #[test]
    fn test_missing_attribute() {
        let (_, message) = failure_of("class A {} var a = A(); print a.nope;");

        assert!(
            message.contains("There is no attribute \"nope\" on an instance of class \"A\""),
            "{}",
            message
        );
    }

    #[test]
    fn test_attribute_on_non_instance() {
        let (_, message) = failure_of("var s = \"str\"; print s.len;");

        assert!(message.contains("Only instances and classes have attributes"), "{}", message);
    }

    #[test]
    fn test_base_must_be_a_class() {
        let (_, message) = failure_of("var NotClass = 1; class A < NotClass {}");

        assert!(message.contains("\"NotClass\" is expected to be a class"), "{}", message);
    }

    #[test]
    fn test_failed_assertion() {
        let (_, message) = failure_of("assert 1 == 2, \"math is broken\";");

        assert!(message.contains("Assertion Error: math is broken"), "{}", message);
    }

    #[test]
    fn test_native_errors_become_runtime_errors() {
        let (_, message) = failure_of("print len(1);");

        assert!(message.contains("Runtime Error: len function only works with str"), "{}", message);
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        // Enough native stack for the depth limit in unoptimized builds.
        let (first, second, output) = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let (mut lox, out) = session();

                assert!(!lox.run("fun f(n) { return f(n + 1); } f(0);"));
                let first = lox.diagnostics()[0].message.clone();

                assert!(!lox.run_line("var g = nil; g = (n) => g(n + 1); g(0);"));
                let second = lox.diagnostics()[0].message.clone();

                // The depth count starts over after an error.
                assert!(lox.run_line(
                    "fun down(n) { if n == 0 return 0; return down(n - 1); } print down(900);"
                ));

                (first, second, out.take())
            })
            .expect("thread starts")
            .join()
            .expect("no native stack overflow");

        assert!(first.contains("Runtime Error: Maximum recursion depth exceeded"));
        assert!(second.contains("Maximum recursion depth exceeded"));
        assert_eq!(output, "0");
    }

    // ───────────────────────── host I/O ────────────────────────────

    #[test]
    fn test_clock_and_input_use_the_provider() {
        let (mut lox, out) = session_with_input(&["hello"]);

        assert!(lox.run("println clock(); println input(); println input();"));
        assert_eq!(out.take(), "42.5\nhello\nnil\n");
    }

    // ───────────────────────── REPL ────────────────────────────────

    #[test]
    fn test_repl_error_then_continue() {
        let (mut lox, out) = session();

        assert!(!lox.run_line("var x = ;"));
        assert_eq!(lox.reporter().count(Level::Error), 1);

        assert!(lox.run_line("print 1;"));
        assert!(!lox.had_error());
        assert_eq!(out.take(), "1");
    }

    #[test]
    fn test_repl_keeps_globals_and_echoes_expressions() {
        let (mut lox, out) = session();

        assert!(lox.run_line("var a = 10;"));
        assert!(lox.run_line("fun twice(n) { return n * 2; }"));
        assert!(lox.run_line("twice(a)"));
        assert_eq!(out.take(), "20\n");
    }

    #[test]
    fn test_repl_runtime_error_keeps_session_usable() {
        let (mut lox, out) = session();

        assert!(lox.run_line("var a = 1;"));
        assert!(!lox.run_line("a / 0"));
        assert!(lox.run_line("a + 1"));
        assert_eq!(out.take(), "2\n");
    }

    #[test]
    fn test_repl_runtime_failure_forgets_unexecuted_globals() {
        let (mut lox, out) = session();

        assert!(!lox.run_line("var b = 1 / 0;"));

        assert!(!lox.run_line("print b;"));
        assert!(lox.diagnostics()[0].message.contains("\"b\" was not found"));

        assert!(lox.run_line("var b = 2;"));
        assert!(lox.run_line("b"));
        assert_eq!(out.take(), "2\n");
    }

    #[test]
    fn test_repl_runtime_failure_keeps_globals_that_ran() {
        let (mut lox, out) = session();

        assert!(!lox.run_line("var c = 1; var d = c / 0; var e = 3;"));

        assert!(lox.run_line("c"));
        assert_eq!(out.take(), "1\n");

        for name in ["d", "e"] {
            assert!(!lox.run_line(&format!("{};", name)));
            assert!(lox.diagnostics()[0].message.contains("was not found"));
            assert!(lox.run_line(&format!("var {} = 4;", name)));
        }
    }
}
