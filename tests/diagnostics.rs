#[cfg(test)]
mod diagnostics_tests {
    use std::io;

    use rox as lox;

    use lox::config::Flags;
    use lox::diagnostics::{Level, Reporter};
    use lox::lox::Lox;
    use lox::natives::SystemIo;

    #[test]
    fn test_cap_suppresses_later_diagnostics() {
        let mut reporter = Reporter::new(3);

        for n in 0..3 {
            reporter.report(Level::Error, format!("error {}", n), None);
        }
        assert!(!reporter.too_many_errors());
        assert_eq!(reporter.messages().len(), 3);

        reporter.report(Level::Error, "error 3", None);
        reporter.report(Level::Warn, "late warning", None);

        assert!(reporter.too_many_errors());
        assert!(reporter.is_error());
        assert!(reporter.is_warn());

        let messages = reporter.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].level, Level::Fatal);
        assert!(messages[3].message.starts_with("Too many errors (3)"));
    }

    #[test]
    fn test_reset_lifts_the_cap() {
        let mut reporter = Reporter::new(1);

        reporter.report(Level::Error, "first", None);
        reporter.report(Level::Error, "second", None);
        assert!(reporter.too_many_errors());

        reporter.reset();

        assert!(!reporter.too_many_errors());
        assert!(!reporter.is_error());

        reporter.report(Level::Warn, "fresh", None);
        assert_eq!(reporter.messages()[0].message, "fresh");
    }

    #[test]
    fn test_session_honours_max_errors() {
        let flags = Flags {
            max_errors: 2,
            ..Flags::quiet()
        };
        let mut lox = Lox::with_io(flags, Box::new(SystemIo), Box::new(io::sink()));

        assert!(!lox.run("print a; print b; print c; print d;"));

        assert!(lox.reporter().too_many_errors());
        assert_eq!(lox.reporter().count(Level::Error), 2);
        assert_eq!(lox.reporter().count(Level::Fatal), 1);
        assert_eq!(lox.exit_code(), 1);
    }
}
