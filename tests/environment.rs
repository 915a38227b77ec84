#[cfg(test)]
mod environment_tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rox as lox;

    use lox::environment::{EnvRef, Environment};
    use lox::error::LoxError;
    use lox::token::{Token, TokenType};
    use lox::value::Value;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1, 0..name.len())
    }

    fn root() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    fn as_int(value: Value) -> i64 {
        match value {
            Value::Int(n) => n,
            other => panic!("expected an int, got {:?}", other),
        }
    }

    #[test]
    fn test_get_walks_outward() {
        let globals = root();
        globals.borrow_mut().declare("a", Some(Value::Int(1)), false);

        let inner = Environment::child_of(&Environment::child_of(&globals));

        assert_eq!(as_int(inner.borrow().get(&ident("a")).unwrap()), 1);
    }

    #[test]
    fn test_inner_declaration_shadows() {
        let globals = root();
        globals.borrow_mut().declare("a", Some(Value::Int(1)), false);

        let inner = Environment::child_of(&globals);
        inner.borrow_mut().declare("a", Some(Value::Int(2)), false);

        assert_eq!(as_int(inner.borrow().get(&ident("a")).unwrap()), 2);
        assert_eq!(as_int(globals.borrow().get(&ident("a")).unwrap()), 1);
    }

    #[test]
    fn test_distance_lookup_matches_linear_scan() {
        let globals = root();
        globals.borrow_mut().declare("a", Some(Value::Int(1)), false);

        let middle = Environment::child_of(&globals);
        middle.borrow_mut().declare("b", Some(Value::Int(2)), false);

        let inner = Environment::child_of(&middle);

        for (name, distance) in [("a", 2), ("b", 1)] {
            let by_distance = Environment::get_at(&inner, distance, &ident(name)).unwrap();
            let by_scan = inner.borrow().get(&ident(name)).unwrap();

            assert_eq!(as_int(by_distance), as_int(by_scan));
        }
    }

    #[test]
    fn test_assign_at_is_visible_through_every_alias() {
        let globals = root();
        let shared = Environment::child_of(&globals);
        shared.borrow_mut().declare("count", Some(Value::Int(0)), false);

        let first = Environment::child_of(&shared);
        let second = Environment::child_of(&shared);

        Environment::assign_at(&first, 1, &ident("count"), Value::Int(5)).unwrap();

        assert_eq!(
            as_int(Environment::get_at(&second, 1, &ident("count")).unwrap()),
            5
        );
    }

    #[test]
    fn test_uninitialized_read_is_runtime_error() {
        let globals = root();
        globals.borrow_mut().declare("x", None, false);

        let err = globals.borrow().get(&ident("x")).unwrap_err();

        assert!(matches!(err, LoxError::Runtime { .. }));
        assert_eq!(err.message(), "Variable \"x\" is not initialized");

        globals
            .borrow_mut()
            .assign(&ident("x"), Value::Int(3))
            .unwrap();
        assert_eq!(as_int(globals.borrow().get(&ident("x")).unwrap()), 3);
    }

    #[test]
    fn test_undefined_name_is_name_error() {
        let globals = root();
        let inner = Environment::child_of(&globals);

        let err = inner.borrow().get(&ident("ghost")).unwrap_err();
        assert!(matches!(err, LoxError::Name { .. }));

        let err = inner
            .borrow_mut()
            .assign(&ident("ghost"), Value::Nil)
            .unwrap_err();
        assert!(matches!(err, LoxError::Name { .. }));
    }

    #[test]
    fn test_const_assignment_is_type_error() {
        let globals = root();
        globals.borrow_mut().declare("k", Some(Value::Int(1)), true);

        let err = globals
            .borrow_mut()
            .assign(&ident("k"), Value::Int(2))
            .unwrap_err();

        assert!(matches!(err, LoxError::Type { .. }));
        assert_eq!(as_int(globals.borrow().get(&ident("k")).unwrap()), 1);
    }

    #[test]
    fn test_wrong_distance_is_reported() {
        let globals = root();
        globals.borrow_mut().declare("a", Some(Value::Int(1)), false);

        let inner = Environment::child_of(&globals);

        assert!(Environment::get_at(&inner, 0, &ident("a")).is_err());
        assert!(Environment::get_at(&inner, 5, &ident("a")).is_err());
        assert!(Environment::ancestor(&inner, 1).is_some());
        assert!(Environment::ancestor(&inner, 2).is_none());
    }
}
