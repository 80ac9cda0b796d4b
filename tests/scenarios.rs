use lcalc::{Error, Outcome, Session, Strategy, lexer, parser, reduce, script};

const TRUE: &str = "λx.λy.x";
const FALSE: &str = "λx.λy.y";

fn eval(session: &mut Session, src: &str) -> String {
    session
        .eval(src)
        .unwrap_or_else(|e| panic!("{src:?} failed: {e}"))
        .unwrap_or_else(|| panic!("{src:?} has no expression"))
}

#[test]
fn identity_returns_its_argument() {
    let mut s = Session::new();
    for strategy in [Strategy::Normal, Strategy::Applicative] {
        s.strategy = strategy;
        assert_eq!(eval(&mut s, "(λx.x λy.λz.(z y))"), "λy.λz.(z y)");
    }
}

#[test]
fn self_application_does_not_terminate() {
    let mut s = Session::new();
    let err = s.eval("(λx.(x x) λx.(x x))").unwrap_err();
    assert!(matches!(
        err,
        Error::Reduce(reduce::Error::TooManySteps { budget: 1024 })
    ));
}

#[test]
fn normal_order_skips_divergent_argument() {
    let mut s = Session::new();
    let src = "(λx.λy.y (λx.(x x) λx.(x x)))";
    assert!(s.eval(src).is_err());
    s.strategy = Strategy::Normal;
    assert_eq!(eval(&mut s, src), "λy.y");
}

#[test]
fn literals_match_hand_built_numerals() {
    let mut s = Session::new();
    assert_eq!(eval(&mut s, "3"), eval(&mut s, "succ (succ (succ zero))"));
    assert_eq!(eval(&mut s, "equal 3 (add 1 2)"), TRUE);
    assert_eq!(eval(&mut s, "equal 3 2"), FALSE);
}

#[test]
fn oversized_literal_is_an_error() {
    let mut s = Session::new();
    let err = s.eval("200000").unwrap_err();
    assert!(matches!(
        err,
        Error::Parse(parser::Error::Lex(lexer::Error::IntTooLarge { .. }))
    ));
    // the session is still usable afterwards
    assert_eq!(eval(&mut s, "iszero 0"), TRUE);
}

#[test]
fn unsaturated_definition_is_bare_symbol() {
    let mut s = Session::new();
    s.run_line("def add1arg x = x").unwrap();
    assert_eq!(eval(&mut s, "add1arg"), "λx.x");
    assert_eq!(eval(&mut s, "add1arg zero"), "λx.x");
}

#[test]
fn recursive_factorial_needs_a_raised_limit() {
    let mut s = Session::new();
    let outcomes = s
        .run_line("rec fact n = if (iszero n) then 1 else (mult n (fact (pred n)))")
        .unwrap();
    assert!(matches!(
        outcomes.as_slice(),
        [Outcome::Defined { arity: 1, .. }]
    ));
    assert_eq!(eval(&mut s, "fact 2"), eval(&mut s, "2"));

    // 3! needs a few thousand steps
    assert!(s.eval("fact 3").is_err());
    s.limit = 8192;
    assert_eq!(eval(&mut s, "fact 3"), eval(&mut s, "6"));
}

#[test]
fn shadowed_binders_keep_their_scope() {
    let mut s = Session::bare();
    assert_eq!(eval(&mut s, "(λx.λx.x y)"), "λx.x");
    assert_eq!(eval(&mut s, "(λx.λy.x y)"), "λ^y.y");
    assert_eq!(eval(&mut s, "((λx.λy.(x y) y) z)"), "(y z)");
}

#[test]
fn typed_conditional_checks_the_tag() {
    let mut s = Session::new();
    assert_eq!(
        eval(&mut s, "IF (make_obj bool_type true) THEN 1 ELSE 0"),
        eval(&mut s, "1")
    );
    assert_eq!(
        eval(&mut s, "IF (make_obj bool_type false) THEN 1 ELSE 0"),
        "λx.x"
    );
    assert_eq!(
        eval(&mut s, "IF true THEN 1 ELSE 0"),
        eval(&mut s, "bool_error")
    );
}

#[test]
fn redefinition_is_rejected() {
    let mut s = Session::new();
    let err = s.run_line("def add x = x").unwrap_err();
    assert!(matches!(
        err,
        Error::Parse(parser::Error::Redefinition { ref name, .. }) if name == "add"
    ));
    assert_eq!(s.symbols.get("add").map(|sym| sym.arity), Some(2));
}

#[test]
fn rec_placeholder_is_private() {
    let mut s = Session::bare();
    s.run_line("rec f x = f x").unwrap();
    assert!(!s.symbols.contains("self^"));
    assert!(!s.symbols.get("f").unwrap().term.has_free("self^"));
}

#[test]
fn runs_a_script() {
    let src = r"
-- booleans as selectors
def not b = if b then false else true
def and a b = \
    if a then b else false
not true            -- false
and true (not false)
";
    let mut s = Session::new();
    let mut results = Vec::new();
    for line in script::logical_lines(src) {
        for outcome in s.run_line(&line.text).unwrap() {
            if let Outcome::Evaluated(r) = outcome {
                results.push(r.term.to_string());
            }
        }
    }
    assert_eq!(results, [FALSE, TRUE]);
}
