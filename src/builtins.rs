//! The predefined combinators every session starts with.
//!
//! Naturals use the pair encoding: `zero = λx.x` and `succ n = λs.((s false) n)`.
//! Conditionals take their branches first and the condition last.

use crate::{
    app, lam,
    term::{Term, TermRef},
    var,
};

#[derive(Debug, Clone)]
pub struct Builtins {
    pub zero: TermRef,
    pub one: TermRef,
    pub select_first: TermRef,
    pub select_second: TermRef,
    pub cond: TermRef,
    pub iszero: TermRef,
    pub succ: TermRef,
    pub pred: TermRef,
    pub recursive: TermRef,
    pub add: TermRef,
    pub sub: TermRef,
    pub mult: TermRef,
    pub abs_diff: TermRef,
    pub equal: TermRef,
    pub type_of: TermRef,
    pub value_of: TermRef,
    pub istype: TermRef,
    pub make_error: TermRef,
    pub bool_type: TermRef,
    pub isbool: TermRef,
    pub bool_error: TermRef,
    pub typed_cond: TermRef,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let zero = lam!("x" => var!("x"));
        let select_first = lam!("x", "y" => var!("x"));
        let select_second = lam!("x", "y" => var!("y"));
        let cond = lam!("e1", "e2", "c" => app!(var!("c"), var!("e1"), var!("e2")));
        let iszero = lam!("n" => app!(var!("n"), select_first.clone()));
        let succ = lam!("n", "s" => app!(var!("s"), select_second.clone(), var!("n")));
        let one = app!(succ.clone(), zero.clone());
        let pred = lam!("n" => app!(
            cond.clone(),
            zero.clone(),
            app!(var!("n"), select_second.clone()),
            app!(iszero.clone(), var!("n"))
        ));

        let self_apply = lam!("s" => app!(var!("f"), app!(var!("s"), var!("s"))));
        let recursive = lam!("f" => app!(self_apply.clone(), self_apply));

        // λf.λx.λy.if iszero x then y else f (pred x) (succ y)
        let add = app!(
            recursive.clone(),
            lam!("f", "x", "y" => app!(
                cond.clone(),
                var!("y"),
                app!(var!("f"), app!(pred.clone(), var!("x")), app!(succ.clone(), var!("y"))),
                app!(iszero.clone(), var!("x"))
            ))
        );
        // λf.λx.λy.if iszero y then x else f (pred x) (pred y)
        let sub = app!(
            recursive.clone(),
            lam!("f", "x", "y" => app!(
                cond.clone(),
                var!("x"),
                app!(var!("f"), app!(pred.clone(), var!("x")), app!(pred.clone(), var!("y"))),
                app!(iszero.clone(), var!("y"))
            ))
        );
        // λf.λx.λy.if iszero y then zero else add x (f x (pred y))
        let mult = app!(
            recursive.clone(),
            lam!("f", "x", "y" => app!(
                cond.clone(),
                zero.clone(),
                app!(
                    add.clone(),
                    var!("x"),
                    app!(var!("f"), var!("x"), app!(pred.clone(), var!("y")))
                ),
                app!(iszero.clone(), var!("y"))
            ))
        );
        let abs_diff = lam!("x", "y" => app!(
            add.clone(),
            app!(sub.clone(), var!("x"), var!("y")),
            app!(sub.clone(), var!("y"), var!("x"))
        ));
        let equal = lam!("x", "y" => app!(
            iszero.clone(),
            app!(abs_diff.clone(), var!("x"), var!("y"))
        ));

        // objects are (type, value) pairs built with cond
        let type_of = lam!("obj" => app!(var!("obj"), select_first.clone()));
        let value_of = lam!("obj" => app!(var!("obj"), select_second.clone()));
        let istype = lam!("t", "obj" => app!(
            equal.clone(),
            var!("t"),
            app!(type_of.clone(), var!("obj"))
        ));
        let make_error = app!(cond.clone(), zero.clone());
        let bool_type = one.clone();
        let isbool = lam!("x" => app!(istype.clone(), bool_type.clone(), var!("x")));
        let bool_error = app!(make_error.clone(), bool_type.clone());
        let typed_cond = lam!("E1", "E2", "C" => app!(
            cond.clone(),
            app!(
                cond.clone(),
                var!("E1"),
                var!("E2"),
                app!(value_of.clone(), var!("C"))
            ),
            bool_error.clone(),
            app!(isbool.clone(), var!("C"))
        ));

        Self {
            zero,
            one,
            select_first,
            select_second,
            cond,
            iszero,
            succ,
            pred,
            recursive,
            add,
            sub,
            mult,
            abs_diff,
            equal,
            type_of,
            value_of,
            istype,
            make_error,
            bool_type,
            isbool,
            bool_error,
            typed_cond,
        }
    }

    /// `n` applications of `succ` to `zero`.
    pub fn numeral(&self, n: usize) -> TermRef {
        (0..n).fold(self.zero.clone(), |acc, _| Term::app(self.succ.clone(), acc))
    }

    /// The named entries a fresh symbol table starts with, as `(name, term, arity)`.
    pub fn entries(&self) -> Vec<(&'static str, TermRef, usize)> {
        vec![
            ("zero", self.zero.clone(), 0),
            ("one", self.one.clone(), 0),
            ("select_first", self.select_first.clone(), 2),
            ("select_second", self.select_second.clone(), 2),
            ("true", self.select_first.clone(), 0),
            ("false", self.select_second.clone(), 0),
            ("cond", self.cond.clone(), 3),
            ("make_pair", self.cond.clone(), 2),
            ("iszero", self.iszero.clone(), 1),
            ("succ", self.succ.clone(), 1),
            ("pred", self.pred.clone(), 1),
            ("recursive", self.recursive.clone(), 1),
            ("add", self.add.clone(), 2),
            ("sub", self.sub.clone(), 2),
            ("mult", self.mult.clone(), 2),
            ("abs_diff", self.abs_diff.clone(), 2),
            ("equal", self.equal.clone(), 2),
            ("make_obj", self.cond.clone(), 2),
            ("type", self.type_of.clone(), 1),
            ("value", self.value_of.clone(), 1),
            ("istype", self.istype.clone(), 2),
            ("error_type", self.zero.clone(), 0),
            ("make_error", self.make_error.clone(), 0),
            ("bool_type", self.bool_type.clone(), 0),
            ("isbool", self.isbool.clone(), 1),
            ("bool_error", self.bool_error.clone(), 0),
            ("typed_cond", self.typed_cond.clone(), 3),
        ]
    }
}
