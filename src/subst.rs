//! Substitution of free names with capture avoidance.

use crate::term::{Name, Term, TermRef};

/// Replaces every free occurrence of `target` in `term` by `replacement`.
///
/// The flag tells whether anything was replaced. Unchanged subtrees are
/// returned as-is, so a `false` result is the very same `Rc` as `term`.
///
/// A binder that would capture a free name of `replacement` is renamed
/// before the substitution descends under it.
pub fn replace(target: &str, replacement: &TermRef, term: &TermRef) -> (bool, TermRef) {
    match &**term {
        Term::Name(n) => {
            if &**n == target {
                (true, replacement.clone())
            } else {
                (false, term.clone())
            }
        }
        Term::App(f, a) => {
            let (f_changed, new_f) = replace(target, replacement, f);
            let (a_changed, new_a) = replace(target, replacement, a);
            if f_changed || a_changed {
                (true, Term::app(new_f, new_a))
            } else {
                (false, term.clone())
            }
        }
        Term::Abs(v, body) => {
            if &**v == target {
                return (false, term.clone());
            }
            let (changed, new_body) = replace(target, replacement, body);
            if !changed {
                return (false, term.clone());
            }
            if replacement.has_free(v) {
                let renamed = alpha_convert(v, body, replacement);
                return replace(target, replacement, &renamed);
            }
            (true, Term::abs(v.clone(), new_body))
        }
    }
}

/// Renames the binder `var` of `λvar.body` to a name free in neither `body`
/// nor `avoid`.
pub fn alpha_convert(var: &Name, body: &TermRef, avoid: &TermRef) -> TermRef {
    let fresh = fresh_name(var, |candidate| {
        body.has_free(candidate) || avoid.has_free(candidate)
    });
    let (_, renamed) = replace(var, &Term::name(fresh.clone()), body);
    Term::abs(fresh, renamed)
}

/// Decorates `base` with `^` until `taken` rejects it. The lexer never
/// produces `^`, so decorated names cannot clash with source identifiers.
fn fresh_name(base: &str, taken: impl Fn(&str) -> bool) -> Name {
    let mut candidate = format!("^{base}");
    while taken(&candidate) {
        candidate.insert(0, '^');
    }
    candidate.into()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{app, lam, var};

    #[test]
    fn replaces_free_name() {
        let (changed, t) = replace("x", &var!("y"), &app!(var!("x"), var!("z")));
        assert!(changed);
        assert_eq!(t.to_string(), "(y z)");
    }

    #[test]
    fn absent_name_leaves_term_untouched() {
        let t = lam!("x" => app!(var!("x"), lam!("y" => app!(var!("y"), var!("x")))));
        let (changed, out) = replace("fresh", &app!(var!("x"), var!("y")), &t);
        assert!(!changed);
        assert!(Rc::ptr_eq(&t, &out));
        assert_eq!(out.to_string(), t.to_string());
    }

    #[test]
    fn shadowing_binder_stops_substitution() {
        let t = lam!("x" => var!("x"));
        let (changed, out) = replace("x", &var!("y"), &t);
        assert!(!changed);
        assert_eq!(out.to_string(), "λx.x");
    }

    #[test]
    fn bare_name_collision_renames_binder() {
        // (λx.λy.x) y must not become λy.y
        let (changed, out) = replace("x", &var!("y"), &lam!("y" => var!("x")));
        assert!(changed);
        assert_eq!(out.to_string(), "λ^y.y");
    }

    #[test]
    fn compound_replacement_is_also_protected() {
        let (_, out) = replace(
            "x",
            &app!(var!("y"), var!("z")),
            &lam!("y" => app!(var!("x"), var!("y"))),
        );
        assert_eq!(out.to_string(), "λ^y.((y z) ^y)");
    }

    #[test]
    fn fresh_name_skips_taken_decorations() {
        let (_, out) = replace(
            "x",
            &app!(var!("y"), var!("^y")),
            &lam!("y" => app!(var!("x"), var!("y"))),
        );
        assert_eq!(out.to_string(), "λ^^y.((y ^y) ^^y)");
    }
}
