use std::{fmt, rc::Rc};

pub type Name = Rc<str>;
pub type TermRef = Rc<Term>;

/// An untyped lambda term.
///
/// Terms are immutable once built; every transformation hands back a new
/// tree that shares the untouched subtrees of its input.
#[derive(Debug, PartialEq, Eq)]
pub enum Term {
    /// `x`
    Name(Name),
    /// `λx.t`
    Abs(Name, TermRef),
    /// `(t t)`
    App(TermRef, TermRef),
}

/// Builds a [`Term::Name`].
#[macro_export]
macro_rules! var {
    ($x:expr) => {
        $crate::term::Term::name($x)
    };
}

/// Builds nested abstractions, first parameter outermost: `lam!("x", "y" => body)`.
#[macro_export]
macro_rules! lam {
    ($x:expr => $body:expr) => {
        $crate::term::Term::abs($x, $body)
    };
    ($x:expr, $($rest:expr),+ => $body:expr) => {
        $crate::term::Term::abs($x, $crate::lam!($($rest),+ => $body))
    };
}

/// Builds left-associated applications: `app!(f, a, b)` is `((f a) b)`.
#[macro_export]
macro_rules! app {
    ($f:expr, $a:expr) => {
        $crate::term::Term::app($f, $a)
    };
    ($f:expr, $a:expr, $($rest:expr),+) => {
        $crate::app!($crate::term::Term::app($f, $a), $($rest),+)
    };
}

impl Term {
    pub fn name(name: impl Into<Name>) -> TermRef {
        Term::Name(name.into()).into()
    }

    pub fn abs(var: impl Into<Name>, body: impl Into<TermRef>) -> TermRef {
        Term::Abs(var.into(), body.into()).into()
    }

    pub fn app(func: impl Into<TermRef>, arg: impl Into<TermRef>) -> TermRef {
        Term::App(func.into(), arg.into()).into()
    }

    /// Whether `name` occurs free anywhere in this term.
    pub fn has_free(&self, name: &str) -> bool {
        match self {
            Term::Name(n) => &**n == name,
            Term::Abs(v, body) => &**v != name && body.has_free(name),
            Term::App(f, a) => f.has_free(name) || a.has_free(name),
        }
    }

    /// Number of nodes in the tree, counting shared subtrees once per use.
    pub fn size(&self) -> usize {
        match self {
            Term::Name(_) => 1,
            Term::Abs(_, body) => 1 + body.size(),
            Term::App(f, a) => 1 + f.size() + a.size(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::Abs(v, body) => write!(f, "λ{v}.{body}"),
            Self::App(func, arg) => write!(f, "({func} {arg})"),
        }
    }
}
