use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    subst::replace,
    term::{Term, TermRef},
};

pub const MAX_REDUCE_STEPS: usize = 1024;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum Error {
    #[error("too many reduction steps (gave up after {budget})")]
    #[diagnostic(
        code(reduce::too_many_steps),
        help("the term is probably non-terminating; raise the limit if it isn't")
    )]
    TooManySteps { budget: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Leftmost-outermost redex first.
    Normal,
    /// Arguments before the enclosing redex.
    #[default]
    Applicative,
}

impl Strategy {
    pub fn step(self, term: &TermRef) -> Option<TermRef> {
        match self {
            Strategy::Normal => normal_step(term),
            Strategy::Applicative => applicative_step(term),
        }
    }
}

impl TryFrom<&str> for Strategy {
    type Error = ();

    fn try_from(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "normal" | "n" => Ok(Strategy::Normal),
            "applicative" | "a" => Ok(Strategy::Applicative),
            _ => Err(()),
        }
    }
}

/// Fires the redex `(λv.b a)`, or `None` if `term` isn't one.
pub fn beta(term: &Term) -> Option<TermRef> {
    match term {
        Term::App(f, arg) => match &**f {
            Term::Abs(v, body) => Some(replace(v, arg, body).1),
            _ => None,
        },
        _ => None,
    }
}

pub fn normal_step(term: &TermRef) -> Option<TermRef> {
    match &**term {
        Term::App(f, a) => beta(term)
            .or_else(|| normal_step(f).map(|f| Term::app(f, a.clone())))
            .or_else(|| normal_step(a).map(|a| Term::app(f.clone(), a))),
        Term::Abs(v, body) => normal_step(body).map(|body| Term::abs(v.clone(), body)),
        Term::Name(_) => None,
    }
}

/// Applicative order along the application spine: the argument is advanced
/// first, then the redex itself, then the function. Subterms advance by a
/// normal-order step so that a fixpoint's self-application only unfolds
/// when it is applied.
pub fn applicative_step(term: &TermRef) -> Option<TermRef> {
    match &**term {
        Term::App(f, a) => normal_step(a)
            .map(|a| Term::app(f.clone(), a))
            .or_else(|| beta(term))
            .or_else(|| normal_step(f).map(|f| Term::app(f, a.clone()))),
        Term::Abs(v, body) => normal_step(body).map(|body| Term::abs(v.clone(), body)),
        Term::Name(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct Reduced {
    pub term: TermRef,
    pub steps: usize,
}

/// Applicative-order reduction bounded by [`MAX_REDUCE_STEPS`].
pub fn reduce(term: &TermRef) -> Result<TermRef> {
    reduce_with(term, Strategy::Applicative, MAX_REDUCE_STEPS).map(|r| r.term)
}

pub fn reduce_with(term: &TermRef, strategy: Strategy, budget: usize) -> Result<Reduced> {
    let mut current = term.clone();
    let mut remaining = budget;
    loop {
        let Some(next) = strategy.step(&current) else {
            let steps = budget - remaining;
            debug!(steps, ?strategy, "reached normal form");
            return Ok(Reduced {
                term: current,
                steps,
            });
        };
        if remaining == 0 {
            warn!(budget, ?strategy, "reduction budget exhausted");
            return Err(Error::TooManySteps { budget });
        }
        remaining -= 1;
        trace!(step = budget - remaining, "{next}");
        current = next;
    }
}
