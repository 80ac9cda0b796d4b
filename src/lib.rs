pub mod builtins;
pub mod lexer;
pub mod parser;
pub mod reduce;
pub mod script;
pub mod subst;
pub mod symbols;
pub mod term;

use miette::Diagnostic;
use thiserror::Error;

pub use builtins::Builtins;
pub use parser::Unit;
pub use reduce::{MAX_REDUCE_STEPS, Reduced, Strategy};
pub use symbols::SymbolTable;
pub use term::{Term, TermRef};

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] parser::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reduce(#[from] reduce::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What running one unit produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Defined {
        name: term::Name,
        term: TermRef,
        arity: usize,
    },
    Evaluated(Reduced),
}

/// One sequential parsing session: the primitives plus every definition
/// made so far.
#[derive(Debug, Clone)]
pub struct Session {
    pub builtins: Builtins,
    pub symbols: SymbolTable,
    pub strategy: Strategy,
    pub limit: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let builtins = Builtins::new();
        let symbols = SymbolTable::with_builtins(&builtins);
        Self::with_symbols(builtins, symbols)
    }

    /// A session whose symbol table starts out empty.
    pub fn bare() -> Self {
        Self::with_symbols(Builtins::new(), SymbolTable::new())
    }

    fn with_symbols(builtins: Builtins, symbols: SymbolTable) -> Self {
        Self {
            builtins,
            symbols,
            strategy: Strategy::default(),
            limit: MAX_REDUCE_STEPS,
        }
    }

    pub fn parse_line(&mut self, src: &str) -> parser::Result<Vec<Unit>> {
        parser::parse_line(src, &self.builtins, &mut self.symbols)
    }

    pub fn reduce(&self, term: &TermRef) -> reduce::Result<Reduced> {
        reduce::reduce_with(term, self.strategy, self.limit)
    }

    /// Parses every unit of `src` and reduces the expressions among them.
    /// Definitions before a failing unit stay installed.
    pub fn run_line(&mut self, src: &str) -> Result<Vec<Outcome>> {
        self.parse_line(src)?
            .into_iter()
            .map(|unit| match unit {
                Unit::Definition { name, term, arity } => {
                    Ok(Outcome::Defined { name, term, arity })
                }
                Unit::Expression(t) => Ok(Outcome::Evaluated(self.reduce(&t)?)),
            })
            .collect()
    }

    /// Runs `src` and renders the last expression's normal form.
    pub fn eval(&mut self, src: &str) -> Result<Option<String>> {
        Ok(self
            .run_line(src)?
            .into_iter()
            .rev()
            .find_map(|o| match o {
                Outcome::Evaluated(r) => Some(r.term.to_string()),
                Outcome::Defined { .. } => None,
            }))
    }
}
