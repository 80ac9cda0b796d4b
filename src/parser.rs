use crate::{
    app,
    builtins::Builtins,
    lexer::{self, TkTy, Token},
    symbols::SymbolTable,
    term::{Name, Term, TermRef},
};
use miette::{Diagnostic, SourceSpan};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

/// Stand-in bound to a `rec` definition's own name while its body is parsed.
pub const SELF_REFERENCE: &str = "self^";

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("unexpected end of input")]
    #[diagnostic(
        code(parser::unexpected_eof),
        help("maybe you've left some parenthesis opened")
    )]
    UnexpectedEof {
        #[label("bit of a sudden, isn't it?")]
        at: SourceSpan,
    },

    #[error("unexpected token {tk:?}")]
    #[diagnostic(
        code(parser::unexpected_token),
        help("no expression can start or continue here")
    )]
    UnexpectedToken {
        tk: TkTy,
        #[label("here")]
        at: SourceSpan,
    },

    #[error("expected {exp}, found {tk:?}")]
    #[diagnostic(
        code(parser::malformed_definition),
        help("definitions read `def name params... = body`")
    )]
    MalformedDefinition {
        exp: &'static str,
        tk: TkTy,
        #[label("here")]
        at: SourceSpan,
    },

    #[error("redefinition of symbol {name:?}")]
    #[diagnostic(
        code(parser::redefinition),
        help("symbols can't be redefined, pick another name")
    )]
    Redefinition {
        name: String,
        #[label("already defined")]
        at: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] lexer::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a single top-level parse step produced.
#[derive(Debug, Clone)]
pub enum Unit {
    Definition {
        name: Name,
        term: TermRef,
        arity: usize,
    },
    Expression(TermRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentPos {
    Expression,
    /// The function slot of an explicit `(f a)`.
    FunctionSlot,
}

#[derive(Clone, Copy)]
struct Context<'c> {
    syms: &'c SymbolTable,
    pos: ParentPos,
}

impl<'c> Context<'c> {
    fn new(syms: &'c SymbolTable) -> Self {
        Self {
            syms,
            pos: ParentPos::Expression,
        }
    }

    fn at(self, pos: ParentPos) -> Self {
        Self { pos, ..self }
    }
}

type Alternative<'s> = for<'c> fn(&mut Parser<'s>, Context<'c>) -> Option<TermRef>;

pub struct Parser<'s> {
    pub tokens: Vec<Token>,
    pub idx: usize,
    builtins: &'s Builtins,
    symbols: &'s mut SymbolTable,
}

impl<'s> Parser<'s> {
    pub fn new(tokens: Vec<Token>, builtins: &'s Builtins, symbols: &'s mut SymbolTable) -> Self {
        Self {
            tokens,
            idx: 0,
            builtins,
            symbols,
        }
    }

    pub fn current(&self) -> Result<&Token> {
        self.tokens.get(self.idx).ok_or_else(|| Error::UnexpectedEof {
            at: self
                .tokens
                .last()
                .map(|t| t.at)
                .unwrap_or(SourceSpan::new(0.into(), 0)),
        })
    }

    fn peek(&self) -> Option<&TkTy> {
        self.tokens.get(self.idx).map(|t| &t.item)
    }

    fn eat(&mut self, tk: &TkTy) -> Option<()> {
        (self.peek()? == tk).then(|| self.idx += 1)
    }

    fn ident(&mut self) -> Option<String> {
        match self.peek()? {
            TkTy::Object(s) => {
                let s = s.clone();
                self.idx += 1;
                Some(s)
            }
            _ => None,
        }
    }

    /// Runs one alternative, rewinding the cursor if it doesn't match.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.idx;
        let r = f(self);
        if r.is_none() {
            self.idx = start;
        }
        r
    }

    fn unexpected(&self) -> Error {
        match self.current() {
            Ok(tk) => Error::UnexpectedToken {
                tk: tk.item.clone(),
                at: tk.at,
            },
            Err(e) => e,
        }
    }

    fn expect(&mut self, exp: &'static str, tk: TkTy) -> Result<()> {
        let current = self.current()?;
        if current.item == tk {
            self.idx += 1;
            Ok(())
        } else {
            Err(Error::MalformedDefinition {
                exp,
                tk: current.item.clone(),
                at: current.at,
            })
        }
    }

    /// Parses the next top-level unit, or `None` once the tokens run out.
    pub fn parse_unit(&mut self) -> Result<Option<Unit>> {
        let Some(tk) = self.peek().cloned() else {
            return Ok(None);
        };
        match tk {
            TkTy::Def => self.parse_definition(false).map(Some),
            TkTy::Rec => self.parse_definition(true).map(Some),
            _ => {
                let syms = self.symbols.clone();
                match self.parse_expr(Context::new(&syms)) {
                    Some(t) => Ok(Some(Unit::Expression(t))),
                    None => Err(self.unexpected()),
                }
            }
        }
    }

    pub fn parse_all(&mut self) -> Result<Vec<Unit>> {
        let mut units = Vec::new();
        while let Some(unit) = self.parse_unit()? {
            units.push(unit);
        }
        Ok(units)
    }

    fn parse_definition(&mut self, rec: bool) -> Result<Unit> {
        self.idx += 1;
        let current = self.current()?;
        let at = current.at;
        let TkTy::Object(name) = &current.item else {
            return Err(Error::MalformedDefinition {
                exp: "a name",
                tk: current.item.clone(),
                at,
            });
        };
        let name: Name = name.as_str().into();
        if self.symbols.contains(&name) {
            return Err(Error::Redefinition {
                name: name.to_string(),
                at,
            });
        }
        self.idx += 1;

        let mut params: SmallVec<[Name; 4]> = SmallVec::new();
        while let Some(p) = self.ident() {
            params.push(p.into());
        }
        self.expect("`=` or a parameter", TkTy::Equals)?;
        let arity = params.len();

        let base = if rec {
            self.symbols
                .extended(name.clone(), Term::name(SELF_REFERENCE), arity)
        } else {
            self.symbols.clone()
        };
        let scope = base.without(params.iter().map(|p| &**p));
        let body = self
            .parse_expr(Context::new(&scope))
            .ok_or_else(|| self.unexpected())?;

        let curried = params
            .into_iter()
            .rev()
            .fold(body, |acc, p| Term::abs(p, acc));
        let term = if rec {
            app!(
                self.builtins.recursive.clone(),
                Term::abs(SELF_REFERENCE, curried)
            )
        } else {
            curried
        };

        if !self.symbols.define(name.clone(), term.clone(), arity) {
            return Err(Error::Redefinition {
                name: name.to_string(),
                at,
            });
        }
        debug!(%name, arity, rec, "defined symbol");
        Ok(Unit::Definition { name, term, arity })
    }

    /// Ordered choice over every expression form; the first match wins.
    fn parse_expr(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        let alternatives: [Alternative<'s>; 7] = [
            Self::parse_if,
            Self::parse_typed_if,
            Self::parse_int,
            Self::parse_symbol,
            Self::parse_name,
            Self::parse_function,
            Self::parse_application,
        ];
        alternatives
            .into_iter()
            .find_map(|alt| self.attempt(|p| alt(p, ctx)))
    }

    fn parse_if(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        let cond = self.builtins.cond.clone();
        self.conditional(ctx, [TkTy::If, TkTy::Then, TkTy::Else], cond)
    }

    fn parse_typed_if(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        let cond = self.builtins.typed_cond.clone();
        self.conditional(
            ctx,
            [TkTy::IfTyped, TkTy::ThenTyped, TkTy::ElseTyped],
            cond,
        )
    }

    /// `if c then a else b` becomes `((select a) b) c`.
    fn conditional(
        &mut self,
        ctx: Context<'_>,
        [kw_if, kw_then, kw_else]: [TkTy; 3],
        select: TermRef,
    ) -> Option<TermRef> {
        let inner = ctx.at(ParentPos::Expression);
        self.eat(&kw_if)?;
        let cond = self.parse_expr(inner)?;
        self.eat(&kw_then)?;
        let positive = self.parse_expr(inner)?;
        self.eat(&kw_else)?;
        let negative = self.parse_expr(inner)?;
        Some(app!(select, positive, negative, cond))
    }

    fn parse_int(&mut self, _ctx: Context<'_>) -> Option<TermRef> {
        let &TkTy::Int(n) = self.peek()? else {
            return None;
        };
        self.idx += 1;
        Some(self.builtins.numeral(n))
    }

    fn parse_symbol(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        let name = self.ident()?;
        let sym = ctx.syms.get(&name)?;
        Some(
            self.implicit_application(&sym.term, sym.arity, ctx)
                .unwrap_or_else(|| sym.term.clone()),
        )
    }

    /// Applies `func` to exactly `arity` following expressions, or to none.
    ///
    /// In the function slot of an explicit application followed by `)`, the
    /// last argument is handed back so the enclosing `(f a)` can take it.
    fn implicit_application(
        &mut self,
        func: &TermRef,
        arity: usize,
        ctx: Context<'_>,
    ) -> Option<TermRef> {
        if arity == 0 {
            return None;
        }
        let start = self.idx;
        let inner = ctx.at(ParentPos::Expression);
        let mut applied = func.clone();
        let mut partial = func.clone();
        let mut last_start = start;
        for _ in 0..arity {
            last_start = self.idx;
            let Some(arg) = self.parse_expr(inner) else {
                trace!(arity, "implicit application abandoned");
                self.idx = start;
                return None;
            };
            partial = applied;
            applied = Term::app(partial.clone(), arg);
        }
        if ctx.pos == ParentPos::FunctionSlot && self.peek() == Some(&TkTy::RParen) {
            trace!(arity, "implicit application hands its last argument back");
            self.idx = last_start;
            return Some(partial);
        }
        Some(applied)
    }

    fn parse_name(&mut self, _ctx: Context<'_>) -> Option<TermRef> {
        self.ident().map(Term::name)
    }

    /// `λx.body`, or `λx y.body` for `λx.λy.body`.
    fn parse_function(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        self.eat(&TkTy::Lambda)?;
        let mut params: SmallVec<[Name; 4]> = SmallVec::new();
        while let Some(p) = self.ident() {
            params.push(p.into());
        }
        if params.is_empty() {
            return None;
        }
        self.eat(&TkTy::Dot)?;
        let scope = ctx.syms.without(params.iter().map(|p| &**p));
        let body = self.parse_expr(Context::new(&scope))?;
        Some(
            params
                .into_iter()
                .rev()
                .fold(body, |acc, p| Term::abs(p, acc)),
        )
    }

    fn parse_application(&mut self, ctx: Context<'_>) -> Option<TermRef> {
        self.eat(&TkTy::LParen)?;
        let func = self.parse_expr(ctx.at(ParentPos::FunctionSlot))?;
        let arg = self.parse_expr(ctx.at(ParentPos::Expression))?;
        self.eat(&TkTy::RParen)?;
        Some(Term::app(func, arg))
    }
}

/// Lexes and parses a whole line against `symbols`.
pub fn parse_line(
    src: &str,
    builtins: &Builtins,
    symbols: &mut SymbolTable,
) -> Result<Vec<Unit>> {
    let tokens = TkTy::tokenize(src)?;
    Parser::new(tokens, builtins, symbols).parse_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        builtins: Builtins,
        symbols: SymbolTable,
    }

    impl Fixture {
        fn new() -> Self {
            let builtins = Builtins::new();
            let symbols = SymbolTable::with_builtins(&builtins);
            Self { builtins, symbols }
        }

        fn bare() -> Self {
            Self {
                builtins: Builtins::new(),
                symbols: SymbolTable::new(),
            }
        }

        fn parse(&mut self, src: &str) -> Result<Vec<Unit>> {
            parse_line(src, &self.builtins, &mut self.symbols)
        }

        fn expr(&mut self, src: &str) -> String {
            match self.parse(src).unwrap().as_slice() {
                [Unit::Expression(t)] => t.to_string(),
                other => panic!("expected one expression, got {other:?}"),
            }
        }
    }

    #[test]
    fn parses_core_forms() {
        let mut f = Fixture::bare();
        assert_eq!(f.expr("x"), "x");
        assert_eq!(f.expr("λx.x"), "λx.x");
        assert_eq!(f.expr("λx.λy.(x y)"), "λx.λy.(x y)");
        assert_eq!(f.expr("λx y.(y x)"), "λx.λy.(y x)");
        assert_eq!(f.expr("((f a) b)"), "((f a) b)");
        assert_eq!(f.expr("(λx.x y)"), "(λx.x y)");
    }

    #[test]
    fn one_unit_per_expression() {
        let mut f = Fixture::bare();
        let units = f.parse("a λx.x (b c)").unwrap();
        let rendered: Vec<_> = units
            .iter()
            .map(|u| match u {
                Unit::Expression(t) => t.to_string(),
                Unit::Definition { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(rendered, ["a", "λx.x", "(b c)"]);
    }

    #[test]
    fn int_literal_desugars_to_successors() {
        let mut f = Fixture::new();
        let b = Builtins::new();
        assert_eq!(f.expr("0"), b.zero.to_string());
        assert_eq!(f.expr("2"), b.numeral(2).to_string());
        assert_eq!(
            f.expr("2"),
            Term::app(b.succ.clone(), Term::app(b.succ.clone(), b.zero.clone())).to_string()
        );
    }

    #[test]
    fn if_desugars_to_cond_with_condition_last() {
        let mut f = Fixture::bare();
        let cond = f.builtins.cond.to_string();
        assert_eq!(f.expr("if c then a else b"), format!("((({cond} a) b) c)"));
    }

    #[test]
    fn typed_if_uses_typed_cond() {
        let mut f = Fixture::bare();
        let tc = f.builtins.typed_cond.to_string();
        assert_eq!(f.expr("IF c THEN a ELSE b"), format!("((({tc} a) b) c)"));
    }

    #[test]
    fn definition_curries_parameters() {
        let mut f = Fixture::bare();
        let units = f.parse("def k x y = x").unwrap();
        let [Unit::Definition { name, term, arity }] = units.as_slice() else {
            panic!("expected a definition");
        };
        assert_eq!(&**name, "k");
        assert_eq!(*arity, 2);
        assert_eq!(term.to_string(), "λx.λy.x");
        assert_eq!(f.expr("k a b"), "((λx.λy.x a) b)");
    }

    #[test]
    fn unsaturated_symbol_falls_back_to_bare_term() {
        let mut f = Fixture::bare();
        f.parse("def add1arg x = x").unwrap();
        assert_eq!(f.expr("add1arg"), "λx.x");
        f.parse("def two a b = a").unwrap();
        // one argument is not enough: no partial application
        let units = f.parse("two p").unwrap();
        assert_eq!(units.len(), 2);
        assert!(matches!(&units[0], Unit::Expression(t) if t.to_string() == "λa.λb.a"));
    }

    #[test]
    fn function_slot_hands_back_last_argument() {
        let mut f = Fixture::bare();
        f.parse("def two a b = a").unwrap();
        assert_eq!(f.expr("(two p q)"), "((λa.λb.a p) q)");
        assert_eq!(f.expr("(two p)"), "(λa.λb.a p)");
        assert_eq!(f.expr("((two p) q)"), "((λa.λb.a p) q)");
        assert_eq!(f.expr("(g (two p q))"), "(g ((λa.λb.a p) q))");
    }

    #[test]
    fn redefinition_fails_without_side_effects() {
        let mut f = Fixture::bare();
        f.parse("def id x = x").unwrap();
        assert!(matches!(
            f.parse("def id y = y"),
            Err(Error::Redefinition { name, .. }) if name == "id"
        ));
        assert_eq!(f.expr("id"), "λx.x");
        // a second definition on the same line sees the first
        assert!(matches!(
            f.parse("def k x = x def k y = y"),
            Err(Error::Redefinition { name, .. }) if name == "k"
        ));
        assert_eq!(f.symbols.get("k").unwrap().term.to_string(), "λx.x");
    }

    #[test]
    fn failed_definition_is_not_installed() {
        let mut f = Fixture::bare();
        assert!(f.parse("def broken x = )").is_err());
        assert!(!f.symbols.contains("broken"));
        assert!(matches!(
            f.parse("def = x"),
            Err(Error::MalformedDefinition { .. })
        ));
        assert!(matches!(f.parse("def f x"), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn rec_wraps_body_in_fixpoint() {
        let mut f = Fixture::bare();
        let units = f.parse("rec loop n = (loop n)").unwrap();
        let [Unit::Definition { term, arity, .. }] = units.as_slice() else {
            panic!("expected a definition");
        };
        assert_eq!(*arity, 1);
        let recursive = f.builtins.recursive.to_string();
        assert_eq!(
            term.to_string(),
            format!("({recursive} λself^.λn.(self^ n))")
        );
    }

    #[test]
    fn self_reference_does_not_leak() {
        let mut f = Fixture::bare();
        f.parse("rec r x = r x").unwrap();
        f.parse("def s x = r").unwrap();
        // `r` is the installed definition here, never the placeholder
        let r = f.symbols.get("r").unwrap().term.to_string();
        let s = f.symbols.get("s").unwrap().term.to_string();
        assert_eq!(s, format!("λx.{r}"));
    }

    #[test]
    fn parameters_shadow_symbols() {
        let mut f = Fixture::new();
        assert_eq!(f.expr("λone.one"), "λone.one");
        f.parse("def pick zero = zero").unwrap();
        assert_eq!(f.symbols.get("pick").unwrap().term.to_string(), "λzero.zero");
    }

    #[test]
    fn reports_unexpected_tokens() {
        let mut f = Fixture::bare();
        assert!(matches!(f.parse(")"), Err(Error::UnexpectedToken { tk: TkTy::RParen, .. })));
        assert!(matches!(f.parse("(a b"), Err(Error::UnexpectedToken { .. })));
        assert!(matches!(f.parse("x ~"), Err(Error::Lex(_))));
        assert!(f.parse("").unwrap().is_empty());
    }
}
