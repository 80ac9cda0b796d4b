use logos::{Lexer, Logos};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Meta<T> {
    pub item: T,
    pub at: SourceSpan,
}

pub type Token = Meta<TkTy>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Diagnostic, Default, Clone, PartialEq)]
pub enum Error {
    #[error("invalid char sequence")]
    #[diagnostic(
        code(lexer::invalid_char_seq),
        help("identifiers are ascii letters, digits and underscores")
    )]
    InvalidCharSeq {
        #[label("here")]
        at: SourceSpan,
    },

    #[error("integer literal too large")]
    #[diagnostic(code(lexer::int_too_large), help("numerals are unary, literals go up to 1024"))]
    IntTooLarge {
        #[label("this one")]
        at: SourceSpan,
    },

    #[default]
    #[error("other error")]
    #[diagnostic(code(lexer::other_error), help("this shouldn't happen"))]
    Other,
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+", error = Error)]
pub enum TkTy {
    #[token("λ")]
    Lambda,

    #[token(".")]
    Dot,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("=")]
    Equals,

    #[token("def")]
    Def,

    #[token("rec")]
    Rec,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("IF")]
    IfTyped,

    #[token("THEN")]
    ThenTyped,

    #[token("ELSE")]
    ElseTyped,

    #[regex("[0-9]+", int_literal)]
    Int(usize),

    #[regex("[0-9]*[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Object(String),
}

/// Largest integer literal accepted. Literals expand to that many nested
/// `succ` applications.
pub const MAX_INT_LITERAL: usize = 1024;

fn int_literal(lex: &mut Lexer<TkTy>) -> std::result::Result<usize, Error> {
    let span = lex.span();
    let too_large = || Error::IntTooLarge {
        at: SourceSpan::new(span.start.into(), span.end - span.start),
    };
    let n: usize = lex.slice().parse().map_err(|_| too_large())?;
    if n > MAX_INT_LITERAL {
        return Err(too_large());
    }
    Ok(n)
}

impl TkTy {
    pub fn processed(s: &str) -> impl Iterator<Item = Result<Token>> {
        TkTy::lexer(s).spanned().map(|(tk, s)| {
            let at = SourceSpan::new(s.start.into(), s.end - s.start);
            match tk {
                Ok(tk) => Ok(Meta { item: tk, at }),
                Err(Error::Other | Error::InvalidCharSeq { .. }) => {
                    Err(Error::InvalidCharSeq { at })
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Tokens up to the first malformed character sequence.
    pub fn tokenize(s: &str) -> Result<Vec<Token>> {
        Self::processed(s).collect()
    }
}
