use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::Parser as ClapParser;
use lcalc::{
    Session, Strategy, Unit,
    lexer::TkTy,
    parser::Parser,
    script,
};
use miette::{Diagnostic, NamedSource, Severity};
use rustyline::{DefaultEditor, error::ReadlineError};
use smallvec::{SmallVec, ToSmallVec};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("can't read the next line")]
    #[diagnostic(
        code(repl::input::readline_error),
        help("are you really running this on interactive mode?")
    )]
    Input(ReadlineError),

    #[error("can't read {path:?}")]
    #[diagnostic(code(script::read_error), help("check the path and its permissions"))]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown command")]
    #[diagnostic(code(repl::command::unknown), help("sometimes we just miss it!"))]
    UnknownCommand(String),

    #[error("missing argument")]
    #[diagnostic(
        code(repl::command::missing_arg),
        help("are you sure this is the command?")
    )]
    MissingArg(String),

    #[error("invalid setting value: {0} doesn't accept {1:?}")]
    #[diagnostic(
        code(repl::command::set::invalid_valid),
        help("are you sure this is the setting?")
    )]
    InvalidValue(String, String),

    #[error("unknown {0:?} setting")]
    #[diagnostic(code(repl::command::set::unknown_setting), help("mistyping maybe?"))]
    UnknownSetting(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ParserError(#[from] lcalc::parser::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ReduceError(#[from] lcalc::reduce::Error),
}

/// Untyped lambda calculus interpreter.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scripts to run in one shared session. Launches the REPL when empty.
    files: Vec<PathBuf>,

    /// Reduction order used to evaluate expressions.
    #[arg(long, default_value = "applicative", value_parser = parse_strategy)]
    strategy: Strategy,

    /// Maximum number of reduction steps per expression.
    #[arg(long, default_value_t = lcalc::MAX_REDUCE_STEPS)]
    limit: usize,

    /// Start with an empty symbol table instead of the predefined combinators.
    #[arg(long)]
    no_prelude: bool,
}

fn parse_strategy(s: &str) -> std::result::Result<Strategy, String> {
    Strategy::try_from(s).map_err(|_| format!("expected `normal` or `applicative`, got {s:?}"))
}

pub struct Command<'a> {
    pub cmd: &'a str,
    pub desc: &'a str,
    pub alias: &'a str,
    pub func: fn(&mut Repl, &str) -> Result<()>,
}

fn quit_cmd(_r: &mut Repl, _input: &str) -> Result<()> {
    std::process::exit(0);
}

fn set_cmd(r: &mut Repl, input: &str) -> Result<()> {
    fn set<T: for<'a> TryFrom<&'a str>>(prop: &mut T, setting: &str, value: &str) -> Result<()> {
        *prop = value
            .try_into()
            .map_err(|_| Error::InvalidValue(setting.to_string(), value.to_string()))?;
        Ok(())
    }

    let (setting, value) = input
        .split_once(' ')
        .ok_or_else(|| Error::MissingArg("setting".to_string()))?;
    match setting {
        "prompt" => set(&mut r.prompt, "prompt", value)?,
        "strategy" => set(&mut r.session.strategy, "strategy", value)?,
        "limit" => {
            r.session.limit = value
                .parse()
                .map_err(|_| Error::InvalidValue(setting.to_string(), value.to_string()))?
        }
        "bench" => {
            r.bench = BENCH_SETTING
                .parse_inspired(value)
                .map_err(|v| Error::InvalidValue(setting.to_string(), v.to_string()))?
        }
        "show" => {
            r.show = SHOW_SETTING
                .parse_inspired(value)
                .map_err(|v| Error::InvalidValue(setting.to_string(), v.to_string()))?
        }
        _ => return Err(Error::UnknownSetting(setting.to_string())),
    }
    Ok(())
}

fn defs_cmd(r: &mut Repl, input: &str) -> Result<()> {
    for (name, sym) in r.session.symbols.sorted() {
        if input.is_empty() || name.starts_with(input.trim()) {
            println!("{name}/{}", sym.arity);
        }
    }
    Ok(())
}

fn step_cmd(r: &mut Repl, input: &str) -> Result<()> {
    let units = r.session.parse_line(input)?;
    for unit in units {
        if let Unit::Expression(t) = unit {
            match r.session.strategy.step(&t) {
                Some(next) => println!("=> {next}"),
                None => println!("{t} (normal form)"),
            }
        }
    }
    Ok(())
}

fn help_cmd(_r: &mut Repl, _input: &str) -> Result<()> {
    for c in COMMANDS {
        println!(":{:<8} :{:<3} {}", c.cmd, c.alias, c.desc);
    }
    Ok(())
}

pub const COMMANDS: &[Command] = &[
    Command {
        cmd: "quit",
        alias: "q",
        desc: "quits the terminal",
        func: quit_cmd,
    },
    Command {
        cmd: "set",
        alias: "s",
        desc: "manual settings: prompt, strategy, limit, bench, show",
        func: set_cmd,
    },
    Command {
        cmd: "defs",
        alias: "d",
        desc: "lists defined symbols with their arity",
        func: defs_cmd,
    },
    Command {
        cmd: "step",
        alias: "n",
        desc: "shows a single reduction step",
        func: step_cmd,
    },
    Command {
        cmd: "help",
        alias: "h",
        desc: "lists commands",
        func: help_cmd,
    },
];

#[derive(Default, Clone)]
pub struct Setting {
    all: &'static [&'static str],
    on: SmallVec<[&'static str; 8]>,
}

impl Setting {
    fn parse_inspired<'a>(&self, value: &'a str) -> std::result::Result<Self, &'a str> {
        if value == "all" {
            return Ok(Setting {
                all: self.all,
                on: self.all.to_smallvec(),
            });
        }
        let mut s = Self {
            all: self.all,
            on: SmallVec::new(),
        };
        for v in value.split(',') {
            let trimmed = v.trim();
            if trimmed == "none" {
                continue;
            }
            if let Some(set) = self.all.iter().find(|&&a_v| a_v == trimmed) {
                s.on.push(set);
            } else {
                return Err(trimmed);
            }
        }
        Ok(s)
    }
}

pub const BENCH_SETTING: Setting = Setting {
    all: &["lexer", "parser", "reduce", "command"],
    on: SmallVec::new_const(),
};

pub const SHOW_SETTING: Setting = Setting {
    all: &["lexer", "parser", "steps"],
    on: SmallVec::new_const(),
};

pub struct Repl {
    pub prompt: String,
    pub rl: DefaultEditor,
    /// Errors reported for the last line, shown in front of the prompt.
    pub errors: usize,
    pub bench: Setting,
    pub show: Setting,
    pub session: Session,
    timings: SmallVec<[(&'static str, Duration); 4]>,
}

impl Repl {
    fn new(session: Session) -> Result<Self> {
        Ok(Self {
            prompt: "λ> ".to_string(),
            rl: DefaultEditor::new().map_err(Error::Input)?,
            errors: 0,
            bench: BENCH_SETTING.clone(),
            show: SHOW_SETTING.clone(),
            session,
            timings: SmallVec::new(),
        })
    }

    /// Runs `f`, recording its duration when `label` is benched.
    pub fn timed<T>(&mut self, label: &'static str, f: impl FnOnce(&mut Self) -> T) -> T {
        if !self.bench.on.contains(&label) {
            return f(self);
        }
        let start = Instant::now();
        let r = f(self);
        self.timings.push((label, start.elapsed()));
        r
    }

    fn flush_timings(&mut self) {
        if self.timings.is_empty() {
            return;
        }
        let summary: Vec<_> = self
            .timings
            .drain(..)
            .map(|(label, took)| format!("{label} {took:?}"))
            .collect();
        println!("[{}]", summary.join(", "));
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            let line = match self.read_line() {
                Ok(line) => line,
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
                Err(e) => return Err(Error::Input(e)),
            };
            self.errors = 0;
            let line = script::strip_comment(&line).trim();
            if !line.is_empty() {
                self.execute("repl", line);
            }
        }
    }

    /// Runs a `:command` or a line of units, reporting failures against `origin`.
    fn execute(&mut self, origin: &str, line: &str) {
        let result = match line.strip_prefix(':') {
            Some(cmd) => self.timed("command", |s| s.cmd(cmd)),
            None => self.expression(line),
        };
        self.flush_timings();
        if let Err(e) = result {
            self.report(e, origin, line);
        }
    }

    pub fn cmd(&mut self, input: &str) -> Result<()> {
        let (name, args) = input.split_once(' ').unwrap_or((input, ""));
        let command = COMMANDS
            .iter()
            .find(|c| name == c.alias || name == c.cmd)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        (command.func)(self, args.trim())
    }

    /// Parses every unit of `input`, printing definitions and normal forms.
    pub fn expression(&mut self, input: &str) -> Result<()> {
        let tokens = self.timed("lexer", |_| TkTy::tokenize(input));
        let tokens = tokens.map_err(lcalc::parser::Error::from)?;
        if self.show.on.contains(&"lexer") {
            let report = miette::MietteDiagnostic::new("tokens")
                .with_labels(tokens.iter().map(|tk| {
                    miette::LabeledSpan::new_with_span(Some(format!("{:?}", tk.item)), tk.at)
                }))
                .with_severity(Severity::Advice);
            self.report(report, "lexer", input);
        }
        let units = self.timed("parser", |s| {
            let session = &mut s.session;
            Parser::new(tokens, &session.builtins, &mut session.symbols).parse_all()
        })?;
        for unit in units {
            match unit {
                Unit::Definition { name, term, arity } => {
                    println!("{name}/{arity} = {term}");
                }
                Unit::Expression(t) => {
                    if self.show.on.contains(&"parser") {
                        println!("{t}");
                    }
                    let reduced = self.timed("reduce", |s| s.session.reduce(&t))?;
                    if self.show.on.contains(&"steps") {
                        println!("[{} steps, {} nodes]", reduced.steps, reduced.term.size());
                    }
                    println!("{}", reduced.term);
                }
            }
        }
        Ok(())
    }

    /// Runs a script line by line, reporting failures and moving on.
    pub fn script(&mut self, path: &PathBuf) -> Result<()> {
        let src = fs::read_to_string(path).map_err(|source| Error::Script {
            path: path.clone(),
            source,
        })?;
        let name = path.display().to_string();
        for line in script::logical_lines(&src) {
            tracing::debug!(file = %name, line = line.number, "running");
            self.execute(&format!("{name}:{}", line.number), &line.text);
        }
        Ok(())
    }

    fn read_line(&mut self) -> rustyline::Result<String> {
        let prompt = match self.errors {
            0 => self.prompt.clone(),
            n => format!("{n}✗ {}", self.prompt),
        };
        let line = self.rl.readline(&prompt)?;
        self.rl.add_history_entry(&line)?;
        Ok(line)
    }

    pub fn report(&mut self, e: impl Diagnostic + Send + Sync + 'static, origin: &str, src: &str) {
        if matches!(e.severity().unwrap_or_default(), Severity::Error) {
            self.errors += 1;
        }
        let source = NamedSource::new(origin, src.to_string());
        println!("{:?}", miette::Report::new(e).with_source_code(source));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut session = if cli.no_prelude {
        Session::bare()
    } else {
        Session::new()
    };
    session.strategy = cli.strategy;
    session.limit = cli.limit;

    let mut r = Repl::new(session)?;
    if cli.files.is_empty() {
        return r.run();
    }
    for path in &cli.files {
        r.script(path)?;
    }
    Ok(())
}
