//! Command-line front end for the streaming rewriter.
//!
//! Usage:
//!   htmlsift [OPTIONS] `<SELECTORS>` [INPUT]
//!
//! `SELECTORS` is a selector source file; INPUT defaults to stdin (`-` also means
//! stdin) and output goes to stdout unless `-o` is given.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use mimalloc::MiMalloc;
use rewriter::{ConfigError, RewriteError, Rewriter, RewriterConfig};
use selector::CompileError;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    let matches = Command::new("htmlsift")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rewrite an HTML stream with CSS-like selectors")
        .arg_required_else_help(true)
        .arg(
            Arg::new("selectors")
                .help("Selector source file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("input")
                .help("Input HTML file; stdin when absent or '-'")
                .value_parser(value_parser!(PathBuf))
                .index(2),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the result here instead of stdout")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("minimize")
                .long("minimize")
                .help("Collapse whitespace and drop comments no selector matched")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .short('e')
                .help("Encoding of input and output, e.g. utf-8, windows-1252, shift_jis")
                .value_name("LABEL"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Rewriter configuration (TOML)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("repeat")
                .long("repeat")
                .help("Rewrite the input this many times, keeping the last output")
                .value_parser(value_parser!(u32).range(1..))
                .default_value("1"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("More logging; repeat for more detail")
                .action(ArgAction::Count),
        )
        .get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("htmlsift: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: io::Error },
    Compile { path: PathBuf, source: CompileError },
    Config(ConfigError),
    Rewrite(RewriteError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Compile { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Config(err) => write!(f, "{err}"),
            Self::Rewrite(err) => write!(f, "{err}"),
        }
    }
}

impl From<RewriteError> for CliError {
    fn from(err: RewriteError) -> Self {
        Self::Rewrite(err)
    }
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RewriterConfig::load(path).map_err(CliError::Config)?,
        None => RewriterConfig::default(),
    };
    if matches.get_flag("minimize") {
        config.minimize_html = true;
    }
    if let Some(label) = matches.get_one::<String>("encoding") {
        config.set_encoding(label).map_err(CliError::Config)?;
    }

    let selectors_path = matches
        .get_one::<PathBuf>("selectors")
        .expect("selectors is a required argument");
    let source = fs::read_to_string(selectors_path).map_err(|source| CliError::Io {
        path: selectors_path.clone(),
        source,
    })?;
    let mut rewriter = Rewriter::from_source(&source)
        .map_err(|source| CliError::Compile {
            path: selectors_path.clone(),
            source,
        })?
        .with_config(config);
    log::info!(
        "{} selector(s) from {}",
        rewriter.selectors().len(),
        selectors_path.display()
    );
    for name in rewriter.unresolved_actions() {
        log::warn!("no function `{name}` is registered; selectors calling it stop there");
    }

    let input = matches
        .get_one::<PathBuf>("input")
        .filter(|path| path.as_os_str() != "-");
    let output = matches.get_one::<PathBuf>("output");
    let repeat = matches.get_one::<u32>("repeat").copied().unwrap_or(1);

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|source| {
            CliError::Io {
                path: path.clone(),
                source,
            }
        })?)),
        None => Box::new(io::stdout().lock()),
    };

    if repeat == 1 {
        let reader = open_input(input)?;
        rewrite_once(&mut rewriter, reader, &mut writer)?;
    } else {
        let mut bytes = Vec::new();
        open_input(input)?
            .read_to_end(&mut bytes)
            .map_err(|source| read_error(input, source))?;
        for _ in 1..repeat {
            rewrite_once(&mut rewriter, bytes.as_slice(), io::sink())?;
        }
        rewrite_once(&mut rewriter, bytes.as_slice(), &mut writer)?;
    }
    writer.flush().map_err(|err| CliError::Rewrite(err.into()))?;
    Ok(())
}

fn rewrite_once<R: Read, W: Write>(
    rewriter: &mut Rewriter,
    reader: R,
    writer: W,
) -> Result<(), CliError> {
    let started = Instant::now();
    let stats = rewriter.rewrite(reader, writer)?;
    log::info!(
        "{} token(s), {} firing(s), {} implied close(s){} in {:?}",
        stats.tokens,
        stats.actions_fired,
        stats.implied_closes,
        if stats.pass_through { ", passed through" } else { "" },
        started.elapsed()
    );
    for err in rewriter.take_action_errors() {
        log::warn!("{err}");
    }
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>, CliError> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| read_error(Some(path), source))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn read_error(path: Option<&PathBuf>, source: io::Error) -> CliError {
    CliError::Io {
        path: path.cloned().unwrap_or_else(|| PathBuf::from("<stdin>")),
        source,
    }
}
