use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::config::Flags;
use lox::diagnostics::{Diagnostic, Reporter};
use lox::lox::Lox;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;

const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// JSON file with warning flags
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the unused-variable warning
    #[arg(long, global = true)]
    no_wunused: bool,

    /// Disable the shadowing warning
    #[arg(long, global = true)]
    no_wshadow: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints the tree of each statement
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session
    Repl,
}

fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let source = fs::read_to_string(filename)
        .with_context(|| format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", source.len(), filename);

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized at {}", chrono::Local::now().to_rfc3339());
    Ok(())
}

fn load_flags(args: &Cli) -> Result<Flags> {
    let mut flags = match &args.config {
        Some(path) => Flags::load(path)?,
        None => Flags::default(),
    };

    if args.no_wunused {
        flags.warn_unused = false;
    }

    if args.no_wshadow {
        flags.warn_shadow = false;
    }

    debug!("Effective flags: {:?}", flags);

    Ok(flags)
}

fn print_diagnostics(diagnostics: &[Diagnostic], source: &str) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.render(source));
    }
}

fn tokenize(filename: &Path, json: bool, flags: &Flags) -> Result<i32> {
    let source = read_file(filename)?;
    let mut reporter = Reporter::new(flags.max_errors);
    let tokens: Vec<Token> = Scanner::new(&source).process(&mut reporter);

    if json {
        let text = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;
        println!("{}", text);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    print_diagnostics(reporter.messages(), &source);

    Ok(i32::from(reporter.is_error()))
}

fn parse(filename: &Path, flags: &Flags) -> Result<i32> {
    let source = read_file(filename)?;
    let mut reporter = Reporter::new(flags.max_errors);
    let tokens = Scanner::new(&source).process(&mut reporter);

    if !reporter.is_error() {
        if let Some(statements) = Parser::new(&tokens).parse(&mut reporter) {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }
    }

    print_diagnostics(reporter.messages(), &source);

    Ok(i32::from(reporter.is_error()))
}

fn run(filename: &Path, flags: Flags) -> Result<i32> {
    let source = read_file(filename)?;
    let mut session = Lox::new(flags);

    session.run(&source);
    print_diagnostics(session.diagnostics(), &source);

    Ok(session.exit_code())
}

fn repl(flags: Flags) -> Result<i32> {
    let mut session = Lox::new(flags);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        line.clear();
        if stdin.lock().read_line(&mut line).context("Failed to read input")? == 0 {
            println!();
            break;
        }

        session.run_line(&line);
        print_diagnostics(session.diagnostics(), &line);
    }

    Ok(0)
}

fn dispatch(commands: Commands, flags: Flags) -> Result<i32> {
    match commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json, &flags),
        Commands::Parse { filename } => parse(&filename, &flags),
        Commands::Run { filename } => run(&filename, flags),
        Commands::Repl => repl(flags),
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let flags = load_flags(&args)?;

    // Deep Lox recursion needs far more native stack than the main thread has.
    let code = thread::Builder::new()
        .name("rox".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(args.commands, flags))
        .context("Failed to start the interpreter thread")?
        .join()
        .map_err(|_| anyhow!("The interpreter thread panicked"))??;

    info!("Exiting with code {}", code);

    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
