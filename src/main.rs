use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{config::Config as EditorConfig, Editor, Helper};
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};

use vecmat::Runtime;

mod repl;

use repl::{fixup_input, ReplHelper};

const HISTORY_FILE: &str = ".vecmat_history";
const PROMPT: &str = "(vecmat) ";

const HELP: &str = r#"Statements:
    vector <name> = <expression>
    matrix <name> = <expression>
    print(<name>)

Expressions:
    [1, 2, 3]             vector literal
    [[1, 2], [3, 4]]      matrix literal
    <name>                variable
    a + b                 elementwise addition (same kind and shape)
    a * b                 matrix multiplication
    (a)                   grouping

`+` and `*` bind left to right with equal precedence.

Session commands: help, vars, quit"#;

#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// Show debug output
    #[arg(short, long)]
    debug: bool,

    /// Program to run. Starts an interactive session if omitted
    file: Option<PathBuf>,
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    };

    // Logs go to stderr so they never mix with program output
    match TermLogger::init(
        filter,
        LogConfig::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to init logger: {}", e),
    }
}

fn init_editor() -> Result<Editor<ReplHelper, DefaultHistory>> {
    let config = EditorConfig::builder().auto_add_history(true).build();
    let mut editor = Editor::with_config(config).context("Failed to create line editor")?;
    editor.set_helper(Some(ReplHelper::new()));

    Ok(editor)
}

fn init_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>) {
    let _ = editor.load_history(HISTORY_FILE);
}

fn save_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>) -> Result<()> {
    match editor.save_history(HISTORY_FILE) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to save history: {}", e),
    }
}

fn welcome() {
    println!(r#"vecmat v{}"#, env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for help");
    println!();
}

fn print_vars(runtime: &Runtime) {
    for (ident, val) in runtime.variables().iter() {
        println!("{} {} {} = {}", val.kind(), ident, val.shape(), val);
    }
}

fn run_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    info!("running {}", path.display());

    let stdout = io::stdout();
    let mut sink = stdout.lock();
    let res = Runtime::new(&mut sink).eval(&source);
    sink.flush()?;

    if let Err(e) = res {
        eprintln!("{}: {}", path.display(), e);
        process::exit(1);
    }

    Ok(())
}

fn run_repl() -> Result<()> {
    let mut editor = init_editor()?;
    init_history(&mut editor);
    welcome();

    let mut stdout = io::stdout();
    let mut runtime = Runtime::new(&mut stdout);

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                info!("read: {}", &line);

                match line.trim() {
                    "" => continue,
                    "quit" => break,
                    "help" => println!("{}", HELP),
                    "vars" => print_vars(&runtime),
                    _ => {
                        if let Err(e) = runtime.eval(&fixup_input(&line)) {
                            eprintln!("{}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Press Ctrl-D or type 'quit' to quit");
            }
            Err(ReadlineError::Eof) => {
                println!("quit");
                break;
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                println!("quit");
                break;
            }
        }
    }

    save_history(&mut editor)?;

    Ok(())
}

fn main() -> Result<()> {
    let opts = Opt::parse();
    init_logging(opts.debug)?;

    match opts.file {
        Some(path) => run_file(&path),
        None => run_repl(),
    }
}
