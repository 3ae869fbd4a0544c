//! CLI wrapper for the painless scripting language.
//!
//! Usage:
//!   painless [flags] <file.painless>    # Execute a script file
//!   painless [flags] -e "code"          # Evaluate a script
//!   painless [flags]                    # Start REPL (interactive mode)
//!
//! Set `PAINLESS_LOG` (e.g. `PAINLESS_LOG=debug`) to log to stderr.

use painless::parser::parse_to_token_tree;
use painless::runner::compiler::{compile, CompilerSettings};
use painless::runner::ds::value::Value;
use painless::runner::script::ScriptInputs;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Options {
    settings: CompilerSettings,
    tokens: bool,
    disasm: bool,
}

fn main() {
    init_logging();

    let mut options = Options::default();
    let mut rest = vec![];
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--no-overflow" => options.settings.numeric_overflow = false,
            "--picky" => options.settings.picky = true,
            "--tokens" => options.tokens = true,
            "--disasm" => options.disasm = true,
            "--max-loops" => match args.next().and_then(|n| n.parse().ok()) {
                Some(n) => options.settings.max_loop_counter = n,
                None => {
                    eprintln!("--max-loops expects a non-negative number");
                    process::exit(1);
                }
            },
            _ => rest.push(arg),
        }
    }

    match rest.as_slice() {
        [] => run_repl(&options),
        [flag, code] if flag == "-e" || flag == "--eval" => {
            if !run_source(code, &options) {
                process::exit(1);
            }
        }
        [file] => run_file(file, &options),
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn init_logging() {
    if let Ok(filter) = env::var("PAINLESS_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(io::stderr)
            .init();
    }
}

fn print_usage() {
    eprintln!("painless - sandboxed scripting language");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  painless [flags] <file>         Execute a script file");
    eprintln!("  painless [flags] -e \"code\"      Evaluate a script");
    eprintln!("  painless [flags]                Start REPL (interactive mode)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --no-overflow     Raise on integer overflow instead of wrapping");
    eprintln!("  --picky           Treat grammar ambiguities as errors");
    eprintln!("  --max-loops N     Loop statement budget, 0 disables the guard");
    eprintln!("  --tokens          Print the parse tree instead of running");
    eprintln!("  --disasm          Print the bytecode before running");
}

fn run_file(filename: &str, options: &Options) {
    let source = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };
    if !run_source(&source, options) {
        process::exit(1);
    }
}

/// Compiles and runs one script, printing its result. Returns false on error.
fn run_source(source: &str, options: &Options) -> bool {
    if options.tokens {
        return match parse_to_token_tree(source) {
            Ok(tree) => {
                println!("{}", tree);
                true
            }
            Err(e) => {
                eprintln!("{}", e);
                false
            }
        };
    }

    let script = match compile(source, &options.settings) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("{}", e);
            return false;
        }
    };
    if options.disasm {
        print!("{}", script.disassemble());
    }

    match script.execute(ScriptInputs::new()) {
        Ok(Value::Null) => true,
        Ok(value) => {
            println!("{}", value);
            true
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            false
        }
    }
}

fn run_repl(options: &Options) {
    println!("painless v0.1.0");
    println!("Each line is compiled and run as its own script. Type .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }

        let input = input.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        run_source(input, options);
    }

    println!("Goodbye!");
}
