use std::io::{self, IsTerminal, Read, Write};

use clap::Parser;
use gf_core::cli::{Cli, Command, ImagineArgs, StackArgs};
use gf_core::config::Config;
use gf_core::imagine::run_imagine;
use gf_core::logging;
use gf_core::stack::{self, StackOptions};

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref());
    logging::init(cli.verbose, &config.logging);

    let code = match cli.command {
        Command::Stack(args) => run_stack(&config, args),
        Command::Imagine(args) => imagine(&config, args),
    };
    std::process::exit(code);
}

fn run_stack(config: &Config, args: StackArgs) -> i32 {
    let opts = StackOptions::from(args);
    match stack::render(&opts, &config.glyph, &mut io::stdin().lock()) {
        Ok(out) => {
            let mut stdout = io::stdout().lock();
            if writeln!(stdout, "{out}").and_then(|()| stdout.flush()).is_err() {
                return 1;
            }
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn imagine(config: &Config, mut args: ImagineArgs) -> i32 {
    let prompt = match args
        .prompt
        .take()
        .filter(|p| !p.trim().is_empty())
        .or_else(read_piped_prompt)
    {
        Some(p) => p,
        None => {
            eprintln!("error: no prompt: pass PROMPT or pipe it on stdin");
            return 1;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            return 1;
        }
    };

    runtime.block_on(run_imagine(config, args.into_options(prompt)))
}

/// Read the prompt from stdin when it is a pipe. Blank input counts as none.
fn read_piped_prompt() -> Option<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf).ok()?;
    let trimmed = buf.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
