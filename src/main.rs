// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use loxi_host::bridge::ModuleLoader;
use loxi_host::channel::{self, Topology, WorkerMessage};
use loxi_host::config::{load_and_validate_config, HostConfig};
use loxi_host::console::{paint, Console, RunOutcome};
use loxi_host::bridge::OutputEvent;
use loxi_host::observability::init_logging;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

const PROMPT: &str = "lox> ";

/// Command line options; flags override the config file.
#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    module: Option<String>,
    topology: Option<Topology>,
    json: bool,
    inspect: bool,
    help: bool,
    input: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().ok_or("--config needs a file")?;
                options.config = Some(PathBuf::from(value));
            }
            "--module" => {
                let value = iter.next().ok_or("--module needs a path or URL")?;
                options.module = Some(value.clone());
            }
            "--inline" => options.topology = Some(Topology::Inline),
            "--isolated" => options.topology = Some(Topology::Isolated),
            "--json" => options.json = true,
            "--inspect" => options.inspect = true,
            "-h" | "--help" => options.help = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {flag}")),
            input => {
                if options.input.is_some() {
                    return Err(format!("Unexpected extra argument: {input}"));
                }
                options.input = Some(input.to_string());
            }
        }
    }

    Ok(options)
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {program} [--config FILE] [--module PATH|URL] [--inline|--isolated] [--json] [--inspect] [FILE|-]"
    );
    eprintln!("       With no FILE, starts an interactive session (:run, :show, :clear, :quit).");
    eprintln!("Example: {program} --module web/loxi.wasm scripts/fib.lox");
    eprintln!("Example: {program} --inspect --module https://example.org/loxi.wasm");
}

fn build_config(options: &CliOptions) -> anyhow::Result<HostConfig> {
    let mut config = match &options.config {
        Some(path) => load_and_validate_config(path)?,
        None => HostConfig::default(),
    };
    if let Some(module) = &options.module {
        config.module.source = module.clone();
    }
    if let Some(topology) = options.topology {
        config.topology = topology;
    }
    config.validate()?;
    Ok(config)
}

/// Print one message as it streams in.
fn show(message: &WorkerMessage, json: bool, ansi: bool) {
    if json {
        match serde_json::to_string(message) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("❌ Failed to encode message: {e}"),
        }
        return;
    }

    match message {
        WorkerMessage::Stdout { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        WorkerMessage::Stderr { text, .. } => {
            eprint!("{}", paint(&OutputEvent::stderr(text.as_str()), ansi));
        }
        WorkerMessage::Done { .. } => {}
        WorkerMessage::Fault { message, .. } => eprintln!("⚠️  Execution faulted: {message}"),
        WorkerMessage::Fatal { message, .. } => eprintln!("❌ Host error: {message}"),
    }
}

async fn run_program(console: &mut Console, code: String, json: bool) -> anyhow::Result<RunOutcome> {
    let ansi = std::io::stderr().is_terminal();
    let outcome = console
        .run_streaming(code, |message| show(message, json, ansi))
        .await?;
    Ok(outcome)
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Faulted(_) => ExitCode::from(70),
        RunOutcome::Failed(_) => ExitCode::FAILURE,
    }
}

async fn read_source(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut code = String::new();
        tokio::io::stdin().read_to_string(&mut code).await?;
        return Ok(code);
    }
    Ok(tokio::fs::read_to_string(input).await?)
}

/// One interactive input line, interpreted against the pending source.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Source line added to the buffer.
    Append,
    Run(String),
    /// Empty the output area; the pending source is kept.
    Clear,
    /// Reprint the output area.
    Show,
    Quit,
}

fn interpret(line: &str, buffer: &mut String) -> Command {
    match line.trim() {
        ":quit" | ":q" => Command::Quit,
        ":clear" => Command::Clear,
        ":show" => Command::Show,
        ":run" => Command::Run(std::mem::take(buffer)),
        _ => {
            buffer.push_str(line);
            buffer.push('\n');
            Command::Append
        }
    }
}

/// Interactive session: lines accumulate until `:run`.
async fn interactive(console: &mut Console, json: bool) -> anyhow::Result<ExitCode> {
    println!("🦀 loxi-host ({} topology)", console.topology());
    println!("Type Lox source, then :run to execute, :show to reprint output, :clear to clear output, :quit to exit.");

    let ansi = std::io::stdout().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = String::new();
    let mut last = ExitCode::SUCCESS;

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            if !buffer.trim().is_empty() {
                let outcome = run_program(console, std::mem::take(&mut buffer), json).await?;
                last = exit_code(&outcome);
            }
            println!();
            return Ok(last);
        };

        match interpret(&line, &mut buffer) {
            Command::Append => {}
            Command::Quit => return Ok(last),
            Command::Clear => {
                console.clear_output();
                println!("🧹 Output cleared");
            }
            Command::Show => {
                let rendered = console.surface().render(ansi);
                print!("{rendered}");
                if !rendered.is_empty() && !rendered.ends_with('\n') {
                    println!();
                }
            }
            Command::Run(code) => {
                let outcome = run_program(console, code, json).await?;
                last = exit_code(&outcome);
                if let RunOutcome::Failed(_) = outcome {
                    return Ok(last);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("loxi-host");

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            print_usage(program);
            return Ok(ExitCode::from(2));
        }
    };
    if options.help {
        print_usage(program);
        return Ok(ExitCode::SUCCESS);
    }

    let config = build_config(&options)?;
    init_logging(&config.log_filter);

    if options.inspect {
        let profile = ModuleLoader::from_config(&config).inspect().await?;
        println!("🔍 {}", config.module.source);
        for line in profile.describe() {
            println!("  {line}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut console = Console::new(channel::open(&config)?);

    match &options.input {
        Some(input) => {
            let code = read_source(input).await?;
            let outcome = run_program(&mut console, code, options.json).await?;
            Ok(exit_code(&outcome))
        }
        None => interactive(&mut console, options.json).await,
    }
}
