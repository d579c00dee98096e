mod demo;

use anyhow::Result;
use clap::Parser;
use sponge_core::commands::{builtin, CommandCause, CommandManager};
use sponge_core::config::CommandConfig;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Sponge command console
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the command configuration. Missing settings are written back.
    #[arg(long, default_value = "Commands.toml")]
    config: PathBuf,

    /// Run this command line and exit instead of reading from stdin. May be
    /// given more than once.
    #[arg(short, long)]
    execute: Vec<String>,

    /// Print the command tree as JSON and exit.
    #[arg(long)]
    dump_tree: bool,

    /// Run commands as this player instead of the console.
    #[arg(long)]
    as_player: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let logfile = tracing_appender::rolling::daily("./logs", "sponge.log");
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("SPONGE_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(logfile.and(std::io::stdout))
        .with_env_filter(env_filter)
        .init();

    let config = CommandConfig::load(&args.config)?;
    let mut manager = CommandManager::new(config);
    builtin::register_commands(&mut manager);
    demo::register_commands(&mut manager);

    let cause = match &args.as_player {
        Some(name) => CommandCause::player(name),
        None => CommandCause::console(),
    };

    if args.dump_tree {
        println!("{}", manager.command_tree(&cause).to_json()?);
        return Ok(());
    }

    if !args.execute.is_empty() {
        for line in &args.execute {
            run(&manager, &cause, line);
        }
        return Ok(());
    }

    info!("Type a command, or ?<text> for suggestions.");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim_end();
        if let Some(partial) = line.strip_prefix('?') {
            let suggestions = manager.suggest(&cause, partial.trim_start_matches('/'))?;
            println!("{}", suggestions.join("  "));
        } else if !line.trim().is_empty() {
            run(&manager, &cause, line);
        }
    }
    Ok(())
}

fn run(manager: &CommandManager, cause: &CommandCause, line: &str) {
    let line = line.trim_start().trim_start_matches('/');
    match manager.execute(cause, line) {
        Ok(result) => debug!("/{} returned {}", line, result),
        Err(err) => error!("/{} failed: {}", line, err),
    }
    for message in cause.take_messages() {
        if message.is_error {
            eprintln!("{}", message.text);
        } else {
            println!("{}", message.text);
        }
    }
}
