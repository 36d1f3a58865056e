use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;

use slimcat_core::stats::CommandOutcome;
use slimcat_core::tracing_setup::init_tracing;
use slimcat_core::{BridgeRuntime, BridgeServices, CoreConfig, NotificationModel};

#[derive(Parser)]
#[command(name = "replay-bridge")]
#[command(about = "Feed newline-delimited bridge payloads through the dispatcher")]
struct Cli {
    /// File with one JSON payload per line ("-" for stdin)
    input: PathBuf,

    /// Path to JSON config file (siteDomain, logFilter, logFile, openLinks)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// After replaying, navigate every published update (open comment
    /// links, jump to conversations) through the shell
    #[arg(long)]
    open: bool,

    /// Never open links in the browser, even with --open
    #[arg(long)]
    no_open: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::load_or_default(cli.config.as_deref())?;
    if cli.no_open {
        config.open_links = false;
    }
    init_tracing(&config)?;

    let mut runtime = BridgeRuntime::spawn(&config, BridgeServices::logging(config.open_links))?;
    let published = Arc::new(Mutex::new(Vec::new()));
    let sink = published.clone();
    runtime
        .publisher()
        .subscribe(move |update: &NotificationModel| {
            println!("[{}] {}", update.style(), update.display_text());
            sink.lock().push(update.clone());
        });

    let reader: Box<dyn BufRead> = if cli.input.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(&cli.input)
            .with_context(|| format!("Failed to open {}", cli.input.display()))?;
        Box::new(BufReader::new(file))
    };

    let handle = runtime.handle();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Err(e) = handle.submit_json(line) {
            eprintln!("line {}: {:#}", index + 1, e);
        }
    }
    handle.flush();

    if cli.open {
        for update in published.lock().iter() {
            runtime.navigate(update);
        }
    }

    let stats = runtime.stats().snapshot();
    runtime.shutdown();

    println!();
    println!("=== Bridge stats ===");
    println!(
        "total: {}  applied: {}  dropped: {}  ignored: {}  published: {}",
        stats.total,
        stats.total_for(CommandOutcome::Applied),
        stats.total_for(CommandOutcome::Dropped),
        stats.total_for(CommandOutcome::Ignored),
        stats.published
    );
    for (command_type, count) in stats.types_by_count() {
        let label = if command_type.is_empty() {
            "(no type)"
        } else {
            command_type.as_str()
        };
        println!("  {:<14} {}", label, count);
    }

    Ok(())
}
