use std::error::Error;
use std::fs::File;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

use bevel::DEFAULT_ENTRY;
use bevel::controller::replay::{self, ReplayReport};
use bevel::web::{self, ServeStrategy, WebConfig};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bevel", about = "Serve the Bevel search landing page", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the landing page and its static assets over HTTP.
    Serve(ServeArgs),
    /// Play a JSON-lines script of page events through the page controller.
    Replay {
        /// Script to replay, or `-` for stdin.
        script: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Directory to serve files from.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Entry document returned for `/` and unmatched paths.
    #[arg(long, default_value = DEFAULT_ENTRY)]
    entry: String,
    /// Address to bind. Defaults to all interfaces.
    #[arg(long)]
    host: Option<IpAddr>,
    /// Port to listen on. Defaults to `$PORT`, then 5000.
    #[arg(long)]
    port: Option<u16>,
    /// How static files are served.
    #[arg(long, value_enum, default_value_t = ServeStrategy::Mapped)]
    strategy: ServeStrategy,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Command::Serve(args) => handle_serve(args),
        Command::Replay { script } => handle_replay(script, cli.json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn handle_serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let mut config = WebConfig::from_env();
    if let Some(host) = args.host {
        config.addr.set_ip(host);
    }
    if let Some(port) = args.port {
        config.addr.set_port(port);
    }
    config.root = args.root;
    config.entry = args.entry;
    config.strategy = args.strategy;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn handle_replay(script: PathBuf, as_json: bool) -> Result<(), Box<dyn Error>> {
    let steps = if script.as_os_str() == "-" {
        replay::read_script(io::stdin().lock())?
    } else {
        let file = File::open(&script)
            .map_err(|err| format!("Failed to open script {}: {err}", script.display()))?;
        replay::read_script(file)?
    };
    let report = replay::run_script(steps);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ReplayReport) {
    if report.timeline.is_empty() {
        println!("No effects.");
    } else {
        let width = report
            .timeline
            .iter()
            .map(|entry| entry.at_ms.to_string().len())
            .max()
            .unwrap_or(5)
            .max("AT_MS".len());
        println!("{:<width$}  {}", "AT_MS", "EFFECT", width = width);
        println!("{:-<width$}  {}", "", "------", width = width);
        for entry in &report.timeline {
            println!("{:<width$}  {}", entry.at_ms, entry.effect, width = width);
        }
    }
    println!("\nFinal state: {} ({})", report.final_state, report.view);
    if let Some(query) = &report.pending_query {
        println!("Pending query: {query:?}");
    }
}
