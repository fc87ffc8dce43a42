//! simdeck terminal client
//!
//! A headless operator console: polls the simulation server on a fixed
//! cadence and exposes the staged-edit workflow over a line-oriented command
//! loop. Useful over SSH and as a reference wiring of the runtime.

use simdeck::config::ConfigCommand;
use simdeck::prelude::*;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod commands;
mod export;

use commands::Command;

#[derive(Debug, Clone)]
struct Options {
    server: String,
    interval_ms: u64,
}

impl Options {
    fn from_env_and_args() -> Self {
        let mut server = std::env::var("SIMDECK_SERVER")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let mut interval_ms: u64 = 500;

        let mut args = std::env::args().skip(1);
        while let Some(a) = args.next() {
            match a.as_str() {
                "--server" => {
                    if let Some(v) = args.next() {
                        server = v;
                    }
                }
                "--interval-ms" => {
                    if let Some(v) = args.next() {
                        if let Ok(n) = v.parse::<u64>() {
                            interval_ms = n.max(1);
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            server,
            interval_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let opts = Options::from_env_and_args();
    let client = ApiClient::new(&opts.server)?;
    info!("connecting to {}", client.base());

    let dashboard = Arc::new(RwLock::new(Dashboard::with_catalog()));
    let controller = SyncController::new(client, Arc::clone(&dashboard));

    controller.load_initial().await;
    let poll_loop = controller.start(opts.interval_ms);
    info!("polling every {}ms; type `help` for commands", opts.interval_ms);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match Command::parse(line) {
                            Ok(Command::Quit) => break,
                            Ok(cmd) => dispatch(cmd, &controller, &dashboard).await,
                            Err(e) => println!("error: {e}"),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("stdin error: {e}");
                        break;
                    }
                }
            }
        }
    }

    poll_loop.abort();
    Ok(())
}

async fn dispatch(
    cmd: Command,
    controller: &SyncController,
    dashboard: &Arc<RwLock<Dashboard>>,
) {
    match cmd {
        Command::Help => print_help(),
        Command::Status => {
            let d = dashboard.read().await;
            println!(
                "status: {}  steps: {}  actions: {}",
                d.status().label(),
                d.history.len(),
                if d.actions_enabled() { "enabled" } else { "disabled" },
            );
        }
        Command::Charts => {
            let d = dashboard.read().await;
            for (spec, state) in d.charts.charts() {
                let points: usize = (0..spec.datasets.len()).map(|i| state.series(i).len()).sum();
                println!("{:<32} {} datasets, {} points", spec.title, spec.datasets.len(), points);
            }
            for (spec, state) in d.charts.scatters() {
                let points: usize = (0..spec.labels.len()).map(|i| state.trace(i).len()).sum();
                println!(
                    "{:<32} {} traces, {} points ({})",
                    spec.title,
                    spec.labels.len(),
                    points,
                    if spec.panel { "panel" } else { "focus" },
                );
            }
        }
        Command::Config => {
            let d = dashboard.read().await;
            if !d.config.is_loaded() {
                println!("no configuration loaded yet");
                return;
            }
            for field in d.config.fields() {
                let path = field.path();
                let value = simdeck::keypath::resolve(d.config.draft(), &path);
                let marker = if d.config.changed().contains(&path) { "*" } else { " " };
                println!(
                    "{marker} {path} = {}",
                    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
                );
            }
            for (i, publisher) in d.config.publishers() {
                println!("  Publisher {i}: {publisher}");
            }
            if d.config.dirty() {
                println!("staged changes: {:?} (use `reset` to apply)", d.config.changed());
            }
        }
        Command::Policies => {
            let d = dashboard.read().await;
            for spec in d.policies.specs() {
                let values = d.policies.values(spec.name).unwrap_or(&[]);
                let args: Vec<String> = spec
                    .args
                    .iter()
                    .zip(values)
                    .map(|(a, v)| format!("{}={v}", a.name))
                    .collect();
                let ok = if d.policies.is_valid(spec.name) { "" } else { "  [invalid]" };
                println!("{:<20} {}{ok}", spec.name, args.join(" "));
            }
            for batch in d.policies.batches() {
                println!("step {}:", batch.step);
                for inv in &batch.invocations {
                    let args: Vec<String> =
                        inv.args.iter().map(|a| format!("{}={}", a.name, a.value)).collect();
                    println!("  {} {}", inv.name, args.join("; "));
                }
            }
        }
        Command::Set { path, raw } => {
            let mut d = dashboard.write().await;
            match d.config.apply(ConfigCommand::Set { path, raw }) {
                Ok(_) => {
                    if d.config.dirty() {
                        println!("staged ({} changed)", d.config.changed().len());
                    } else {
                        println!("back to baseline");
                    }
                }
                Err(e) => println!("rejected: {e}"),
            }
        }
        Command::AddPublisher => {
            let mut d = dashboard.write().await;
            match d.config.apply(ConfigCommand::AddPublisher) {
                Ok(_) => println!("publisher added ({} total)", d.config.publishers().len()),
                Err(e) => println!("rejected: {e}"),
            }
        }
        Command::DelPublisher { index } => {
            let mut d = dashboard.write().await;
            match d.config.apply(ConfigCommand::RemovePublisher { index }) {
                Ok(_) => println!("publisher removed ({} remain)", d.config.publishers().len()),
                Err(e) => println!("rejected: {e}"),
            }
        }
        Command::EditPolicy { policy, args } => {
            let mut d = dashboard.write().await;
            for (name, raw) in args {
                let index = d
                    .policies
                    .specs()
                    .find(|s| s.name == policy)
                    .and_then(|s| s.args.iter().position(|a| a.name == name));
                match index {
                    Some(index) => match d.policies.edit(&policy, index, &raw) {
                        Ok(outcome) => println!("{policy}.{name}: {outcome:?}"),
                        Err(e) => println!("rejected: {e}"),
                    },
                    None => println!("rejected: {policy} has no argument {name}"),
                }
            }
        }
        Command::Submit { policy } => match controller.enact_policy(&policy).await {
            Ok(inv) => println!("enacted {} {:?}", inv.name, inv.values()),
            Err(e) => println!("rejected: {e}"),
        },
        Command::Scrub { scatter, index, value } => {
            let mut d = dashboard.write().await;
            if scatter {
                d.charts.set_scatter_scrub(index, value);
            } else {
                d.charts.set_chart_scrub(index, value);
            }
        }
        Command::Step { steps } => match controller.run_steps(steps).await {
            Ok(()) => println!("stepping by {steps}"),
            Err(e) => println!("rejected: {e}"),
        },
        Command::Reset => match controller.reset().await {
            Ok(()) => println!("reset submitted; dashboard clears when the server is ready"),
            Err(e) => println!("rejected: {e}"),
        },
        Command::Export { path } => {
            let d = dashboard.read().await;
            match export::write_history(d.history.records(), path) {
                Ok(path) => println!("wrote {} records to {}", d.history.len(), path.display()),
                Err(e) => warn!("export failed: {e}"),
            }
        }
        Command::Quit => unreachable!("handled by the main loop"),
    }
}

fn print_help() {
    println!(
        "\
commands:
  status                         simulation phase and local step count
  charts                         chart/scatter point summary
  config                         staged configuration (dirty paths marked *)
  set <PATH> <VALUE>             stage one config edit
  add-publisher                  append a publisher with catalog defaults
  del-publisher <I>              remove publisher I
  policies                       policy forms and the staged queue
  policy <NAME> <ARG>=<V> ...    edit policy arguments
  submit <NAME>                  validate and enact a policy
  scrub chart|scatter <I> <V>    set a scrub position (0-100)
  step <N>                       advance the simulation
  reset                          apply staged config via a full reset
  export [PATH]                  write fetched history to a JSON file
  quit"
    );
}
