use crate::engine::{IntervalScheduler, RuntimeClock};
use crate::model::{InfoEvent, RunConfig, TimerEvent, DEFAULT_STORAGE_KEY};
use crate::orchestrator::{Controller, UiCommand};
use crate::storage::{self, FileStore, HistoryStore};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "freefall-depth",
    version,
    about = "Free-fall depth stopwatch with measurement history and optional TUI"
)]
pub struct Cli {
    /// Measure once in the terminal without the TUI; Enter or Ctrl-C stops the run
    #[arg(long)]
    pub text: bool,

    /// Print results as JSON (measurement in run mode, list with --list)
    #[arg(long)]
    pub json: bool,

    /// Stop the text-mode run automatically after this long
    #[arg(long)]
    pub duration: Option<humantime::Duration>,

    /// Sampling interval while a run is active (must be non-zero)
    #[arg(long, default_value = "100ms", value_parser = parse_tick_interval)]
    pub tick_interval: humantime::Duration,

    /// Directory holding the persisted history
    #[arg(long, env = "FREEFALL_DEPTH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage slot name for the history
    #[arg(long, default_value = DEFAULT_STORAGE_KEY)]
    pub storage_key: String,

    /// Print the measurement history and exit
    #[arg(long)]
    pub list: bool,

    /// Rename history entry number N (as shown by --list); requires --name
    #[arg(long, value_name = "N", requires = "name", value_parser = clap::value_parser!(u64).range(1..))]
    pub rename: Option<u64>,

    /// New name for --rename
    #[arg(long, requires = "rename")]
    pub name: Option<String>,

    /// Delete history entry number N (as shown by --list)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub delete: Option<u64>,

    /// Export the history as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the history as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// True when the invocation only reads or edits the stored history.
    pub fn is_history_command(&self) -> bool {
        self.list
            || self.rename.is_some()
            || self.delete.is_some()
            || self.export_json.is_some()
            || self.export_csv.is_some()
    }

    /// True when this invocation will take over the terminal.
    pub fn is_tui(&self) -> bool {
        cfg!(feature = "tui")
            && !self.text
            && !self.json
            && !self.print_config
            && !self.is_history_command()
    }
}

fn parse_tick_interval(raw: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = raw.parse::<humantime::Duration>().map_err(|e| e.to_string())?;
    if Duration::from(d).is_zero() {
        return Err("tick interval must be greater than zero".to_string());
    }
    Ok(d)
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        tick_interval: Duration::from(args.tick_interval),
        data_dir: args
            .data_dir
            .clone()
            .unwrap_or_else(storage::default_data_dir),
        storage_key: args.storage_key.clone(),
        auto_stop: args.duration.map(Duration::from),
    }
}

pub async fn run(args: Cli, cfg: RunConfig) -> Result<()> {
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }
    if args.is_history_command() {
        return run_history(&args, &cfg);
    }

    if !args.text && !args.json {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
    }

    run_text(args, cfg).await
}

/// Apply history edits and exports, then optionally list.
fn run_history(args: &Cli, cfg: &RunConfig) -> Result<()> {
    let mut store = HistoryStore::open(FileStore::new(&cfg.data_dir), cfg.storage_key.clone());

    if let (Some(n), Some(name)) = (args.rename, args.name.as_deref()) {
        if !store.rename(entry_index(n), name)? {
            anyhow::bail!("no history entry #{n} ({} entries)", store.list().len());
        }
        eprintln!("Renamed #{n} to \"{name}\"");
    }
    if let Some(n) = args.delete {
        if store.delete(entry_index(n))?.is_none() {
            anyhow::bail!("no history entry #{n} ({} entries)", store.list().len());
        }
        eprintln!("Deleted #{n}");
    }
    if let Some(p) = args.export_json.as_deref() {
        storage::export_json(p, store.list())?;
        eprintln!("Exported JSON: {}", p.display());
    }
    if let Some(p) = args.export_csv.as_deref() {
        storage::export_csv(p, store.list())?;
        eprintln!("Exported CSV: {}", p.display());
    }

    if args.list {
        if args.json {
            println!("{}", serde_json::to_string_pretty(store.list())?);
        } else {
            for line in crate::text_summary::build_history_lines(store.list()).lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn entry_index(n: u64) -> usize {
    usize::try_from(n.saturating_sub(1)).unwrap_or(usize::MAX)
}

/// Info line for text mode. `NoSample` is left to the run summary.
fn text_info_line(info: &InfoEvent) -> Option<String> {
    match info {
        InfoEvent::NoSample => None,
        other => Some(other.to_message()),
    }
}

/// Run one measurement in the terminal.
async fn run_text(args: Cli, cfg: RunConfig) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TimerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let store = HistoryStore::open(FileStore::new(&cfg.data_dir), cfg.storage_key.clone());
    let controller = Controller::new(RuntimeClock, IntervalScheduler, store, cfg.tick_interval);
    let handle = tokio::spawn(controller.run(event_tx, cmd_rx));

    let _ = cmd_tx.send(UiCommand::Start);
    if !args.json {
        let _ = out_tx.send(OutputLine::Stderr(
            "Measuring... press Enter or Ctrl-C to stop".into(),
        ));
    }

    // Stop on Enter, Ctrl-C, or the optional deadline, whichever comes first.
    let stop_tx = cmd_tx.clone();
    let auto_stop = cfg.auto_stop;
    let trigger = tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        // A closed stdin is not a stop request.
        let enter = async {
            match lines.next_line().await {
                Ok(Some(_)) => {}
                _ => futures::future::pending().await,
            }
        };
        let deadline = async {
            match auto_stop {
                Some(d) => tokio::time::sleep(d).await,
                None => futures::future::pending().await,
            }
        };
        tokio::select! {
            _ = enter => {}
            _ = tokio::signal::ctrl_c() => {}
            _ = deadline => {}
        }
        let _ = stop_tx.send(UiCommand::Stop);
    });

    let mut readout = None;
    let mut committed = None;
    let mut history_len = 0;
    while let Some(ev) = event_rx.recv().await {
        match ev {
            TimerEvent::Started => {}
            TimerEvent::Readout(s) => {
                if !args.json {
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "Depth: {:.2} m   Time: {:.2} s",
                        s.depth, s.elapsed_time
                    )));
                }
            }
            TimerEvent::Stopped {
                readout: r,
                committed: c,
            } => {
                readout = r;
                committed = c;
                let _ = cmd_tx.send(UiCommand::Quit);
            }
            TimerEvent::HistoryChanged { history } => history_len = history.len(),
            TimerEvent::Info(info) => {
                if let Some(msg) = text_info_line(&info) {
                    let _ = out_tx.send(OutputLine::Stderr(msg));
                }
            }
        }
    }

    trigger.abort();
    handle.await.context("controller task failed")??;

    if args.json {
        let out = serde_json::to_string_pretty(&committed)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary =
            crate::text_summary::build_run_summary(readout, committed.as_ref(), history_len);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Cli::parse_from(["freefall-depth", "--data-dir", "/tmp/ff"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.tick_interval, Duration::from_millis(100));
        assert_eq!(cfg.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/ff"));
        assert!(cfg.auto_stop.is_none());
        assert!(!args.is_history_command());
    }

    #[test]
    fn rename_needs_a_name() {
        assert!(Cli::try_parse_from(["freefall-depth", "--rename", "1"]).is_err());
        let args =
            Cli::try_parse_from(["freefall-depth", "--rename", "2", "--name", "Well"]).unwrap();
        assert!(args.is_history_command());
        assert!(!args.is_tui());
        assert_eq!(entry_index(args.rename.unwrap()), 1);
    }

    #[test]
    fn entry_numbers_start_at_one() {
        assert!(Cli::try_parse_from(["freefall-depth", "--delete", "0"]).is_err());
    }

    #[test]
    fn empty_run_is_reported_once() {
        let summary = crate::text_summary::build_run_summary(None, None, 0);
        let notices = summary
            .lines
            .iter()
            .chain(text_info_line(&InfoEvent::NoSample).iter())
            .filter(|l| l.contains("nothing recorded"))
            .count();
        assert_eq!(notices, 1);
        assert!(text_info_line(&InfoEvent::StorageFailed("disk full".into())).is_some());
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        assert!(
            Cli::try_parse_from(["freefall-depth", "--text", "--tick-interval", "0s"]).is_err()
        );
        assert!(Cli::try_parse_from(["freefall-depth", "--tick-interval", "soon"]).is_err());
        let args = Cli::try_parse_from(["freefall-depth", "--tick-interval", "250ms"]).unwrap();
        assert_eq!(build_config(&args).tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn print_config_dumps_effective_settings() {
        let args = Cli::parse_from([
            "freefall-depth",
            "--print-config",
            "--data-dir",
            "/tmp/ff",
            "--duration",
            "3s",
        ]);
        assert!(!args.is_tui());
        let cfg = build_config(&args);
        let raw = serde_json::to_string(&cfg).unwrap();
        let back: RunConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, cfg);
        assert_eq!(back.auto_stop, Some(Duration::from_secs(3)));
    }

    #[test]
    fn duration_sets_auto_stop() {
        let args = Cli::parse_from(["freefall-depth", "--text", "--duration", "2s"]);
        assert_eq!(build_config(&args).auto_stop, Some(Duration::from_secs(2)));
        assert!(!args.is_tui());
    }
}
