use anyhow::Result;
use clap::Parser;
use freefall_depth::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_tui = args.is_tui();
    let cfg = cli::build_config(&args);

    let log_dir = is_tui.then_some(cfg.data_dir.as_path());
    logging::init(args.verbose, log_dir)?;

    match cli::run(args, cfg).await {
        Ok(()) => {
            // Stdin readers in text mode would otherwise keep the runtime alive.
            if !is_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
