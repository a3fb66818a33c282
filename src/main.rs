use clap::Parser;
use docsplit::Settings;
use docsplit::cli::commands::{config, watch};
use docsplit::cli::{self, Cli};

#[tokio::main]
async fn main() {
    if cli::is_legacy_help(std::env::args_os().nth(1).as_deref()) {
        print!("{}", cli::LEGACY_USAGE);
        return;
    }

    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    if cli.show_config {
        if let Err(e) = config::run(&settings) {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
        return;
    }

    docsplit::logging::init_with_config(&settings.logging);

    let args = watch::WatchArgs {
        paths: cli.path_args(),
        once: cli.once,
    };
    if let Err(e) = watch::run(args, settings).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
