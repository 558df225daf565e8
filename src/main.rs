use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub mod config;
pub mod http_probe;
pub mod report;
pub mod title;
pub mod tls;

use config::{ProbeSettings, load_config};
use http_probe::prelude::*;
use http_probe::report as error_report;

/// Probe which HTTP versions an origin serves and whether something in the
/// path downgrades them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Host or URL to probe. Prompted for when omitted.
    target: Option<String>,

    /// Only fetch over the best protocol that works.
    #[arg(long)]
    best: bool,

    /// Request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Accept certificates that do not chain to a known root.
    #[arg(long)]
    insecure: bool,

    /// YAML settings file. Defaults to CONFIG_FILE or ./probe.yml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut settings: ProbeSettings) -> ProbeSettings {
        if let Some(timeout) = self.timeout {
            settings.timeout_seconds = timeout;
        }
        if self.insecure {
            settings.accept_invalid_certs = true;
        }
        settings
    }
}

async fn prompt_for_target() -> std::io::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter the website URL: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line)
}

async fn wait_for_enter() {
    println!("Press [ENTER] to exit...");
    let mut line = String::new();
    let _ = BufReader::new(tokio::io::stdin()).read_line(&mut line).await;
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("HTTP Probe v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();

    let app_config = match load_config(cli.config.as_deref()) {
        Ok(app_config) => app_config,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = &app_config.config_file {
        log::info!("Using settings from {}", path.display());
    }
    let settings = cli.apply(app_config.settings);

    let prompted = cli.target.is_none();
    let input = match &cli.target {
        Some(target) => target.clone(),
        None => match prompt_for_target().await {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let target = match Target::parse(&input) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            return ExitCode::FAILURE;
        }
    };

    let fetcher = HttpFetcher::new(settings);
    let code = if cli.best {
        match fetch_best(&fetcher, &target).await {
            Ok(best) => {
                println!("{}", report::render_best(&target, &best));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ {}", error_report(&e));
                ExitCode::FAILURE
            }
        }
    } else {
        let session = probe_all(&fetcher, &target).await;
        for line in report::render_session(&session) {
            println!("{line}");
        }
        ExitCode::SUCCESS
    };

    if prompted {
        wait_for_enter().await;
    }
    code
}
