use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use herald::{CommandHandler, Config, CronScheduler, DiscordClient, HttpFeedSource, Publisher, SyncEngine};

#[derive(Parser)]
#[command(name = "herald", version, about = "Relay an RSS/Atom feed into a Discord forum")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "herald.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = herald::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        herald::logging::init_console_only(&config.logging.level);
    }

    info!("herald {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> herald::Result<()> {
    let source = Arc::new(HttpFeedSource::new(&config.feed)?);
    let client = Arc::new(DiscordClient::new(&config.discord)?);
    let publisher = Publisher::new(client, &config.discord);
    let engine = Arc::new(SyncEngine::new(
        source,
        publisher,
        config.feed.post_interval()?,
    ));

    let tracked = engine.bootstrap().await?;
    info!("Tracking {} feed items from {}", tracked, config.feed.url);

    let scheduler = Arc::new(CronScheduler::new(&config.feed.cron_schedule)?);
    let task = Arc::clone(&scheduler).start(Arc::clone(&engine));
    if let Some(next) = scheduler.next_run() {
        info!("First scheduled check at {}", next);
    }

    let handler = CommandHandler::new(engine, scheduler, config);
    let user = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match handler.handle_line(&user, &line).await {
                    Ok(reply) => println!("{reply}"),
                    Err(e) => println!("{e}"),
                },
                Ok(None) => {
                    // stdin closed; keep the scheduler running until Ctrl-C
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutting down");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read command input: {}", e);
                    break;
                }
            },
        }
    }

    task.abort();
    Ok(())
}
