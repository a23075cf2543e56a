//! goldwatch CLI
//!
//! Drives the aggregation engine from a terminal: the menu-bar layer of the
//! original app replaced by subcommands over the same engine interface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use goldwatch::{
    error::Result,
    models::{EngineConfig, Source},
    services::{DirectoryResolver, SourceClients},
    utils::http,
    Engine,
};

/// goldwatch - multi-source gold price watcher
#[derive(Parser, Debug)]
#[command(name = "goldwatch", version, about = "Aggregates gold prices from multiple upstreams")]
struct Cli {
    /// Path to the engine config file
    #[arg(short, long, default_value = "goldwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the engine and print the selected view as it updates
    Watch {
        /// Source to select at start
        #[arg(long)]
        select: Option<Source>,

        /// Stop after this many seconds (0 = run until killed)
        #[arg(long, default_value_t = 0)]
        seconds: u64,
    },

    /// Fetch sources once and print the readings
    Fetch {
        /// Source id, e.g. spot_api or chow_tai_fook; all sources when omitted
        source: Option<Source>,
    },

    /// List all known sources
    Sources,

    /// Refresh the brand directory and list its entries
    Directory,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = EngineConfig::load_or_default(&cli.config);

    match cli.command {
        Command::Watch { select, seconds } => {
            config.validate()?;
            let engine = Engine::new(config)?;
            engine.start().await;
            if let Some(source) = select {
                engine.select_source(source);
            }

            log::info!("Watching; selected source: {}", engine.snapshot().selected);
            let mut rx = engine.subscribe();
            let deadline = (seconds > 0).then(|| tokio::time::sleep(Duration::from_secs(seconds)));

            if let Some(deadline) = deadline {
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut deadline => break,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            println!("{}", rx.borrow().selected_text());
                        }
                    }
                }
            } else {
                while rx.changed().await.is_ok() {
                    println!("{}", rx.borrow().selected_text());
                }
            }

            engine.stop();
        }

        Command::Fetch { source } => {
            let directory_client = http::create_client(&config.http)?;
            let directory = Arc::new(DirectoryResolver::new(
                directory_client,
                config.providers.brands.directory_url.clone(),
            ));
            let clients = SourceClients::new(&config, directory)?;

            let Some(source) = source else {
                for result in clients.fetch_all(4).await {
                    match result {
                        Ok(reading) => println!(
                            "{:<16} ¥{:>8.2}  {}",
                            reading.source,
                            reading.price,
                            reading.source.label()
                        ),
                        Err(error) => println!("{:<16} unavailable ({error})", error.source()),
                    }
                }
                return Ok(());
            };

            if source == Source::ExchangeTable {
                // Multi-row provider: show the individual quotes behind the mean.
                let (rows, mean) = clients
                    .page()
                    .fetch_exchange_rows(source)
                    .await
                    .map_err(|error| {
                        log::error!("{error}");
                        error
                    })?;
                for row in &rows {
                    println!("{:<12} {:>10.2}  {}", row.label, row.price, row.time_text);
                }
                println!("{} ({}): mean ¥{:.2}", source.label(), source, mean);
            } else {
                match clients.fetch(source).await {
                    Ok(reading) => {
                        println!(
                            "{} ({}): ¥{:.2} at {}",
                            source.label(),
                            source,
                            reading.price,
                            reading.observed_at
                        );
                    }
                    Err(error) => {
                        log::error!("{error}");
                        return Err(error.into());
                    }
                }
            }
        }

        Command::Sources => {
            for source in Source::ALL {
                let keyword = source
                    .brand_keyword()
                    .map(|k| format!(" (brand keyword: {k})"))
                    .unwrap_or_default();
                println!("{:<16} {:?} tier  {}{}", source, source.tier(), source.label(), keyword);
            }
        }

        Command::Directory => {
            let client = http::create_client(&config.http)?;
            let resolver =
                DirectoryResolver::new(client, config.providers.brands.directory_url.clone());
            let count = resolver.refresh().await?;
            log::info!("{count} brands in directory");
            for brand in resolver.brands().await {
                println!("{:<12} {}", brand.id, brand.name);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (endpoints, intervals and pattern rules)");
        }
    }

    Ok(())
}
