//! feedscan CLI
//!
//! Local execution entry point for backfill and poll runs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use feedscan::{
    error::{AppError, Result},
    models::{CleanupMode, Config, ItemId},
    pipeline::{
        self, CleanupPolicy, CleanupScheduler, Coordinator, ItemProcessor, PollOptions,
        ProcessingPolicy, Window,
    },
    services::{Classifier, Downloader, FeedClient, TesseractCli},
    storage::{CursorStore, DedupStore, FanoutSink, PgStore, Sink, TagSink},
};

/// feedscan - image feed text and color scanner
#[derive(Parser, Debug)]
#[command(
    name = "feedscan",
    version,
    about = "Scans feed images for text and tags the results"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "feedscan.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit structured JSON logs
    #[cfg(feature = "json-logs")]
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the feed history and record every image in the database
    Backfill {
        /// Start below this item id instead of at the newest item
        #[arg(long)]
        older_than: Option<ItemId>,

        /// Number of concurrent workers
        #[arg(long)]
        workers: Option<usize>,

        /// Postgres connection string
        #[arg(long)]
        database_url: Option<String>,

        /// Keep downloaded images in the cache directory
        #[arg(long)]
        keep_files: bool,
    },

    /// Periodically process the newest items
    Poll {
        /// Ignore items older than this many seconds
        #[arg(long)]
        max_age: Option<u64>,

        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,

        /// Account used to add tags
        #[arg(long, requires = "password")]
        username: Option<String>,

        #[arg(long, requires = "username")]
        password: Option<String>,

        /// Postgres connection string
        #[arg(long)]
        database_url: Option<String>,

        /// How queued items are processed
        #[arg(long, value_enum, default_value_t = PolicyArg::Ascending)]
        policy: PolicyArg,

        /// Keep downloaded images in the cache directory
        #[arg(long)]
        keep_files: bool,

        /// Poll once and exit
        #[arg(long)]
        once: bool,
    },

    /// Classify a local image and print its tags
    Classify {
        /// Image file to classify
        file: PathBuf,
    },

    /// Validate the configuration file
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PolicyArg {
    /// One worker, ascending ids, stop on first failure
    Ascending,
    /// Several workers, database dedup
    Concurrent,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "json-logs")]
fn init_json_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
    tracing::debug!("JSON logging enabled");
}

#[cfg(feature = "json-logs")]
fn setup_logging(cli: &Cli) {
    if cli.json_logs {
        init_json_logging(cli.verbose);
    } else {
        init_logging(cli.verbose);
    }
}

#[cfg(not(feature = "json-logs"))]
fn setup_logging(cli: &Cli) {
    init_logging(cli.verbose);
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    let mut config = Config::load_or_default(&cli.config);

    let result = match cli.command {
        Command::Backfill {
            older_than,
            workers,
            database_url,
            keep_files,
        } => {
            if let Some(workers) = workers {
                config.pipeline.workers = workers;
            }
            apply_common(&mut config, database_url, keep_files);
            backfill(config, older_than).await
        }

        Command::Poll {
            max_age,
            interval,
            username,
            password,
            database_url,
            policy,
            keep_files,
            once,
        } => {
            if let Some(max_age) = max_age {
                config.pipeline.max_age_secs = max_age;
            }
            if let Some(interval) = interval {
                config.pipeline.poll_interval_secs = interval;
            }
            apply_common(&mut config, database_url, keep_files);
            let credentials = username.zip(password);
            poll(config, credentials, policy, once).await
        }

        Command::Classify { file } => classify(&config, file).await,

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate().map(|()| log::info!("Config OK"))
        }
    };

    if let Err(e) = &result {
        log::error!("{}", e);
    }
    result
}

fn apply_common(config: &mut Config, database_url: Option<String>, keep_files: bool) {
    if database_url.is_some() {
        config.database.url = database_url;
    }
    if keep_files {
        config.download.cleanup = CleanupMode::Keep;
    }
}

/// Build the per-item processor shared by every run mode.
fn build_processor(
    config: &Config,
    dedup: Arc<dyn DedupStore>,
    sink: Arc<dyn Sink>,
) -> Result<Arc<ItemProcessor>> {
    let downloader = Downloader::from_config(config)?;
    let ocr = Arc::new(TesseractCli::from_config(&config.ocr));
    let classifier = Classifier::from_config(config, ocr);
    let cleanup = CleanupScheduler::new(CleanupPolicy::from_config(&config.download));

    Ok(Arc::new(ItemProcessor::new(
        dedup,
        Arc::new(downloader),
        Arc::new(classifier),
        sink,
        Arc::new(cleanup),
    )))
}

async fn connect_store(config: &Config) -> Result<PgStore> {
    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    Ok(store)
}

async fn backfill(config: Config, older_than: Option<ItemId>) -> Result<()> {
    config.validate()?;

    let store = Arc::new(connect_store(&config).await?);
    let client = Arc::new(FeedClient::new(&config.api)?);
    let processor = build_processor(&config, store.clone(), store)?;
    let coordinator = Coordinator::new(client, processor, config.pipeline.queue_capacity);

    let window = Window::backfill(config.pipeline.flags(), older_than)
        .with_max_pages(config.pipeline.max_pages);
    let policy = ProcessingPolicy::Concurrent {
        workers: config.pipeline.workers,
    };

    pipeline::run_backfill(&coordinator, &window, &policy).await?;
    Ok(())
}

async fn poll(
    config: Config,
    credentials: Option<(String, String)>,
    policy: PolicyArg,
    once: bool,
) -> Result<()> {
    config.validate()?;

    let client = Arc::new(FeedClient::new(&config.api)?);
    let store = match &config.database.url {
        Some(_) => Some(Arc::new(connect_store(&config).await?)),
        None => None,
    };

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    if let Some((username, password)) = credentials {
        let session = client.login(&username, &password).await?;
        sinks.push(Arc::new(TagSink::new(Arc::clone(&client), session)));
    }
    if let Some(store) = &store {
        sinks.push(store.clone());
    }
    let sink = FanoutSink::new(sinks);
    if sink.is_empty() {
        return Err(AppError::config(
            "poll needs a sink: pass --username/--password or --database-url",
        ));
    }

    let (policy, dedup) = match policy {
        PolicyArg::Ascending => {
            let cursor = match &config.state.cursor_file {
                Some(path) => CursorStore::load(path).await?,
                None => CursorStore::new(),
            };
            let cursor = Arc::new(cursor);
            let dedup: Arc<dyn DedupStore> = cursor.clone();
            (ProcessingPolicy::Ascending { cursor }, dedup)
        }
        PolicyArg::Concurrent => {
            let Some(store) = store else {
                return Err(AppError::config(
                    "concurrent polling needs --database-url for dedup",
                ));
            };
            let dedup: Arc<dyn DedupStore> = store;
            let workers = config.pipeline.workers;
            (ProcessingPolicy::Concurrent { workers }, dedup)
        }
    };

    let processor = build_processor(&config, dedup, Arc::new(sink))?;
    let coordinator = Coordinator::new(client, processor, config.pipeline.queue_capacity);
    let options = PollOptions {
        flags: config.pipeline.flags(),
        max_age: config.pipeline.max_age(),
        interval: config.pipeline.poll_interval(),
        max_pages: config.pipeline.max_pages,
        once,
    };

    let totals = pipeline::run_poll(&coordinator, &policy, &options).await?;
    totals.log("Polling stopped");
    Ok(())
}

async fn classify(config: &Config, file: PathBuf) -> Result<()> {
    if !file.is_file() {
        return Err(AppError::validation(format!(
            "{} is not a file",
            file.display()
        )));
    }

    let ocr = Arc::new(TesseractCli::from_config(&config.ocr));
    let classifier = Classifier::from_config(config, ocr);
    let result = classifier.classify(0, &file).await?;

    log::info!(
        "{}: text={} gray={}",
        file.display(),
        result.has_text,
        result.correct_gray
    );
    println!("{}", result.joined_tags());
    Ok(())
}
