//! stream-debug CLI - sample pipeline and chunking preview

use std::convert::Infallible;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::{future, stream, StreamExt, TryStreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;

use stream_debug::config::LEGACY_MAX_TAG_LENGTH;
use stream_debug::{
    CompletionKind, ConsoleSink, DebugConfig, DebugError, DebugFutureExt, DebugStreamExt,
    Debugger, EventLogger, FixSuggestion, LoggingSwitch, MemorySink, OptionalKind, SingleKind,
};

#[derive(Parser)]
#[command(name = "stream-debug")]
#[command(about = "Lifecycle logging for async streams and futures")]
#[command(version)]
struct Cli {
    /// YAML config file (missing file = defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample pipeline, logging to stderr
    Demo {
        /// Explicit tag for the tagged stream
        #[arg(short, long, default_value = "Words")]
        tag: String,

        /// Cap base tags to the legacy 23-character limit
        #[arg(long)]
        legacy_tags: bool,
    },

    /// Read stdin and print the records it would be logged as
    Chunk {
        /// Event title, e.g. "OnNext: "
        #[arg(long)]
        title: String,

        /// Maximum record length (defaults to the configured limit)
        #[arg(short, long)]
        max_length: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Demo { tag, legacy_tags } => run_demo(config, &tag, legacy_tags).await,
            Commands::Chunk { title, max_length } => run_chunk(config, &title, max_length),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<DebugError>().and_then(|e| e.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<DebugConfig> {
    let config = match path {
        Some(path) => DebugConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DebugConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

async fn run_demo(mut config: DebugConfig, tag: &str, legacy_tags: bool) -> anyhow::Result<()> {
    if legacy_tags {
        config.max_tag_length = Some(LEGACY_MAX_TAG_LENGTH);
    }
    let debugger = Debugger::builder()
        .config(config)
        .sink(ConsoleSink)
        .build()?;

    // push-many: natural completion
    let words: Vec<&str> = stream::iter(["One", "Two", "Three"].map(Ok::<_, Infallible>))
        .debug_with(&debugger, None)
        .try_collect()
        .await?;
    tracing::info!(count = words.len(), "untagged stream done");

    let _: Vec<&str> = stream::iter(["First", "Second", "Third"].map(Ok::<_, Infallible>))
        .debug_with(&debugger, Some(tag))
        .try_collect()
        .await?;

    // push-many: failure is logged and forwarded
    let failed: Result<Vec<u32>, io::Error> = stream::iter(vec![
        Ok(1),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream went away")),
    ])
    .debug_with(&debugger, Some("failing"))
    .try_collect()
    .await;
    tracing::info!(failed = failed.is_err(), "failing stream done");

    // unbounded: channel drained partially, then dropped
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    for n in 0..5u32 {
        tx.send(n)?;
    }
    drop(tx);
    let first_two: Vec<u32> = UnboundedReceiverStream::new(rx)
        .map(Ok::<_, Infallible>)
        .debug_unbounded_with(&debugger, Some("channel"))
        .take(2)
        .try_collect()
        .await?;
    tracing::info!(?first_two, "channel stream done");

    let answer = async { Ok::<_, io::Error>(42) }
        .debug_with(&debugger, SingleKind, Some("single"))
        .await?;
    tracing::info!(answer, "single done");

    future::ready(Ok::<Option<&str>, Infallible>(None))
        .debug_with(&debugger, OptionalKind, Some("maybe"))
        .await?;

    async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, Infallible>(())
    }
    .debug_with(&debugger, CompletionKind, Some("completable"))
    .await?;

    Ok(())
}

fn run_chunk(config: DebugConfig, title: &str, max_length: Option<usize>) -> anyhow::Result<()> {
    let max_length = max_length.unwrap_or(config.max_message_length);
    if max_length == 0 {
        anyhow::bail!(DebugError::Config {
            reason: "max length must be greater than 0".into(),
        });
    }

    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .context("reading stdin")?;
    let body = body.strip_suffix('\n').unwrap_or(&body);

    let sink = MemorySink::new();
    let logger = EventLogger::new(Arc::new(sink.clone()))
        .with_switch(LoggingSwitch::new(true))
        .with_max_message_length(max_length);
    logger.write_chunked("chunk", title, body);

    for message in sink.messages() {
        println!("{message}");
    }
    Ok(())
}
