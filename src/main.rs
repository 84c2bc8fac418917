use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tokio::runtime::Runtime;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use multibooru::api::QueryBuilder;
use multibooru::cli::{Cli, Command, Parser, PostArgs, TagArgs};
use multibooru::config::Config;
use multibooru::present::show_records;
use multibooru::provider::{Provider, SearchKind};
use multibooru::scheduler::Scheduler;
use multibooru::tool::dir_name_for;

#[inline]
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[inline]
fn build_client(timeout: u64) -> reqwest::Result<Client> {
    let client_builder = Client::builder();
    let client_builder = if timeout > 0 {
        client_builder.timeout(Duration::from_secs(timeout))
    } else {
        client_builder
    };
    client_builder.build()
}

async fn post_search(
    client: Client,
    config: Config,
    provider: Provider,
    args: PostArgs,
) -> anyhow::Result<()> {
    let tags = args.tags();
    let jobs = args.jobs.or(config.jobs);

    let records = QueryBuilder::new(config)
        .build_search(provider, SearchKind::Post, args.limit)
        .add_post_params(&tags, args.random)
        .send(&client)
        .await
        .with_context(|| format!("failed to search posts on {provider}"))?;

    if !args.dl {
        show_records(&records, io::stdout().lock()).context("failed to print posts")?;
        return Ok(());
    }

    let download_dir = PathBuf::from(dir_name_for(args.random, &tags));
    let scheduler = Scheduler::build(client, &download_dir, records)
        .await
        .with_context(|| {
            format!(
                "Unable to create the download directory {}",
                download_dir.display()
            )
        })?;
    scheduler.with_jobs(jobs).launch().await;

    Ok(())
}

async fn tag_search(
    client: Client,
    config: Config,
    provider: Provider,
    args: TagArgs,
) -> anyhow::Result<()> {
    let records = QueryBuilder::new(config)
        .build_search(provider, SearchKind::Tag, args.limit)
        .add_tag_params(args.pattern(), args.order())
        .send(&client)
        .await
        .with_context(|| format!("failed to search tags on {provider}"))?;

    show_records(&records, io::stdout().lock()).context("failed to print tags")?;
    Ok(())
}

#[inline]
async fn async_main(cli: Cli, config: Config) -> anyhow::Result<()> {
    let client = build_client(config.timeout).context("failed to build reqwest client")?;
    let provider = cli.provider();

    match cli.command {
        Command::Post(args) => post_search(client, config, provider, args).await,
        Command::Tag(args) => tag_search(client, config, provider, args).await,
    }
}

fn main() -> anyhow::Result<()> {
    // here, if parse fails, the program will exit, and no `Drop` will be called,
    // but it's okay, because we don't need to clean up anything.
    let cli = Cli::parse();
    init_tracing();

    let config_dir = match cli.config.clone() {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };
    let config = Config::load_or_create(&config_dir).context("failed to load config")?;

    let runtime = Runtime::new().context("failed to build tokio runtime")?;
    runtime.block_on(async {
        tokio::select! {
            result = async_main(cli, config) => {result},
            result = signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c signal")?;
                eprintln!("Ctrl-C received, exiting...");
                Ok(())
            },
        }
    })
}
