//! A core module for command line interface.
//!
//! See [`Cli`] for more information.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{value_parser, Args, Subcommand};
pub use clap::{CommandFactory, Parser};

use crate::provider::{Provider, SortOrder};

/// [`clap`] command line interface.
///
/// # Example
///
/// ```no_run
/// use multibooru::cli::{Cli, Parser as _};
///
/// let cli = Cli::parse();
/// ```
#[non_exhaustive]
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// API to use: 0 = danbooru, 1 = gelbooru, 2 = konachan
    #[arg(short, long, global = true, default_value_t = 0)]
    #[arg(value_parser = value_parser!(u8).range(0..=2))]
    pub api: u8,

    /// Directory of `config.toml`, created with defaults if missing.
    ///
    /// Defaults to the platform config directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// The search to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The search to run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get post data for specified tags. Optionally, download images.
    Post(PostArgs),
    /// Search for tags. Accepts `*` wildcards in the pattern.
    Tag(TagArgs),
}

/// Arguments of `post`.
#[non_exhaustive]
#[derive(Args, Debug)]
pub struct PostArgs {
    /// Download the images instead of printing the posts
    #[arg(short, long = "dl")]
    pub dl: bool,

    /// Number of posts to retrieve
    #[arg(short = 'n', long, default_value_t = 20)]
    #[arg(value_parser = value_parser!(u32).range(1..=200))]
    pub limit: u32,

    /// Ignore the tags and retrieve random posts
    #[arg(short, long)]
    pub random: bool,

    /// Maximum number of concurrent downloads, overrides the config
    #[arg(short, long)]
    pub jobs: Option<NonZeroUsize>,

    /// Tags to search for
    pub tags: Vec<String>,
}

/// Arguments of `tag`.
#[non_exhaustive]
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Number of tags to retrieve
    #[arg(short = 'n', long, default_value_t = 20)]
    #[arg(value_parser = value_parser!(u32).range(1..=100))]
    pub limit: u32,

    /// Sort order: 0 = date, 1 = name, 2 = count
    #[arg(short, long, default_value_t = 0)]
    #[arg(value_parser = value_parser!(u8).range(0..=2))]
    pub order: u8,

    /// Tag name pattern, only the first one is used
    #[arg(required = true)]
    pub pattern: Vec<String>,
}

impl Cli {
    /// The selected provider.
    pub fn provider(&self) -> Provider {
        Provider::from_ordinal(self.api).expect("`api` is range checked by clap")
    }
}

impl PostArgs {
    /// The tags joined with spaces.
    pub fn tags(&self) -> String {
        self.tags.join(" ")
    }
}

impl TagArgs {
    /// The first pattern argument.
    pub fn pattern(&self) -> &str {
        self.pattern.first().map(String::as_str).unwrap_or_default()
    }

    /// The sort order named by `--order`.
    pub fn order(&self) -> SortOrder {
        SortOrder::from_ordinal(self.order).expect("`order` is range checked by clap")
    }
}
