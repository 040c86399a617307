use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse BILIBILI COMICS chapters and pages", long_about = None)]
pub struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Value of the `access_token` session cookie, percent-encoded or raw JSON
    #[arg(long, global = true, env = "COMICS_ACCESS_TOKEN", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Language: en, zh-Hans or id
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Print debug logs
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the readable chapters of a comic
    Chapters {
        /// Comic URL, path (`/detail/mc1234`) or id
        comic: String,
    },

    /// List the pages of a chapter
    Pages {
        /// Chapter URL or path (`/mc1234/5678`)
        chapter: String,

        /// Also fetch signed image URLs
        #[arg(long)]
        resolve: bool,
    },

    /// Show the genre, sort, status and price tables of the selected language
    Locale,
}
