use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the channel for new tracks and update the page.
    Update(UpdateArgs),
    /// Re-render the page from the stored track catalogue (no network).
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Path to the JSON log of processed links.
    #[arg(long, default_value = "docs/log.json")]
    pub log: String,

    /// Path to the generated HTML page.
    #[arg(long, default_value = "docs/index.html")]
    pub html: String,

    /// Maximum number of channel messages to scan.
    #[arg(long, default_value_t = 100)]
    pub limit: u16,

    /// Substring identifying links to collect.
    #[arg(long, default_value = "music.yandex")]
    pub marker: String,

    /// What to do when a track's link already has a block on the page.
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Replace)]
    pub on_duplicate: DuplicatePolicy,

    /// Timeout for every HTTP request.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Page title (used for `<title>` and the heading).
    #[arg(long, default_value = "JenMusic")]
    pub title: String,

    /// Fetch and report, but write nothing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Path to the generated HTML page (the catalogue lives next to it).
    #[arg(long, default_value = "docs/index.html")]
    pub html: String,

    /// Page title (used for `<title>` and the heading).
    #[arg(long, default_value = "JenMusic")]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Re-render the existing block with fresh metadata, keeping its position.
    #[default]
    Replace,
    /// Leave the existing block untouched.
    Skip,
}
