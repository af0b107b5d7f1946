//! VidPack CLI: turn a blog post URL into a short-form video package.
//!
//! Streams the generated script, image prompts and hashtags to stdout and
//! talks to a local voice backend for narration audio.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
