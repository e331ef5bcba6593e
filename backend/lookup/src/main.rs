use std::sync::Arc;

use clap::Parser;
use server::{config::Config, resolver::NoopResolver, state::AppState};
use tracing_subscriber::{EnvFilter, fmt};

/// Resolve one Discord id the same way the server would and print the profile.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    id: String,

    /// Use the bot token and OAuth settings from the environment.
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let state = if args.live {
        let state = AppState::new(Config::load()?)?;
        state.pipeline.resolver().ensure_connected().await;
        state
    } else {
        AppState::with_resolver(Config::default(), Arc::new(NoopResolver), None)
    };

    let profile = state.pipeline.profile(&args.id, None).await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);

    Ok(())
}
