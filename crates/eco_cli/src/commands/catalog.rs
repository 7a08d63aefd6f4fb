//! Catalog command - List what a session can be configured with.

use anyhow::Result;
use clap::Args;

use eco_chat::curriculum::{default_model, CONTENT_TYPES, ENVIRONMENTAL_TOPICS, MODELS};
use eco_chat::{dispatch, Difficulty};

#[derive(Args)]
pub struct CatalogArgs {
    /// Only list models
    #[arg(long)]
    models: bool,
}

pub async fn execute(args: CatalogArgs) -> Result<()> {
    println!("Models:");
    for model in MODELS {
        let marker = if *model == default_model() { " (default)" } else { "" };
        println!("  {:<22} {}{}", model, dispatch(model), marker);
    }

    if args.models {
        return Ok(());
    }

    println!();
    println!("Topics:");
    for topic in ENVIRONMENTAL_TOPICS {
        println!("  {}", topic);
    }

    println!();
    println!("Content types:");
    for content_type in CONTENT_TYPES {
        println!("  {}", content_type);
    }

    println!();
    println!("Difficulty levels:");
    for level in Difficulty::ALL {
        let marker = if level == Difficulty::default() { " (default)" } else { "" };
        println!("  {}{}", level, marker);
    }

    Ok(())
}
