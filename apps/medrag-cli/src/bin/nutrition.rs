use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use medrag_cli::{init_tracing, load_settings};
use medrag_nutrition::{format_summary, FatSecretClient, NutritionService};

#[derive(Debug, Parser)]
#[command(name = "medrag-nutrition", about = "Look up per-serving nutrition facts")]
struct Args {
    /// Food name, e.g. "banana".
    food: String,

    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(&args.config_dir)?;
    let service = NutritionService::new(Arc::new(FatSecretClient::new(&settings.nutrition)?));
    let facts = service.facts(&args.food)?;
    println!("{}", format_summary(&facts));
    Ok(())
}
