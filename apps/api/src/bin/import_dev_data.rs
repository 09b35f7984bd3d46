//! Loads or clears the development data set
//!
//! ```sh
//! import-dev-data --import
//! import-dev-data --delete
//! import-dev-data --import --dir ./dev-data
//! ```

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use natours_api::config::Config;
use natours_api::infrastructure::database;
use natours_api::seed::{self, DevData};
use natours_api::state::Repositories;

#[derive(Parser, Debug)]
#[command(
    name = "import-dev-data",
    version,
    about = "Import or delete the Natours development data",
    group(ArgGroup::new("action").required(true).args(["import", "delete"]))
)]
struct Cli {
    /// Insert tours, users and reviews from the data directory
    #[arg(long)]
    import: bool,

    /// Remove all tours, users and reviews
    #[arg(long)]
    delete: bool,

    /// Directory holding tours.json, users.json and reviews.json
    #[arg(long, default_value = "dev-data")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    let repositories = if config.uses_memory_store() {
        tracing::warn!("DATABASE_URL points at the in-memory store; nothing will persist");
        Repositories::in_memory()
    } else {
        let pool = database::connect(&config).await?;
        database::migrate(&pool).await?;
        Repositories::postgres(pool)
    };

    if cli.import {
        let data = DevData::load(&cli.dir)?;
        let summary = seed::import(&repositories, &data, config.bcrypt_cost).await?;
        tracing::info!(
            tours = summary.tours,
            users = summary.users,
            reviews = summary.reviews,
            "Data imported successfully!"
        );
    } else {
        seed::delete(&repositories).await?;
        tracing::info!("DB cleared successfully!");
    }

    Ok(())
}
