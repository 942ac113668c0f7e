use std::path::PathBuf;

use clap::{Parser, Subcommand};
use foodgram::{
    actions::ingredients, config::Configuration, import::parse_ingredients, routes,
};
use miette::{IntoDiagnostic, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand)]
enum AppSubcommand {
    /// Apply migrations, then serve the HTTP API
    Serve,

    /// Apply pending migrations and exit
    Migrate,

    /// Load ingredients from a `name,measurement_unit` file
    ImportIngredients {
        /// Path to the ingredient list
        file: PathBuf,
    },
}

/// Recipe sharing backend
#[derive(Parser)]
#[command(about, version)]
struct App {
    #[clap(subcommand)]
    subcommand: AppSubcommand,
}

async fn connect(config: &Configuration) -> Result<Pool<Postgres>> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .into_diagnostic()
}

async fn migrate(pool: &Pool<Postgres>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .into_diagnostic()?;
    log::info!("Migrations applied");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();
    let config = Configuration::load().into_diagnostic()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cmd = App::parse();
    let pool = connect(&config).await?;

    match cmd.subcommand {
        AppSubcommand::Serve => {
            let keys = config.session_keys().into_diagnostic()?;
            migrate(&pool).await?;

            log::info!("Listening on {}", config.bind_address);
            warp::serve(routes::api(pool, keys))
                .run(config.bind_address)
                .await;
        }
        AppSubcommand::Migrate => migrate(&pool).await?,
        AppSubcommand::ImportIngredients { file } => {
            let input = tokio::fs::read_to_string(&file).await.into_diagnostic()?;
            let parsed = parse_ingredients(&input).into_diagnostic()?;
            let report = ingredients::import(&parsed, &pool).await.into_diagnostic()?;

            println!("inserted: {}", report.inserted);
            println!("skipped: {}", report.skipped);
        }
    }

    Ok(())
}
