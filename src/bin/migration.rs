use clap::Parser;
use sea_orm_migration::MigratorTrait;
use shoppingcart::{
    config::{init_tracing, load_config},
    db::{establish_connection, DbConfig},
    migrator::Migrator,
};
use tracing::{error, info};

/// Applies or rolls back the shopping cart schema
#[derive(Debug, Parser)]
#[command(name = "migration", about = "Shopping cart schema migrations")]
struct Args {
    /// Roll back the last applied migration instead of applying pending ones
    #[arg(long)]
    down: bool,

    /// Print applied and pending migrations and exit
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config()?;
    init_tracing(&config.log_level, config.log_json);

    let Some(db_config) = DbConfig::from_settings(&config.database) else {
        error!("No database configured; set SHOPPINGCART__DATABASE__URL");
        anyhow::bail!("no database configured");
    };
    let db = establish_connection(&db_config).await?;

    if args.status {
        Migrator::status(&db).await?;
    } else if args.down {
        info!("Rolling back last migration");
        Migrator::down(&db, Some(1)).await?;
    } else {
        info!("Applying pending migrations");
        Migrator::up(&db, None).await?;
    }

    info!("Migration completed successfully");
    Ok(())
}
