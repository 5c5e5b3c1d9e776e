use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down [n]|fresh|reset|status|pending]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = args.next().map(|raw| raw.parse::<u32>()).transpose()?;

    let db_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("SPARTIAMO__DATABASE__URL"))
        .unwrap_or_else(|_| "sqlite:./spartiamo.db?mode=rwc".to_string());

    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        "down" => migration::Migrator::down(&db, Some(steps.unwrap_or(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "reset" => migration::Migrator::reset(&db).await?,
        "status" => {
            migration::Migrator::status(&db).await?;
        }
        "pending" => {
            for pending in migration::Migrator::get_pending_migrations(&db).await? {
                println!("{}", pending.name());
            }
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
