//! Walk through the Member/Team queries against a SQLite database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry_query::{select, select_from, EntityStore, Projections};
use quarry_sqlite::SqliteConfig;
use quarry_study::fixtures::{open_session, seed};
use quarry_study::{MemberDto, QMember, QTeam};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "quarry-study")]
#[command(about = "Run the Member/Team query walkthrough", long_about = None)]
struct Cli {
    /// SQLite settings (TOML); in-memory when omitted
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,

    /// Log every statement at info level
    #[arg(long)]
    show_sql: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Members with their teams
    Members,
    /// Average age per team
    Teams,
    /// Members as JSON DTOs
    Dtos,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SqliteConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SqliteConfig::memory(),
    };
    let config = if cli.show_sql {
        config.with_show_sql(true)
    } else {
        config
    };

    let session = open_session(config)?;
    seed(&session)?;
    session.flush()?;
    info!("Sample data ready");

    let member = QMember::member();
    let team = QTeam::team();

    match cli.command.unwrap_or(Commands::Members) {
        Commands::Members => {
            let rows = select((&member, &team))
                .from(&member)
                .left_join(member.team(), &team)
                .fetch(&session)?;
            for row in rows {
                println!("{}", row);
            }
        }
        Commands::Teams => {
            let rows = select((team.name(), member.age().avg()))
                .from(&member)
                .join(member.team(), &team)
                .group_by(team.name())
                .fetch(&session)?;
            for row in rows {
                println!(
                    "{}: {}",
                    row.get_at::<String>(0)?,
                    row.get_at::<f64>(1)?
                );
            }
        }
        Commands::Dtos => {
            let dtos = select(Projections::bean::<MemberDto>((
                member.username().nullable(),
                member.age(),
            )))
            .from(&member)
            .fetch(&session)?;
            println!("{}", serde_json::to_string_pretty(&dtos)?);
        }
    }

    let total = select_from(&member).fetch_count(&session)?;
    info!(total, "Done");
    Ok(())
}
