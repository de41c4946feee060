//! Session setup and the two-team sample data shared by tests and the demo.

use crate::model::{Member, Team, ENTITIES};
use quarry_query::EntityStore;
use quarry_sqlite::{SqliteConfig, SqliteSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `warn`).
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Open a session with the Member and Team tables in place.
pub fn open_session(config: SqliteConfig) -> anyhow::Result<SqliteSession> {
    Ok(SqliteSession::open(config, ENTITIES)?)
}

/// Handles to the seeded rows.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub team_a: Team,
    pub team_b: Team,
    pub members: Vec<Member>,
}

/// teamA holds member1 (10) and member2 (20); teamB holds member3 (30) and
/// member4 (40). Nothing is flushed.
pub fn seed(session: &SqliteSession) -> anyhow::Result<Seeded> {
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    session.insert(&mut team_a)?;
    session.insert(&mut team_b)?;

    let mut members = Vec::with_capacity(4);
    for (name, age, team) in [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ] {
        let mut member = Member::new(name, age);
        session.relate(&mut member, "team", team)?;
        session.insert(&mut member)?;
        members.push(member);
    }

    info!(teams = 2, members = members.len(), "Seeded sample data");
    Ok(Seeded {
        team_a,
        team_b,
        members,
    })
}

/// In-memory session with the sample data queued.
pub fn seeded_session() -> anyhow::Result<(SqliteSession, Seeded)> {
    let session = open_session(SqliteConfig::memory())?;
    let seeded = seed(&session)?;
    Ok((session, seeded))
}
