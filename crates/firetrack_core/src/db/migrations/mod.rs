//! Versioned storage migrations.
//!
//! Each step is an embedded SQL script tagged with the `user_version` it
//! leaves behind. Steps run in their own transaction, so an interrupted
//! upgrade resumes from the last committed step on the next open.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

/// One embedded migration script.
struct Step {
    version: u32,
    label: &'static str,
    script: &'static str,
}

static STEPS: [Step; 2] = [
    Step {
        version: 1,
        label: "documents",
        script: include_str!("0001_documents.sql"),
    },
    Step {
        version: 2,
        label: "schema_metadata",
        script: include_str!("0002_schema_metadata.sql"),
    },
];

/// Highest `user_version` this build can produce.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|step| step.version).max().unwrap_or(0)
}

/// Brings `conn` up to [`latest_version`].
///
/// A database stamped with a newer version is refused untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = stored_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::NewerSchema { found, supported });
    }

    let mut applied = 0usize;
    for step in STEPS.iter().filter(|step| step.version > found) {
        run_step(conn, step)?;
        applied += 1;
    }
    if applied == 0 {
        debug!("event=db_migrate module=db status=current version={found}");
    }
    Ok(())
}

fn run_step(conn: &mut Connection, step: &Step) -> DbResult<()> {
    let wrap = |source: rusqlite::Error| DbError::Migration {
        version: step.version,
        label: step.label,
        source,
    };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(wrap)?;
    tx.execute_batch(step.script).map_err(wrap)?;
    tx.pragma_update(None, "user_version", step.version)
        .map_err(wrap)?;
    tx.commit().map_err(wrap)?;

    info!(
        "event=db_migrate module=db status=ok version={} label={}",
        step.version, step.label
    );
    Ok(())
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
