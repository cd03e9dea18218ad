//! Schema versioning through `PRAGMA user_version`. Forward-only.

use rusqlite::Connection;
use tracing::info;

use super::{SCHEMA_VERSION, schema};
use crate::errors::{AppError, Result};

/// Bring the schema up to [`SCHEMA_VERSION`]. Safe to call repeatedly.
pub fn run(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current == 0 {
        info!(version = SCHEMA_VERSION, "[WAREHOUSE] creating schema");
        conn.execute_batch(schema::SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current > SCHEMA_VERSION {
        return Err(AppError::Config(format!(
            "database schema v{current} is newer than supported v{SCHEMA_VERSION}"
        )));
    }
    Ok(())
}
