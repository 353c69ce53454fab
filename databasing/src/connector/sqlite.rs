//! SQLite connector construction

use sqlx::sqlite::SqliteConnectOptions;

use crate::connector::Connector;
use crate::error::{Error, Result};

/// Build a connector for a SQLite database file.
///
/// The file is created on first connect if it does not exist.
pub fn new_connector(filename: &str) -> Result<Connector> {
    if filename.trim().is_empty() {
        return Err(Error::InvalidTarget("empty SQLite filename".to_string()));
    }
    if filename.contains('\0') {
        return Err(Error::InvalidTarget(format!(
            "SQLite filename contains a NUL byte: {:?}",
            filename
        )));
    }

    let options = SqliteConnectOptions::new()
        .filename(filename)
        .create_if_missing(true);

    Ok(Connector::sqlite(options))
}
