use std::time::Duration;

use etl_config::shared::{IntoConnectOptions, MySqlConnectionConfig};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

/// Connects a pool to the configured database.
///
/// Pool bounds, acquire timeout, and connection lifetime come from the configuration.
/// The pool eagerly opens `min_connections` so that connection failures surface here rather
/// than in the first worker query.
pub async fn connect_pool(config: &MySqlConnectionConfig) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .max_lifetime(Duration::from_millis(config.max_lifetime_ms))
        .connect_with(config.with_db())
        .await?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        max_connections = config.max_connections,
        "connected mysql pool"
    );

    Ok(pool)
}

/// Quotes a MySQL identifier with backticks, doubling any embedded backtick.
pub fn quote_identifier(identifier: &str) -> String {
    let mut quoted = String::with_capacity(identifier.len() + 2);
    quoted.push('`');
    for c in identifier.chars() {
        if c == '`' {
            quoted.push('`');
        }
        quoted.push(c);
    }
    quoted.push('`');

    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifier() {
        assert_eq!(quote_identifier("raw_records"), "`raw_records`");
    }

    #[test]
    fn escapes_embedded_backticks() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
