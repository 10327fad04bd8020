use etl_config::shared::{IntoConnectOptions, MySqlConnectionConfig, TlsConfig};
use secrecy::SecretString;
use sqlx::{Connection, Executor, MySqlConnection, MySqlPool};
use uuid::Uuid;

use crate::db::{connect_pool, quote_identifier};

/// Builds connection settings for a uniquely named test database.
///
/// Reads the server location from:
/// - `TESTS_DATABASE_HOST` (required)
/// - `TESTS_DATABASE_PORT` (required)
/// - `TESTS_DATABASE_USERNAME` (required)
/// - `TESTS_DATABASE_PASSWORD` (optional)
///
/// # Panics
/// Panics if a required variable is missing or the port is not a number.
pub fn local_mysql_connection_config() -> MySqlConnectionConfig {
    MySqlConnectionConfig {
        host: std::env::var("TESTS_DATABASE_HOST").expect("TESTS_DATABASE_HOST must be set"),
        port: std::env::var("TESTS_DATABASE_PORT")
            .expect("TESTS_DATABASE_PORT must be set")
            .parse()
            .expect("TESTS_DATABASE_PORT must be a valid port number"),
        name: Uuid::new_v4().to_string(),
        username: std::env::var("TESTS_DATABASE_USERNAME")
            .expect("TESTS_DATABASE_USERNAME must be set"),
        password: std::env::var("TESTS_DATABASE_PASSWORD")
            .ok()
            .map(SecretString::new),
        tls: TlsConfig::disabled(),
        max_connections: MySqlConnectionConfig::DEFAULT_MAX_CONNECTIONS,
        min_connections: 1,
        acquire_timeout_ms: MySqlConnectionConfig::DEFAULT_ACQUIRE_TIMEOUT_MS,
        max_lifetime_ms: MySqlConnectionConfig::DEFAULT_MAX_LIFETIME_MS,
    }
}

/// Creates the configured database and returns a pool connected to it.
///
/// # Panics
/// Panics if the server is unreachable or the database cannot be created.
pub async fn create_mysql_database(config: &MySqlConnectionConfig) -> MySqlPool {
    let mut connection = MySqlConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to MySQL");

    connection
        .execute(format!("create database {}", quote_identifier(&config.name)).as_str())
        .await
        .expect("Failed to create database");

    connect_pool(config)
        .await
        .expect("Failed to connect to MySQL database")
}

/// Drops the configured database if it exists.
///
/// # Panics
/// Panics if the server is unreachable or the drop fails.
pub async fn drop_mysql_database(config: &MySqlConnectionConfig) {
    let mut connection = MySqlConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to MySQL");

    connection
        .execute(format!("drop database if exists {}", quote_identifier(&config.name)).as_str())
        .await
        .expect("Failed to drop database");
}
