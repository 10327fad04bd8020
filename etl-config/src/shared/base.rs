use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field holds a value outside its allowed range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// A table name is not a plain SQL identifier.
    #[error("`{field}` must be a non-empty identifier of letters, digits and underscores, got `{value}`")]
    InvalidIdentifier { field: String, value: String },
    /// A connection pool cannot serve every worker that uses it at once.
    #[error(
        "`{field}` is {max_connections} but at least {required} connections are needed by the configured workers"
    )]
    PoolTooSmall {
        field: String,
        max_connections: u32,
        required: u32,
    },
}
