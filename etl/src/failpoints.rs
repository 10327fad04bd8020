use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Evaluated by an extractor before each page query.
pub const EXTRACT_BEFORE_PAGE: &str = "extract.before_page";
/// Evaluated by a transformer before pushing a transformed record.
pub const TRANSFORM_BEFORE_PUSH: &str = "transform.before_push";
/// Evaluated by a loader before each non-empty flush.
pub const LOAD_BEFORE_FLUSH: &str = "load.before_flush";

/// Returns an error when the named failpoint is configured with a `return` action.
///
/// Compiles to `Ok(())` unless the `failpoints` feature is enabled.
pub fn etl_fail_point(name: &str) -> EtlResult<()> {
    fail_point!(name, |parameter| {
        bail!(
            ErrorKind::FailpointTriggered,
            "An error occurred in a fail point",
            format!(
                "failpoint '{name}' returned an error{}",
                parameter.map(|p| format!(": {p}")).unwrap_or_default()
            )
        );
    });

    Ok(())
}
