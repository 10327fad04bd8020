use fail::FailScenario;

/// Configures failpoints for the lifetime of the value and turns them off on drop.
///
/// Holding the inner [`FailScenario`] serializes tests that use failpoints, since the registry
/// is process-wide.
pub struct CustomFailScenario<'a> {
    _scenario: FailScenario<'a>,
    failpoints: Vec<String>,
}

impl<'a> CustomFailScenario<'a> {
    /// Applies each `(failpoint, action)` pair, for example `("load.before_flush", "1*off->return")`.
    ///
    /// # Panics
    ///
    /// Panics if an action cannot be parsed.
    pub fn setup(failpoints: &[(&str, &str)]) -> CustomFailScenario<'a> {
        let scenario = FailScenario::setup();

        for &(failpoint, action) in failpoints {
            fail::cfg(failpoint, action).unwrap();
        }

        Self {
            _scenario: scenario,
            failpoints: failpoints
                .iter()
                .map(|(failpoint, _)| failpoint.to_string())
                .collect(),
        }
    }
}

impl Drop for CustomFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in &self.failpoints {
            fail::remove(failpoint);
        }
    }
}
