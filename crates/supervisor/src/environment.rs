//! Where a run's base environment comes from.

use std::collections::HashMap;

/// Produces the environment a command should start with.
///
/// Platform-specific lookups (e.g. the logged-in user's environment block
/// instead of the host process's) plug in here.
pub trait EnvironmentSource: Send + Sync {
    fn effective_environment(&self) -> HashMap<String, String>;
}

/// The environment of the current process. Non-UTF-8 entries are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritedEnvironment;

impl EnvironmentSource for InheritedEnvironment {
    fn effective_environment(&self) -> HashMap<String, String> {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}

impl<F> EnvironmentSource for F
where
    F: Fn() -> HashMap<String, String> + Send + Sync,
{
    fn effective_environment(&self) -> HashMap<String, String> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_sees_path() {
        let env = InheritedEnvironment.effective_environment();
        assert_eq!(env.get("PATH").cloned(), std::env::var("PATH").ok());
    }

    #[test]
    fn test_closure_source() {
        let source = || HashMap::from([("A".to_string(), "1".to_string())]);
        assert_eq!(source.effective_environment()["A"], "1");
    }
}
