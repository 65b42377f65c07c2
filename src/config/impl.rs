use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when `init_config`
/// was never called (tests, benches).
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from `path` plus `CL__*` environment
/// overrides. Calling it again replaces the stored configuration.
pub fn init_config(path: &str) -> Result<Arc<StaticConfig>> {
    let loaded = Arc::new(StaticConfig::load(path)?);
    match CONFIG.get() {
        Some(current) => current.store(loaded.clone()),
        None => {
            let _ = CONFIG.set(ArcSwap::new(loaded.clone()));
        }
    }
    Ok(get_config())
}

/// Replace the global configuration (CLI overrides such as `--port`)
pub fn update_config<F>(f: F) -> Arc<StaticConfig>
where
    F: FnOnce(&mut StaticConfig),
{
    let mut next = (*get_config()).clone();
    f(&mut next);
    let next = Arc::new(next);
    if let Some(current) = CONFIG.get() {
        current.store(next.clone());
    }
    next
}
