use tracing::warn;

pub const DEFAULT_ADDR: &str = "127.0.0.1:7878";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Dashboard settings read from the environment at startup.
///
/// - `WORKBENCH_ADDR`: listen address
/// - `WORKBENCH_MAX_UPLOAD_MB`: request body limit for uploads
/// - `WORKBENCH_SEED`: fixed training seed; random per run when unset
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    pub seed: Option<u64>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            addr: DEFAULT_ADDR.to_owned(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            seed: None,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> StudioConfig {
        StudioConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default with a warning.
    pub fn from_lookup<F>(get: F) -> StudioConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = StudioConfig::default();

        if let Some(addr) = get("WORKBENCH_ADDR").filter(|a| !a.trim().is_empty()) {
            config.addr = addr.trim().to_owned();
        }
        if let Some(raw) = get("WORKBENCH_MAX_UPLOAD_MB") {
            let bytes = raw.trim().parse::<usize>().ok()
                .filter(|&mb| mb > 0)
                .and_then(|mb| mb.checked_mul(1024 * 1024));
            match bytes {
                Some(bytes) => config.max_upload_bytes = bytes,
                None => warn!(value = %raw, "ignoring invalid WORKBENCH_MAX_UPLOAD_MB"),
            }
        }
        if let Some(raw) = get("WORKBENCH_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => warn!(value = %raw, "ignoring invalid WORKBENCH_SEED"),
            }
        }
        config
    }
}
