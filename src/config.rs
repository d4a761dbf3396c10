use tracing::trace;

/// Bus endpoint the owning process connects to by default.
pub const DEFAULT_ENDPOINT: &str = "ipc://@/asset-bus";

/// Agent settings consumed by the owning event loop.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Message bus endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How long a directory lookup may block before it is abandoned.
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Separator between friendly names in the announced location path.
    #[serde(default = "default_path_separator")]
    pub path_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            path_separator: default_path_separator(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    5
}

fn default_path_separator() -> String {
    " > ".to_string()
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("invalid configuration file"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
