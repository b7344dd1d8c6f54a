use log::info;
use once_cell::sync::OnceCell;
use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

static CONFIG: OnceCell<ClientConfig> = OnceCell::new();

/// Settings for the generation service. Fixed after first use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            // baked in at build time, the way a bundler substitutes process.env.API_KEY
            api_key: option_env!("API_KEY").filter(|key| !key.is_empty()).map(str::to_string),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn generate_content_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint.trim_end_matches('/'), self.model)
    }
}

/// Install `config` unless one is already in place. Returns false if it was too late.
pub fn install(config: ClientConfig) -> bool {
    let installed = CONFIG.set(config).is_ok();
    if !installed {
        info!("client config already set; ignoring update");
    }
    installed
}

pub fn get() -> &'static ClientConfig {
    CONFIG.get_or_init(ClientConfig::default)
}
