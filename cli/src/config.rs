use clap::Args;
use std::path::PathBuf;

use tikit_client::{api::client::normalize_base_url, ClientConfig};

/// Flags that override the environment for a single invocation.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// API base URL, overrides TIKIT_API_BASE_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,
    /// State file, overrides TIKIT_STORAGE_PATH
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,
}

pub fn load(args: &GlobalArgs) -> anyhow::Result<ClientConfig> {
    let config = ClientConfig::load()?;
    Ok(apply_overrides(config, args))
}

fn apply_overrides(mut config: ClientConfig, args: &GlobalArgs) -> ClientConfig {
    if let Some(url) = &args.api_url {
        config.api_base_url = normalize_base_url(url);
    }
    if let Some(state) = &args.state {
        config.storage_path = state.clone();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let base = ClientConfig::new("https://tikit.cl/api/");
        let args = GlobalArgs {
            api_url: Some("http://localhost:9000/api/".into()),
            state: Some(PathBuf::from("/tmp/gate-2.json")),
        };
        let config = apply_overrides(base, &args);
        assert_eq!(config.api_base_url, "http://localhost:9000/api");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/gate-2.json"));
    }

    #[test]
    fn no_flags_keep_environment() {
        let base = ClientConfig::new("https://tikit.cl/api/");
        let config = apply_overrides(base, &GlobalArgs::default());
        assert_eq!(config.api_base_url, "https://tikit.cl/api");
    }
}
