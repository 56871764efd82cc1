use std::fs;
use std::path::Path;

use eyre::{bail, Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use quayci_lib::log;

/// Process configuration, loaded once and immutable afterwards.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port for the webhook listener.
    pub port: u16,
    /// Shared secret configured on the repository's webhook.
    pub webhook_secret: String,
    /// Personal access token; needs repo:status and gist scopes.
    pub access_token: String,
    /// Clone over ssh instead of https. Required for private repositories.
    pub use_ssh: bool,
    /// Display name, used as the commit status context.
    pub name: String,
    /// Log level filter.
    pub logging: String,
    /// Check commands, run one after the other from the repository root.
    pub checks: Vec<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            webhook_secret: "Create a secret and set it at github.com/<owner>/<repo>/settings/hooks"
                .to_owned(),
            access_token: "Get one at https://github.com/settings/tokens".to_owned(),
            use_ssh: false,
            name: "quayci".to_owned(),
            logging: "info".to_owned(),
            checks: vec![vec!["cargo".to_owned(), "test".to_owned(), "--all".to_owned()]],
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init(path: &Path) -> Result<&'static Config> {
    let config = load(path)?;
    CONFIG.set(config).expect("Config initialised twice");
    Ok(get())
}

pub fn get() -> &'static Config {
    CONFIG.get().expect("Config read before initialisation")
}

fn load(path: &Path) -> Result<Config> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            let canonical = toml::to_string_pretty(&Config::default())?;
            fs::write(path, canonical)
                .wrap_err_with(|| format!("Writing default {}", path.display()))?;
            bail!(
                "wrote new {}; fill in the secrets and restart",
                path.display()
            );
        }
    };

    let config: Config = toml::from_str(&raw).wrap_err("Parsing config")?;

    // Keep the stored file in canonical form.
    let canonical = toml::to_string_pretty(&config)?;
    if canonical != raw {
        log::info!("Rewriting {} in canonical format", path.display());
        fs::write(path, &canonical)
            .wrap_err_with(|| format!("Rewriting {}", path.display()))?;
    }

    Ok(config)
}
