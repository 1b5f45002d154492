use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "CFDEV_HOME";
const HOME_DIR: &str = ".cfdev";
const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_BOSH_DIRECTOR_IP: &str = "10.245.0.2";
const DEFAULT_CF_ROUTER_IP: &str = "10.144.0.34";

/// Environment configuration, read once per invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub home_dir: PathBuf,
    pub state_dir: PathBuf,
    pub cf_router_ip: String,
    pub bosh_director_ip: String,
    pub analytics: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cf_router_ip: Option<String>,
    bosh_director_ip: Option<String>,
    analytics: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let home_dir = resolve_home_dir(
            std::env::var(HOME_ENV).ok().as_deref(),
            std::env::var("HOME").ok().as_deref(),
        )?;
        Self::load_from(home_dir)
    }

    /// Build the configuration rooted at `home_dir`, applying `config.yaml` if present.
    pub fn load_from(home_dir: PathBuf) -> Result<Self, ConfigError> {
        let file = read_config_file(&home_dir.join(CONFIG_FILE))?;
        let config = Config {
            state_dir: home_dir.join("state"),
            cf_router_ip: file
                .cf_router_ip
                .unwrap_or_else(|| DEFAULT_CF_ROUTER_IP.to_string()),
            bosh_director_ip: file
                .bosh_director_ip
                .unwrap_or_else(|| DEFAULT_BOSH_DIRECTOR_IP.to_string()),
            analytics: file.analytics.unwrap_or(false),
            home_dir,
        };
        log::debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

fn resolve_home_dir(
    cfdev_home: Option<&str>,
    home: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = cfdev_home.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    match home.map(str::trim).filter(|h| !h.is_empty()) {
        Some(home) => Ok(Path::new(home).join(HOME_DIR)),
        None => Err(ConfigError::NoHome),
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
