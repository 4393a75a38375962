use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

/// Environment variable that overrides `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("server.max_clients must be greater than zero")]
    NoClients,
    #[error("portal.splash_page must be a plain file name, got {0:?}")]
    InvalidSplashPage(String),
    #[error("portal.redirect_url is not an absolute URL: {0}")]
    InvalidRedirect(#[from] url::ParseError),
    #[error("server.listen_addr is not a socket address: {0}")]
    InvalidListenAddr(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub portal: PortalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub max_clients: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub name: String,
    pub gateway_address: String,
    pub document_root: PathBuf,
    pub splash_page: String,
    pub credentials_path: PathBuf,
    pub shutdown_delay_secs: u64,
    /// Connectivity check URL passed back to the splash page as `redir`.
    pub probe_url: String,
    /// Explicit `Location` for the probe redirect; derived when unset.
    pub redirect_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:2050".to_string(),
            max_clients: 20,
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            name: "WiFi Setup Portal".to_string(),
            gateway_address: "192.168.4.1".to_string(),
            document_root: PathBuf::from("/etc/wifi-config-ap/htdocs"),
            splash_page: "splash.html".to_string(),
            credentials_path: PathBuf::from("/tmp/wifi-config.txt"),
            shutdown_delay_secs: 5,
            probe_url: "http://connectivitycheck.gstatic.com/generate_204".to_string(),
            redirect_url: None,
        }
    }
}

impl Config {
    /// Loads the configuration: defaults, then the YAML file (if any), then
    /// the `LISTEN` environment variable.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // an empty document deserializes to unit, not to an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_clients == 0 {
            return Err(ConfigError::NoClients);
        }
        let splash = &self.portal.splash_page;
        if splash.is_empty() || splash.contains('/') || splash == ".." {
            return Err(ConfigError::InvalidSplashPage(splash.clone()));
        }
        if let Some(redirect) = &self.portal.redirect_url {
            Url::parse(redirect)?;
        }
        Ok(())
    }

    /// Port the server listens on.
    pub fn listen_port(&self) -> Result<u16, ConfigError> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .map_err(|_| ConfigError::InvalidListenAddr(self.server.listen_addr.clone()))
    }

    /// `Location` sent in answer to connectivity probes.
    ///
    /// Unless configured explicitly this is
    /// `http://<gateway>:<port>/<splash_page>?redir=<probe_url>`.
    pub fn redirect_location(&self) -> Result<String, ConfigError> {
        if let Some(redirect) = &self.portal.redirect_url {
            Url::parse(redirect)?;
            return Ok(redirect.clone());
        }

        let base = format!(
            "http://{}:{}/",
            self.portal.gateway_address,
            self.listen_port()?
        );
        let mut url = Url::parse(&base)?.join(&self.portal.splash_page)?;
        url.query_pairs_mut()
            .append_pair("redir", &self.portal.probe_url);
        Ok(url.to_string())
    }
}
