use std::io::Write;
use std::path::Path;

use portal::config::{Config, ConfigError, LISTEN_ENV};

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:2050");
    assert_eq!(cfg.server.max_clients, 20);
    assert_eq!(cfg.portal.gateway_address, "192.168.4.1");
    assert_eq!(cfg.portal.splash_page, "splash.html");
    assert_eq!(cfg.portal.credentials_path, Path::new("/tmp/wifi-config.txt"));
    assert_eq!(cfg.portal.shutdown_delay_secs, 5);
    assert!(cfg.portal.redirect_url.is_none());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_empty_yaml_is_default() {
    let cfg = Config::from_yaml_str("  \n").unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:2050");
}

#[test]
fn test_config_partial_yaml_keeps_other_defaults() {
    let cfg = Config::from_yaml_str(
        "portal:\n  document_root: /srv/htdocs\n  shutdown_delay_secs: 1\n",
    )
    .unwrap();

    assert_eq!(cfg.portal.document_root, Path::new("/srv/htdocs"));
    assert_eq!(cfg.portal.shutdown_delay_secs, 1);
    assert_eq!(cfg.portal.splash_page, "splash.html");
    assert_eq!(cfg.server.max_clients, 20);
}

#[test]
fn test_config_rejects_malformed_yaml() {
    assert!(Config::from_yaml_str("server: [unclosed").is_err());
    assert!(Config::from_yaml_str("server:\n  max_clients: many\n").is_err());
}

#[test]
fn test_config_validation() {
    let mut cfg = Config::default();
    cfg.server.max_clients = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::NoClients)));

    let mut cfg = Config::default();
    cfg.portal.splash_page = "../secret.html".to_string();
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidSplashPage(_))));

    let mut cfg = Config::default();
    cfg.portal.redirect_url = Some("not a url".to_string());
    assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRedirect(_))));
}

#[test]
fn test_redirect_location_is_derived() {
    let cfg = Config::default();
    assert_eq!(
        cfg.redirect_location().unwrap(),
        "http://192.168.4.1:2050/splash.html?redir=http%3A%2F%2Fconnectivitycheck.gstatic.com%2Fgenerate_204"
    );
}

#[test]
fn test_redirect_location_follows_listen_port() {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "10.0.0.1:8080".to_string();
    cfg.portal.gateway_address = "10.0.0.1".to_string();
    cfg.portal.splash_page = "index.html".to_string();

    let location = cfg.redirect_location().unwrap();
    assert!(location.starts_with("http://10.0.0.1:8080/index.html?redir="));
}

#[test]
fn test_redirect_location_explicit() {
    let mut cfg = Config::default();
    cfg.portal.redirect_url = Some("http://portal.local/welcome".to_string());
    assert_eq!(cfg.redirect_location().unwrap(), "http://portal.local/welcome");
}

#[test]
fn test_redirect_location_needs_port() {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "localhost".to_string();
    assert!(matches!(
        cfg.redirect_location(),
        Err(ConfigError::InvalidListenAddr(_))
    ));
}

// Only test in this binary that touches the environment.
#[test]
fn test_config_load_file_and_env_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "server:\n  listen_addr: 127.0.0.1:9000\n  max_clients: 4").unwrap();

    unsafe {
        std::env::remove_var(LISTEN_ENV);
    }
    let cfg = Config::load(Some(file.path())).unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.server.max_clients, 4);

    unsafe {
        std::env::set_var(LISTEN_ENV, "0.0.0.0:3000");
    }
    let cfg = Config::load(Some(file.path())).unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");

    let cfg = Config::load(None).unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    unsafe {
        std::env::remove_var(LISTEN_ENV);
    }

    assert!(Config::load(Some(Path::new("/nonexistent/portal.yaml"))).is_err());
}

#[test]
fn test_sample_config_matches_defaults() {
    let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/portal.yaml")).unwrap();
    let cfg = Config::from_yaml_str(&text).unwrap();
    let defaults = Config::default();

    assert_eq!(cfg.server.listen_addr, defaults.server.listen_addr);
    assert_eq!(cfg.portal.document_root, defaults.portal.document_root);
    assert_eq!(
        cfg.redirect_location().unwrap(),
        defaults.redirect_location().unwrap()
    );
}
