use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use dirs::config_dir;
use log::LevelFilter;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub preferences_path: Option<PathBuf>,
    pub log_level: LevelFilter,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal UI for a multi-backend torrent manager", long_about = None)]
pub struct Cli {
    /// Base URL of the manager daemon API.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub timeout: Option<f64>,
    #[arg(long)]
    pub insecure: bool,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub preferences: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api: Option<FileApiConfig>,
    preferences_path: Option<PathBuf>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileApiConfig {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<f64>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
}

pub fn build_config(cli: &Cli) -> Result<AppConfig> {
    let file_config = load_file_config(cli.config.as_deref())?;
    let api_file = file_config.as_ref().and_then(|cfg| cfg.api.as_ref());

    let base_url = cli
        .url
        .clone()
        .or_else(|| env::var("SEEDBOX_URL").ok())
        .or_else(|| api_file.and_then(|cfg| cfg.url.clone()))
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    let username = cli
        .username
        .clone()
        .or_else(|| env::var("SEEDBOX_USERNAME").ok())
        .or_else(|| api_file.and_then(|cfg| cfg.username.clone()));

    let password = cli
        .password
        .clone()
        .or_else(|| env::var("SEEDBOX_PASSWORD").ok())
        .or_else(|| api_file.and_then(|cfg| cfg.password.clone()));

    let timeout_secs = cli
        .timeout
        .or_else(|| env_float("SEEDBOX_TIMEOUT"))
        .or_else(|| api_file.and_then(|cfg| cfg.timeout))
        .unwrap_or(10.0);

    if timeout_secs <= 0.0 {
        anyhow::bail!("timeout must be positive");
    }

    let verify_env = env_bool("SEEDBOX_VERIFY_SSL");
    let mut verify_ssl = api_file.and_then(|cfg| cfg.verify_ssl).unwrap_or(true);
    if let Some(value) = verify_env {
        verify_ssl = value;
    }
    if cli.insecure {
        verify_ssl = false;
    }

    let user_agent = env::var("SEEDBOX_USER_AGENT")
        .ok()
        .or_else(|| api_file.and_then(|cfg| cfg.user_agent.clone()))
        .unwrap_or_else(|| "seedbox-tui".to_string());

    let preferences_path = cli
        .preferences
        .clone()
        .or_else(|| env::var("SEEDBOX_PREFERENCES").ok().map(PathBuf::from))
        .or_else(|| {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.preferences_path.clone())
        })
        .or_else(crate::preferences::default_path);

    let log_level_str = cli
        .log_level
        .clone()
        .or_else(|| env::var("SEEDBOX_LOG_LEVEL").ok())
        .or_else(|| file_config.as_ref().and_then(|cfg| cfg.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_level = LevelFilter::from_str(&log_level_str).unwrap_or(LevelFilter::Info);

    Ok(AppConfig {
        api: ApiConfig {
            base_url,
            username,
            password,
            timeout: Duration::from_secs_f64(timeout_secs),
            verify_ssl,
            user_agent,
        },
        preferences_path,
        log_level,
    })
}

fn load_file_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = path {
        return read_file_config(path);
    }

    if let Ok(env_path) = env::var("SEEDBOX_TUI_CONFIG") {
        return read_file_config(Path::new(&env_path));
    }

    if let Some(dir) = config_dir() {
        let path = dir.join("seedbox-tui").join("config.toml");
        return read_file_config(&path);
    }

    Ok(None)
}

fn read_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(parsed))
}

fn env_var_parse<T>(name: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn env_float(name: &str) -> Option<f64> {
    env_var_parse(name)
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
