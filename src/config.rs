use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Console,
    Test,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailProvider {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantsConfig {
    Inline(Vec<String>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub participants: ParticipantsConfig,
    pub notifier: NotifierKind,
    pub mail: Option<MailProvider>,
    pub allow_reset: bool,
}

impl Config {
    /// Process environment, with `.env` filling in anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| {
            info!("DATABASE_URL not set, using sqlite://picker.db");
            "sqlite://picker.db".to_owned()
        });

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid { key: "BIND_ADDR", reason: format!("{e}") })?;

        let participants = match (var("PARTICIPANTS_FILE"), var("PARTICIPANTS")) {
            (Some(path), _) => ParticipantsConfig::File(path.into()),
            (None, Some(list)) => ParticipantsConfig::Inline(
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            (None, None) => ParticipantsConfig::Inline(Vec::new()),
        };

        let notifier = match var("NOTIFIER").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("console") => NotifierKind::Console,
            Some("test") => NotifierKind::Test,
            Some("provider") => NotifierKind::Provider,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "NOTIFIER",
                    reason: format!("unknown notifier {other:?}"),
                });
            }
        };

        let mail = if notifier == NotifierKind::Provider {
            Some(MailProvider {
                api_url: var("MAIL_API_URL").ok_or(ConfigError::Missing("MAIL_API_URL"))?,
                api_key: var("MAIL_API_KEY").ok_or(ConfigError::Missing("MAIL_API_KEY"))?,
                from: var("MAIL_FROM").ok_or(ConfigError::Missing("MAIL_FROM"))?,
            })
        } else {
            None
        };

        let allow_reset = match var("ALLOW_RESET").as_deref() {
            None => false,
            Some(v) => parse_bool(v).ok_or_else(|| ConfigError::Invalid {
                key: "ALLOW_RESET",
                reason: format!("expected true or false, got {v:?}"),
            })?,
        };

        Ok(Config {
            database_url,
            bind_addr,
            participants,
            notifier,
            mail,
            allow_reset,
        })
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
