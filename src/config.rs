use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_README: &str = include_str!("../assets/README.md");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration value missing: {0}")]
    Missing(&'static str),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("failed to read README template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(alias = "WebhookSecretKey", default)]
    pub webhook_secret_key: String,
    #[serde(alias = "WebhookSlackUrl", default)]
    pub webhook_slack_url: String,
    #[serde(alias = "FooterSlack", default)]
    pub footer_slack: String,
    #[serde(alias = "OrgAvatarURL", default)]
    pub org_avatar_url: String,
    #[serde(alias = "PortUrl", deserialize_with = "port_from_any")]
    pub port: u16,
    #[serde(alias = "GitToken", default)]
    pub git_token: String,
    #[serde(alias = "Adminemail", default)]
    pub admin_email: String,
    #[serde(alias = "Issueass", default)]
    pub issue_assignee: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: PathBuf,
    #[serde(default)]
    pub readme_template: Option<PathBuf>,
    /// Overwrite an existing README in new repositories with the template.
    #[serde(default)]
    pub force_readme: bool,

    /// Contents pushed as `README.md`; resolved from `readme_template` on load.
    #[serde(skip, default = "default_readme")]
    pub readme_content: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("data/loggithub.json")
}

fn default_readme() -> String {
    DEFAULT_README.to_string()
}

/// Older config files store the port as a string ("3002").
fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s
            .trim()
            .trim_start_matches(':')
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port {s:?}"))),
    }
}

impl Config {
    /// Read, parse and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, path)
    }

    fn from_json(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(template) = &config.readme_template {
            // Relative template paths resolve against the config file's directory.
            let template = match path.parent() {
                Some(dir) if template.is_relative() => dir.join(template),
                _ => template.clone(),
            };
            config.readme_content =
                std::fs::read_to_string(&template).map_err(|source| ConfigError::Template {
                    path: template.clone(),
                    source,
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("webhook_secret_key", &self.webhook_secret_key),
            ("webhook_slack_url", &self.webhook_slack_url),
            ("git_token", &self.git_token),
            ("admin_email", &self.admin_email),
            ("issue_assignee", &self.issue_assignee),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort("0".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        webhook_secret_key: "s3cret".to_string(),
        webhook_slack_url: "https://hooks.slack.test/services/T0/B0/X".to_string(),
        footer_slack: "GitHub Org Monitor".to_string(),
        org_avatar_url: "https://avatars.test/org.png".to_string(),
        port: 3002,
        git_token: "ghp_test".to_string(),
        admin_email: "admin@acme.test".to_string(),
        issue_assignee: "secops".to_string(),
        bind_address: default_bind_address(),
        default_branch: default_branch(),
        github_api_url: default_github_api_url(),
        audit_log_path: default_audit_log_path(),
        readme_template: None,
        force_readme: false,
        readme_content: default_readme(),
    }
}
