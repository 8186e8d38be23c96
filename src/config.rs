use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "woodhouse.toml";
pub const DEFAULT_DATA_FILE: &str = "woodhouse.data";
const DEFAULT_GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No Jenkins job configured for repository {repo}")]
    MissingJob { repo: String },

    #[error("No repositories configured for organization {org}")]
    MissingRepos { org: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
}

/// Top-level configuration loaded from woodhouse.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where the reconciliation table lives between runs
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    pub github: GitHubConfig,

    pub jenkins: JenkinsConfig,

    /// Organization name -> repositories watched in that organization
    #[serde(default)]
    pub repos: HashMap<String, Vec<String>>,

    /// Repository name -> Jenkins job that builds its pull requests
    #[serde(default)]
    pub jobs: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api")]
    pub api_url: String,
    /// API token. If None, falls back to GITHUB_TOKEN, then to login/password.
    pub token: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JenkinsConfig {
    pub url: String,
    pub user: String,
    /// If None, falls back to JENKINS_PASSWORD.
    pub password: Option<String>,
}

/// How the GitHub client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubAuth {
    Token(String),
    Basic { login: String, password: String },
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

impl Config {
    /// Load configuration from the given path and apply environment overrides.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }
        if config.jenkins.password.is_none() {
            if let Ok(password) = std::env::var("JENKINS_PASSWORD") {
                config.jenkins.password = Some(password);
            }
        }

        Ok(config)
    }

    /// Load from a specific path without looking at the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Organizations to watch, with blank entries dropped.
    pub fn orgs(&self) -> Vec<&str> {
        self.github
            .orgs
            .iter()
            .map(|org| org.trim())
            .filter(|org| !org.is_empty())
            .collect()
    }

    pub fn repos_for(&self, org: &str) -> Result<Vec<&str>, ConfigError> {
        let repos = self
            .repos
            .get(org)
            .ok_or_else(|| ConfigError::MissingRepos { org: org.to_string() })?;
        Ok(repos
            .iter()
            .map(|repo| repo.trim())
            .filter(|repo| !repo.is_empty())
            .collect())
    }

    /// Jenkins job for a repository. A missing mapping is fatal to the cycle:
    /// skipping the repository would hide the misconfiguration.
    pub fn job_name(&self, repo: &str) -> Result<&str, ConfigError> {
        self.jobs
            .get(repo)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingJob { repo: repo.to_string() })
    }

    pub fn github_auth(&self) -> Result<GitHubAuth, ConfigError> {
        if let Some(token) = &self.github.token {
            return Ok(GitHubAuth::Token(token.clone()));
        }
        match (&self.github.login, &self.github.password) {
            (Some(login), Some(password)) => Ok(GitHubAuth::Basic {
                login: login.clone(),
                password: password.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials(
                "github.token or github.login/github.password",
            )),
        }
    }

    pub fn jenkins_password(&self) -> Result<&str, ConfigError> {
        self.jenkins
            .password
            .as_deref()
            .ok_or(ConfigError::MissingCredentials("jenkins.password"))
    }
}
