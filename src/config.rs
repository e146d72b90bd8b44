//! Command line configuration.

use std::{path::PathBuf, time::Duration};

use anyhow::{Result, bail};
use clap::Parser;

use crate::{
    domain::{MatchMode, RepoFilter},
    github::DEFAULT_API_URL,
};

/// Serves a dashboard of GitHub notifications for one repository.
#[derive(Debug, Clone, Parser)]
#[command(name = "escalation-board", version, about, long_about = None)]
pub struct Config {
    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Repository whose notifications are shown and marked read (owner/name)
    #[arg(long, env = "BOARD_REPO", default_value = "grafana/support-escalations")]
    pub repo: String,

    /// How notification repositories are compared against --repo
    #[arg(long, env = "BOARD_MATCH", value_enum, default_value = "substring")]
    pub match_mode: MatchMode,

    /// Address to listen on
    #[arg(long, env = "BOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "BOARD_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Stylesheet injected into the page instead of the built-in one
    #[arg(long, env = "BOARD_STYLESHEET")]
    pub stylesheet: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Timeout for each call to GitHub, in seconds
    #[arg(long, env = "BOARD_TIMEOUT", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Config {
    /// Parses configuration from command line arguments and environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the token is blank, the repository is not `owner/name`
    /// or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!("GITHUB_TOKEN is empty");
        }
        if self.timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }
        self.repo_filter()?;
        Ok(())
    }

    pub fn repo_filter(&self) -> Result<RepoFilter> {
        match RepoFilter::parse(&self.repo, self.match_mode) {
            Some(filter) => Ok(filter),
            None => bail!("Repository must be owner/name, got {:?}", self.repo),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Config {
        let mut argv = vec!["escalation-board", "--token", "ghp_test"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn test_config_defaults() {
        // Act
        let config = config(&[]);

        // Assert
        assert_eq!(config.port, 4000);
        assert_eq!(config.repo, "grafana/support-escalations");
        assert_eq!(config.match_mode, MatchMode::Substring);
        assert_eq!(config.listen_addr(), "127.0.0.1:4000");
        assert!(config.stylesheet.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_exact_match_and_port() {
        // Act
        let config = config(&["--match-mode", "exact", "--port", "8080", "--repo", "acme/ops"]);

        // Assert
        let filter = config.repo_filter().expect("filter");
        assert_eq!(filter.mode, MatchMode::Exact);
        assert_eq!(filter.owner, "acme");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_config_stylesheet_path() {
        // Act
        let config = config(&["--stylesheet", "/etc/board/dark.css"]);

        // Assert
        assert_eq!(config.stylesheet, Some(PathBuf::from("/etc/board/dark.css")));
    }

    #[test]
    fn test_config_rejects_malformed_repo() {
        // Act
        let config = config(&["--repo", "just-a-name"]);

        // Assert
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_blank_token() {
        // Arrange
        let mut config = config(&[]);
        config.token = "  ".to_string();

        // Assert
        assert!(config.validate().is_err());
    }
}
