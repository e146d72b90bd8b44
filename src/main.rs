mod config;
mod domain;
mod github;
mod logging;
mod markdown;
mod microserver;
mod pipeline;
mod server;
#[cfg(test)]
mod testing;
mod view;

use std::sync::Arc;

use anyhow::Context;

use config::Config;
use github::GitHubClient;
use logging::LogError;
use server::Dashboard;
use view::PageTemplate;

fn main() -> anyhow::Result<()> {
    logging::init().context("Failed to initialize logging")?;
    run(Config::parse()).log()
}

fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let filter = config.repo_filter()?;
    let template = PageTemplate::load(config.stylesheet.as_deref())?;
    let client = GitHubClient::new(&config.token, &config.api_url, config.timeout())
        .context("Failed to build GitHub client")?;

    tracing::info!(repo = %filter.full_name(), mode = ?filter.mode, "watching notifications");
    let dashboard = Dashboard::new(Arc::new(client), filter, template);
    server::run_server(&config.listen_addr(), dashboard)
}
