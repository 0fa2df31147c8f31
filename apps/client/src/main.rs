mod config;
mod errors;
mod models;
mod orchestrator;
mod query;
mod recommend_client;
mod render;
mod shell;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::orchestrator::{ExecuteOutcome, RequestOrchestrator};
use crate::query::{QueryInput, TopK};
use crate::recommend_client::RecommendClient;
use crate::render::render;
use crate::shell::Shell;

#[derive(Parser)]
#[command(
    name = "assessment-client",
    version,
    about = "Ask the assessment recommendation service for matches to a job description"
)]
struct Cli {
    /// Service origin, e.g. http://127.0.0.1:8000
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one query and print the result table
    Recommend {
        /// Job description text
        #[arg(short, long)]
        text: Option<String>,

        /// URL of a job posting
        #[arg(short, long)]
        url: Option<String>,

        /// Number of recommendations (5-10)
        #[arg(short = 'k', long, default_value_t = TopK::default())]
        top_k: TopK,
    },
    /// Interactive session reading commands from stdin
    Shell,
    /// Check that the service is up
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?.with_overrides(cli.api_base, cli.timeout);

    // Logs go to stderr; stdout carries the table
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting assessment client v{}", env!("CARGO_PKG_VERSION"));

    let client = RecommendClient::new(&config.api_base, config.request_timeout)?;
    info!(
        "Recommendation service at {} (timeout {:?})",
        client.base(),
        config.request_timeout
    );

    match cli.command {
        Command::Recommend { text, url, top_k } => {
            let mut input = QueryInput::new();
            input.set_text(text.unwrap_or_default());
            input.set_url(url.unwrap_or_default());
            input.set_top_k(top_k);

            let orchestrator = RequestOrchestrator::new(Arc::new(client));
            match orchestrator.execute(input.submit()).await {
                ExecuteOutcome::Success(_) => match render(&orchestrator.state()) {
                    Some(table) => print!("{table}"),
                    None => println!("No results."),
                },
                ExecuteOutcome::Failed(message) => bail!(message),
                ExecuteOutcome::Superseded { generation } => {
                    bail!("request {generation} was superseded")
                }
            }
        }
        Command::Shell => {
            let orchestrator = RequestOrchestrator::new(Arc::new(client));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            Shell::new(orchestrator, std::io::stdout()).run(stdin).await?;
        }
        Command::Health => {
            let status = client.health().await?;
            if !status.is_ok() {
                bail!("service reported status '{}'", status.status);
            }
            println!("ok");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_BASE;

    #[test]
    fn test_blank_env_base_without_flag_uses_default() {
        let cli = Cli::try_parse_from(["assessment-client", "health"]).unwrap();
        let config = Config::from_lookup(|key| {
            (key == "RECOMMENDER_API_BASE").then(|| "  ".to_string())
        })
        .unwrap()
        .with_overrides(cli.api_base, cli.timeout);

        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(RecommendClient::new(&config.api_base, config.request_timeout).is_ok());
    }

    #[test]
    fn test_api_base_flag_overrides_env() {
        let cli = Cli::try_parse_from([
            "assessment-client",
            "--api-base",
            "http://10.0.0.5:8000",
            "health",
        ])
        .unwrap();
        let config = Config::from_lookup(|_| None)
            .unwrap()
            .with_overrides(cli.api_base, cli.timeout);
        assert_eq!(config.api_base, "http://10.0.0.5:8000");
    }

    #[test]
    fn test_zero_timeout_flag_is_rejected() {
        assert!(Cli::try_parse_from(["assessment-client", "--timeout", "0", "health"]).is_err());
    }

    #[test]
    fn test_recommend_top_k_is_validated() {
        assert!(Cli::try_parse_from(["assessment-client", "recommend", "-k", "11"]).is_err());
        let cli = Cli::try_parse_from(["assessment-client", "recommend", "-t", "analyst"]).unwrap();
        match cli.command {
            Command::Recommend { text, url, top_k } => {
                assert_eq!(text.as_deref(), Some("analyst"));
                assert_eq!(url, None);
                assert_eq!(top_k, TopK::default());
            }
            _ => panic!("expected recommend"),
        }
    }
}
