//! Helios Elastic CLI (hes)
//!
//! Exercises the helios-elastic library against a live cluster.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use helios_elastic::{
    ConnectionTarget, ElasticArgs, ElasticConfiguration, ElasticContext, ElasticRepository,
    ElasticsearchRepository, ElasticsearchService, FuzzyMode, JsonDocument, LoggingConfig, Query,
    RefreshPolicy, SearchService, init_logging,
};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "hes", version, about = "Helios Elastic command line tool")]
struct Cli {
    #[command(flatten)]
    elastic: ElasticArgs,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "HES_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Also ship this tool's logs to the cluster.
    #[arg(long, env = "HES_SHIP_LOGS")]
    ship_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the cluster answers.
    Ping,
    /// Print cluster health.
    Health,
    /// Count documents in an index.
    Count {
        #[arg(long)]
        index: String,
    },
    /// Create an index with dynamic mapping.
    CreateIndex {
        #[arg(long)]
        index: String,
    },
    /// Delete an index.
    DeleteIndex {
        #[arg(long)]
        index: String,
    },
    /// Fetch a document by id.
    Get {
        #[arg(long)]
        index: String,
        #[arg(long)]
        id: String,
    },
    /// Index documents from a JSON file holding an object or an array.
    Insert {
        #[arg(long)]
        index: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Full-text match on one field.
    Search {
        #[arg(long)]
        index: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        text: String,
    },
    /// Run one of the autocomplete query shapes.
    Autocomplete {
        #[arg(long)]
        index: String,
        /// Field to complete on; repeat for multi-field mode.
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        #[arg(long)]
        query: String,
        #[arg(long, value_enum, default_value_t = Mode::Fuzzy)]
        mode: Mode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Fuzzy,
    Transpositions,
    Wildcard,
    PhrasePrefix,
    Multi,
    Like,
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_documents(documents: Vec<JsonDocument>) -> anyhow::Result<()> {
    let values: Vec<Value> = documents.into_iter().map(JsonDocument::into_inner).collect();
    print_json(&values)
}

async fn run(context: &ElasticContext, command: Command) -> anyhow::Result<()> {
    let repository = |index: &str| {
        ElasticsearchRepository::<JsonDocument>::with_index(context.client().clone(), index)
            .with_refresh(RefreshPolicy::WaitFor)
    };

    match command {
        Command::Ping => {
            let service = context.service::<JsonDocument>();
            if !service.is_connected(ConnectionTarget::Primary).await? {
                anyhow::bail!("Cluster at {} is unavailable", context.client().url());
            }
            println!("ok");
        }
        Command::Health => {
            print_json(&context.client().cluster_health().await?)?;
        }
        Command::Count { index } => {
            println!("{}", repository(&index).count().await?);
        }
        Command::CreateIndex { index } => {
            let created = repository(&index).create_index().await?;
            println!("{}", if created { "created" } else { "exists" });
        }
        Command::DeleteIndex { index } => {
            repository(&index).delete_index(&index).await?;
            println!("deleted");
        }
        Command::Get { index, id } => {
            print_json(&repository(&index).get(&id).await?)?;
        }
        Command::Insert { index, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let documents: Vec<JsonDocument> = match serde_json::from_str(&text)? {
                Value::Array(items) => items.into_iter().map(JsonDocument).collect(),
                other => vec![JsonDocument(other)],
            };

            repository(&index).insert_many(&documents).await?;
            info!(index = %index, count = documents.len(), "Inserted documents");
            println!("{}", documents.len());
        }
        Command::Search { index, field, text } => {
            let documents = repository(&index)
                .search(&Query::match_text(field, text))
                .await?;
            print_documents(documents)?;
        }
        Command::Autocomplete {
            index,
            fields,
            query,
            mode,
        } => {
            let service = ElasticsearchService::<JsonDocument>::new(context.client().clone())
                .with_index(index);
            let field = fields.first().map(String::as_str).unwrap_or_default();

            let documents = match mode {
                Mode::Fuzzy => {
                    service
                        .auto_complete(field, &query, FuzzyMode::EditDistance)
                        .await?
                }
                Mode::Transpositions => {
                    service
                        .auto_complete(field, &query, FuzzyMode::Transpositions)
                        .await?
                }
                Mode::Wildcard => service.auto_complete_in_between(field, &query).await?,
                Mode::PhrasePrefix => service.auto_match_in_between(field, &query).await?,
                Mode::Multi => service.auto_match_without_sensitive(&fields, &query).await?,
                Mode::Like => service.auto_analyze_with_like(field, &query).await?,
            };
            print_documents(documents)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ElasticConfiguration::from(cli.elastic);

    let context = ElasticContext::new(config)?;

    let logging = LoggingConfig::from_elastic(context.config()).with_level(&cli.log_level);
    let guard = init_logging(&logging, cli.ship_logs.then(|| context.client()));

    info!(url = %context.client().url(), "Starting hes");

    let result = run(&context, cli.command).await;
    guard.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_rejected_by_context() {
        let cli = Cli::try_parse_from([
            "hes",
            "--elastic-url",
            "",
            "--elastic-username",
            "elastic",
            "ping",
        ])
        .unwrap();
        let config = ElasticConfiguration::from(cli.elastic);

        let err = ElasticContext::new(config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("URL cannot be empty"), "unexpected error: {}", message);
        assert!(message.contains("password must be provided together"), "unexpected error: {}", message);
    }
}
