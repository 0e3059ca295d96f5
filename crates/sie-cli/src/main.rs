//! SIE CLI - Command-line interface
//!
//! Usage:
//!   sie resolve <text>
//!   sie extract --file notes.txt
//!   sie discover <domain>
//!   sie entities --type company
//!   sie relationships --entity 3

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sie_core::{AppConfig, EntityType, KnowledgeStore, MemoryStore, Page, PgStore, StoreKind};
use sie_discovery::{CommunityDiscovery, RedditClient};
use sie_extractor::resolver::DEFAULT_SEARCH_LIMIT;
use sie_extractor::{EntityResolver, RelationshipInference};
use tracing::{debug, info, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sie")]
#[command(about = "Social Intelligence Engine CLI")]
#[command(version)]
struct Cli {
    /// PostgreSQL URL; switches from the in-memory store
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve entities mentioned in text
    Resolve {
        #[command(flatten)]
        input: TextInput,
    },
    /// Extract relationships from text
    Extract {
        #[command(flatten)]
        input: TextInput,
    },
    /// Rank public communities for a company domain
    Discover {
        /// Company domain, e.g. https://www.openai.com
        domain: String,
    },
    /// List or search stored entities
    Entities {
        /// Only entities of this type
        #[arg(long = "type", value_parser = parse_entity_type)]
        entity_type: Option<EntityType>,
        /// Case-insensitive name substring
        #[arg(long, conflicts_with = "entity_type")]
        search: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List stored relationships
    Relationships {
        /// Only edges touching this entity
        #[arg(long)]
        entity: Option<i64>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(clap::Args)]
struct TextInput {
    /// Inline text
    #[arg(required_unless_present = "file")]
    text: Option<String>,
    /// Read the text from a file instead
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

impl TextInput {
    fn read(&self) -> anyhow::Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => read_file(path),
            (None, None) => anyhow::bail!("either TEXT or --file is required"),
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_entity_type(s: &str) -> Result<EntityType, String> {
    EntityType::from_name(s)
        .ok_or_else(|| format!("unknown entity type '{s}' (person, company, product, unknown, other)"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KnowledgeStore>> {
    match config.database.store {
        StoreKind::Memory => {
            debug!("using in-memory store; nothing outlives this command");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Postgres => {
            let store = PgStore::new(
                &config.database.postgres_url,
                config.database.postgres_pool_size,
            )
            .await?;
            store.migrate().await?;
            info!("connected to PostgreSQL");
            Ok(Arc::new(store))
        }
    }
}

fn build_subscriber<W>(
    filter: EnvFilter,
    json_format: bool,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if json_format {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database.store = StoreKind::Postgres;
        config.database.postgres_url = url;
    }
    config.validate()?;

    // Logs go to stderr so stdout stays valid JSON
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing::subscriber::set_global_default(build_subscriber(
        filter,
        config.logging.json_format,
        std::io::stderr,
    ))?;

    match cli.command {
        Commands::Resolve { input } => {
            let text = input.read()?;
            let resolver = EntityResolver::new(open_store(&config).await?);
            print_json(&resolver.resolve_entities_in_text(&text).await?)?;
        }
        Commands::Extract { input } => {
            let text = input.read()?;
            let inference = RelationshipInference::new(open_store(&config).await?);
            print_json(&inference.extract_relationships_from_text(&text).await?)?;
        }
        Commands::Discover { domain } => {
            info!(
                domain = %domain,
                base_url = %config.discovery.reddit_base_url,
                "discovering communities"
            );
            let source = Arc::new(RedditClient::new(&config.discovery)?);
            let discovery = CommunityDiscovery::new(source, config.discovery.clone());
            print_json(&discovery.discover_communities(&domain).await?)?;
        }
        Commands::Entities {
            entity_type,
            search,
            skip,
            limit,
        } => {
            let resolver = EntityResolver::new(open_store(&config).await?);
            let entities = match search {
                Some(query) => {
                    resolver
                        .search_entities(&query, limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
                        .await?
                }
                None => {
                    let page = Page::new(skip, limit.unwrap_or(Page::default().limit));
                    resolver.list_entities(page, entity_type).await?
                }
            };
            print_json(&entities)?;
        }
        Commands::Relationships {
            entity,
            skip,
            limit,
        } => {
            let inference = RelationshipInference::new(open_store(&config).await?);
            let relationships = match entity {
                Some(id) => inference.get_entity_relationships(id).await?,
                None => inference.list_relationships(Page::new(skip, limit)).await?,
            };
            print_json(&relationships)?;
        }
    }

    Ok(())
}
