//! # Folio
//!
//! Command-line consumer of the portfolio document cache. Reads and edits
//! the portfolio stored as JSON under a data directory:
//!
//! ```text
//! <data-dir>/<collection>/<document>.json
//! ```
//!
//! Every command goes through a [`DocumentCache`], so the document is
//! created with the default shape on first use and always reconciled before
//! it is shown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use folio_core::icons::known_platforms;
use folio_core::{
    encode_document, reconcile_verbose, DetailsPatch, DocumentPatch, PortfolioDocument, Section,
    SocialLink,
};
use folio_sync::config::{DEFAULT_COLLECTION, DEFAULT_DOCUMENT};
use folio_sync::{CacheConfigBuilder, DocumentCache, JsonFileStore, SyncEvent};
use serde_json::Value;
use stress_test::stress_test_updates;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub mod stress_test;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio document cache over a local JSON store")]
#[command(version)]
struct Cli {
    /// Directory holding the document files
    #[arg(long, env = "FOLIO_DATA_DIR", default_value = "folio-data", global = true)]
    data_dir: PathBuf,

    /// Collection holding the portfolio document
    #[arg(long, env = "FOLIO_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    collection: String,

    /// Portfolio document id
    #[arg(long, env = "FOLIO_DOCUMENT", default_value = DEFAULT_DOCUMENT, global = true)]
    document: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reconciled portfolio
    Show {
        /// Print the reconciled document in its wire form
        #[arg(long)]
        json: bool,
        /// Print the stored document as-is, without reconciling it
        #[arg(long, conflicts_with = "json")]
        raw: bool,
    },
    /// Set one personal detail
    Set {
        #[arg(value_enum)]
        field: DetailField,
        value: String,
    },
    /// Add or replace a social link by platform name
    Social { name: String, url: String },
    /// Append a JSON entry to a list section
    Add {
        #[arg(value_parser = parse_section)]
        section: Section,
        /// Entry as a JSON value
        entry: String,
    },
    /// Add a skill to a category
    Skill { category: String, skill: String },
    /// Replace the portfolio with the contents of a JSON file
    Import { file: PathBuf },
    /// List the platforms with a dedicated icon
    Icons,
    /// Concurrent optimistic updates against an in-memory store
    Stress {
        #[arg(long, default_value_t = 4)]
        writers: usize,
        #[arg(long, default_value_t = 100)]
        updates: usize,
        #[arg(long, default_value_t = 2)]
        latency_ms: u64,
        /// Copies of each snapshot the store delivers
        #[arg(long, default_value_t = 2)]
        echo: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DetailField {
    Name,
    Title,
    AvatarUrl,
    Summary,
    PersonalTouch,
    SellingPoint,
    Email,
    Location,
}

fn parse_section(key: &str) -> Result<Section, String> {
    match Section::from_key(key) {
        Some(Section::Details) | Some(Section::Skills) => {
            Err(format!("{} is not a list section", key))
        }
        Some(section) => Ok(section),
        None => Err(format!("unknown section {}", key)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    rt.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Stress {
        writers,
        updates,
        latency_ms,
        echo,
    } = cli.command
    {
        let stats =
            stress_test_updates(writers, updates, Duration::from_millis(latency_ms), echo).await;
        stats.print();
        if !stats.converged {
            bail!("cache did not converge with the store");
        }
        return Ok(());
    }
    if let Commands::Icons = cli.command {
        for platform in known_platforms() {
            let icon = folio_core::resolve_icon(platform);
            let marker = if icon.is_fallback() { "  (fallback)" } else { "" };
            println!("{:>4}  {}{}", icon.glyph(), icon.key(), marker);
        }
        return Ok(());
    }

    let config = CacheConfigBuilder::new()
        .collection(cli.collection)
        .document(cli.document)
        .build();
    info!(data_dir = %cli.data_dir.display(), path = %config.path, "opening portfolio");

    let store = Arc::new(JsonFileStore::new(cli.data_dir));
    let cache = DocumentCache::with_config(store, config);
    cache.start()?;
    cache.wait_synced().await?;

    let result = run(&cache, cli.command).await;
    cache.shutdown();
    result
}

async fn run(cache: &DocumentCache<JsonFileStore>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Show { raw: true, .. } => {
            match cache.channel().fetch().await? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => println!("(no stored document)"),
            }
            Ok(())
        }
        Commands::Show { json, .. } => {
            let document = cache.current();
            if json {
                println!("{}", serde_json::to_string_pretty(&encode_document(&document))?);
            } else {
                print_summary(&document);
            }
            Ok(())
        }
        Commands::Set { field, value } => {
            let mut details = DetailsPatch::new();
            details = match field {
                DetailField::Name => details.name(value),
                DetailField::Title => details.title(value),
                DetailField::AvatarUrl => details.avatar_url(value),
                DetailField::Summary => details.professional_summary(value),
                DetailField::PersonalTouch => details.personal_touch(value),
                DetailField::SellingPoint => details.unique_selling_point(value),
                DetailField::Email | DetailField::Location => {
                    let mut contact = cache.current().details.contact.clone();
                    if matches!(field, DetailField::Email) {
                        contact.email = value;
                    } else {
                        contact.location = value;
                    }
                    details.contact(contact)
                }
            };
            write(cache, DocumentPatch::new().details(details)).await
        }
        Commands::Social { name, url } => {
            let mut socials = cache.current().details.socials.clone();
            match socials.iter_mut().find(|s| s.name.eq_ignore_ascii_case(&name)) {
                Some(link) => link.url = url,
                None => socials.push(SocialLink::new(name.to_lowercase(), name, url)),
            }
            write(cache, DocumentPatch::new().details(DetailsPatch::new().socials(socials))).await
        }
        Commands::Add { section, entry } => {
            // Anything that is not JSON is taken as a plain string entry.
            let entry: Value =
                serde_json::from_str(&entry).unwrap_or_else(|_| Value::String(entry));
            let mut entries = cache
                .current()
                .sequence(section)
                .cloned()
                .unwrap_or_default();
            entries.push(entry);
            write(cache, DocumentPatch::new().sequence(section, entries)).await
        }
        Commands::Skill { category, skill } => {
            let mut skills = cache.current().skills.clone();
            let list = skills.entry(category).or_default();
            if !list.iter().any(|s| s.as_str() == Some(skill.as_str())) {
                list.push(Value::String(skill));
            }
            write(cache, DocumentPatch::new().skills(skills)).await
        }
        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let raw: Value = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let reconciled = reconcile_verbose(Some(&raw), &folio_core::defaults());
            for issue in &reconciled.issues {
                println!("  replaced with default: {}", issue);
            }
            write(cache, DocumentPatch::from_document(&reconciled.document)).await
        }
        Commands::Icons | Commands::Stress { .. } => Ok(()),
    }
}

/// Apply `patch` and wait for the store to confirm it.
async fn write(cache: &DocumentCache<JsonFileStore>, patch: DocumentPatch) -> anyhow::Result<()> {
    let mut events = cache.events();
    let write_id = cache.update(patch)?;
    debug!(%write_id, "waiting for write confirmation");

    let outcome = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::WriteConfirmed { write_id: id }) if id == write_id => {
                    return Ok(());
                }
                Ok(SyncEvent::WriteFailed { write_id: id, error }) if id == write_id => {
                    return Err(anyhow::Error::new(error).context("write failed"));
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => bail!("cache closed before the write finished"),
            }
        }
    })
    .await;

    match outcome {
        Ok(result) => result,
        Err(_) => bail!("timed out waiting for the store"),
    }
}

fn print_summary(document: &PortfolioDocument) {
    let details = &document.details;
    let or_unset = |s: &str| if s.is_empty() { "(unset)".to_string() } else { s.to_string() };

    println!("{}", or_unset(&details.name));
    println!("  {}", or_unset(&details.title));
    if !details.contact.email.is_empty() || !details.contact.location.is_empty() {
        println!("  {} · {}", details.contact.email, details.contact.location);
    }
    for link in &details.socials {
        let url = if link.url.is_empty() { "-" } else { link.url.as_str() };
        println!("  {}  {}", link.icon.render(&link.name), url);
    }

    println!();
    for section in Section::ALL {
        if let Some(entries) = document.sequence(section) {
            println!("{:<14}{:>4} entries", section.key(), entries.len());
        }
    }
    for (category, skills) in &document.skills {
        let names: Vec<_> = skills
            .iter()
            .map(|s| s.as_str().map(str::to_string).unwrap_or_else(|| s.to_string()))
            .collect();
        println!("skills.{:<7}{}", category, names.join(", "));
    }
}
