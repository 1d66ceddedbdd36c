use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use contextmap::aggregate::{BoundedContextEvent, DomainEvent, bounded_context, domain};
use contextmap::read_model::ReadModels;
use contextmap::search::{Lookup, SearchPhrase, SearchResult, combine_results_with_and};
use contextmap::{EventKind, EventStore, StoreConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "catalog-tool")]
#[command(about = "Inspect and query a contextmap event journal")]
struct Cli {
    /// Journal directory; falls back to CONTEXTMAP_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Event counts per stream kind
    Stats,
    /// Every event of one aggregate stream
    Stream { id: Uuid },
    FindDomains {
        /// Repeat for synonyms; `*` marks a wildcard
        #[arg(long)]
        name: Vec<String>,
        #[arg(long)]
        key: Vec<String>,
    },
    FindBoundedContexts {
        #[arg(long)]
        name: Vec<String>,
        #[arg(long)]
        key: Vec<String>,
        #[arg(long)]
        domain: Option<Uuid>,
    },
    FindNamespaces {
        #[arg(long)]
        name: Vec<String>,
        #[arg(long)]
        label_name: Option<String>,
        #[arg(long)]
        label_value: Option<String>,
        #[arg(long)]
        template: Vec<String>,
    },
    /// Write the whole log as a catalog snapshot
    Export { path: PathBuf },
    /// Seed an empty journal from a catalog snapshot
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = store_config(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Import { path } => {
            let store = EventStore::import_snapshot(&path, config)
                .with_context(|| format!("Failed to import snapshot '{}'", path.display()))?;
            println!("Journal holds {} events", store.len()?);
            Ok(())
        }
        command => {
            let store = EventStore::open(config).context("Failed to open event store")?;
            run(&store, command)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn store_config(data_dir: Option<&Path>) -> Result<StoreConfig> {
    let config = match data_dir {
        Some(dir) => StoreConfig::file_backed(dir),
        None => StoreConfig::from_env().context("Invalid store configuration")?,
    };
    if config.journal_path().is_none() {
        return Err(anyhow!(
            "No journal configured: pass --data-dir or set CONTEXTMAP_DATA_DIR"
        ));
    }
    Ok(config)
}

fn run(store: &EventStore, command: Command) -> Result<()> {
    match command {
        Command::Stats => stats(store),
        Command::Stream { id } => stream(store, id),
        Command::FindDomains { name, key } => find_domains(store, &name, &key),
        Command::FindBoundedContexts { name, key, domain } => {
            find_bounded_contexts(store, &name, &key, domain)
        }
        Command::FindNamespaces {
            name,
            label_name,
            label_value,
            template,
        } => find_namespaces(
            store,
            &name,
            label_name.as_deref(),
            label_value.as_deref(),
            &template,
        ),
        Command::Export { path } => {
            let count = store
                .export_snapshot(&path)
                .with_context(|| format!("Failed to export snapshot to '{}'", path.display()))?;
            println!("Exported {} events to {}", count, path.display());
            Ok(())
        }
        Command::Import { .. } => Err(anyhow!("import is handled before the store is opened")),
    }
}

fn stats(store: &EventStore) -> Result<()> {
    println!("{:<20} {:>8} {:>8}", "stream", "streams", "events");
    let all = store.all()?;
    for kind in EventKind::ALL {
        let events = all
            .iter()
            .filter(|envelope| envelope.event.kind() == kind)
            .count();
        println!(
            "{:<20} {:>8} {:>8}",
            kind.as_str(),
            store.sources(kind)?.len(),
            events
        );
    }
    println!("{:<20} {:>8} {:>8}", "total", "", all.len());
    Ok(())
}

fn stream(store: &EventStore, id: Uuid) -> Result<()> {
    let envelopes = store.stream(id)?;
    if envelopes.is_empty() {
        println!("No events for {}", id);
        return Ok(());
    }
    for envelope in envelopes {
        let payload = envelope.event.to_payload()?;
        println!(
            "{} {:<18} {:<28} {}",
            envelope.recorded_at().to_rfc3339(),
            envelope.event.kind().as_str(),
            envelope.event.event_type(),
            serde_json::to_string(&payload)?
        );
    }
    Ok(())
}

fn phrases(raw: &[String]) -> Vec<SearchPhrase> {
    SearchPhrase::from_inputs(raw.iter().map(String::as_str))
}

/// Synonyms on one field are OR-ed; an empty list leaves the filter unused.
fn field<L, T>(index: &L, raw: &[String]) -> SearchResult<T>
where
    L: Lookup<T>,
    T: Ord + Clone,
{
    index.by_any(&phrases(raw))
}

fn print_ids<T: Ord + std::fmt::Display>(
    result: &SearchResult<T>,
    describe: impl Fn(&T) -> String,
) {
    match result {
        SearchResult::Results(ids) => {
            for id in ids {
                println!("{}  {}", id, describe(id));
            }
        }
        SearchResult::NoResult => println!("No matches"),
        SearchResult::NotUsed => println!("No filter given"),
    }
}

fn find_domains(store: &EventStore, name: &[String], key: &[String]) -> Result<()> {
    let models = ReadModels::rebuild(store)?;
    let domains = domain::all_domains().project(&store.get::<DomainEvent>()?);

    let result = combine_results_with_and([
        field(&models.domains.by_name, name),
        field(&models.domains.by_key, key),
    ]);
    print_ids(&result, |id| match domains.get(id) {
        Some(domain) => format!(
            "{}{}",
            domain.name,
            domain
                .key
                .as_ref()
                .map(|key| format!(" [{}]", key))
                .unwrap_or_default()
        ),
        None => String::new(),
    });
    Ok(())
}

fn find_bounded_contexts(
    store: &EventStore,
    name: &[String],
    key: &[String],
    domain_id: Option<Uuid>,
) -> Result<()> {
    let models = ReadModels::rebuild(store)?;
    let contexts =
        bounded_context::all_bounded_contexts().project(&store.get::<BoundedContextEvent>()?);

    let index = &models.bounded_contexts;
    let in_domain = match domain_id {
        Some(domain_id) => index.in_domain(&domain_id),
        None => SearchResult::NotUsed,
    };
    let result = combine_results_with_and([
        field(&index.by_name, name),
        field(&index.by_key, key),
        in_domain,
    ]);
    print_ids(&result, |id| {
        contexts
            .get(id)
            .map(|context| format!("{} (domain {})", context.name, context.domain_id))
            .unwrap_or_default()
    });
    Ok(())
}

fn find_namespaces(
    store: &EventStore,
    name: &[String],
    label_name: Option<&str>,
    label_value: Option<&str>,
    template: &[String],
) -> Result<()> {
    let models = ReadModels::rebuild(store)?;

    let label_name = label_name.and_then(SearchPhrase::from_input);
    let label_value = label_value.and_then(SearchPhrase::from_input);
    let result = combine_results_with_and([
        field(&models.namespaces, name),
        models
            .labels
            .find(label_name.as_ref(), label_value.as_ref()),
        field(&models.templates, template),
    ]);
    print_ids(&result, |id| {
        let name = models.namespaces.by_name.name_of(id).unwrap_or_default();
        match models.namespaces.owner_of(id) {
            Some(owner) => format!("{} (bounded context {})", name, owner),
            None => name.to_string(),
        }
    });
    Ok(())
}
