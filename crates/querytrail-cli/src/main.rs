use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use querytrail_core::{Config, DataBucket, StoreKind};
use querytrail_manifest::LineageResolver;
use querytrail_pipeline::{
    DataCollector, DomainCatalog, KeywordIntentClassifier, KeywordSearch, Pipeline,
    TemplateSynthesizer,
};
use querytrail_trajectory::{JsonlStore, MemoryStore, TrajectoryStore, TrajectoryTracker};

/// QueryTrail - lineage and provenance for LLM SQL-assistant pipelines
#[derive(Parser)]
#[command(name = "querytrail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: querytrail.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to dbt manifest.json (overrides config)
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the direct parents of a table (declared and inferred)
    Parents {
        /// Table name to analyze (alias, name, or unique-id suffix)
        table: String,
    },

    /// Show the shortest dependency path between two tables
    Path {
        /// First table name
        a: String,

        /// Second table name
        b: String,
    },

    /// Dump a table's manifest metadata
    Inspect {
        /// Table name to inspect
        table: String,
    },

    /// Answer a question with the offline three-stage pipeline
    Ask {
        /// The question to answer
        question: String,

        /// Session id to record the run under (random when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("querytrail.toml").exists() {
        Config::from_file(Path::new("querytrail.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    let manifest_path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| config.manifest_path.clone());
    if cli.verbose {
        eprintln!("{} manifest: {}", "Using".cyan(), manifest_path.display());
    }
    let resolver = Arc::new(LineageResolver::from_file(&manifest_path)?);

    match cli.command {
        Commands::Parents { table } => parents_command(&resolver, &table),
        Commands::Path { a, b } => path_command(&resolver, &a, &b),
        Commands::Inspect { table } => inspect_command(&resolver, &table),
        Commands::Ask { question, session } => {
            ask_command(&config, resolver, &question, session, cli.verbose).await
        }
    }
}

fn parents_command(resolver: &LineageResolver, table: &str) -> Result<()> {
    let parents = resolver.direct_parents(table)?;

    println!("{} {}", "Direct parents of".bold(), table.cyan());
    if parents.declared.is_empty() && parents.inferred.is_empty() {
        println!("  {}", "none".dimmed());
        return Ok(());
    }
    for parent in &parents.declared {
        println!("  {} {}", parent, "(declared)".green());
    }
    for parent in &parents.inferred {
        println!("  {} {}", parent, "(inferred)".yellow());
    }
    Ok(())
}

fn path_command(resolver: &LineageResolver, a: &str, b: &str) -> Result<()> {
    let path = resolver.shortest_path(a, b);
    if path.is_empty() {
        println!(
            "{} {} {} {}",
            "No relationship found between".yellow(),
            a.cyan(),
            "and".yellow(),
            b.cyan()
        );
    } else {
        println!("{}", path.join(" -> ").green());
    }
    Ok(())
}

fn inspect_command(resolver: &LineageResolver, table: &str) -> Result<()> {
    let (key, node) = resolver
        .manifest()
        .find_node(table)
        .ok_or_else(|| anyhow::anyhow!("no model named '{table}' in manifest"))?;

    println!("{} {}", "Model:".bold(), key.cyan());
    println!("  name: {}", node.name);
    if let Some(alias) = &node.alias {
        println!("  alias: {alias}");
    }
    if let Some(database) = &node.database {
        println!("  database: {database}");
    }
    if let Some(schema) = &node.schema {
        println!("  schema: {schema}");
    }
    if !node.description.is_empty() {
        println!("  description: {}", node.description);
    }
    if !node.columns.is_empty() {
        println!("  columns:");
        let mut names: Vec<&String> = node.columns.keys().collect();
        names.sort();
        for name in names {
            let column = &node.columns[name];
            if column.description.is_empty() {
                println!("    {name}");
            } else {
                println!("    {name}: {}", column.description);
            }
        }
    }
    if !node.depends_on.nodes.is_empty() {
        println!("  depends on:");
        for dep in &node.depends_on.nodes {
            println!("    {dep}");
        }
    }
    Ok(())
}

async fn ask_command(
    config: &Config,
    resolver: Arc<LineageResolver>,
    question: &str,
    session: Option<String>,
    verbose: bool,
) -> Result<()> {
    let store: Arc<dyn TrajectoryStore> = match config.trajectory.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Jsonl => Arc::new(JsonlStore::new(config.trajectory.dir.clone()).await?),
    };
    let mut tracker = TrajectoryTracker::new(store);

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracker.start_session(&session_id);
    tracker.set_original_query(question);

    let pipeline = build_pipeline(config, resolver);

    let (response, success, error) = match pipeline.process_query(question, &mut tracker).await {
        Ok(outcome) => {
            if verbose {
                print_bucket(&outcome.bucket);
            }
            (outcome.answer, true, None)
        }
        Err(e) => (format!("pipeline failed: {e}"), false, Some(e.to_string())),
    };

    let trajectory = tracker
        .end_session(&response, success, error, true)
        .await?;

    if success {
        println!("{response}");
    } else {
        eprintln!("{}", response.red());
    }
    if let Some(trajectory) = trajectory {
        eprintln!(
            "{}",
            format!(
                "session {} recorded {} step(s)",
                trajectory.session_id, trajectory.total_steps
            )
            .dimmed()
        );
    }
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn build_pipeline(config: &Config, resolver: Arc<LineageResolver>) -> Pipeline {
    let known_tables: Vec<String> = resolver
        .manifest()
        .models()
        .into_values()
        .map(|node| node.resolved_name().to_string())
        .collect();

    let mut catalog = DomainCatalog::default_catalog();
    if !config.domains.is_empty() {
        let mut domains = catalog.domains().to_vec();
        domains.extend(DomainCatalog::from_config(&config.domains).domains().to_vec());
        catalog = DomainCatalog::new(domains);
    }

    // Offline search corpus: one document per model description.
    let docs: Vec<String> = resolver
        .manifest()
        .models()
        .into_values()
        .map(|node| {
            if node.description.is_empty() {
                node.resolved_name().to_string()
            } else {
                format!("{}: {}", node.resolved_name(), node.description)
            }
        })
        .collect();

    let intent = KeywordIntentClassifier::new(catalog, known_tables);
    let collector = DataCollector::new(
        resolver,
        Arc::new(KeywordSearch::new(docs)),
        config.search_k,
    );
    Pipeline::new(Arc::new(intent), collector, Arc::new(TemplateSynthesizer))
}

fn print_bucket(bucket: &DataBucket) {
    eprintln!("{}", "Collected data bucket:".bold());
    match serde_json::to_string_pretty(bucket) {
        Ok(json) => eprintln!("{json}"),
        Err(e) => eprintln!("  (unprintable: {e})"),
    }
}
