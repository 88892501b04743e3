use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zomato_core::analytics::Panel;
use zomato_core::params::RawParams;
use zomato_core::{QueryId, EMPTY_NOTICE};
use zomato_storage::{connect, ExplorerConfig, Session};

#[derive(Parser)]
#[command(name = "zomato")]
#[command(about = "Explore a restaurant collection from the terminal", long_about = None)]
struct Cli {
    /// Store connection string (overrides MONGO_URI)
    #[arg(long, global = true)]
    uri: Option<String>,
    #[arg(long, global = true)]
    db: Option<String>,
    #[arg(long, global = true)]
    collection: Option<String>,
    /// Read documents from a JSON / NDJSON (optionally .zst) file instead of the store
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Detected field map and resolution diagnostics
    Schema,
    /// Queries available for this collection
    Queries,
    /// Run one catalog query by number or slug
    Run {
        query: String,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long)]
        max_cost: Option<i64>,
        #[arg(long)]
        skip: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
        /// Print the built query instead of running it
        #[arg(long)]
        explain: bool,
    },
    /// Overview panels; all available ones when no panel is named
    Analytics { panel: Option<String> },
}

impl Cli {
    fn config(&self) -> ExplorerConfig {
        let mut cfg = ExplorerConfig::from_env();
        if let Some(uri) = &self.uri {
            cfg.uri = uri.clone();
        }
        if let Some(db) = &self.db {
            cfg.target.database = db.clone();
        }
        if let Some(coll) = &self.collection {
            cfg.target.collection = coll.clone();
        }
        if let Some(path) = &self.data {
            cfg.data_file = Some(path.clone());
        }
        cfg
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = cli.config();
    let mut session = Session::open(connect(&cfg).await?, cfg.result_cache)
        .await?
        .with_cache_capacity(cfg.cache_entries);

    match cli.cmd {
        Cmd::Schema => print(&json!({
            "target": session.target(),
            "documents": session.total(),
            "fields": session.fields(),
            "diagnostics": session.diagnostics(),
        }))?,
        Cmd::Queries => {
            for d in session.menu() {
                println!("{:>2}. {:<20} {}", d.id.number(), d.id.slug(), d.label(session.fields()));
            }
            for (d, missing) in session.unavailable() {
                let missing: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
                println!(
                    "{:>2}. {:<20} unavailable (missing {})",
                    d.id.number(),
                    d.id.slug(),
                    missing.join(", ")
                );
            }
        }
        Cmd::Run {
            query,
            min_rating,
            max_cost,
            skip,
            limit,
            explain,
        } => {
            let id: QueryId = query.parse()?;
            let raw = RawParams {
                min_rating,
                max_cost,
                skip,
                limit,
            };
            session.update_params(id, &raw)?;
            if explain {
                print(&session.explain(id)?)?;
            } else {
                let out = session.run(id).await?;
                if out.is_empty() {
                    eprintln!("{EMPTY_NOTICE}");
                }
                print(&out)?;
            }
        }
        Cmd::Analytics { panel: Some(name) } => {
            let panel: Panel = name.parse()?;
            print(&session.panel(panel).await?)?;
        }
        Cmd::Analytics { panel: None } => {
            let mut out = serde_json::Map::new();
            for p in session.panels() {
                out.insert(p.id.slug().to_string(), serde_json::to_value(session.panel(p.id).await?)?);
            }
            print(&out)?;
        }
    }
    Ok(())
}
