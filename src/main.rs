mod advice;
mod export;
mod graph;
mod introspect;
mod store;
mod types;
mod ui;

use advice::OpenAiGenerator;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use export::{ExportFormat, ExportTarget};
use graph::LayoutCache;
use introspect::{Introspector, PostgrestClient};
use serde_json::json;
use store::Store;
use types::SuggestionStatus;

#[derive(Parser)]
#[command(name = "slopcollector")]
#[command(
    about = "Introspect a Supabase/PostgREST schema, collect optimization advice, and draw the ER diagram"
)]
struct Cli {
    /// Local store file
    #[arg(long, default_value = "slopcollector.db")]
    db: String,

    /// Project the command operates on
    #[arg(long, default_value = "default")]
    project: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect the remote schema and store a new snapshot
    Sync {
        /// Supabase project base URL (e.g. https://xyz.supabase.co)
        #[arg(long, env = "SUPABASE_URL")]
        url: String,

        /// Supabase API key
        #[arg(long, env = "SUPABASE_API_KEY")]
        api_key: String,

        /// Direct Postgres connection for catalog metadata (optional)
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },

    /// Generate optimization suggestions from the latest snapshot
    Advise {
        /// OpenAI-compatible API base
        #[arg(long, default_value = "https://api.openai.com/v1")]
        llm_endpoint: String,

        #[arg(long, env = "OPENAI_API_KEY")]
        llm_api_key: String,

        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Hours to wait between advice runs for one project
        #[arg(long, default_value = "6")]
        cooldown_hours: i64,
    },

    /// List or update suggestions
    Suggestions {
        #[command(subcommand)]
        command: SuggestionCommands,
    },

    /// Emit diagram nodes, edges, and layout as JSON
    Graph {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        out: Option<String>,
    },

    /// Export the latest snapshot or the suggestion list
    Export {
        #[arg(long, short, value_enum)]
        target: ExportTargetArg,

        #[arg(long, short, value_enum)]
        format: ExportFormatArg,

        #[arg(long, short)]
        out: String,
    },

    /// Import code-usage observations from CSV
    Usage {
        /// CSV with header table_name,column_name,last_used_at,source_path
        #[arg(long)]
        csv: String,
    },

    /// Browse the ER diagram in the terminal
    View,
}

#[derive(Subcommand)]
enum SuggestionCommands {
    /// List suggestions, optionally filtered by status
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Move a suggestion to a new status
    SetStatus {
        #[arg(long)]
        id: i64,

        #[arg(long, value_enum)]
        status: StatusArg,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum StatusArg {
    Pending,
    Applied,
    Dismissed,
    Archived,
}

impl From<StatusArg> for SuggestionStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => SuggestionStatus::Pending,
            StatusArg::Applied => SuggestionStatus::Applied,
            StatusArg::Dismissed => SuggestionStatus::Dismissed,
            StatusArg::Archived => SuggestionStatus::Archived,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Csv,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(fmt: ExportFormatArg) -> Self {
        match fmt {
            ExportFormatArg::Csv => ExportFormat::Csv,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum ExportTargetArg {
    Snapshot,
    Suggestions,
}

impl From<ExportTargetArg> for ExportTarget {
    fn from(target: ExportTargetArg) -> Self {
        match target {
            ExportTargetArg::Snapshot => ExportTarget::Snapshot,
            ExportTargetArg::Suggestions => ExportTarget::Suggestions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut store =
        Store::open(&cli.db).with_context(|| format!("Failed to open local store: {}", cli.db))?;

    match cli.command {
        Commands::Sync {
            url,
            api_key,
            database_url,
        } => {
            let client = PostgrestClient::new(&url, &api_key)?;
            let introspector = Introspector::new(client, database_url);
            let snapshot = introspector.snapshot().await;
            let id = store.insert_snapshot(&cli.project, &snapshot)?;
            println!(
                "Stored snapshot {} ({} tables, {} columns, {} indexes)",
                id,
                snapshot.tables.len(),
                snapshot.columns.len(),
                snapshot.indexes.len()
            );
        }

        Commands::Advise {
            llm_endpoint,
            llm_api_key,
            model,
            cooldown_hours,
        } => {
            let generator = OpenAiGenerator::new(&llm_endpoint, &llm_api_key, &model)?;
            let inserted =
                advice::run_advice(&mut store, &generator, &cli.project, cooldown_hours).await?;
            println!("Stored {inserted} new suggestions");
        }

        Commands::Suggestions { command } => match command {
            SuggestionCommands::List { status } => {
                let suggestions =
                    store.list_suggestions(&cli.project, status.map(SuggestionStatus::from))?;
                if suggestions.is_empty() {
                    println!("No suggestions");
                }
                for s in suggestions {
                    let column = s.column_name.as_deref().unwrap_or("-");
                    println!(
                        "#{:<4} [{}] {:<9} {}.{}: {}",
                        s.id, s.status, s.severity, s.table_name, column, s.title
                    );
                }
            }
            SuggestionCommands::SetStatus { id, status } => {
                let updated = store.set_suggestion_status(id, status.into())?;
                println!("Suggestion #{} is now {}", updated.id, updated.status);
            }
        },

        Commands::Graph { out } => {
            let row = store.latest_snapshot(&cli.project)?.with_context(|| {
                format!("no snapshot for project '{}'; run sync first", cli.project)
            })?;
            let mut snapshot = row.snapshot;
            snapshot.apply_usage(&store.list_usage(&cli.project)?);
            let suggestions = store.list_suggestions(&cli.project, None)?;

            let mut cache = LayoutCache::new();
            let (nodes, edges, layout) =
                graph::build_diagram(&snapshot, &suggestions, &mut cache, 0);
            let document = serde_json::to_string_pretty(&json!({
                "nodes": nodes,
                "edges": edges,
                "layout": layout,
            }))?;
            match out {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("Failed to write {path}"))?;
                    println!("Wrote diagram to {path}");
                }
                None => println!("{document}"),
            }
        }

        Commands::Export {
            target,
            format,
            out,
        } => {
            export::export(
                &store,
                &cli.project,
                target.into(),
                format.into(),
                std::path::Path::new(&out),
            )?;
            println!("Exported to: {out}");
        }

        Commands::Usage { csv } => {
            let rows = store::read_usage_csv(&csv)?;
            let count = rows.len();
            store.upsert_usage(&cli.project, &rows)?;
            println!("Imported {count} usage rows");
        }

        Commands::View => {
            ui::run_viewer(&store, &cli.project)?;
        }
    }

    Ok(())
}
