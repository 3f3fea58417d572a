//! Dialectica CLI: runs the research pipeline from the terminal.
//!
//! Usage:
//!   dialectica search "<question>" [filters] [--exclude DOI]... [--follow-up Q]... [--layout]
//!   dialectica config

use clap::{Parser, Subcommand};
use dialectica::config::{load_config, DialecticaConfig};
use dialectica::layout::GraphView;
use dialectica::model::{Doi, SourceKind};
use dialectica::{PipelineController, PipelineError};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dialectica",
    version,
    about = "Map points of contention in the academic literature"
)]
struct Cli {
    /// Path to a TOML config file, layered over the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full analysis and print the result as JSON
    Search {
        /// Research question
        question: String,
        /// First publication year
        #[arg(long)]
        from: Option<i32>,
        /// Last publication year
        #[arg(long)]
        to: Option<i32>,
        /// Only open-access papers
        #[arg(long)]
        open_access: bool,
        /// Minimum citation count
        #[arg(long)]
        min_citations: Option<u32>,
        /// Skip OpenAlex
        #[arg(long)]
        no_openalex: bool,
        /// Skip Semantic Scholar
        #[arg(long)]
        no_semantic_scholar: bool,
        /// Deselect a paper before synthesis (repeatable)
        #[arg(long = "exclude", value_name = "DOI")]
        exclude: Vec<String>,
        /// Ask a follow-up question after synthesis (repeatable)
        #[arg(long = "follow-up", value_name = "QUESTION")]
        follow_up: Vec<String>,
        /// Also print the graph layout
        #[arg(long)]
        layout: bool,
    },
    /// Print the effective configuration, API key redacted
    Config,
}

struct SearchArgs {
    question: String,
    from: Option<i32>,
    to: Option<i32>,
    open_access: bool,
    min_citations: Option<u32>,
    no_openalex: bool,
    no_semantic_scholar: bool,
    exclude: Vec<String>,
    follow_up: Vec<String>,
    layout: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dialectica=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_config(config: &DialecticaConfig) -> i32 {
    match serde_json::to_string_pretty(&config.redacted()) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn report(err: &PipelineError) -> i32 {
    eprintln!("Error: {}", err.user_message());
    1
}

async fn run_search(config: &DialecticaConfig, args: SearchArgs) -> i32 {
    let controller = match PipelineController::from_config(config) {
        Ok(c) => c,
        Err(e) => return report(&e),
    };

    let mut filters = config.filters.clone();
    if let Some(from) = args.from {
        filters.start_year = from;
    }
    if let Some(to) = args.to {
        filters.end_year = to;
    }
    if let Some(min) = args.min_citations {
        filters.min_citations = min;
    }
    if args.open_access {
        filters.open_access_only = true;
    }
    if args.no_openalex {
        filters.sources.set(SourceKind::OpenAlex, false);
    }
    if args.no_semantic_scholar {
        filters.sources.set(SourceKind::SemanticScholar, false);
    }

    let corpus = match controller.search(&args.question, filters).await {
        Ok(corpus) => corpus,
        Err(e) => return report(&e),
    };
    eprintln!(
        "Found {} papers ({} pre-selected) for query: {}",
        corpus.len(),
        controller.selection().len(),
        controller.final_query().unwrap_or_default()
    );

    for doi in &args.exclude {
        let doi = Doi::new(doi.as_str());
        if controller.selection().contains(&doi) {
            if let Err(e) = controller.toggle_selection(&doi) {
                return report(&e);
            }
        } else {
            eprintln!("Warning: {} is not selected, ignoring", doi);
        }
    }

    let result = match controller.proceed().await {
        Ok(result) => result,
        Err(e) => return report(&e),
    };

    let mut follow_ups = Vec::new();
    for question in &args.follow_up {
        match controller.ask_follow_up(question).await {
            Ok(answer) => follow_ups.push(answer),
            Err(e) => return report(&e),
        }
    }

    let mut output = json!({
        "result": result,
        "usage": controller.usage(),
    });
    if !follow_ups.is_empty() {
        output["followUps"] = json!(follow_ups);
    }
    if args.layout {
        output["layout"] = json!(GraphView::from_result(&result).layout());
    }

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Config => cmd_config(&config),
        Commands::Search {
            question,
            from,
            to,
            open_access,
            min_citations,
            no_openalex,
            no_semantic_scholar,
            exclude,
            follow_up,
            layout,
        } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("failed to create tokio runtime: {}", e);
                    std::process::exit(1);
                }
            };
            let args = SearchArgs {
                question,
                from,
                to,
                open_access,
                min_citations,
                no_openalex,
                no_semantic_scholar,
                exclude,
                follow_up,
                layout,
            };
            rt.block_on(run_search(&config, args))
        }
    };
    std::process::exit(code);
}
