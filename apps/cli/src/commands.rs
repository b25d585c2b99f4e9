//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use coursepilot_core::{
    DocumentOutcome, IngestProgress, IngestReport, PromptTemplate, SilentProgress, prepare,
    recommend, search_courses,
};
use coursepilot_generation::GeminiClient;
use coursepilot_shared::{
    AppConfig, CoursePilotError, DISPLAY_TEXT_KEY, Profile, init_config, load_config,
    load_config_from, validate_config,
};
use coursepilot_store::{
    AnyEmbedder, ChromaStore, CollectionHandle, HashingEmbedder, MemoryStore, VectorStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CoursePilot: graduate course recommendations from your catalog.
#[derive(Parser)]
#[command(
    name = "coursepilot",
    version,
    about = "Ingest a course catalog and recommend graduate courses for a student profile.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.coursepilot/coursepilot.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vector store host, overriding the config file.
    #[arg(long, env = "CHROMA_HOST", global = true)]
    pub chroma_host: Option<String>,

    /// Vector store port, overriding the config file.
    #[arg(long, env = "CHROMA_PORT", global = true)]
    pub chroma_port: Option<u16>,

    /// Collection name, overriding the config file.
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load a course catalog CSV into the vector store.
    Ingest {
        /// Catalog CSV (UTF-8 or Windows-1252).
        #[arg(long)]
        csv: PathBuf,
    },

    /// Recommend courses for a student profile.
    Recommend {
        /// Profile JSON file, or `-` for stdin.
        #[arg(long)]
        profile: String,

        /// Number of candidate courses retrieved.
        #[arg(long)]
        top_k: Option<usize>,

        /// Prompt template file, overriding the config file.
        #[arg(long)]
        template: Option<PathBuf>,

        /// Print the composed prompt instead of calling the model.
        #[arg(long)]
        dry_run: bool,

        /// Emit the search phrase, candidates, and answer as JSON.
        #[arg(long)]
        json: bool,

        /// Index this catalog CSV in memory instead of using the vector store.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show the courses nearest to a free-text query.
    Search {
        /// Query text; cleaned the same way as indexed documents.
        query: String,

        /// Number of results.
        #[arg(long)]
        top_k: Option<usize>,

        /// Index this catalog CSV in memory instead of using the vector store.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so command output
/// can be piped.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursepilot=info",
        1 => "coursepilot=debug",
        _ => "coursepilot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&cli).await,
        };
    }

    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Ingest { csv } => cmd_ingest(&config, &csv).await,
        Command::Recommend {
            profile,
            top_k,
            template,
            dry_run,
            json,
            catalog,
        } => {
            let opts = RecommendOptions {
                top_k: top_k.unwrap_or(config.retrieval.top_k),
                template,
                dry_run,
                json,
            };
            cmd_recommend(&config, &profile, catalog.as_deref(), &opts).await
        }
        Command::Search {
            query,
            top_k,
            catalog,
        } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            cmd_search(&config, &query, catalog.as_deref(), top_k).await
        }
        Command::Config { .. } => Ok(()),
    }
}

/// Attach the user-facing error class to a library error.
fn classified(err: CoursePilotError) -> Report {
    let class = err.class();
    Report::new(err).wrap_err(format!("{class} error"))
}

/// Config file, then CLI flags and their env fallbacks.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path).map_err(classified)?,
        None => load_config().map_err(classified)?,
    };
    if let Some(host) = &cli.chroma_host {
        config.vector_store.host = host.clone();
    }
    if let Some(port) = cli.chroma_port {
        config.vector_store.port = port;
    }
    if let Some(collection) = &cli.collection {
        config.vector_store.collection = collection.clone();
    }
    validate_config(&config).map_err(classified)?;
    Ok(config)
}

/// Build the store client and confirm the server answers.
async fn connect(config: &AppConfig) -> Result<ChromaStore<AnyEmbedder>> {
    let timeout = Duration::from_secs(config.vector_store.timeout_secs);
    let embedder = AnyEmbedder::from_config(&config.embedding, timeout).map_err(classified)?;
    let endpoint = config.vector_store.endpoint();
    let store = ChromaStore::new(&endpoint, timeout, embedder).map_err(classified)?;
    store
        .heartbeat()
        .await
        .map_err(classified)
        .wrap_err_with(|| format!("is Chroma running at {endpoint}?"))?;
    Ok(store)
}

async fn open_collection<S: VectorStore>(store: &S, config: &AppConfig) -> Result<CollectionHandle> {
    store
        .open_collection(&config.vector_store.collection)
        .await
        .map_err(classified)
}

/// Index a catalog in process with the hashing embedder. No server or key needed.
async fn offline_store(config: &AppConfig, csv: &Path) -> Result<MemoryStore<HashingEmbedder>> {
    let records = coursepilot_corpus::read_records(csv).map_err(classified)?;
    let store = MemoryStore::new(HashingEmbedder::new(config.embedding.dimensions));
    let report = coursepilot_core::ingest(
        &store,
        &config.vector_store.collection,
        &records,
        &SilentProgress,
    )
    .await
    .map_err(classified)?;
    info!(documents = report.succeeded, "indexed catalog in memory");
    Ok(store)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(config: &AppConfig, csv: &Path) -> Result<()> {
    let records = coursepilot_corpus::read_records(csv).map_err(classified)?;
    info!(
        path = %csv.display(),
        records = records.len(),
        collection = %config.vector_store.collection,
        "ingesting catalog"
    );

    let store = connect(config).await?;
    let reporter = CliProgress::new();
    let report = coursepilot_core::ingest(
        &store,
        &config.vector_store.collection,
        &records,
        &reporter,
    )
    .await
    .map_err(classified)?;

    println!();
    println!("  Ingestion complete.");
    println!("  Collection: {}", config.vector_store.collection);
    println!("  Attempted:  {}", report.attempted);
    println!("  Added:      {}", report.succeeded);
    println!("  Duplicates: {}", report.skipped_duplicates);
    println!("  Failed:     {}", report.failed);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();

    if report.failed > 0 && report.succeeded == 0 && report.skipped_duplicates == 0 {
        return Err(eyre!("no documents could be stored; see the log for causes"));
    }
    Ok(())
}

struct RecommendOptions {
    top_k: usize,
    template: Option<PathBuf>,
    dry_run: bool,
    json: bool,
}

async fn cmd_recommend(
    config: &AppConfig,
    profile_arg: &str,
    catalog: Option<&Path>,
    opts: &RecommendOptions,
) -> Result<()> {
    let profile = read_profile(profile_arg)?;
    let template = match &opts.template {
        Some(path) => PromptTemplate::load(path),
        None => PromptTemplate::from_config(&config.prompt),
    }
    .map_err(classified)?;

    // A missing API key fails before any store traffic.
    let generator = if opts.dry_run {
        None
    } else {
        Some(GeminiClient::from_config(&config.generation).map_err(classified)?)
    };

    match catalog {
        Some(csv) => {
            let store = offline_store(config, csv).await?;
            let handle = open_collection(&store, config).await?;
            answer(&store, &handle, generator.as_ref(), &template, &profile, opts).await
        }
        None => {
            let store = connect(config).await?;
            let handle = open_collection(&store, config).await?;
            answer(&store, &handle, generator.as_ref(), &template, &profile, opts).await
        }
    }
}

/// Print the composed prompt (no generator) or the model's answer.
async fn answer<S: VectorStore>(
    store: &S,
    handle: &CollectionHandle,
    generator: Option<&GeminiClient>,
    template: &PromptTemplate,
    profile: &Profile,
    opts: &RecommendOptions,
) -> Result<()> {
    let Some(generator) = generator else {
        let prepared = prepare(store, handle, template, profile, opts.top_k)
            .await
            .map_err(classified)?;
        if opts.json {
            let out = serde_json::json!({
                "search_phrase": prepared.search_phrase,
                "candidates": prepared.candidates,
                "prompt": prepared.prompt,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("{}", prepared.prompt);
        }
        return Ok(());
    };

    let rec = recommend(store, handle, generator, template, profile, opts.top_k)
        .await
        .map_err(classified)?;
    info!(
        candidates = rec.candidates.len(),
        phrase = %rec.search_phrase,
        "recommendation ready"
    );

    if opts.json {
        let out = serde_json::json!({
            "search_phrase": rec.search_phrase,
            "candidates": rec.candidates,
            "response": rec.response,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", rec.response);
    }
    Ok(())
}

/// Read a profile from a JSON file, or stdin for `-`.
fn read_profile(arg: &str) -> Result<Profile> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read profile from stdin")?;
        buf
    } else {
        std::fs::read_to_string(arg)
            .map_err(|e| classified(CoursePilotError::io(arg, e)))?
    };
    Profile::from_json_str(&text).map_err(classified)
}

async fn cmd_search(
    config: &AppConfig,
    query: &str,
    catalog: Option<&Path>,
    top_k: usize,
) -> Result<()> {
    match catalog {
        Some(csv) => {
            let store = offline_store(config, csv).await?;
            let handle = open_collection(&store, config).await?;
            print_matches(&store, &handle, query, top_k).await
        }
        None => {
            let store = connect(config).await?;
            let handle = open_collection(&store, config).await?;
            print_matches(&store, &handle, query, top_k).await
        }
    }
}

async fn print_matches<S: VectorStore>(
    store: &S,
    handle: &CollectionHandle,
    query: &str,
    top_k: usize,
) -> Result<()> {
    let matches = search_courses(store, handle, query, top_k)
        .await
        .map_err(classified)?;

    if matches.is_empty() {
        println!("No courses found.");
        return Ok(());
    }
    for (rank, hit) in matches.iter().enumerate() {
        println!("#{} (similarity {:.3})", rank + 1, hit.similarity());
        match hit.metadata.get(DISPLAY_TEXT_KEY) {
            Some(text) => println!("{text}"),
            None => println!("{}", hit.id),
        }
        println!();
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(classified)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Ingestion progress on an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl IngestProgress for CliProgress {
    fn started(&self, total: usize) {
        self.spinner.set_message(format!("Ingesting {total} courses"));
    }

    fn document(&self, current: usize, total: usize, outcome: DocumentOutcome) {
        let label = match outcome {
            DocumentOutcome::Added => "added",
            DocumentOutcome::Duplicate => "duplicate",
            DocumentOutcome::Failed => "failed",
        };
        self.spinner
            .set_message(format!("Ingesting [{current}/{total}] {label}"));
    }

    fn done(&self, _report: &IngestReport) {
        self.spinner.finish_and_clear();
    }
}
