//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};

use abstractkb_core::{
    KnowledgeBase, PipelineConfig, ProgressReporter, RunSummary, build_report, run_pipeline,
    write_full_dump, write_report,
};
use abstractkb_shared::{
    AbstractKbError, AppConfig, init_config, load_config, load_config_from,
};
use abstractkb_storage::{ArtifactStore, StoreLayout};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// abstractkb: index newly listed arXiv abstracts by keyword.
#[derive(Parser)]
#[command(
    name = "abstractkb",
    version,
    about = "Fetch new abstracts from a listing page and build a keyword → sentence knowledge base.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.abstractkb/abstractkb.toml.
    #[arg(long, global = true, env = "ABSTRACTKB_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Run the full pipeline and print a report over the interest terms.
    Run(RunArgs),

    /// Look up keywords in the saved knowledge base.
    Query {
        /// Keywords to look up.
        #[arg(required_unless_present = "all")]
        keywords: Vec<String>,

        /// Print every keyword instead.
        #[arg(long, conflicts_with = "keywords")]
        all: bool,

        /// Artifact directory (defaults to storage.output_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the batch report over a term list.
    Report {
        /// Comma-separated terms (defaults to report.interest_terms).
        #[arg(long, value_delimiter = ',')]
        terms: Option<Vec<String>>,

        /// Artifact directory (defaults to storage.output_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for a single `run`.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Listing page to scan.
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// Artifact directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Documents fetched at once.
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Keywords kept per document.
    #[arg(long)]
    pub max_keywords: Option<usize>,

    /// Skip the interest-term report after the run.
    #[arg(long)]
    pub no_report: bool,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "abstractkb=info",
        1 => "abstractkb=debug",
        _ => "abstractkb=trace",
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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run(args) => cmd_run(config_path, args).await,
        Command::Query { keywords, all, out } => {
            cmd_query(config_path, &keywords, all, out.as_deref())
        }
        Command::Report { terms, out } => cmd_report(config_path, terms, out.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load config from `--config` or the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Open the artifact store and load the knowledge base saved by `run`.
fn open_knowledge_base(config: &AppConfig, out: Option<&Path>) -> Result<KnowledgeBase> {
    let mut layout = StoreLayout::from(config);
    if let Some(dir) = out {
        layout.root = dir.to_path_buf();
    }
    let root = layout.root.clone();
    let store = ArtifactStore::open(layout)?;

    match KnowledgeBase::load(&store) {
        Ok(kb) => Ok(kb),
        Err(AbstractKbError::MissingArtifact { .. }) => Err(eyre!(
            "no knowledge base in '{}'; run `abstractkb run` first",
            root.display()
        )),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;

    if let Some(url) = args.catalog_url {
        config.discovery.catalog_url = url;
    }
    if let Some(out) = args.out {
        config.storage.output_dir = out.to_string_lossy().into_owned();
    }
    if let Some(n) = args.concurrency {
        config.fetch.concurrency = n;
    }
    if let Some(n) = args.max_keywords {
        config.keywords.max_keywords = n;
    }
    config.validate()?;

    info!(
        catalog_url = %config.discovery.catalog_url,
        output_dir = %config.storage.output_dir,
        "starting run"
    );

    let reporter = CliProgress::new()?;
    let outcome = run_pipeline(&PipelineConfig::from(&config), &reporter).await?;
    let summary = &outcome.summary;

    println!();
    println!("  Run complete");
    println!("  ID:         {}", summary.run_id);
    println!("  Discovered: {}", summary.discovered);
    println!("  Processed:  {}", summary.processed);
    println!("  Skipped:    {}", summary.skipped.len());
    for skipped in &summary.skipped {
        println!("    [{}] {}: {}", skipped.stage, skipped.url, skipped.reason);
    }
    println!("  Keywords:   {}", summary.keyword_count);
    println!("  Output:     {}", config.storage.output_dir);
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    if !args.no_report {
        let entries = build_report(&outcome.knowledge_base, config.report.interest_terms.as_slice());
        let mut stdout = std::io::stdout().lock();
        write_report(&entries, &mut stdout)?;
        stdout.flush()?;
    }

    Ok(())
}

fn cmd_query(
    config_path: Option<&Path>,
    keywords: &[String],
    all: bool,
    out: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let kb = open_knowledge_base(&config, out)?;

    let mut stdout = std::io::stdout().lock();
    if all {
        write_full_dump(&kb, &mut stdout)?;
    } else {
        write_report(&build_report(&kb, keywords), &mut stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_report(
    config_path: Option<&Path>,
    terms: Option<Vec<String>>,
    out: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let kb = open_knowledge_base(&config, out)?;

    let terms = terms.unwrap_or_else(|| config.report.interest_terms.clone());
    if terms.is_empty() {
        return Err(eyre!("no terms to report on; pass --terms or set report.interest_terms"));
    }

    let mut stdout = std::io::stdout().lock();
    write_report(&build_report(&kb, terms.as_slice()), &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {url}"));
    }

    fn document_indexed(&self, url: &str, keywords: usize, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Indexing [{current}/{total}] {url} ({keywords} keywords)"
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
