//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use algocatalog_core::pipeline::{BuildConfig, BuildResult, ProgressReporter};
use algocatalog_render::HtmlCodeRenderer;
use algocatalog_shared::{
    AppConfig, CatalogError, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// algocatalog — build a multi-language algorithm catalog.
#[derive(Parser)]
#[command(
    name = "algocatalog",
    version,
    about = "Collect algorithm implementations from many repositories into one static catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.algocatalog/algocatalog.toml).
    #[arg(long, global = true, env = "ALGOCATALOG_CONFIG")]
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
    /// Acquire all sources and write the catalog.
    Build(BuildArgs),

    /// Parse a directory listing (file path or URL) and print its entries as JSON.
    ParseListing {
        /// Listing file or http(s) URL.
        source: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `build`; each overrides the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct BuildArgs {
    /// Output directory for the catalog.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Scratch directory sources are acquired into.
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Only build these languages (repeatable or comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Explanation locales to collect (repeatable or comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub locale: Vec<String>,

    /// Keep the workspace after a successful build.
    #[arg(long)]
    pub keep_workspace: bool,

    /// Fail when any source cannot be acquired.
    #[arg(long)]
    pub strict: bool,
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
        0 => "algocatalog=info",
        1 => "algocatalog=debug",
        _ => "algocatalog=trace",
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
        Command::Build(args) => cmd_build(config_path, &args).await,
        Command::ParseListing { source } => cmd_parse_listing(config_path, &source).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config from `--config` or the default location, then validate it.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    config.validate()?;
    Ok(config)
}

/// Apply `build` flags on top of the resolved config.
fn build_config(config: &AppConfig, args: &BuildArgs) -> Result<BuildConfig> {
    let mut build = BuildConfig::from_app(config, env!("CARGO_PKG_VERSION"));

    if let Some(out) = &args.out {
        build.output_dir = out.clone();
    }
    if let Some(workspace) = &args.workspace {
        build.acquire.workspace_dir = workspace.clone();
    }
    if !args.locale.is_empty() {
        build.explanations.locales = args.locale.clone();
    }
    build.keep_workspace |= args.keep_workspace;
    build.fail_on_unavailable |= args.strict;
    build.restrict_languages(&args.only)?;

    if build.output_dir == build.acquire.workspace_dir {
        return Err(eyre!(
            "output and workspace directories must differ ({})",
            build.output_dir.display()
        ));
    }

    Ok(build)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(config_path: Option<&Path>, args: &BuildArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let build = build_config(&config, args)?;

    info!(
        output = %build.output_dir.display(),
        workspace = %build.acquire.workspace_dir.display(),
        repositories = build.repositories.len(),
        locales = build.explanations.locales.len(),
        "building catalog"
    );

    let reporter = CliProgress::new();
    let result = match algocatalog_core::build_catalog(
        &build,
        Arc::new(HtmlCodeRenderer),
        &reporter,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            if let CatalogError::Stage { stage, source } = &e {
                error!(stage, error = %source, "build failed");
            }
            return Err(e.into());
        }
    };

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &BuildResult) {
    println!();
    println!("  Catalog built successfully!");
    println!("  Run:         {}", result.run_id);
    println!("  Algorithms:  {}", result.algorithm_count);
    println!("  Categories:  {}", result.category_count);
    println!("  Languages:   {}", result.language_count);
    let unavailable: Vec<&str> = result.unavailable().map(|s| s.language.as_str()).collect();
    if !unavailable.is_empty() {
        println!("  Unavailable: {}", unavailable.join(", "));
    }
    println!("  Path:        {}", result.output_dir.display());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

async fn cmd_parse_listing(config_path: Option<&Path>, source: &str) -> Result<()> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        let config = resolve_config(config_path)?;
        let client = algocatalog_discovery::build_client(config.defaults.http_timeout_secs)?;
        algocatalog_discovery::fetch_text(&client, source).await?
    } else {
        std::fs::read_to_string(source).map_err(|e| CatalogError::io(source, e))?
    };

    let parsed = algocatalog_discovery::parse_listing(&text);
    info!(
        sections = parsed.sections.len(),
        entries = parsed.entries.len(),
        "listing parsed"
    );
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: one spinner line per pipeline stage.
struct CliProgress {
    spinner: ProgressBar,
    current: Mutex<Option<String>>,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✔"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            current: Mutex::new(None),
        }
    }

    /// Print the running stage as finished, returning its name.
    fn finish_current(&self) -> Option<String> {
        let finished = self.current.lock().ok()?.take()?;
        self.spinner.println(format!("✔ {finished}"));
        Some(finished)
    }

    fn abandon(&self) {
        if let Some(stage) = self.current.lock().ok().and_then(|mut c| c.take()) {
            self.spinner.println(format!("✖ {stage}"));
        }
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, name: &str) {
        self.finish_current();
        if let Ok(mut current) = self.current.lock() {
            *current = Some(name.to_string());
        }
        self.spinner.set_message(name.to_string());
    }

    fn discovered(&self, language: &str, implementations: usize) {
        self.spinner
            .println(format!("  {language}: {implementations} implementations"));
    }

    fn done(&self, _result: &BuildResult) {
        self.finish_current();
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "algocatalog",
            "build",
            "--out",
            "site/data",
            "--only",
            "python,go",
            "--locale",
            "en",
            "--strict",
        ])
        .unwrap();

        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.out, Some(PathBuf::from("site/data")));
        assert_eq!(args.only, vec!["python", "go"]);
        assert_eq!(args.locale, vec!["en"]);
        assert!(args.strict);
        assert!(!args.keep_workspace);
    }

    #[test]
    fn flags_override_config() {
        let args = BuildArgs {
            out: Some("public".into()),
            workspace: Some("scratch".into()),
            only: vec!["rust".into()],
            locale: vec!["fr".into()],
            keep_workspace: true,
            strict: true,
        };
        let build = build_config(&AppConfig::default(), &args).unwrap();

        assert_eq!(build.output_dir, PathBuf::from("public"));
        assert_eq!(build.acquire.workspace_dir, PathBuf::from("scratch"));
        assert_eq!(build.repositories.len(), 1);
        assert_eq!(build.repositories[0].language, "rust");
        assert_eq!(build.explanations.locales, vec!["fr"]);
        assert!(build.keep_workspace);
        assert!(build.fail_on_unavailable);
    }

    #[test]
    fn defaults_without_flags() {
        let config = AppConfig::default();
        let build = build_config(&config, &BuildArgs::default()).unwrap();
        assert_eq!(build.repositories.len(), config.repositories.len());
        assert_eq!(build.output_dir, PathBuf::from("tmp"));
        assert!(!build.fail_on_unavailable);
    }

    #[test]
    fn unknown_only_language_is_an_error() {
        let args = BuildArgs {
            only: vec!["cobol".into()],
            ..BuildArgs::default()
        };
        assert!(build_config(&AppConfig::default(), &args).is_err());
    }

    #[test]
    fn output_and_workspace_must_differ() {
        let args = BuildArgs {
            out: Some("same".into()),
            workspace: Some("same".into()),
            ..BuildArgs::default()
        };
        assert!(build_config(&AppConfig::default(), &args).is_err());
    }
}
