use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use artfetch::downloader::ConsoleProgressReporter;
use artfetch::{
    DownloadConfig, FetchJob, Fetcher, ImageQuality, IntoProgressCallback, NamingPolicy,
    ProgressReporter, ProjectClient, ProjectData, ProjectError, RenameDecision, RenamePrompt,
    RunSummary, SkipPrompt, extract_hash_id, parse_project, project_json_url,
};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const RATE_LIMIT_NOTICE: &str = "Rate limit exceeded. Best take a break and try again later.";

#[derive(Parser)]
#[command(name = "artfetch")]
#[command(about = "Download the images of an ArtStation project", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the image assets of a project
    List(SourceArgs),
    /// Print the metadata URL for a project
    JsonUrl {
        /// Project hash id or project page URL
        project: String,
    },
    /// Download the image assets of a project
    Download(DownloadArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Project hash id or project page URL
    project: Option<String>,

    /// Read project JSON from a file instead (`-` for stdin)
    #[arg(long, value_name = "FILE")]
    json: Option<String>,
}

#[derive(Args)]
struct DownloadArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output directory (must exist)
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    /// Image quality: small, medium, large, 4k or 8k
    #[arg(short, long, default_value = "8k")]
    quality: ImageQuality,

    /// 1-based positions to leave out, comma separated
    #[arg(long, value_delimiter = ',', value_name = "N,...")]
    exclude: Vec<usize>,

    /// Name files <PREFIX>1, <PREFIX>2, ... instead of using the URL name
    #[arg(long, value_name = "NAME")]
    prefix: Option<String>,

    /// Ask for a new name when a file exists instead of skipping it
    #[arg(long)]
    overwrite_prompt: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DownloadConfig::from_env().context("Invalid configuration")?;
    debug!("Configuration: {:?}", config);

    match cli.command {
        Command::JsonUrl { project } => {
            let hash_id = hash_id_from(&project)?;
            println!("{}", project_json_url(&config.project_base_url, &hash_id)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::List(source) => {
            let project = load_project(&config, &source).await?;
            list(&project);
            Ok(ExitCode::SUCCESS)
        }
        Command::Download(args) => download(config, args).await,
    }
}

fn hash_id_from(input: &str) -> Result<String> {
    extract_hash_id(input).with_context(|| format!("No project id found in '{}'", input))
}

async fn load_project(config: &DownloadConfig, source: &SourceArgs) -> Result<ProjectData> {
    let loaded = match (&source.project, &source.json) {
        (_, Some(path)) => {
            let text = read_json_source(path).await?;
            parse_project(&text)
        }
        (Some(project), None) => {
            let hash_id = hash_id_from(project)?;
            ProjectClient::new(config)?.fetch_project(&hash_id).await
        }
        (None, None) => bail!("Either a project or --json is required"),
    };

    match loaded {
        Ok(project) => Ok(project),
        Err(e @ ProjectError::InvalidJson(_)) => Err(e).context("Project data is not valid JSON"),
        Err(e) if e.is_malformed() => {
            warn!("Malformed project data: {}", e);
            Err(e).context("Project data is malformed")
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_json_source(path: &str) -> Result<String> {
    if path == "-" {
        return read_all(tokio::io::stdin())
            .await
            .context("Failed to read project JSON from stdin");
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path))
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text).await?;
    Ok(text)
}

fn list(project: &ProjectData) {
    if project.is_empty() {
        println!("No images found in project {}", project.hash_id);
        return;
    }

    println!("Project {} - {} images", project.hash_id, project.len());
    for (index, url) in project.image_urls().iter().enumerate() {
        println!("{:>3}. {}", index + 1, url);
    }
}

/// Turn 1-based positions into the 0-based indices of the project
fn excluded_indices(positions: &[usize], len: usize) -> Vec<usize> {
    positions
        .iter()
        .filter_map(|&position| {
            if position == 0 || position > len {
                warn!("Ignoring --exclude {}: project has {} images", position, len);
                None
            } else {
                Some(position - 1)
            }
        })
        .collect()
}

async fn download(config: DownloadConfig, args: DownloadArgs) -> Result<ExitCode> {
    let project = load_project(&config, &args.source).await?;
    if project.is_empty() {
        println!("No images found in project {}", project.hash_id);
        return Ok(ExitCode::SUCCESS);
    }

    let urls = project.selected_urls(&excluded_indices(&args.exclude, project.len()));
    if urls.is_empty() {
        println!("Every image is excluded, nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let job = FetchJob::new(urls, &args.out)
        .with_quality(args.quality)
        .with_skip_existing(!args.overwrite_prompt)
        .with_naming(NamingPolicy::from_prefix(args.prefix));

    let interactive = std::io::stdout().is_terminal();
    let bar = if interactive {
        progress_bar(job.urls.len())
    } else {
        ProgressBar::hidden()
    };

    let mut prompt: Box<dyn RenamePrompt> = if args.overwrite_prompt && std::io::stdin().is_terminal() {
        let bar = bar.clone();
        Box::new(move |base: &str| bar.suspend(|| ask_rename(base)))
    } else {
        Box::new(SkipPrompt)
    };

    let progress_callback = if interactive {
        BarReporter { bar: bar.clone() }.into_callback()
    } else {
        ConsoleProgressReporter::new(false).into_callback()
    };

    let fetcher = Fetcher::new(config)?;
    let summary = fetcher
        .fetch_all(job, prompt.as_mut(), Some(progress_callback))
        .await
        .with_context(|| format!("Cannot download into {}", args.out.display()))?;

    Ok(if summary.rate_limited {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn ask_rename(base_name: &str) -> RenameDecision {
    let choice = Select::new()
        .with_prompt(format!("\"{}\" already exists", base_name))
        .items(&["Rename", "Skip", "Skip all"])
        .default(0)
        .interact();

    match choice {
        Ok(0) => Input::<String>::new()
            .with_prompt("New file name")
            .with_initial_text(base_name)
            .allow_empty(true)
            .interact_text()
            .ok()
            .into(),
        Ok(2) => RenameDecision::SkipAll,
        Ok(_) => RenameDecision::Skip,
        Err(e) => {
            warn!("Prompt failed, skipping: {}", e);
            RenameDecision::Skip
        }
    }
}

/// Progress bar with log lines printed above it
struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn on_run_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_log(&self, line: &str) {
        self.bar.println(line);
    }

    fn on_progress(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_rate_limited(&self, _url: &str) {
        self.bar.suspend(|| eprintln!("{}", RATE_LIMIT_NOTICE));
    }

    fn on_run_finished(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        println!("{}", summary.summary_line());
    }
}
