mod config;
mod gitlog;
mod observability;
mod render;
mod terminal;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Parser, Subcommand};
use g2log_ai::{AbortHandle, ClientOptions, StreamError, Summarizer, SummaryInput};
use tracing::{debug, info};

use crate::config::{AppConfig, CONFIG_DIR_NAME, mask_secret};
use crate::gitlog::LogQuery;
use crate::terminal::ConsoleSink;

const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "g2log",
    author,
    version,
    about = "Summarize git commits into a work report with an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,

    /// Config file (default: ~/.g2log/config.json)
    #[arg(long, global = true, env = "G2LOG_CONFIG")]
    config_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging; also prints the prompt
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Only commits by this author (default: configured author, else everyone)
    #[arg(short, long)]
    author: Option<String>,

    /// Start of the time range, any expression git understands
    #[arg(short, long, conflicts_with = "days")]
    since: Option<String>,

    /// End of the time range
    #[arg(short, long)]
    until: Option<String>,

    /// Shorthand for --since "<N> days ago"
    #[arg(long)]
    days: Option<u32>,

    /// Only the repository containing the current directory
    #[arg(long)]
    local: bool,

    /// Write the Markdown summary to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write an HTML page next to the Markdown file
    #[arg(long)]
    html: bool,

    /// Print the rendered prompt before sending it
    #[arg(long)]
    show_prompt: bool,

    /// Use this profile for one run
    #[arg(long, env = "G2LOG_PROFILE")]
    profile: Option<String>,

    /// Give up on the AI request after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration with API keys masked
    Show,
    /// Print the config file path
    Path,
    /// Set the API key of the current profile
    SetApiKey { key: String },
    /// Switch the current profile
    SetProvider { name: String },
    /// Set the API base URL of the current profile
    SetUrl { url: String },
    /// Set the model of the current profile
    SetModel { model: String },
    /// Set the sampling temperature of the current profile
    SetTemperature { value: f64 },
    /// Request extended reasoning (Zhipu only)
    EnableThinking,
    DisableThinking,
    SetDefaultAuthor { author: String },
    /// Set the default time range
    SetTimeRange {
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
    },
    /// Add or replace a repository
    AddRepo { alias: String, path: PathBuf },
    RemoveRepo { alias: String },
    ListRepos,
    /// Use the contents of FILE as prompt template
    SetPromptTemplate { file: PathBuf },
    /// Go back to the built-in prompt template
    ResetPromptTemplate,
    /// Search the usual project folders for git repositories and add them
    FindRepos {
        /// Add without asking
        #[arg(long)]
        yes: bool,
    },
    /// Delete the configuration directory
    Uninstall {
        /// Delete without asking
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    config::init_env();
    observability::init_observability(cli.debug);
    let colors = !cli.no_color && console::colors_enabled();

    let outcome = match config::resolve_config_path(cli.config_file.as_deref()) {
        Ok(config_path) => match cli.command {
            // Before loading, so a broken config file can still be removed.
            Some(Command::Config {
                action: ConfigAction::Uninstall { yes },
            }) => uninstall(&config_path, yes, colors),
            Some(Command::Config { action }) => run_config(action, &config_path, colors),
            None => run_summary(cli.run, &config_path, colors, cli.debug).await,
        },
        Err(err) => Err(err),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", terminal::error(&format!("error: {err:#}"), colors));
            ExitCode::FAILURE
        }
    }
}

fn resolve_range(args: &RunArgs, config: &AppConfig) -> (String, String) {
    let since = args
        .days
        .map(|days| format!("{days} days ago"))
        .or_else(|| args.since.clone())
        .unwrap_or_else(|| config.default_since.clone());
    let until = args
        .until
        .clone()
        .unwrap_or_else(|| config.default_until.clone());
    (since, until)
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
}

async fn run_summary(
    args: RunArgs,
    config_path: &Path,
    colors: bool,
    debug_mode: bool,
) -> Result<ExitCode> {
    let config = AppConfig::load(config_path)?;
    let author = args
        .author
        .clone()
        .unwrap_or_else(|| config.default_author.clone());
    let (since, until) = resolve_range(&args, &config);
    let title = render::summary_title(&author);

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (repos, format) = gitlog::resolve_repositories(&config.repositories, args.local, &cwd)?;
    let query = LogQuery {
        author: &author,
        since: &since,
        until: &until,
    };
    let logs = gitlog::collect_logs(&repos, &query, format);
    info!(
        repositories = repos.len(),
        read = logs.repositories_read,
        commits = logs.commit_count,
        "collected git logs"
    );

    if logs.is_empty() {
        let who = if author.trim().is_empty() {
            "anyone".to_string()
        } else {
            author.clone()
        };
        let notice = format!("No commits by {who} between {since} and {until}.");
        println!("{}", terminal::warning(&notice, colors));
        if let Some(output) = &args.output {
            render::write_file(output, &notice)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let profile = config.resolve_profile_from_env(args.profile.as_deref())?;
    println!("{}", terminal::heading(&title, colors));
    println!("{}", terminal::dim(&format!("Range:   {since} to {until}"), colors));
    println!(
        "{}",
        terminal::dim(
            &format!(
                "Commits: {} from {} repositories",
                logs.commit_count, logs.repositories_read
            ),
            colors
        )
    );
    println!(
        "{}",
        terminal::dim(
            &format!(
                "Model:   {} ({} / {}){}",
                profile.model,
                profile.name,
                profile.kind.display_name(),
                if profile.reasoning_enabled() {
                    ", thinking on"
                } else {
                    ""
                }
            ),
            colors
        )
    );
    println!();

    let mut options = ClientOptions::default();
    if let Some(secs) = args.timeout_secs {
        options = options.timeout(Duration::from_secs(secs));
    }
    let (abort, signal) = AbortHandle::pair();
    let summarizer = Summarizer::new(profile, options)?
        .template(config.prompt_template.clone())
        .abort_signal(signal);
    let input = SummaryInput {
        logs: logs.text.clone(),
        author: author.clone(),
        since: since.clone(),
        until: until.clone(),
    };
    if args.show_prompt || debug_mode {
        println!("{}", terminal::dim("--- prompt ---", colors));
        println!("{}", summarizer.render_prompt(&input));
        println!("{}", terminal::dim("--- end of prompt ---", colors));
    }

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received, aborting request");
            abort.abort();
        }
    });
    let mut sink = ConsoleSink::new(colors);
    let result = summarizer.summarize(&input, &mut sink).await;
    ctrl_c.abort();
    println!();

    match result {
        Ok(summary) => {
            let today = chrono::Local::now().date_naive();
            let md_path = match &args.output {
                Some(path) => path.clone(),
                None => render::default_output_path(
                    &config_dir(config_path),
                    &author,
                    &since,
                    &until,
                    today,
                ),
            };
            render::write_file(
                &md_path,
                &render::markdown_document(&title, &since, &until, &summary),
            )?;
            // The live echo is raw Markdown; show it once more styled.
            if colors {
                println!("{}", terminal::heading(&title, colors));
                println!("{}", terminal::render_markdown(&summary, colors));
                println!();
            }
            println!(
                "{}",
                terminal::dim(&format!("Saved to {}", md_path.display()), colors)
            );
            if args.html {
                let html_path = render::html_path_for(&md_path);
                render::write_file(
                    &html_path,
                    &render::html_document(&title, &since, &until, &summary),
                )?;
                println!(
                    "{}",
                    terminal::dim(&format!("HTML saved to {}", html_path.display()), colors)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if matches!(err.stream_error(), Some(StreamError::Cancelled { .. })) => {
            eprintln!("{}", terminal::warning("Cancelled.", colors));
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(err) => {
            eprintln!(
                "{}",
                terminal::error(&format!("AI summary failed: {err}"), colors)
            );
            println!("{}", terminal::warning("Raw commit log:", colors));
            println!("{}", logs.text);
            if let Some(output) = &args.output {
                render::write_file(
                    output,
                    &render::markdown_document(&title, &since, &until, &logs.text),
                )?;
                println!(
                    "{}",
                    terminal::dim(&format!("Raw log saved to {}", output.display()), colors)
                );
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_config(action: ConfigAction, config_path: &Path, colors: bool) -> Result<ExitCode> {
    let mut config = AppConfig::load(config_path)?;
    let message = match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
            return Ok(ExitCode::SUCCESS);
        }
        ConfigAction::Show => {
            let mut shown = config.clone();
            for profile in shown.profiles.values_mut() {
                profile.api_key = mask_secret(&profile.api_key);
            }
            println!("{}", terminal::dim(&config_path.display().to_string(), colors));
            println!(
                "{}",
                serde_json::to_string_pretty(&shown).context("failed to serialize config")?
            );
            return Ok(ExitCode::SUCCESS);
        }
        ConfigAction::ListRepos => {
            if config.repositories.is_empty() {
                println!("{}", terminal::warning("No repositories configured.", colors));
            }
            for (alias, path) in &config.repositories {
                println!("{}: {path}", terminal::heading(alias, colors));
            }
            return Ok(ExitCode::SUCCESS);
        }
        ConfigAction::SetApiKey { key } => {
            config.current_profile_mut()?.api_key = key.trim().to_string();
            "API key updated".to_string()
        }
        ConfigAction::SetProvider { name } => {
            config.set_current_profile(name.trim())?;
            format!("Current profile: {}", config.current_profile)
        }
        ConfigAction::SetUrl { url } => {
            let url = url.trim().to_string();
            config.current_profile_mut()?.api_base_url = url.clone();
            format!("API base URL: {url}")
        }
        ConfigAction::SetModel { model } => {
            let model = model.trim().to_string();
            config.current_profile_mut()?.model = model.clone();
            format!("Model: {model}")
        }
        ConfigAction::SetTemperature { value } => {
            if !(0.0..=2.0).contains(&value) {
                bail!("temperature must be between 0 and 2, got {value}");
            }
            config.current_profile_mut()?.temperature = Some(value);
            format!("Temperature: {value}")
        }
        ConfigAction::EnableThinking => {
            let name = config.select_profile_name(None)?;
            let profile = config.current_profile_mut()?;
            profile.enable_thinking = true;
            if !profile.to_profile(&name).kind.supports_reasoning() {
                println!(
                    "{}",
                    terminal::warning(
                        &format!("Profile {name} does not support extended reasoning; the flag is ignored."),
                        colors
                    )
                );
            }
            "Extended reasoning enabled".to_string()
        }
        ConfigAction::DisableThinking => {
            config.current_profile_mut()?.enable_thinking = false;
            "Extended reasoning disabled".to_string()
        }
        ConfigAction::SetDefaultAuthor { author } => {
            config.default_author = author.trim().to_string();
            format!("Default author: {}", config.default_author)
        }
        ConfigAction::SetTimeRange { since, until } => {
            if since.is_none() && until.is_none() {
                bail!("pass --since and/or --until");
            }
            config.set_time_range(since.as_deref(), until.as_deref());
            format!(
                "Default range: {} to {}",
                config.default_since, config.default_until
            )
        }
        ConfigAction::AddRepo { alias, path } => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("invalid path {}", path.display()))?;
            if !gitlog::is_work_tree(&path) {
                println!(
                    "{}",
                    terminal::warning(
                        &format!("{} is not a git work tree (yet)", path.display()),
                        colors
                    )
                );
            }
            config.add_repository(alias.trim(), &path.display().to_string());
            format!("Repository {} -> {}", alias.trim(), path.display())
        }
        ConfigAction::RemoveRepo { alias } => {
            if !config.remove_repository(alias.trim()) {
                bail!("repository \"{}\" is not configured", alias.trim());
            }
            format!("Repository {} removed", alias.trim())
        }
        ConfigAction::SetPromptTemplate { file } => {
            let template = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read template {}", file.display()))?;
            if template.trim().is_empty() {
                bail!("template {} is empty", file.display());
            }
            config.prompt_template = template;
            "Prompt template updated".to_string()
        }
        ConfigAction::ResetPromptTemplate => {
            config.prompt_template.clear();
            "Prompt template reset to the built-in default".to_string()
        }
        ConfigAction::FindRepos { yes } => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            let roots = gitlog::default_search_roots(&home);
            return find_repos(config, config_path, &roots, yes, colors);
        }
        ConfigAction::Uninstall { yes } => return uninstall(config_path, yes, colors),
    };
    config.save(config_path)?;
    println!("{}", terminal::heading(&message, colors));
    Ok(ExitCode::SUCCESS)
}

fn find_repos(
    mut config: AppConfig,
    config_path: &Path,
    roots: &[PathBuf],
    yes: bool,
    colors: bool,
) -> Result<ExitCode> {
    let listed: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
    println!("{}", terminal::dim(&format!("Searching: {}", listed.join(", ")), colors));
    let found = gitlog::find_repositories(roots, gitlog::SEARCH_DEPTH);
    info!(found = found.len(), "repository search finished");
    if found.is_empty() {
        println!("{}", terminal::warning("No git repositories found.", colors));
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "{}",
        terminal::heading(&format!("Found {} repositories:", found.len()), colors)
    );
    for (i, repo) in found.iter().enumerate() {
        println!("  {}. {}: {}", i + 1, repo.alias, repo.path.display());
    }
    if !yes && !terminal::confirm("Add them to the configuration?", colors) {
        println!("{}", terminal::warning("Cancelled.", colors));
        return Ok(ExitCode::SUCCESS);
    }
    let added = config.add_discovered(&found);
    config.save(config_path)?;
    let skipped = found.len() - added.len();
    let mut message = format!("Added {} repositories", added.len());
    if skipped > 0 {
        message.push_str(&format!(" ({skipped} already configured)"));
    }
    println!("{}", terminal::heading(&message, colors));
    Ok(ExitCode::SUCCESS)
}

fn uninstall(config_path: &Path, yes: bool, colors: bool) -> Result<ExitCode> {
    let question = format!("Delete the configuration at {}?", config_dir(config_path).display());
    if !yes && !terminal::confirm(&question, colors) {
        println!("{}", terminal::warning("Cancelled.", colors));
        return Ok(ExitCode::SUCCESS);
    }
    match config::remove_config(config_path)? {
        Some(removed) => println!(
            "{}",
            terminal::heading(&format!("Removed {}", removed.display()), colors)
        ),
        None => println!(
            "{}",
            terminal::warning(
                &format!("Nothing to remove at {}", config_path.display()),
                colors
            )
        ),
    }
    Ok(ExitCode::SUCCESS)
}
