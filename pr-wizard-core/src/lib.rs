// pr-wizard-core/src/lib.rs

// declare modules
pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod form;
pub mod host;
pub mod page;
pub mod text;
pub mod utils;

// re-export key structs/functions for external use by other crates
pub use anyhow::{Context, Result}; // re-export for convenience
pub use clap::Parser; // re-export Parser for CLI crate
pub use console::style;
pub use dialoguer::{theme::ColorfulTheme, Select};
pub use dotenv::dotenv;
pub use indicatif::{ProgressBar, ProgressStyle};
pub use std::time::Duration;

pub use crate::ai::{Dispatcher, Generated, GenerationRequest, GenerationSource};
pub use crate::config::Config;
pub use crate::error::{WizardError, WizardResult};
pub use crate::form::{inject, InjectionOutcome, InjectionPlan, Notice};
pub use crate::page::{extract_page, Page, PageExtraction};

use clap::{Args, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use crate::page::{decode_html, is_compare_page, wait_for_element, CancelReason, WaitOutcome};
use crate::utils::mask_secret;

/// how often `--wait-for` re-reads the page file
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug, Clone)]
#[command(name = "pr-wizard", version, about = "pull request descriptions from compare pages")]
pub struct CoreCliArgs {
    /// path to the config file (defaults to $CONFIG_DIR/pr-wizard/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// generate a description for a saved compare page
    Generate(GenerateArgs),
    /// run as a browser native-messaging host on stdin/stdout
    Host,
    /// manage the stored api key
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// saved html of the pull request creation page
    pub page: PathBuf,

    /// url the page was captured from
    #[arg(short, long)]
    pub url: Option<String>,

    /// include per-file analysis in the prompt and local synthesis
    #[arg(short, long)]
    pub detailed: bool,

    /// accept the first generated description without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// write the injection plan json here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// wait until this selector appears in the page file before extracting
    #[arg(short, long)]
    pub wait_for: Option<String>,

    /// provider override (local, openrouter, openai, custom)
    #[arg(long)]
    pub provider: Option<String>,

    /// model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// maximum number of commits to read from the page
    #[arg(long)]
    pub max_commits: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// store an api key in the config file
    SetKey { key: String },
    /// print the effective configuration
    Show,
    /// check the stored (or given) api key against the provider
    Test { key: Option<String> },
}

/// everything one trigger produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub extraction: PageExtraction,
    pub generated: Generated,
    pub injection: InjectionOutcome,
}

/// request generation for an extraction; never fails, see [`Dispatcher::dispatch`]
pub async fn generate_from_extraction(
    dispatcher: &Dispatcher,
    extraction: &PageExtraction,
    detailed: bool,
) -> Generated {
    let request =
        GenerationRequest::new(&extraction.commits).with_changes(&extraction.changes, detailed);
    dispatcher.dispatch(&request).await
}

/// extract then generate
pub async fn generate_for_page(
    page: &Page,
    config: &Config,
    detailed: bool,
) -> WizardResult<(PageExtraction, Generated)> {
    let extraction = extract_page(page, &config.extraction)?;
    let dispatcher = Dispatcher::from_config(config)?;
    let generated = generate_from_extraction(&dispatcher, &extraction, detailed).await;
    Ok((extraction, generated))
}

/// extract, generate and plan the form writes
pub async fn run_pipeline(page: &Page, config: &Config, detailed: bool) -> WizardResult<PipelineOutput> {
    let (extraction, generated) = generate_for_page(page, config, detailed).await?;
    let injection = inject(page, &generated.text);
    Ok(PipelineOutput {
        extraction,
        generated,
        injection,
    })
}

/// load config for the given cli args: file, then env, then flag overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    dotenv().ok();
    Config::load(path).context("failed to load configuration")
}

fn config_path(args: &CoreCliArgs) -> Option<PathBuf> {
    args.config.clone().or_else(Config::default_path)
}

/// entry point for the cli binary
pub async fn execute_cli(args: CoreCliArgs) -> Result<Option<String>> {
    let path = config_path(&args);
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Generate(generate) => {
            let (text, written) = execute_generate_flow(generate, config, args.verbose).await?;
            Ok(if written { None } else { Some(text) })
        }
        Command::Host => {
            host::run_stdio(config, path).await?;
            Ok(None)
        }
        Command::Config { action } => {
            execute_config_action(action, config, path).await?;
            Ok(None)
        }
    }
}

async fn execute_config_action(
    action: ConfigAction,
    mut config: Config,
    path: Option<PathBuf>,
) -> Result<()> {
    match action {
        ConfigAction::SetKey { key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err(WizardError::MissingCredential.into());
            }
            let path = path.context("could not determine a config directory, pass --config")?;
            // reload without env overrides so they are not written to disk
            let mut stored = if path.exists() {
                Config::load_file(&path)?
            } else {
                Config::default()
            };
            stored.credentials.api_key = Some(key.to_string());
            stored
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} {}",
                style("✅ api key").green().bold(),
                style(mask_secret(key)).yellow(),
                style(format!("saved to {}", path.display())).dim()
            );
        }
        ConfigAction::Show => {
            if let Some(path) = &path {
                println!("{} {}", style("config file:").cyan().bold(), path.display());
            }
            if let Some(key) = config.credentials.api_key.as_mut() {
                *key = mask_secret(key);
            }
            let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
            println!("{rendered}");
            match config.provider.resolved_endpoint() {
                Some(endpoint) => println!("{} {}", style("endpoint:").cyan().bold(), endpoint),
                None => println!("{}", style("local synthesis only (no endpoint)").yellow()),
            }
        }
        ConfigAction::Test { key } => {
            let key = key
                .or_else(|| config.api_key().map(str::to_string))
                .ok_or(WizardError::MissingCredential)?;
            ai::test_api_key(&config, &key)
                .await
                .context("api key check failed")?;
            println!("{}", style("✅ api key is valid").green().bold());
        }
    }
    Ok(())
}

fn apply_generate_overrides(config: &mut Config, args: &GenerateArgs) -> Result<()> {
    if let Some(kind) = &args.provider {
        config.provider.kind = config::ProviderKind::parse(kind)?;
    }
    if let Some(model) = &args.model {
        config.provider.model = model.clone();
    }
    if let Some(max) = args.max_commits {
        config.extraction.max_commits = max;
    }
    config.validate()?;
    Ok(())
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn read_page(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(decode_html(&bytes))
}

/// feed the page file into a watch channel until `selector` shows up
async fn wait_for_page_element(path: &Path, selector: &str, timeout: Duration) -> Result<usize> {
    let (tx, rx) = watch::channel(read_page(path)?);
    let poll_path = path.to_path_buf();
    let poller = tokio::spawn(async move {
        loop {
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            if tx.receiver_count() == 0 {
                break;
            }
            match fs::read(&poll_path) {
                Ok(bytes) => {
                    let html = decode_html(&bytes);
                    tx.send_if_modified(|current| {
                        if *current == html {
                            false
                        } else {
                            *current = html;
                            true
                        }
                    });
                }
                Err(e) => tracing::debug!("page file not readable yet: {e}"),
            }
        }
    });

    let outcome = wait_for_element(rx, selector, timeout).await;
    poller.abort();

    match outcome {
        WaitOutcome::Found(count) => Ok(count),
        WaitOutcome::Cancelled(CancelReason::Timeout) => Err(anyhow::anyhow!(
            "timed out after {timeout:?} waiting for '{selector}' in {}",
            path.display()
        )),
        WaitOutcome::Cancelled(CancelReason::SourceClosed) => Err(anyhow::anyhow!(
            "stopped watching {} before '{selector}' appeared",
            path.display()
        )),
    }
}

fn print_description(heading: &str, text: &str) {
    println!("\n{}\n", style(heading).green().bold());
    println!("{}", style(text).yellow());
    println!();
}

// the interactive generation flow
pub async fn execute_generate_flow(
    args: GenerateArgs,
    mut config: Config,
    verbose: bool,
) -> Result<(String, bool)> {
    apply_generate_overrides(&mut config, &args)?;

    println!("{}", style("\npr-wizard 🧙").cyan().bold());
    println!("{}\n", style("pull request descriptions from your compare page").dim());

    if let Some(selector) = &args.wait_for {
        let timeout = Duration::from_millis(config.extraction.wait_timeout_ms);
        let count = wait_for_page_element(&args.page, selector, timeout).await?;
        tracing::debug!("'{selector}' matched {count} element(s)");
    }

    let spin = spinner("📊 reading commits and changes...");
    let html = read_page(&args.page)?;
    let mut page = Page::parse(&html);
    if let Some(url) = &args.url {
        if !is_compare_page(url) {
            spin.suspend(|| {
                println!(
                    "{}",
                    style("⚠️  url does not look like a pull request creation page").yellow()
                )
            });
        }
        page = page.with_url(url.clone());
    }
    let extraction = extract_page(&page, &config.extraction);
    spin.finish_and_clear();
    let extraction = extraction.context("nothing to describe on this page")?;

    if extraction.placeholder_commits {
        println!("{}\n", style("⚠️  no commit messages found, using generic ones").yellow().bold());
    } else {
        println!("{}\n", style("commits:").cyan().bold());
        for commit in &extraction.commits {
            println!("{}", style(format!("  - {commit}")).green());
        }
        println!();
    }

    if verbose {
        let stats = extraction.changes.stats;
        println!(
            "found {} changed files (+{} -{})",
            stats.files_changed, stats.additions, stats.deletions
        );
        for file in &extraction.changes.files {
            println!(
                "- {} [{}] (+{} -{}): {}",
                file.filename,
                file.status.as_str(),
                file.additions,
                file.deletions,
                file.summary
            );
        }
        println!();
    }

    let dispatcher = Dispatcher::from_config(&config)?;
    let mut description = generate_with_spinner(&dispatcher, &extraction, args.detailed).await;
    print_description("✅ generated description:", &description);

    let interactive = !args.yes && atty::is(atty::Stream::Stdin);
    if interactive {
        println!("{}", style("press ctrl+c at any time to exit").dim());

        loop {
            let options = &[
                "yes, use this description",
                "edit this description",
                "no, regenerate description",
            ];
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("what would you like to do?")
                .default(0)
                .items(options)
                .interact()?;

            match selection {
                0 => break,
                1 => {
                    println!("{}", style("opening editor for description...").cyan());
                    if let Some(edited) = open_editor_for_message(&description)? {
                        description = edited;
                        println!("{}", style("description updated").green());
                    } else {
                        println!("{}", style("edit cancelled, using previous description").yellow());
                    }
                    print_description("current description:", &description);
                }
                2 => {
                    println!("\n{}", style("regenerating...").cyan());
                    description = generate_with_spinner(&dispatcher, &extraction, args.detailed).await;
                    print_description("✅ newly generated description:", &description);
                }
                _ => unreachable!(),
            }
        }
    } else if args.yes {
        println!("{}", style("--yes flag detected, using the generated description.").green());
    } else {
        println!("{}", style("stdin is not a terminal, using the generated description.").green());
    }

    let outcome = inject(&page, &description);
    let level = outcome.notice.level;
    let message = outcome.notice.message.clone();
    match level {
        form::NoticeLevel::Success | form::NoticeLevel::Info => {
            println!("{}", style(format!("✅ {message}")).green())
        }
        _ => eprintln!("{}", style(format!("⚠️  {message}")).yellow()),
    }

    let rendered = serde_json::to_string_pretty(&outcome).context("failed to render injection plan")?;
    match &args.out {
        Some(out) => {
            fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", style(format!("injection plan written to {}", out.display())).dim());
            Ok((description, true))
        }
        None => {
            println!("{rendered}");
            Ok((description, false))
        }
    }
}

async fn generate_with_spinner(
    dispatcher: &Dispatcher,
    extraction: &PageExtraction,
    detailed: bool,
) -> String {
    let spin = spinner("🧙 generating description...");
    let generated = generate_from_extraction(dispatcher, extraction, detailed).await;
    spin.finish_and_clear();

    if let Some(reason) = &generated.fallback_reason {
        println!(
            "{} {}",
            style("⚠️  provider unavailable, used local synthesis:").yellow(),
            style(reason).dim()
        );
    }
    generated.text
}

// helper function for editing the description
fn open_editor_for_message(current_message: &str) -> Result<Option<String>> {
    use std::process::{Command, Stdio};
    use crossterm::terminal::disable_raw_mode;

    let draft = write_draft(current_message)?;
    let _ = disable_raw_mode();

    let editor = resolve_editor();
    let (program, args) = split_editor_command(&editor);
    let status = Command::new(program)
        .args(&args)
        .arg(draft.path())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("failed to execute editor '{editor}'"))?;

    if !status.success() {
        eprintln!(
            "{}",
            style(format!("editor '{editor}' exited with error: {status}")).yellow()
        );
        return Ok(None);
    }

    // editors that save by rename leave a new file at the same path
    let edited = fs::read_to_string(draft.path())
        .with_context(|| format!("failed to read {}", draft.path().display()))?;

    if edited.trim_end() != current_message.trim_end() {
        Ok(Some(edited.trim_end().to_string()))
    } else {
        println!("{}", style("no changes detected; using previous description").yellow());
        Ok(None)
    }
}

/// private, uniquely named draft file, removed when dropped
fn write_draft(contents: &str) -> Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let mut draft = tempfile::Builder::new()
        .prefix("pr-wizard-")
        .suffix(".md")
        .tempfile()
        .context("failed to create draft file")?;
    draft
        .write_all(contents.as_bytes())
        .context("failed to write initial description")?;
    draft.flush().context("failed to write initial description")?;
    Ok(draft)
}

/// $VISUAL, then $EDITOR, then the first editor found on PATH
fn resolve_editor() -> String {
    std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| {
            ["code -w", "nvim", "vim", "vi", "nano"]
                .iter()
                .find(|cand| {
                    cand.split_whitespace()
                        .next()
                        .map(|bin| which::which(bin).is_ok())
                        .unwrap_or(false)
                })
                .map(|cand| cand.to_string())
                .unwrap_or_else(|| "nano".to_string())
        })
}

/// "code -w" style editors carry their own arguments
fn split_editor_command(editor: &str) -> (&str, Vec<&str>) {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(editor);
    (program, parts.collect())
}
