use anyhow::Context;
use clap::Parser;
use config::{DocumentFormat, PathManager, Settings, load_env_file};
use docsmith_core::{
    AuditLog, ConversationContext, DocumentSession, Orchestrator, OrchestratorConfig, PromptBuilder, SectionResolver,
    SeedContext, TurnEvent, TurnOutcome,
};
use llm::{ModelProvider, OpenAIProvider};

use clap_derive::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "Conversational, section-aware document editing", long_about = None)]
struct Args {
    /// Model identifier, e.g. gpt-4o
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Plain-text domain dataset for the system context
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Specification document for the system context
    #[arg(long)]
    specification: Option<PathBuf>,

    /// Directory for prompt audit files
    #[arg(long)]
    audit_dir: Option<PathBuf>,

    /// Do not write prompt audit files
    #[arg(long)]
    no_audit: bool,

    /// Document shape after a full rewrite (markdown, marked)
    #[arg(long)]
    format: Option<DocumentFormat>,

    /// Number of recent transcript turns sent with each prompt
    #[arg(long)]
    history_window: Option<usize>,

    /// Custom base URL for OpenAI API (e.g., for proxy or compatible services)
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_url: Option<String>,

    /// Override the data directory (logs, settings)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Write the effective settings to settings.toml and exit
    #[arg(long)]
    save_settings: bool,

    #[arg(long, short)]
    tracing: bool,
}

impl Args {
    /// Command-line flags win over settings.toml
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(dataset) = &self.dataset {
            settings.dataset_path = dataset.clone();
        }
        if let Some(specification) = &self.specification {
            settings.specification_path = specification.clone();
        }
        if let Some(audit_dir) = &self.audit_dir {
            settings.audit_dir = Some(audit_dir.clone());
        }
        if let Some(format) = self.format {
            settings.document_format = format;
        }
        if let Some(history_window) = self.history_window {
            settings.history_window = history_window;
        }
        if let Some(url) = &self.openai_url {
            settings.openai_base_url = Some(url.clone());
        }
    }
}

// Application state
pub struct AppState {
    orchestrator: Orchestrator,
    session: DocumentSession,
    provider: OpenAIProvider,
}

fn create_provider(settings: &Settings) -> anyhow::Result<OpenAIProvider> {
    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    match &settings.openai_base_url {
        Some(url) => OpenAIProvider::new(url, &api_key),
        None => OpenAIProvider::default(&api_key),
    }
}

fn build_state(settings: &Settings, no_audit: bool) -> anyhow::Result<AppState> {
    let seed = SeedContext::load(&settings.dataset_path, &settings.specification_path)?;

    let provider = create_provider(settings)?;
    let model = provider
        .create_chat_model(&settings.model)
        .with_context(|| format!("Failed to create model {}", settings.model))?;

    let resolver = SectionResolver::new(&settings.section_keywords)?;
    let audit_log = match settings.resolved_audit_dir() {
        Some(dir) if !no_audit => AuditLog::new(dir),
        _ => AuditLog::disabled(),
    };
    let prompt = PromptBuilder::new(seed.system_context()).with_history_window(settings.history_window);

    let orchestrator = Orchestrator::new(
        model,
        prompt,
        resolver,
        audit_log,
        OrchestratorConfig {
            temperature: settings.temperature,
            document_format: settings.document_format,
        },
    );

    Ok(AppState {
        orchestrator,
        session: DocumentSession::new(),
        provider,
    })
}

fn print_event(event: TurnEvent) -> io::Result<()> {
    let mut stdout = io::stdout();
    match event {
        TurnEvent::Notice(notice) => writeln!(stdout, "· {}", notice)?,
        TurnEvent::Fragment(fragment) => {
            write!(stdout, "{}", fragment)?;
            stdout.flush()?;
        }
        TurnEvent::Error(message) => {
            writeln!(stdout)?;
            eprintln!("Error: {}", message);
        }
        TurnEvent::Completed => writeln!(stdout)?,
    }
    Ok(())
}

/// Run one turn, printing its events as they arrive
async fn run_turn(state: &mut AppState, input: &str) -> TurnOutcome {
    let (events, mut rx) = mpsc::unbounded_channel();

    let orchestrator = &state.orchestrator;
    let session = &mut state.session;
    let turn = async move {
        let outcome = orchestrator.handle_turn(session, input, &events).await;
        drop(events);
        outcome
    };
    let printer = async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = print_event(event) {
                tracing::warn!("Failed to print turn output: {}", e);
            }
        }
    };

    let (outcome, ()) = tokio::join!(turn, printer);
    outcome
}

fn print_status_bar(model_name: &str, session: &DocumentSession) {
    let terminal_width: usize = 80;
    let status = format!(
        " {} • {} sections • {} messages ",
        model_name,
        session.registry().len(),
        session.transcript().len()
    );
    let padding = terminal_width.saturating_sub(status.chars().count());
    let left_pad = padding / 2;
    let right_pad = padding - left_pad;

    println!("┌{}┐", "─".repeat(terminal_width - 2));
    println!("│{}{}{}│", " ".repeat(left_pad), status, " ".repeat(right_pad));
    println!("└{}┘", "─".repeat(terminal_width - 2));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    let args = Args::parse();

    if let Some(dir) = &args.data_dir {
        PathManager::set_data_dir(dir.clone());
    }
    let _log_guard = logging::setup_tracing(args.tracing);
    if let Err(e) = PathManager::ensure_dirs_exist() {
        tracing::warn!("Failed to create data directories: {}", e);
    }

    let mut settings = Settings::load();
    args.apply_to(&mut settings);
    tracing::debug!("Effective settings: {:?}", settings);

    if args.save_settings {
        settings.save().map_err(anyhow::Error::msg)?;
        if let Some(path) = PathManager::settings_path() {
            println!("Settings written to {}", path.display());
        }
        return Ok(());
    }

    let mut state = build_state(&settings, args.no_audit)?;
    tracing::info!("Session {} started with model {}", state.session.id(), settings.model);

    println!();
    println!("Type /help for commands, Ctrl+D or /quit to exit.");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_status_bar(state.orchestrator.model_name(), &state.session);
        print!("> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
            None => {
                println!();
                println!("Goodbye!");
                break;
            }
        };

        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        // Try to parse as command
        if input.starts_with('/') {
            match commands::Command::parse(input) {
                Ok(cmd) => match cmd.execute(&mut state) {
                    commands::CommandResult::Exit => break,
                    commands::CommandResult::Continue => continue,
                },
                Err(err) => {
                    println!("{}", err);
                    println!();
                    continue;
                }
            }
        }

        if let TurnOutcome::Completed {
            document_changed: true,
            ..
        } = run_turn(&mut state, input).await
        {
            println!("Document updated. Type /document to view it.");
        }

        println!();
    }

    Ok(())
}
