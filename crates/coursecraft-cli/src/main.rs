//! Coursecraft CLI
//!
//! Interactive terminal front end: reads commands from stdin, feeds them to
//! the app as actions and prints the current screen as Markdown.

mod commands;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use coursecraft_client::{App, Config, CourseApi, History, HttpCourseApi, WebSocketTransport};
use coursecraft_core::{Assessment, Screen};
use coursecraft_report::{render_progress, ClientView, HistoryView, MarkdownGenerator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::commands::{parse_command, Command, HELP};

/// Coursecraft - AI course generator client
///
/// Requests a course on any subject from the course backend, follows the
/// generation progress live, then lets you read the lessons and take the
/// assessment.
#[derive(Parser, Debug)]
#[command(name = "coursecraft")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: coursecraft.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Backend base URL, overriding the configuration file
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Assessment JSON to use for every course instead of asking the server
    #[arg(short, long, value_name = "FILE")]
    assessment: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Coursecraft starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Sets up the app and runs the prompt until `quit`, Ctrl+C or end of input.
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(server) = args.server {
        config.server_url = server;
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let assessment = args
        .assessment
        .as_deref()
        .map(|path| load_assessment(Path::new(path)))
        .transpose()?;

    let api = Arc::new(HttpCourseApi::new(config.clone())?);
    let transport = Arc::new(WebSocketTransport::from_config(&config));
    let (mut app, mut events) = App::new(Arc::clone(&api), transport, config.completion_delay());
    if let Some(assessment) = assessment {
        tracing::info!(title = %assessment.title, "Using assessment from file");
        app = app.with_assessment(assessment);
    }
    let queue = app.queue();

    println!();
    println!("{HELP}");
    println!();
    render(&app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("End of input, shutting down");
                    break;
                };
                match parse_command(&line, app.navigator()) {
                    Ok(Command::Empty) => {}
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Progress) => spawn_progress_fetch(Arc::clone(&api)),
                    Ok(Command::App(action)) => {
                        queue.post(action);
                    }
                    Err(e) => println!("{e}"),
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if app.handle(event) {
                    if !app.is_running() {
                        break;
                    }
                    render(&app);
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Loads an assessment JSON file, accepting either the bare assessment or
/// the `{"assessment": {...}}` wrapper the server produces.
fn load_assessment(path: &Path) -> anyhow::Result<Assessment> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read assessment file: {e}\n\nPath: {}",
            path.display()
        )
    })?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        anyhow::anyhow!(
            "Failed to parse assessment file: {e}\n\nPath: {}",
            path.display()
        )
    })?;
    Ok(Assessment::from_value(value)?)
}

/// Prints the effective configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Server: {}", config.server_url);
    println!("  Progress channel: {}", config.channel_url());
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!("  Completion delay: {}ms", config.completion_delay_ms);
}

/// Fetches one progress snapshot and prints it when it arrives.
fn spawn_progress_fetch(api: Arc<HttpCourseApi>) {
    tokio::spawn(async move {
        match api.fetch_progress().await {
            Ok(progress) => println!("{}", render_progress(&progress)),
            Err(e) => println!("Failed to fetch progress: {e}"),
        }
    });
}

/// Prints the current screen followed by a hint for what to type next.
fn render<A: CourseApi>(app: &App<A>) {
    let workflow = app.workflow();
    let history = match app.history() {
        History::NotLoaded => HistoryView::Hidden,
        History::Loading => HistoryView::Loading,
        History::Loaded(courses) => HistoryView::Loaded(courses),
        History::Failed(message) => HistoryView::Failed(message),
    };
    let view = ClientView {
        loading: workflow.is_loading(),
        error: workflow.error(),
        progress: workflow.progress(),
        history,
        assessment_loading: app.is_assessment_loading(),
        notice: app.notice(),
    };

    println!("{}", MarkdownGenerator::new(app.navigator(), view).generate());
    println!("{}", screen_hint(app.navigator().screen()));
}

const fn screen_hint(screen: Screen) -> &'static str {
    match screen {
        Screen::Home => "[create <1-3> <subject> | history | open <n> | help | quit]",
        Screen::CourseOverview => "[lesson <n> | assess | home]",
        Screen::Lesson => "[next | prev | course | assess | home]",
        Screen::Assessment => "[answer <n|true|false> | next | prev | restart | course | home]",
    }
}
