use anyhow::{Context, Result};
use clap::Parser;
use services::{
    project_group_name, resolve_project_directory, write_feedback, JsonSettingsStore,
    SettingsRepository,
};
use shared::settings::ProjectSettings;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use supervisor::Supervisor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod console;
use console::Console;

#[derive(Parser, Debug)]
#[command(
    name = "feedback-console",
    version,
    about = "Run a project command and collect feedback for an AI agent"
)]
struct Cli {
    /// Directory the command runs in. May be percent-encoded.
    #[arg(long, default_value = ".")]
    project_directory: String,

    /// Message shown to the user
    #[arg(long, default_value = "I have implemented the changes you requested.")]
    prompt: String,

    /// Write the feedback as JSON here instead of printing it
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Command to run (overrides the saved one)
    #[arg(long)]
    command: Option<String>,

    /// Run the command as soon as the console opens
    #[arg(long)]
    run: bool,

    /// Set whether the command runs automatically next time
    #[arg(long)]
    execute_automatically: Option<bool>,

    /// Save the command and auto-run flag for this project
    #[arg(long)]
    save: bool,

    /// Where project settings live (defaults to the user config dir)
    #[arg(long)]
    settings_dir: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let project_dir = resolve_project_directory(&cli.project_directory)?;
    let store = match &cli.settings_dir {
        Some(dir) => JsonSettingsStore::with_base_dir(dir),
        None => JsonSettingsStore::new(),
    };
    let group = project_group_name(&project_dir);
    let mut settings = store.load(&group);
    apply_overrides(&mut settings, &cli);

    if cli.save {
        store.save(&group, &settings)?;
        info!(group = %group, "project settings saved");
    }

    let stdout = io::stdout();
    let mut console = Console::new(Supervisor::new(), project_dir, stdout.lock());
    console.show_header(&cli.prompt, &settings)?;

    if cli.run || settings.should_auto_run() {
        console.run_command(&settings.run_command)?;
    }

    let feedback_rx = spawn_feedback_reader()?;
    let feedback = console.wait_for_feedback(&feedback_rx)?;
    let result = console.finish(feedback);

    match &cli.output_file {
        Some(path) => write_feedback(path, &result)?,
        None => {
            println!("\nCollected logs:\n{}", result.command_logs);
            println!("\nFeedback received:\n{}", result.interactive_feedback);
        }
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn apply_overrides(settings: &mut ProjectSettings, cli: &Cli) {
    if let Some(command) = &cli.command {
        settings.run_command = command.clone();
    }
    if let Some(auto) = cli.execute_automatically {
        settings.execute_automatically = auto;
    }
}

/// Read all of stdin on a background thread; the text arrives once input
/// closes. A read error drops the sender, which reads as "closed".
fn spawn_feedback_reader() -> Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("feedback-reader".into())
        .spawn(move || {
            let mut text = String::new();
            match io::stdin().read_to_string(&mut text) {
                Ok(_) => {
                    let _ = tx.send(text);
                }
                Err(e) => warn!(error = %e, "failed to read feedback"),
            }
        })
        .context("Failed to start feedback reader")?;
    Ok(rx)
}
