use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use alpr_dataset_manager::app::{App, FetchReport, ListResult, SetupReport};
use alpr_dataset_manager::error::StageError;
use alpr_dataset_manager::kaggle::{DownloadClient, SystemKaggleClient, ToolInfo, ToolStatus};
use alpr_dataset_manager::output::{ConsoleSink, JsonOutput, OutputMode};
use alpr_dataset_manager::registry::Registry;
use alpr_dataset_manager::stage::EntryStatus;
use alpr_dataset_manager::workspace::Workspace;

#[derive(Parser)]
#[command(name = "alpr-dm")]
#[command(about = "Workspace bootstrapper and dataset stager for an ALPR training pipeline")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the project directory skeleton")]
    Setup,
    #[command(about = "Download and stage one dataset")]
    Fetch(FetchArgs),
    #[command(about = "List registered datasets and their staging state")]
    List,
}

#[derive(Args)]
struct FetchArgs {
    key: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(stage) = report.downcast_ref::<StageError>() {
            return ExitCode::from(map_exit_code(stage));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &StageError) -> u8 {
    match error {
        StageError::UnknownDatasetKey(_) => 2,
        StageError::MissingTool(_) | StageError::DownloadFailed(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let workspace = Workspace::new().into_diagnostic()?;
    let registry = Registry::builtin();

    match cli.command {
        Some(Commands::Setup) => {
            let app = App::new(workspace, registry, NopDownloader);
            run_setup(app, output_mode)
        }
        Some(Commands::Fetch(args)) => {
            let app = App::new(workspace, registry, SystemKaggleClient::new());
            run_fetch(&args.key, app, output_mode)
        }
        Some(Commands::List) => {
            let app = App::new(workspace, registry, NopDownloader);
            run_list(app, output_mode)
        }
        None => match output_mode {
            OutputMode::Interactive => run_menu(workspace, registry),
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `alpr-dm --help`)",
            )),
        },
    }
}

fn run_setup<D: DownloadClient>(app: App<D>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.setup(&JsonOutput).into_diagnostic()?;
            JsonOutput::print_setup(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.setup(&ConsoleSink).into_diagnostic()?;
            print_setup_summary(&result);
        }
    }
    Ok(())
}

fn run_fetch<D: DownloadClient>(
    key: &str,
    app: App<D>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch(key, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.fetch(key, &ConsoleSink).into_diagnostic()?;
            print_fetch_summary(&result);
        }
    }
    Ok(())
}

fn run_list<D: DownloadClient>(app: App<D>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.list(&JsonOutput).into_diagnostic()?;
            JsonOutput::print_list(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.list(&ConsoleSink).into_diagnostic()?;
            print_list_summary(&result);
        }
    }
    Ok(())
}

fn run_menu(workspace: Workspace, registry: Registry) -> miette::Result<()> {
    let app = App::new(workspace, registry, SystemKaggleClient::new());
    let setup = app.setup(&ConsoleSink).into_diagnostic()?;
    print_setup_summary(&setup);

    loop {
        println!("\n--- ALPR dataset manager ---");
        for profile in app.registry().profiles() {
            println!("{}. Fetch {}", profile.key, profile.display_name);
        }
        println!("q. Quit");
        print!("Select an option: ");
        std::io::stdout().flush().into_diagnostic()?;

        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line).into_diagnostic()?;
        if read == 0 {
            return Ok(());
        }
        let choice = line.trim();

        match choice {
            "" => continue,
            "q" | "quit" | "exit" => return Ok(()),
            key => match app.fetch(key, &ConsoleSink) {
                Ok(result) => print_fetch_summary(&result),
                Err(err) => {
                    let report = miette::Report::new(err);
                    eprintln!("{report:?}");
                }
            },
        }
    }
}

fn print_setup_summary(result: &SetupReport) {
    let green = "\x1b[32m";
    let reset = "\x1b[0m";
    println!(
        "{green}Directory skeleton ready: {} dirs under {}{reset}",
        result.dirs.len(),
        result.root
    );
}

fn print_fetch_summary(result: &FetchReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}{} ({}){reset}", result.display_name, result.source_id);
    println!("  extraction root: {}", result.stage.resolved_root);
    if result.stage.root_fallback {
        println!("{yellow}  declared subfolder missing, fell back to the download root{reset}");
    }
    for entry in &result.stage.entries {
        match entry.status {
            EntryStatus::Moved => {
                println!("{green}  moved   {} -> {}{reset}", entry.source, entry.dest);
            }
            EntryStatus::Missing => {
                println!("{yellow}  missing {}{reset}", entry.source);
            }
        }
    }
    if result.stage.outcome.is_success() {
        println!(
            "{green}Done. Data ready in {}{reset}",
            result.stage.staging_dest
        );
        if let Some(note) = &result.note {
            println!("{yellow}  note: {note}{reset}");
        }
    } else {
        println!(
            "{red}Nothing was moved. Check the contents of {}{reset}",
            result.stage.resolved_root
        );
    }
}

fn print_list_summary(result: &ListResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let reset = "\x1b[0m";

    for entry in &result.datasets {
        let (marker, color) = if entry.staged {
            ("staged", green)
        } else {
            ("empty", yellow)
        };
        println!(
            "{color}{} {} [{}] -> {} ({marker}){reset}",
            entry.key, entry.display_name, entry.source_id, entry.staging_dest
        );
    }
}

#[derive(Clone, Copy)]
struct NopDownloader;

impl DownloadClient for NopDownloader {
    fn tool_status(&self) -> ToolStatus {
        ToolStatus::Missing {
            message: "download client not configured".to_string(),
        }
    }

    fn download(
        &self,
        _id: &alpr_dataset_manager::domain::SourceId,
        _destination: &camino::Utf8Path,
    ) -> Result<(), StageError> {
        Err(StageError::MissingTool(
            "download client not configured".to_string(),
        ))
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo { kaggle: None }
    }
}
