use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mosaic_wm::common::config::{Config, config_file, data_dir};
use mosaic_wm::common::log;
use mosaic_wm::common::util::{parse_command, script_lines};
use mosaic_wm::controller::{CloseOutcome, CloseTarget, CreateOptions, Event, MosaicController};
use mosaic_wm::model::{GroupId, RonFileStore};
use mosaic_wm::sys::prompt::{CloseAnswer, Prompt};
use mosaic_wm::sys::screen::{Display, StaticDisplay};
use mosaic_wm::sys::window_server::{CloseRequest, HeadlessWindowServer, WindowHandle};
use tracing::{trace, warn};

#[derive(Parser)]
#[command(version, about = "Tile windows in square-ish grids over every monitor")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    /// Run the commands in this file instead of reading them from stdin.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Directory holding the registry backup (default ~/.mosaic).
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

/// One command line of the interactive host.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: LineCommand,
}

#[derive(Subcommand)]
enum LineCommand {
    /// Create a window and lay its group out again.
    Create {
        /// Monitor to pin the window to, 0 for any.
        #[arg(long, default_value_t = 0)]
        monitor: u32,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Close a whole group (default: the ungrouped windows) or `all`.
    Close { target: Option<String> },
    /// Lay a group out again (default: the ungrouped windows).
    Layout { group: Option<String> },
    /// Lay every group out again.
    LayoutAll,
    /// List groups and their window counts.
    Groups,
    /// Print the registry.
    State,
    /// Simulate the user clicking a window's close button.
    CloseWindow { handle: u64 },
    /// Close grouped windows one at a time without asking.
    Batch {
        #[arg(action = clap::ArgAction::Set)]
        on: bool,
    },
    Quit,
}

fn flush_stderr() {
    if let Err(e) = io::stderr().flush() {
        trace!("Could not flush stderr: {e}");
    }
}

/// Asks on stderr and reads the answer from stdin.
struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&mut self, message: &str, default: CloseAnswer) -> CloseAnswer {
        eprint!("{message} [all/one/cancel] ({default}) ");
        flush_stderr();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => default,
            Ok(_) => match line.trim() {
                "" => default,
                answer => CloseAnswer::from_str(answer).unwrap_or_else(|_| {
                    warn!(answer, "Unrecognized answer, using {default}");
                    default
                }),
            },
        }
    }
}

type Controller = MosaicController<HeadlessWindowServer, StaticDisplay, RonFileStore, StdinPrompt>;

enum Flow {
    Continue,
    Quit,
}

fn group_arg(text: Option<&str>) -> GroupId {
    text.map_or(GroupId::None, |t| t.parse().unwrap_or_default())
}

fn print_outcome(outcome: &CloseOutcome) {
    match outcome {
        CloseOutcome::Unknown(handle) => println!("window {handle} was in no group"),
        CloseOutcome::Cancelled { group } => println!("cancelled, group {group} unchanged"),
        CloseOutcome::Closed { group, windows, group_removed } => {
            let handles: Vec<String> = windows.iter().map(ToString::to_string).collect();
            println!("closed {} from group {group}", handles.join(" "));
            if *group_removed {
                println!("group {group} removed");
            }
        }
    }
}

fn execute(controller: &mut Controller, line: &str) -> anyhow::Result<Flow> {
    if line.starts_with('{') {
        let event: Event = serde_json::from_str(line).context("Could not parse event")?;
        let response = controller.handle_event(event)?;
        println!("{}", serde_json::to_string(&response)?);
        return Ok(Flow::Continue);
    }

    let words = parse_command(line);
    let Line { command } = Line::try_parse_from(words)?;
    match command {
        LineCommand::Create { monitor, group, title } => {
            let group = group_arg(group.as_deref());
            let handle = controller.create(CreateOptions { monitor, group, title })?;
            println!("{handle}");
        }
        LineCommand::Close { target } => {
            let target = match target.as_deref() {
                Some(t) if t.eq_ignore_ascii_case("all") => CloseTarget::All,
                other => CloseTarget::Group(group_arg(other)),
            };
            let closed = controller.close(target)?;
            println!("closed {} windows", closed.len());
        }
        LineCommand::Layout { group } => {
            for (handle, frame) in controller.layout(&group_arg(group.as_deref()))? {
                println!("{handle}\t{} {} {} {}", frame.x, frame.y, frame.width, frame.height);
            }
        }
        LineCommand::LayoutAll => controller.layout_all()?,
        LineCommand::Groups => {
            for (group, count) in controller.list_groups() {
                println!("{group}\t{count}");
            }
        }
        LineCommand::State => {
            let state = controller.debug_state();
            println!("{}", ron::ser::to_string_pretty(&state, ron::ser::PrettyConfig::default())?);
        }
        LineCommand::CloseWindow { handle } => {
            match controller.server_mut().request_close(WindowHandle::new(handle)) {
                CloseRequest::Intercepted(handle) => {
                    print_outcome(&controller.handle_close_requested(handle))
                }
                CloseRequest::Destroyed => println!("window {handle} destroyed"),
                CloseRequest::Unknown => bail!("No window {handle}"),
            }
        }
        LineCommand::Batch { on } => controller.set_batch_close(on),
        LineCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn run(opt: Cli, config: Config) -> anyhow::Result<()> {
    let store = RonFileStore::new(opt.data_dir.unwrap_or_else(data_dir));
    let display = StaticDisplay::new(config.monitor_rects());
    let mut controller: Controller = MosaicController::new(
        config.settings.clone(),
        HeadlessWindowServer::new(),
        display,
        store,
        StdinPrompt,
    );

    // Windows of an earlier session are gone in a fresh headless server.
    let stale = controller.prune_stale();
    if !stale.is_empty() {
        eprintln!("forgot {} windows from the previous session", stale.len());
    }
    eprintln!(
        "{} monitors, registry in {}",
        controller.display().monitor_count(),
        controller.backup().dir().display()
    );

    if let Some(path) = opt.script {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Could not read script {}", path.display()))?;
        for (number, line) in script_lines(&text) {
            match execute(&mut controller, line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => eprintln!("{}:{number}: {e:#}", path.display()),
            }
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        eprint!("mosaic> ");
        flush_stderr();
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match execute(&mut controller, line) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("{e:#}"),
        }
    }
    Ok(())
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let config = match Config::read_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e:#}", config_path.display());
            process::exit(1);
        }
    };

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{}", issue);
            }
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run(opt, config) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}
