//! follow-capture CLI
//!
//! Captures a following list while you scroll it in a real browser, then
//! analyzes the captured bios offline.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use follow_capture::analysis::{self, PROMPT_FILE, SCHEDULE_JSON_FILE, SCHEDULE_SUMMARY_FILE};
use follow_capture::capture::DEFAULT_URL_PATTERN;
use follow_capture::output::load_records;
use follow_capture::{
    BrowserSession, CaptureOptions, CapturePipeline, CaptureReport, ConnectionOptions, LaunchOptions, OutputDir,
    ProfileRecord, Termination,
};
use headless_chrome::Tab;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

const HOME_URL: &str = "https://www.douyin.com/";

#[derive(Parser)]
#[command(name = "follow-capture")]
#[command(version)]
#[command(about = "Capture a following list from a live browser session", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the following list while you scroll it in the browser
    Capture(CaptureArgs),

    /// Find convention/offline schedules in captured bios
    Analyze(AnalyzeArgs),

    /// Print the JSON Schema of the captured record file
    Schema,
}

#[derive(Args)]
struct CaptureArgs {
    /// Attach to a browser started with --remote-debugging-port (its WebSocket debugger URL)
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory (launch mode)
    #[arg(long, value_name = "DIR", default_value = "chrome_profile")]
    user_data_dir: PathBuf,

    /// Path to custom browser executable (launch mode)
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// sec_uid of the account whose following list to open
    #[arg(long, value_name = "ID")]
    sec_user_id: Option<String>,

    /// Do not wait for a login confirmation before opening the list
    #[arg(long)]
    skip_login: bool,

    /// Output directory
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// URL substring identifying following-list responses
    #[arg(long, default_value = DEFAULT_URL_PATTERN)]
    url_pattern: String,

    /// How long to wait for in-flight responses after stopping, in milliseconds
    #[arg(long, default_value = "3000")]
    drain_grace_ms: u64,

    /// Maximum number of tracked in-flight responses
    #[arg(long, default_value = "256")]
    max_pending: usize,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Directory holding a previous capture
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// Also list users without schedule information
    #[arg(long)]
    all: bool,

    /// Write schedule users as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    /// Write a prompt for structured extraction by an LLM
    #[arg(long)]
    prompt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Capture(args) => capture(args).await,
        Command::Analyze(args) => run_analyze(args),
        Command::Schema => {
            let schema = schemars::schema_for!(Vec<ProfileRecord>);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn wait_for_enter(prompt: &str) -> std::io::Result<()> {
    print!("\n>>> {}", prompt);
    std::io::stdout().flush()?;
    std::io::stdin().lock().read_line(&mut String::new())?;
    Ok(())
}

fn open_session(args: &CaptureArgs) -> follow_capture::Result<BrowserSession> {
    match &args.ws_endpoint {
        Some(ws_url) => {
            println!("Attaching to running browser at {}", ws_url);
            BrowserSession::connect(ConnectionOptions::new(ws_url.clone()))
        }
        None => {
            let mut options = LaunchOptions::new().user_data_dir(args.user_data_dir.clone());
            if let Some(path) = &args.chrome_path {
                options = options.chrome_path(path.clone());
            }
            println!("Launching browser with profile {}", args.user_data_dir.display());
            BrowserSession::launch(options)
        }
    }
}

async fn capture(args: CaptureArgs) -> anyhow::Result<()> {
    println!("{}", "=".repeat(60));
    println!("Following list capture");
    println!("{}", "=".repeat(60));
    println!();
    println!("1. Log in in the browser window if you are not logged in yet");
    println!("2. Open the following list and keep scrolling down");
    println!("3. Responses are captured automatically; progress is logged here");
    println!("4. When you reach the end, press Enter here (or Ctrl+C) to save");

    let session = open_session(&args)?;
    let tab = session.active_or_new_tab()?;

    let options = CaptureOptions::new()
        .url_pattern(args.url_pattern.clone())
        .drain_grace(Duration::from_millis(args.drain_grace_ms))
        .max_pending(args.max_pending);

    // Listen before navigating so the first page is not missed
    let mut pipeline = CapturePipeline::new(session.event_source(tab.clone()), options);
    pipeline.start()?;
    let stop = pipeline.stop_handle();

    let output = args.output.clone();
    let mut run = tokio::task::spawn_blocking(move || {
        let mut sink = OutputDir::new(output);
        pipeline.run(&mut sink).map(|report| (report, sink))
    });

    // From here on every exit path must stop the run and wait for it, or the
    // pages captured so far never reach the output directory
    let guard = stop.stop_on_drop();
    if let Err(e) = open_following_list(&session, &tab, &args) {
        drop(guard);
        match run.await {
            Ok(Ok((report, sink))) => print_outcome(&report, &sink),
            Ok(Err(save_error)) => log::error!("Failed to save capture: {}", save_error),
            Err(join_error) => log::error!("Capture task panicked: {}", join_error),
        }
        return Err(e);
    }
    guard.disarm();

    println!("Keep scrolling until the whole list is loaded.");
    print!("\n>>> Press Enter here (or Ctrl+C) to save the results...");
    let _ = std::io::stdout().flush();

    // A detached thread, so a lost connection does not leave shutdown waiting on stdin
    let (enter_tx, enter) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let _ = std::io::stdin().lock().read_line(&mut String::new());
        let _ = enter_tx.send(());
    });

    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!();
            stop.stop();
            None
        }
        _ = enter => {
            stop.stop();
            None
        }
        result = &mut run => Some(result),
    };

    let (report, sink) = match finished {
        Some(result) => result,
        None => run.await,
    }
    .context("capture task panicked")??;

    print_outcome(&report, &sink);
    Ok(())
}

/// Log in and open the following list while the capture is already listening
fn open_following_list(session: &BrowserSession, tab: &Tab, args: &CaptureArgs) -> anyhow::Result<()> {
    if args.ws_endpoint.is_none() {
        session.navigate(tab, HOME_URL)?;
    }
    if !args.skip_login {
        wait_for_enter("Log in in the browser, then press Enter to continue...")?;
    }

    match &args.sec_user_id {
        Some(id) => {
            let url = format!("{}user/{}?showTab=following", HOME_URL, id);
            println!("\nOpening following list: {}", url);
            session.navigate(tab, &url)?;
            if let Err(e) = session.wait_for_navigation(tab) {
                log::warn!("{}", e);
            }
        }
        None => println!("\nOpen your following list in the browser."),
    }

    Ok(())
}

fn print_outcome(report: &CaptureReport, sink: &OutputDir) {
    println!("\nCaptured {} users from {} pages", report.records.len(), report.request_count);
    if let Termination::ConnectionLost(reason) = &report.termination {
        println!("Browser connection was lost ({}); saved what was captured so far.", reason);
    }
    if report.stats.rejected + report.stats.decode_errors + report.stats.fetch_errors > 0 {
        println!(
            "Skipped pages: {} rejected, {} undecodable, {} not retrievable",
            report.stats.rejected, report.stats.decode_errors, report.stats.fetch_errors
        );
    }

    if sink.written().is_empty() {
        println!("No data captured. Check that you are logged in and scrolled the list.");
    } else {
        for path in sink.written() {
            println!("Saved {}", path.display());
        }
    }
}

fn run_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let (records, source) = load_records(&args.output)?;
    println!("Data source: {} ({} users)\n", source.display(), records.len());

    if args.prompt {
        let prompt = analysis::llm_prompt(&records);
        let path = args.output.join(PROMPT_FILE);
        std::fs::write(&path, &prompt)?;
        println!("LLM prompt saved to {} ({} chars)", path.display(), prompt.chars().count());
        println!("Paste it into a chat model to extract structured schedules.");
        return Ok(());
    }

    let report = analysis::analyze(&records);

    if args.json {
        let entries = report.entries();
        let path = args.output.join(SCHEDULE_JSON_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
        println!("Schedule users saved to {} ({} users)", path.display(), entries.len());
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("  Users with schedule information: {} / {}", report.schedule_users.len(), report.total);
    println!("{}\n", "=".repeat(60));
    print!("{}", report.render_schedules(100, false));

    println!("\n{}", "=".repeat(60));
    print!("{}", report.render_categories());

    if args.all {
        println!("\n\n{}", "=".repeat(60));
        println!("  Users without schedule information ({})", report.others.len());
        println!("{}\n", "=".repeat(60));
        print!("{}", report.render_others());
    }

    let path = args.output.join(SCHEDULE_SUMMARY_FILE);
    std::fs::write(&path, report.render_summary_file())?;
    println!("\nSchedule summary saved to {}", path.display());

    Ok(())
}
