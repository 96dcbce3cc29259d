use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use examguard_common::formatter::format_dashboard;
use examguard_common::protocol::Role;
use examguard_engine::camera::DirectoryCamera;
use examguard_engine::cli::{self, ExamConsole, FileOptions, OutputHandlers, ReplOptions};
use examguard_engine::client::DetectionClient;
use examguard_engine::config::{ConfigLoader, ExamGuardConfig, override_base_url};
use examguard_engine::dashboard::DashboardAggregator;
use examguard_engine::exam::{ExamRunner, ExamSession};
use examguard_engine::formatter::format_exam;
use examguard_engine::monitor::ProctoringMonitor;
use examguard_engine::service::HttpProctorService;
use examguard_engine::session::{StudentSession, login};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "examguard", version, about = "ExamGuard proctored exam client")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./examguard.yaml, then ~/.examguard/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Detection service base URL, overrides config and EXAMGUARD_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Take the exam under camera proctoring
    Student {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Directory of JPEG frames used as the camera
        #[arg(long, default_value = "frames")]
        frames: PathBuf,
        /// Script of exam commands to run instead of the interactive prompt
        #[arg(long)]
        file: Option<String>,
    },
    /// Watch the live dashboard of active students
    Admin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

const TICK: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the exam view on stdout stays readable.
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(url) = &args.api_url {
        override_base_url(&mut config, url)?;
    }

    let service = HttpProctorService::from_config(&config.service)?;
    info!("Detection service at {}", service.base_url());
    let client = DetectionClient::new(Arc::new(service));

    match args.mode {
        Mode::Student {
            email,
            password,
            frames,
            file,
        } => run_student(config, client, &email, &password, frames, file).await,
        Mode::Admin { email, password } => run_admin(config, client, &email, &password).await,
    }
}

async fn run_student(
    config: ExamGuardConfig,
    client: DetectionClient,
    email: &str,
    password: &str,
    frames: PathBuf,
    file: Option<String>,
) -> anyhow::Result<()> {
    let profile = login(email, password, Role::Student)?;
    let session = Arc::new(StudentSession::start(&profile));
    info!(
        student_id = %session.student_id,
        user = %profile.name,
        "Exam session started"
    );

    let exam = ExamSession::from_config(&config.exam)?;
    let (alert_tx, alert_rx) = mpsc::unbounded_channel();

    let mut camera = DirectoryCamera::new(frames);
    let mut monitor = ProctoringMonitor::new(
        client,
        session.clone(),
        config.proctoring.capture_interval(),
    )
    .with_alert_listener(alert_tx)
    .start(&mut camera)
    .await;

    let mut runner = ExamRunner::start(exam, TICK, alert_rx);
    let console = ExamConsole::new(runner.session()).with_monitor(monitor.view());

    let output = OutputHandlers {
        out: |msg| println!("{}", msg),
        err: |msg| eprintln!("{}", msg),
    };

    let result = match file {
        Some(path) => cli::run_file(
            &console,
            output,
            &path,
            FileOptions {
                stop_on_error: true,
            },
        )
        .await
        .map_err(|e| anyhow!("Error executing file {}: {}", path, e)),
        None => {
            let opening = console
                .execute_line("status")
                .await
                .unwrap_or_else(|e| e.to_string());
            println!("{}", opening);
            cli::run_repl(
                &console,
                output,
                ReplOptions {
                    banner_lines: &[
                        "Type 'help' for commands, 'exit' or 'quit' to leave.",
                        "Leaving does not submit the exam.",
                    ],
                    prompt: "exam> ",
                    exit_commands: &["exit", "quit"],
                    handle_ctrl_c: true,
                    ctrl_c_message: Some("Interrupted."),
                },
            )
            .await
            .map_err(|e| anyhow!("Error during exam: {}", e))
        }
    };

    // The camera is released whether or not the session ended cleanly.
    monitor.stop().await;
    runner.stop().await;

    let exam = runner.session();
    let exam = exam.lock().await;
    if !exam.is_submitted() {
        warn!("Leaving without submitting the exam");
    }
    println!("{}", format_exam(&exam));
    result
}

async fn run_admin(
    config: ExamGuardConfig,
    client: DetectionClient,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let profile = login(email, password, Role::Admin)?;
    info!(user = %profile.name, "Admin dashboard opened");
    let evidence = client.evidence_list().await;
    info!("{} evidence images on record", evidence.len());

    let mut dashboard =
        DashboardAggregator::new(client, config.dashboard.poll_interval()).start();
    let mut updates = dashboard.subscribe();
    println!("{}", format_dashboard(None));

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(view) => println!("\n{}", format_dashboard(view.entries())),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} dashboard updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down dashboard");
                break;
            }
        }
    }

    dashboard.stop();
    Ok(())
}
