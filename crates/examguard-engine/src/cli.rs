use crate::exam::{ExamError, ExamSession};
use crate::formatter::{format_exam, format_monitor};
use crate::monitor::MonitorView;
use std::error::Error;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type 'help' for a list of commands.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    Exam(#[from] ExamError),
}

/// One line of student input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    Next,
    Previous,
    GoTo(u32),
    /// Replaces the whole answer of the current question.
    Answer(String),
    Status,
    Dismiss,
    Submit,
    Help,
}

impl FromStr for ExamCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "next" | "n" => Ok(ExamCommand::Next),
            "prev" | "previous" | "p" => Ok(ExamCommand::Previous),
            "goto" | "go" => rest
                .parse()
                .map(ExamCommand::GoTo)
                .map_err(|_| CommandError::Usage("goto <question number>")),
            // The raw remainder keeps inner whitespace; an empty answer is allowed.
            "answer" | "a" => Ok(ExamCommand::Answer(rest.to_string())),
            "status" | "s" => Ok(ExamCommand::Status),
            "dismiss" => Ok(ExamCommand::Dismiss),
            "submit" => Ok(ExamCommand::Submit),
            "help" | "?" => Ok(ExamCommand::Help),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

const HELP: &str = "Commands:
  next | prev | goto <n>   move between questions
  answer <text>            replace the answer to the current question
  status                   show the exam and camera panels
  dismiss                  hide the current alert
  submit                   submit the exam
  exit | quit              leave";

/// Applies student commands to a running exam.
#[derive(Clone)]
pub struct ExamConsole {
    session: Arc<Mutex<ExamSession>>,
    monitor: Option<MonitorView>,
}

impl ExamConsole {
    pub fn new(session: Arc<Mutex<ExamSession>>) -> Self {
        Self {
            session,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: MonitorView) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub async fn execute(&self, command: ExamCommand) -> Result<String, CommandError> {
        let mut session = self.session.lock().await;
        match command {
            ExamCommand::Next => {
                session.next();
            }
            ExamCommand::Previous => {
                session.previous();
            }
            ExamCommand::GoTo(id) => session.go_to(id)?,
            ExamCommand::Answer(text) => session.answer(text)?,
            ExamCommand::Dismiss => session.dismiss_alert(),
            ExamCommand::Submit => {
                if !session.submit() {
                    return Ok("Exam was already submitted.".to_string());
                }
            }
            ExamCommand::Help => return Ok(HELP.to_string()),
            ExamCommand::Status => {
                let mut output = format_exam(&session);
                drop(session);
                if let Some(monitor) = &self.monitor {
                    output.push_str("\n\n");
                    output.push_str(&format_monitor(&monitor.status().await));
                }
                return Ok(output);
            }
        }
        Ok(format_exam(&session))
    }

    pub async fn execute_line(&self, line: &str) -> Result<String, CommandError> {
        let command: ExamCommand = line.parse()?;
        self.execute(command).await
    }

    pub async fn is_submitted(&self) -> bool {
        self.session.lock().await.is_submitted()
    }
}

#[derive(Clone, Copy)]
pub struct OutputHandlers {
    pub out: fn(&str),
    pub err: fn(&str),
}

pub struct FileOptions {
    pub stop_on_error: bool,
}

pub struct ReplOptions<'a> {
    pub banner_lines: &'a [&'a str],
    pub prompt: &'a str,
    pub exit_commands: &'a [&'a str],
    pub handle_ctrl_c: bool,
    pub ctrl_c_message: Option<&'a str>,
}

/// Runs the commands of a script file, one per line. `#` starts a comment.
pub async fn run_file(
    console: &ExamConsole,
    output: OutputHandlers,
    path: &str,
    options: FileOptions,
) -> Result<(), Box<dyn Error>> {
    let content = tokio::fs::read_to_string(path).await?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match console.execute_line(trimmed).await {
            Ok(result) => (output.out)(&result),
            Err(err) => {
                (output.err)(&format!("Error executing line '{}': {}", trimmed, err));
                if options.stop_on_error {
                    return Err(io::Error::other(err.to_string()).into());
                }
            }
        }
    }
    Ok(())
}

/// Possible outcomes from reading a single REPL line.
enum ReadLineResult {
    /// A non-empty input line to process.
    Input(String),
    /// Empty line or no input yet -- skip and re-prompt.
    Skip,
    /// EOF or exit command -- terminate the loop.
    Exit,
    /// I/O error while reading.
    Error(io::Error),
}

async fn read_line(
    reader: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    exit_commands: &[&str],
    handle_ctrl_c: bool,
    ctrl_c_message: Option<&str>,
    output: OutputHandlers,
) -> ReadLineResult {
    if handle_ctrl_c {
        tokio::select! {
            line = reader.next_line() => {
                classify_line(line, exit_commands)
            }
            _ = tokio::signal::ctrl_c() => {
                if let Some(message) = ctrl_c_message {
                    (output.out)(message);
                }
                ReadLineResult::Exit
            }
        }
    } else {
        classify_line(reader.next_line().await, exit_commands)
    }
}

fn classify_line(
    result: Result<Option<String>, io::Error>,
    exit_commands: &[&str],
) -> ReadLineResult {
    match result {
        Ok(Some(input)) => {
            let trimmed = input.trim().to_string();
            if trimmed.is_empty() {
                ReadLineResult::Skip
            } else if exit_commands.contains(&trimmed.as_str()) {
                ReadLineResult::Exit
            } else {
                ReadLineResult::Input(trimmed)
            }
        }
        Ok(None) => ReadLineResult::Exit,
        Err(e) => ReadLineResult::Error(e),
    }
}

pub async fn run_repl(
    console: &ExamConsole,
    output: OutputHandlers,
    options: ReplOptions<'_>,
) -> Result<(), Box<dyn Error>> {
    for line in options.banner_lines {
        (output.out)(line);
    }

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = io::stdout();

    loop {
        print!("{}", options.prompt);
        stdout.flush()?;

        match read_line(
            &mut reader,
            options.exit_commands,
            options.handle_ctrl_c,
            options.ctrl_c_message,
            output,
        )
        .await
        {
            ReadLineResult::Input(line) => match console.execute_line(&line).await {
                Ok(result) => (output.out)(&result),
                Err(err) => (output.err)(&format!("Error: {}", err)),
            },
            ReadLineResult::Skip => continue,
            ReadLineResult::Exit => break,
            ReadLineResult::Error(e) => return Err(e.into()),
        }
    }
    Ok(())
}
