use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, Settings},
    export::save_transcript,
    Controller, ControllerEvent, EffectRunner, LocalFile, ProgressAction, StreamPhase,
    TranscriptionClient, ViewModel,
};
use shared::domain::ViewState;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Upload an audio file and follow its transcription")]
struct Args {
    /// Audio file to transcribe (WAV, MP3, OGG, FLAC or M4A).
    file: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// File or directory to save the transcript to. Printed to stdout when
    /// omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[arg(long)]
    settle_delay_ms: Option<u64>,
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(server_url) = &self.server_url {
            settings.server_url = server_url.clone();
        }
        if let Some(delay) = self.settle_delay_ms {
            settings.settle_delay_ms = delay;
        }
    }
}

/// Turns successive view projections into terminal lines, printing only what
/// changed since the previous projection.
#[derive(Debug, Default)]
struct ProgressPrinter {
    printed_file: bool,
    last_status: Option<String>,
    last_percent: Option<u32>,
    printed_log: usize,
}

impl ProgressPrinter {
    fn lines(&mut self, view: &ViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(info) = &view.file_info {
            if !self.printed_file {
                self.printed_file = true;
                lines.push(format!("{} ({})", info.name, info.size_text));
                if let Some(advisory) = &info.advisory {
                    lines.push(advisory.clone());
                }
            }
        }
        let Some(progress) = &view.progress else {
            return lines;
        };

        let percent = progress.percent.round() as u32;
        if self.last_status.as_deref() != Some(progress.status_text.as_str())
            || self.last_percent != Some(percent)
        {
            let mut line = format!("[{percent:>3}%] {}", progress.status_text);
            if let Some(counter) = progress.counter_text() {
                line.push_str(&format!(" ({counter})"));
            }
            lines.push(line);
            self.last_status = Some(progress.status_text.clone());
            self.last_percent = Some(percent);
        }
        if progress.log.len() < self.printed_log {
            self.printed_log = 0;
        }
        for entry in &progress.log[self.printed_log..] {
            lines.push(format!("  {}", entry.text));
        }
        self.printed_log = progress.log.len();
        lines
    }
}

fn is_settled(controller: &Controller) -> bool {
    match controller.state() {
        ViewState::Completed | ViewState::Failed | ViewState::Idle => true,
        ViewState::Streaming => controller
            .session()
            .is_some_and(|session| session.phase == StreamPhase::Interrupted),
        ViewState::FileStaged | ViewState::Uploading => false,
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut settings = load_settings();
    args.apply_to(&mut settings);
    info!(server_url = %settings.server_url, "using transcription server");

    let client = TranscriptionClient::new(&settings.server_url)?
        .with_upload_timeout(settings.request_timeout());
    let local = LocalFile::from_path(&args.file)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut runner = EffectRunner::new(client, tx);
    let mut controller = Controller::new(settings.settle_delay());
    let mut printer = ProgressPrinter::default();

    runner.apply_all(controller.dispatch(ControllerEvent::Stage(local)));
    print_lines(&mut printer, &controller);
    runner.apply_all(controller.dispatch(ControllerEvent::StartUpload));

    while !is_settled(&controller) {
        print_lines(&mut printer, &controller);
        let event = tokio::select! {
            event = rx.recv() => event,
            _ = tokio::signal::ctrl_c() => Some(ControllerEvent::Cancel),
        };
        let Some(event) = event else {
            break;
        };
        runner.apply_all(controller.dispatch(event));
    }
    print_lines(&mut printer, &controller);

    let view = ViewModel::project(&controller);
    match controller.state() {
        ViewState::Completed => {
            let transcript = controller.transcript().unwrap_or_default();
            match &args.output {
                Some(target) => {
                    let source = controller
                        .session()
                        .and_then(|session| session.source_name.as_deref());
                    let path = save_transcript(target, source, transcript)
                        .await
                        .context("could not save transcript")?;
                    println!("Transcript saved to {}", path.display());
                }
                None => println!("\n{transcript}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        ViewState::Failed => {
            if let Some(error) = &view.error {
                eprintln!("Error: {}", error.message);
            }
            Ok(ExitCode::FAILURE)
        }
        ViewState::Idle => {
            warn!("transcription cancelled");
            Ok(ExitCode::FAILURE)
        }
        _ => {
            if view
                .progress
                .as_ref()
                .is_some_and(|progress| progress.action == ProgressAction::Back)
            {
                let preview = view
                    .progress
                    .as_ref()
                    .map(|progress| progress.preview.as_str())
                    .unwrap_or_default();
                if !preview.is_empty() {
                    println!("\nPartial transcript:\n{preview}");
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_lines(printer: &mut ProgressPrinter, controller: &Controller) {
    for line in printer.lines(&ViewModel::project(controller)) {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    run(Args::parse()).await
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
