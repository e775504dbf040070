use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    Aggregator, CourseArchive, CourseCommand, HttpCalculator, QpaSession, SessionEvent,
};
use storage::{SlotStore, Storage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod render;
mod settings;

use render::{render_courses, render_totals, HELP};
use settings::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "qpa", about = "Track courses and compute a weighted QPA")]
struct Cli {
    /// Extra settings file layered over `qpa.toml`
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    calculator_url: Option<String>,
    /// Compute totals locally without contacting the calculator
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the saved courses and totals, then exit
    Show,
    /// Forget the saved course list
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    if let Some(url) = cli.calculator_url {
        settings.calculator_url = url;
    }
    settings.offline |= cli.offline;

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Arc::new(
        Storage::new(&database_url)
            .await
            .with_context(|| format!("failed to open {database_url}"))?,
    );

    if let Some(Command::Reset) = cli.command {
        let removed = storage.clear_slot(&settings.slot_key).await?;
        println!(
            "{}",
            if removed {
                "saved courses cleared"
            } else {
                "nothing saved yet"
            }
        );
        return Ok(());
    }

    let aggregator = if settings.offline {
        Aggregator::local_only()
    } else {
        let calculator = HttpCalculator::with_timeout(
            &settings.calculator_url,
            Duration::from_millis(settings.calculator_timeout_ms),
        )?;
        info!(endpoint = calculator.endpoint(), "using remote calculator");
        Aggregator::new(Arc::new(calculator))
    };

    let archive = CourseArchive::new(storage, settings.slot_key.clone());
    let session = QpaSession::open(archive, aggregator).await;
    let mut events = session.subscribe();
    session.recalculate().await;

    print!("{}", render_courses(&session.courses().await));
    print!("{}", render_totals(&session.totals().await));
    if let Some(Command::Show) = cli.command {
        return Ok(());
    }

    println!("type `help` for commands");
    run_prompt(&session, &mut events).await
}

async fn run_prompt(
    session: &Arc<QpaSession>,
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                continue;
            }
            "list" => {
                print!("{}", render_courses(&session.courses().await));
                print!("{}", render_totals(&session.totals().await));
                continue;
            }
            _ => {}
        }

        let command = match CourseCommand::parse_line(line) {
            Ok(command) => command,
            Err(error) => {
                println!("{error}");
                continue;
            }
        };
        debug!(?command, "dispatching");
        let redraw = edits_row_in_place(&command);

        match session.dispatch(command).await {
            Ok(Some(recalculation)) => {
                if let Err(error) = recalculation.await {
                    tracing::error!(%error, "recalculation task failed");
                }
            }
            Ok(None) => {}
            Err(error) => {
                println!("{error}");
                continue;
            }
        }

        let mut redrawn = false;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::CoursesChanged(courses) => {
                    redrawn = true;
                    print!("{}", render_courses(&courses));
                }
                SessionEvent::TotalsUpdated(totals) => print!("{}", render_totals(&totals)),
            }
        }
        if redraw && !redrawn {
            print!("{}", render_courses(&session.courses().await));
        }
    }

    Ok(())
}

/// Edits the session does not announce as list changes; the terminal still
/// has to show the new value.
fn edits_row_in_place(command: &CourseCommand) -> bool {
    matches!(
        command,
        CourseCommand::SetCode(..) | CourseCommand::SetGrade(..)
    )
}
