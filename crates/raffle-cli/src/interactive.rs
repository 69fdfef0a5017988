//! Interactive terminal raffle.

use std::io::Write;
use std::path::PathBuf;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use tokio::sync::broadcast;

use raffle_core::RaffleError;
use raffle_core::types::pluralize;
use raffle_engine::{RaffleController, RaffleEvent};

const MENU: [&str; 6] = [
    "Draw winner",
    "Add participants",
    "Import CSV file",
    "Show winners",
    "Reset raffle",
    "Quit",
];

/// Run a blocking dialoguer prompt off the async runtime.
async fn prompt<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, dialoguer::Error> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

pub async fn run(controller: RaffleController) -> anyhow::Result<()> {
    let mut events = controller.subscribe();

    loop {
        print_status(&controller);

        let choice = prompt(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("What next?")
                .items(&MENU)
                .default(0)
                .interact()
        })
        .await?;

        match choice {
            0 => draw(&controller, &mut events).await?,
            1 => add_names(&controller).await?,
            2 => import_csv(&controller).await?,
            3 => print_winners(&controller),
            4 => reset(&controller).await?,
            _ => break,
        }
    }

    Ok(())
}

fn print_status(controller: &RaffleController) {
    let snapshot = controller.snapshot();
    println!();
    println!(
        "[{}] {} | {} | {}",
        snapshot.status,
        pluralize(snapshot.participant_count, "participant"),
        pluralize(snapshot.winners.len(), "winner"),
        snapshot.display_text
    );
    if let Some(notice) = snapshot.notice {
        println!("{notice}");
    }
}

async fn draw(
    controller: &RaffleController,
    events: &mut broadcast::Receiver<RaffleEvent>,
) -> anyhow::Result<()> {
    // Drop anything queued from earlier actions.
    while events.try_recv().is_ok() {}

    if !controller.start_draw() {
        println!("{}", controller.snapshot().draw_label);
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    let winner = loop {
        match events.recv().await {
            Ok(RaffleEvent::Highlight { name, .. }) => {
                print!("\r  {name:<40}");
                stdout.flush()?;
            }
            Ok(RaffleEvent::WinnerDrawn { name, .. }) => break Some(name),
            Ok(RaffleEvent::DrawAborted | RaffleEvent::Reset) => break None,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break None,
        }
    };

    let Some(name) = winner else {
        println!("\rDraw cancelled.{:<40}", "");
        return Ok(());
    };

    println!("\r{:<44}", "");
    println!("  *** Winner Selected! ***");
    println!("  {name}");
    println!();

    prompt(|| {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Close announcement?")
            .default(true)
            .show_default(false)
            .interact()
    })
    .await?;
    controller.acknowledge_winner();
    Ok(())
}

async fn add_names(controller: &RaffleController) -> anyhow::Result<()> {
    println!("Enter participant names, one per line. Empty line to finish.");
    let mut lines = Vec::new();
    loop {
        let line: String = prompt(|| {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("Name")
                .allow_empty(true)
                .interact_text()
        })
        .await?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }

    match controller.add_from_text(&lines.join("\n")) {
        Ok(added) => println!(
            "Added {added} ({} total).",
            controller.snapshot().participant_count
        ),
        Err(_) => println!("Nothing added."),
    }
    Ok(())
}

async fn import_csv(controller: &RaffleController) -> anyhow::Result<()> {
    let path: String = prompt(|| {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("CSV file")
            .interact_text()
    })
    .await?;

    match controller.import_csv_file(&PathBuf::from(path.trim())).await {
        Ok(_) | Err(RaffleError::NoValidNames) => {
            if let Some(feedback) = controller.snapshot().feedback {
                println!("{}", feedback.message);
            }
        }
        Err(e) => println!("Could not import: {e}"),
    }
    Ok(())
}

fn print_winners(controller: &RaffleController) {
    let winners = controller.numbered_winners();
    if winners.is_empty() {
        println!("No winners yet.");
        return;
    }
    println!("Winners History ({})", winners.len());
    for (number, winner) in &winners {
        println!(
            "  {:>3}. {}  ({})",
            number,
            winner.participant,
            winner.drawn_at.format("%H:%M:%S")
        );
    }
}

async fn reset(controller: &RaffleController) -> anyhow::Result<()> {
    let allowed = controller.snapshot().reset_allowed;
    let confirmed = allowed
        || prompt(|| {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Participants remain. Reset anyway?")
                .default(false)
                .interact()
        })
        .await?;

    if confirmed {
        controller.reset();
        println!("Raffle reset.");
    }
    Ok(())
}
