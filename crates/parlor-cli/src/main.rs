mod commands;
mod view;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use parlor_client::{ChannelReporter, ClientConfig, Session, SyncError};

use commands::{Command, HELP};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=info,parlor_client=info".into()),
        )
        .init();

    let config = ClientConfig::from_env()?;
    info!("Connecting to {} (push {})", config.api_url, config.push_url);

    let (reporter, mut reports) = ChannelReporter::new();
    let session = Session::connect(&config, Arc::new(reporter)).await?;

    // Render store changes as they land, whichever path they came from
    let store = session.store().clone();
    let mut changes = store.subscribe();
    let render_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(outcome) => {
                        if let Some(line) = store.read(|s| view::render(&outcome, s)) {
                            println!("{}", line);
                        }
                    }
                    Err(RecvError::Lagged(n)) => warn!("View lagged by {} changes", n),
                    Err(RecvError::Closed) => break,
                },
                report = reports.recv() => match report {
                    Some(report) => println!("! {}", report.message),
                    None => break,
                },
            }
        }
    });

    println!("{}", session.store().read(view::history).join("\n"));
    println!("you are {} -- /help for commands", session.author());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Some(Ok(command)) => command,
            Some(Err(e)) => {
                println!("! {}", e);
                continue;
            }
            None => continue,
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&session, command).await {
            // Request failures already reached the reporter
            if let SyncError::Validation(e) = e {
                println!("! {}", e);
            }
        }
    }

    render_task.abort();
    session.shutdown().await;
    Ok(())
}

async fn run(session: &Session, command: Command) -> Result<(), SyncError> {
    let reconciler = session.reconciler();
    match command {
        Command::Channels => {
            for line in session.store().read(view::channel_list) {
                println!("{}", line);
            }
        }
        Command::History => println!("{}", session.store().read(view::history).join("\n")),
        Command::Help => println!("{}", HELP),
        Command::Join(id) => reconciler.select_channel(id)?,
        Command::Create(name) => {
            reconciler.submit_new_channel(&name).await?;
        }
        Command::Rename(id, name) => reconciler.submit_rename(id, &name).await?,
        Command::Remove(id) => reconciler.submit_removal(id).await?,
        Command::Say(text) => {
            reconciler.send_to_current(session.author(), &text).await?;
        }
        Command::Quit => {}
    }
    Ok(())
}
