//! Connect command - attach stdin/stdout to a backend

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use termext_core::{ConnectionState, ExtensionConnection, StartupInfo};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::Context;

/// How long a backend may take to open its channel
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(
    ctx: &Context,
    id: Uuid,
    rows: Option<u32>,
    columns: Option<u32>,
) -> Result<()> {
    let registry = ctx.registry().await;
    let Some(factory) = registry.get_factory(id) else {
        anyhow::bail!("No backend with id {} in catalog '{}'", id, ctx.catalog_name);
    };

    let startup = StartupInfo::default().with_size(
        rows.unwrap_or(ctx.settings.default_rows),
        columns.unwrap_or(ctx.settings.default_columns),
    );
    let connection = factory.create(startup);

    connection.on_output(|text: &String| {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    });
    let (disconnected_tx, mut disconnected_rx) = mpsc::unbounded_channel();
    connection.on_disconnected(move |_: &()| {
        let _ = disconnected_tx.send(());
    });

    eprintln!(
        "{} {}",
        "Connecting to".blue(),
        factory.name().cyan().bold()
    );
    connection.start()?;
    wait_until_open(&connection).await?;
    info!("Connected to {}", connection.service_identifier());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = disconnected_rx.recv() => {
                debug!("Backend disconnected");
                break;
            }
            line = stdin.next_line() => match line? {
                Some(line) => connection.write_input(&format!("{}\n", line)),
                None => {
                    debug!("stdin closed");
                    break;
                }
            },
        }
    }

    connection.close();

    match connection.failure_reason() {
        Some(reason) => anyhow::bail!("Backend failed: {}", reason),
        None => {
            eprintln!("{}", "Disconnected".dimmed());
            Ok(())
        }
    }
}

async fn wait_until_open(connection: &ExtensionConnection) -> Result<()> {
    let mut states = connection.state_changes();
    let settled = tokio::time::timeout(
        OPEN_TIMEOUT,
        states.wait_for(|state| *state != ConnectionState::Connecting),
    )
    .await
    .map(|changed| changed.map(|state| *state));

    let state = match settled {
        Ok(Ok(state)) => state,
        Ok(Err(_)) => connection.state(),
        Err(_) => {
            connection.close();
            anyhow::bail!("Backend did not open within {:?}", OPEN_TIMEOUT);
        }
    };

    match state {
        ConnectionState::Open => Ok(()),
        state => anyhow::bail!(
            "Backend could not be opened ({}): {}",
            state,
            connection.failure_reason().unwrap_or_default()
        ),
    }
}
