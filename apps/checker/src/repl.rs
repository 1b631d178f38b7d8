use std::future::Future;
use std::io::Write;

use anyhow::Result;
use stock::{KvBackend, QuoteSource};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info};

use crate::app::App;
use crate::command::{self, Command};

/// Drive `app` from prompt lines until `quit`, end of input or `shutdown`.
///
/// Fetch outcomes are applied as they arrive, in between commands. At end of
/// input, outstanding fetches are waited for and the table is shown once more.
pub async fn run<S, B, R, W>(
    app: &mut App<S, B>,
    input: R,
    out: &mut W,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    S: QuoteSource + 'static,
    B: KvBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    write!(out, "{}", app.render())?;
    out.flush()?;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            Some(outcome) = app.next_outcome() => {
                let symbol = outcome.symbol.clone();
                if let Err(e) = app.apply(outcome).await {
                    error!(error = ?e, %symbol, "session write failed");
                }
                write!(out, "{}", app.render())?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    if let Err(e) = app.settle().await {
                        error!(error = ?e, "session write failed");
                    }
                    write!(out, "{}", app.render())?;
                    break;
                };

                match command::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => handle(app, cmd, out).await?,
                    Err(e) => write!(out, "{e}")?,
                }
            }
        }
        out.flush()?;
    }

    out.flush()?;
    Ok(())
}

async fn handle<S, B, W>(app: &mut App<S, B>, cmd: Command, out: &mut W) -> Result<()>
where
    S: QuoteSource + 'static,
    B: KvBackend,
    W: Write,
{
    match cmd {
        Command::Add { symbols } => {
            let symbols = command::split_symbols(&symbols);
            if symbols.is_empty() {
                writeln!(out, "No valid symbols provided.")?;
                return Ok(());
            }

            info!(count = symbols.len(), symbols = %symbols.join(", "), "add");
            for symbol in &symbols {
                app.request_fetch(symbol);
            }
            write!(out, "{}", app.render())?;
        }
        Command::Toggle { field } => {
            let offered = app.state().candidate_fields().any(|k| k == field);
            match app.toggle_field(&field).await {
                Ok(_) if !offered => {
                    writeln!(out, "Note: {field} is not a field of the current quotes.")?;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, %field, "toggle failed");
                    writeln!(out, "Toggle failed: {e:#}")?;
                }
            }
            write!(out, "{}", app.render())?;
        }
        Command::Fields => write!(out, "{}", app.render_fields())?,
        Command::Table => write!(out, "{}", app.render())?,
        Command::Export => match app.export() {
            Ok(path) => writeln!(out, "Exported to {}", path.display())?,
            Err(e) => {
                error!(error = ?e, "export failed");
                writeln!(out, "Export failed: {e:#}")?;
            }
        },
        Command::Quit => {}
    }

    Ok(())
}
