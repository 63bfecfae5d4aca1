use super::{summary, ui};
use crate::core::ValuationEngine;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Re-values the portfolio every `interval`, sharing one price cache across
/// passes. `r` + Enter clears the cache and re-values now, `q` quits.
pub async fn run(engine: &ValuationEngine, interval: Duration, currency: &str) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                pass(engine, currency).await?;
            }
            line = stdin.next_line() => {
                match line.context("Failed to read from stdin")? {
                    Some(cmd) if cmd.trim().eq_ignore_ascii_case("r") => {
                        engine.clear_cache().await;
                        pass(engine, currency).await?;
                        ticker.reset();
                    }
                    Some(cmd) if cmd.trim().eq_ignore_ascii_case("q") => break,
                    None => break,
                    Some(other) => debug!("Ignoring input {:?}", other),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

async fn pass(engine: &ValuationEngine, currency: &str) -> Result<()> {
    ui::print_separator();
    if let Err(e) = summary::run(engine, currency).await {
        warn!("Valuation pass failed: {e:#}");
    }

    let next = engine
        .resolver()
        .cache()
        .refresh_due_in()
        .await
        .map(|left| format!("cached prices expire in {}s", left.num_seconds()))
        .unwrap_or_else(|| "nothing cached".to_string());
    println!(
        "\n{}",
        ui::style_text(
            &format!("{next}. [r] refresh now, [q] quit"),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
