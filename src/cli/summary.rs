use super::ui;
use crate::core::ValuationEngine;
use crate::core::portfolio::PortfolioSnapshot;
use crate::core::price::ResolvedPrice;
use crate::core::resolver::PriceResolver;
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Renders the per-lot table followed by the portfolio totals.
pub fn display_snapshot(snapshot: &PortfolioSnapshot, currency: &str) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Item"),
        ui::header_cell("Qty"),
        ui::header_cell(&format!("Cost ({currency})")),
        ui::header_cell(&format!("Price ({currency})")),
        ui::header_cell(&format!("Profit ({currency})")),
        ui::header_cell("Profit (%)"),
    ]);

    let mut rows: Vec<_> = snapshot.lots.iter().collect();
    rows.sort_by(|a, b| a.lot.item_name.cmp(&b.lot.item_name));

    for valuation in rows {
        let lot = &valuation.lot;
        let short_id: String = lot.id.to_string().chars().take(8).collect();
        let name = if lot.override_price().is_some() {
            format!(
                "{} {}",
                lot.item_name,
                ui::style_text("(manual)", ui::StyleType::Subtle)
            )
        } else {
            lot.item_name.clone()
        };

        let price = match valuation.price {
            ResolvedPrice::Value(p) => ui::number_cell(format!("{p:.2}")),
            ResolvedPrice::Unavailable(reason) => ui::unavailable_cell(reason),
        };
        let (profit, percent) = match (
            valuation.profit,
            valuation.profit_percent,
            valuation.trend(),
        ) {
            (Some(profit), Some(percent), Some(trend)) => (
                ui::trend_cell(format!("{profit:.2}"), trend),
                ui::trend_cell(format!("{percent:.2}%"), trend),
            ),
            _ => (ui::na_cell(), ui::na_cell()),
        };

        table.add_row(vec![
            Cell::new(short_id),
            Cell::new(name),
            ui::number_cell(lot.quantity.to_string()),
            ui::number_cell(format!("{:.2}", lot.unit_cost)),
            price,
            profit,
            percent,
        ]);
    }

    let trend = snapshot.trend();
    let mut output = format!(
        "{}\n\n",
        ui::style_text("Portfolio", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{}: {:.2} {currency}",
        ui::style_text("Total spent", ui::StyleType::TotalLabel),
        snapshot.total_spent
    ));
    output.push_str(&format!(
        "\n{}: {:.2} {currency}",
        ui::style_text("Total value", ui::StyleType::TotalLabel),
        snapshot.total_value
    ));
    output.push_str(&format!(
        "\n{}: {} ({})",
        ui::style_text("Profit", ui::StyleType::TotalLabel),
        ui::style_by_trend(&format!("{:.2} {currency}", snapshot.total_profit), trend),
        ui::style_by_trend(&format!("{:.2}%", snapshot.profit_percent), trend),
    ));

    let unresolved = snapshot.unresolved_count();
    if unresolved > 0 {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "{unresolved} lot(s) without a price, cost {:.2} {currency}",
                    snapshot.unresolved_cost
                ),
                ui::StyleType::Error
            )
        ));
    }

    output
}

/// One valuation pass over the stored lots: fetch with a progress bar,
/// print the table and record the day's history point.
pub async fn run(engine: &ValuationEngine, currency: &str) -> Result<PortfolioSnapshot> {
    let lots = engine.lots().list().await.context("Failed to load lots")?;
    if lots.is_empty() {
        println!(
            "{}",
            ui::style_text("No lots yet. Add one with `skinfolio add`.", ui::StyleType::Subtle)
        );
        return Ok(engine.resolve_all(&lots).await);
    }

    let pb = ui::new_progress_bar(PriceResolver::lookup_count(&lots) as u64, true);
    pb.set_message("Fetching prices...");
    let snapshot = engine
        .resolve_all_with_progress(&lots, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();

    println!("{}", display_snapshot(&snapshot, currency));
    engine
        .record_and_fetch_history()
        .await
        .context("Failed to record history")?;
    Ok(snapshot)
}
