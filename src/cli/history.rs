use super::ui;
use crate::core::ValuationEngine;
use crate::core::history::{HistoryMetric, HistoryPoint};
use crate::core::portfolio::ProfitTrend;
use anyhow::Result;
use comfy_table::Cell;
use rust_decimal::Decimal;

const BAR_WIDTH: usize = 30;

/// Renders the daily series with a bar per day for the chosen metric.
pub fn display_history(points: &[HistoryPoint], metric: HistoryMetric, currency: &str) -> String {
    if points.is_empty() {
        return ui::style_text(
            "No history yet. Run `skinfolio summary` to record today's point.",
            ui::StyleType::Subtle,
        );
    }

    let mut table = ui::new_styled_table();
    let metric_header = match metric {
        HistoryMetric::Percent => "Profit (%)".to_string(),
        HistoryMetric::Absolute => format!("Profit ({currency})"),
    };
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Spent ({currency})")),
        ui::header_cell(&format!("Value ({currency})")),
        ui::header_cell(&metric_header),
        ui::header_cell(""),
    ]);

    let max_abs = points
        .iter()
        .map(|p| p.metric(metric).abs())
        .max()
        .unwrap_or(Decimal::ZERO);

    for point in points {
        let value = point.metric(metric);
        let trend = ProfitTrend::of(value);
        let formatted = match metric {
            HistoryMetric::Percent => format!("{value:.2}%"),
            HistoryMetric::Absolute => format!("{value:.2}"),
        };
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d").to_string()),
            ui::number_cell(format!("{:.2}", point.total_spent)),
            ui::number_cell(format!("{:.2}", point.total_value)),
            ui::trend_cell(formatted, trend),
            Cell::new(ui::style_by_trend(&ui::bar(value, max_abs, BAR_WIDTH), trend)),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Profit history", ui::StyleType::Title),
        table
    )
}

pub async fn run(engine: &ValuationEngine, metric: HistoryMetric, currency: &str) -> Result<()> {
    let points = engine.record_and_fetch_history().await?;
    println!("{}", display_history(&points, metric, currency));
    Ok(())
}
