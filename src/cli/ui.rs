use crate::core::UnavailableReason;
use crate::core::portfolio::ProfitTrend;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    Gain,
    Loss,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::Gain => style(text).green().bold(),
        StyleType::Loss => style(text).red().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Styles a figure by the sign of its profit.
pub fn style_by_trend(text: &str, trend: ProfitTrend) -> String {
    match trend {
        ProfitTrend::Gain => style_text(text, StyleType::Gain),
        ProfitTrend::Loss => style_text(text, StyleType::Loss),
        ProfitTrend::Flat => style_text(text, StyleType::TotalLabel),
    }
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned money or count cell.
pub fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Cell colored green, red or left plain according to `trend`.
pub fn trend_cell(text: String, trend: ProfitTrend) -> Cell {
    let cell = Cell::new(text).set_alignment(CellAlignment::Right);
    match trend {
        ProfitTrend::Gain => cell.fg(Color::Green),
        ProfitTrend::Loss => cell.fg(Color::Red),
        ProfitTrend::Flat => cell,
    }
}

/// Cell explaining why there is no price.
pub fn unavailable_cell(reason: UnavailableReason) -> Cell {
    let color = match reason {
        UnavailableReason::ConnectionError => Color::Yellow,
        UnavailableReason::InvalidName | UnavailableReason::NoListings => Color::Red,
    };
    Cell::new(format!("N/A ({reason})")).fg(color)
}

/// Creates a cell for "N/A" values.
pub fn na_cell() -> Cell {
    Cell::new("N/A")
        .fg(Color::DarkGrey)
        .set_alignment(CellAlignment::Right)
}

/// A horizontal bar proportional to `value / max_abs`, for history charts.
pub fn bar(value: Decimal, max_abs: Decimal, width: usize) -> String {
    if max_abs.is_zero() {
        return String::new();
    }
    let ratio = (value.abs() / max_abs).min(Decimal::ONE);
    let cells = (ratio * Decimal::from(width))
        .round()
        .to_usize()
        .unwrap_or(0);
    "█".repeat(cells)
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
