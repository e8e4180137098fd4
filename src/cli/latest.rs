use super::ui::{self, StyleType};
use crate::backfill::{BackfillEngine, LatestReport};
use crate::core::config::AppConfig;
use crate::core::source::RateSource;
use crate::core::store::RateStore;
use anyhow::Result;
use comfy_table::Table;

/// Currencies shown in the summary; the full table is stored regardless.
const HEADLINE: [&str; 5] = ["USD", "EUR", "JPY", "CNY", "GBP"];

/// Refreshes the latest cache and today's history row, then prints a summary.
pub async fn run(config: &AppConfig, source: &dyn RateSource, store: &dyn RateStore) -> Result<()> {
    let engine = BackfillEngine::new(source, store, &config.base);
    let report = engine.update_latest().await?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("Latest {} rates ({})", config.base, report.snapshot.date),
            StyleType::Title
        )
    );
    println!("{}", report_table(&report));
    println!(
        "{}",
        ui::style_text(
            &format!("{} currencies stored", report.snapshot.rates.len()),
            StyleType::Subtle
        )
    );
    Ok(())
}

pub fn report_table(report: &LatestReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Item"), ui::header_cell("Value")]);
    table.add_row(vec!["Cache updated".into(), ui::status_cell(report.cache_updated)]);
    table.add_row(vec![
        "History updated".into(),
        ui::status_cell(report.history_updated),
    ]);
    for code in HEADLINE {
        if let Some(rate) = report.snapshot.rates.get(code) {
            table.add_row(vec![code.into(), ui::rate_cell(*rate)]);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::{RateSnapshot, Rates};
    use chrono::NaiveDate;

    #[test]
    fn test_report_table_shows_headline_rates() {
        let report = LatestReport {
            snapshot: RateSnapshot {
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                base: "KRW".to_string(),
                rates: Rates::from([
                    ("USD".to_string(), 0.00075),
                    ("XAU".to_string(), 0.0000003),
                ]),
            },
            cache_updated: true,
            history_updated: false,
        };
        let rendered = report_table(&report).to_string();

        assert!(rendered.contains("USD"));
        assert!(rendered.contains("0.00075000"));
        assert!(!rendered.contains("XAU"));
        assert!(rendered.contains("no"));
    }
}
