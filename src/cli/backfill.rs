use super::ui::{self, StyleType};
use crate::backfill::{BackfillEngine, BackfillReport, BackfillRequest};
use crate::core::config::AppConfig;
use crate::core::source::RateSource;
use crate::core::store::RateStore;
use crate::core::window::past_dates;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Table;

/// Backfills the configured window ending the day before `today` and prints a
/// summary.
pub async fn run(
    config: &AppConfig,
    today: NaiveDate,
    source: &dyn RateSource,
    store: &dyn RateStore,
) -> Result<()> {
    let dates = past_dates(today, config.backfill.days);
    let request = BackfillRequest::from_config(dates, &config.backfill)?;

    let pb = ui::new_progress_bar(request.dates.len() as u64, true);
    pb.set_message(format!("Fetching {} rates", config.base));
    let engine = BackfillEngine::new(source, store, &config.base).with_progress(pb.clone());
    let report = engine.run(&request).await;
    pb.finish_and_clear();

    println!(
        "\n{}",
        ui::style_text(&format!("Backfill {}", config.base), StyleType::Title)
    );
    println!("{}", report_table(&report));
    if report.failed_chunks > 0 {
        println!(
            "{}",
            ui::style_text(
                "Some chunks failed to commit; re-run to fill the gaps.",
                StyleType::Error
            )
        );
    }
    Ok(())
}

pub fn report_table(report: &BackfillReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Count")]);
    table.add_row(vec!["Dates requested".into(), ui::count_cell(report.requested, false)]);
    table.add_row(vec!["Chunks".into(), ui::count_cell(report.chunks, false)]);
    table.add_row(vec!["Stored".into(), ui::count_cell(report.stored, false)]);
    table.add_row(vec!["Skipped".into(), ui::count_cell(report.skipped, false)]);
    table.add_row(vec!["Uncommitted".into(), ui::count_cell(report.uncommitted, true)]);
    table.add_row(vec![
        "Failed commits".into(),
        ui::count_cell(report.failed_chunks, true),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_table_lists_every_counter() {
        let report = BackfillReport {
            requested: 12,
            chunks: 3,
            stored: 9,
            skipped: 1,
            uncommitted: 2,
            failed_chunks: 1,
        };
        let rendered = report_table(&report).to_string();

        for label in [
            "Dates requested",
            "Chunks",
            "Stored",
            "Skipped",
            "Uncommitted",
            "Failed commits",
        ] {
            assert!(rendered.contains(label), "missing {label}");
        }
        assert!(rendered.contains("12"));
    }
}
