use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nextbite_core::models::HistoryRange;
use nextbite_core::service::NextBiteService;

use super::helpers::{display_date, display_days, today, truncate};

pub(crate) fn cmd_history(svc: &NextBiteService, range: HistoryRange, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Item Type")]
        category: String,
        #[tabled(rename = "Days Ago")]
        days: String,
    }

    let rows = svc.history(range, today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("No history for this range");
        return Ok(());
    }

    let table_rows: Vec<HistoryRow> = rows
        .iter()
        .map(|r| HistoryRow {
            date: display_date(r.date),
            recipe: truncate(&r.recipe, 40),
            category: truncate(r.category.as_deref().unwrap_or(""), 20),
            days: display_days(r.days_ago),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
