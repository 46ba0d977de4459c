use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nextbite_core::error::{CatalogError, HistoryError};
use nextbite_core::models::Candidate;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            "tomorrow" => Ok(today() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Dates are shown day-first, the way the planner always displayed them.
pub(crate) fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

pub(crate) fn display_days(days: Option<i64>) -> String {
    days.map(|d| d.to_string()).unwrap_or_default()
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Errors that mean "nothing there" rather than failure; reported with exit 2.
pub(crate) fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::NotFound(_))
    ) || matches!(
        err.downcast_ref::<HistoryError>(),
        Some(HistoryError::NothingPicked(_))
    )
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn print_candidate_table(candidates: &[Candidate]) {
    #[derive(Tabled)]
    struct CandidateRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Recipe")]
        name: String,
        #[tabled(rename = "Item Type")]
        category: String,
        #[tabled(rename = "Last Eaten")]
        last_eaten: String,
        #[tabled(rename = "Days Ago")]
        days: String,
    }

    let rows: Vec<CandidateRow> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateRow {
            idx: i + 1,
            name: truncate(&c.name, 40),
            category: truncate(&c.category, 20),
            last_eaten: display_date(c.last_eaten),
            days: display_days(c.days_since),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        assert_eq!(parse_date(None).unwrap(), today());
    }

    #[test]
    fn test_parse_date_keywords() {
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today());
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today() - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today() + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_display_date_day_first() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(display_date(date), "09-03-2024");
        assert_eq!(display_date(None), "");
    }

    #[test]
    fn test_display_days() {
        assert_eq!(display_days(Some(12)), "12");
        assert_eq!(display_days(None), "");
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(json_error("bad \"name\""), r#"{"error":"bad \"name\""}"#);
    }

    #[test]
    fn test_is_not_found() {
        let missing = anyhow::Error::new(CatalogError::NotFound("Pizza".to_string()));
        assert!(is_not_found(&missing));
        let nothing = anyhow::Error::new(HistoryError::NothingPicked(today()));
        assert!(is_not_found(&nothing));
        let duplicate = anyhow::Error::new(CatalogError::Duplicate("Pizza".to_string()));
        assert!(!is_not_found(&duplicate));
        assert!(!is_not_found(&anyhow::anyhow!("disk full")));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée tart", 10), "Crème b...");
        assert_eq!(truncate("Pongal", 10), "Pongal");
    }
}
