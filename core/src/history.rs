use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::HistoryError;
use crate::models::{HistoryEntry, HistoryRange, HistoryView, Recipe, days_between, name_key};

/// Most recent dated pick per recipe, keyed by [`name_key`]. Undated rows are ignored.
#[must_use]
pub fn last_eaten_by_recipe(history: &[HistoryEntry]) -> HashMap<String, NaiveDate> {
    let mut last: HashMap<String, NaiveDate> = HashMap::new();
    for entry in history {
        let Some(date) = entry.date else { continue };
        last.entry(name_key(&entry.recipe))
            .and_modify(|d| *d = (*d).max(date))
            .or_insert(date);
    }
    last
}

/// The latest dated entry. Among entries sharing that date the one stored last wins.
#[must_use]
pub fn most_recent_entry(history: &[HistoryEntry]) -> Option<&HistoryEntry> {
    history
        .iter()
        .filter(|e| e.date.is_some())
        .max_by_key(|e| e.date)
}

/// Today's pick. With several rows for the same date the one stored last wins.
#[must_use]
pub fn todays_pick(history: &[HistoryEntry], today: NaiveDate) -> Option<&HistoryEntry> {
    history.iter().rev().find(|e| e.date == Some(today))
}

/// Fill in missing categories from the catalog. Unknown recipes stay `None`.
pub fn backfill_categories(history: &mut [HistoryEntry], catalog: &[Recipe]) {
    let by_name: HashMap<String, &str> = catalog
        .iter()
        .map(|r| (name_key(&r.name), r.category.as_str()))
        .collect();
    for entry in history.iter_mut().filter(|e| e.category.is_none()) {
        if let Some(category) = by_name.get(&name_key(&entry.recipe)) {
            entry.category = Some((*category).to_string());
        }
    }
}

/// Entries inside `range`, newest first, undated rows last.
#[must_use]
pub fn entries_in_range(
    history: &[HistoryEntry],
    range: HistoryRange,
    today: NaiveDate,
) -> Vec<HistoryView> {
    let mut rows: Vec<HistoryView> = history
        .iter()
        .filter(|e| range.contains(e.date, today))
        .map(|e| HistoryView {
            date: e.date,
            recipe: e.recipe.clone(),
            category: e.category.clone(),
            days_ago: e.date.map(|d| days_between(d, today)),
        })
        .collect();
    // Option orders None first; reverse puts the newest dates first and None last.
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

/// Save a pick, keeping at most one entry per date.
///
/// Fails when the date already has an entry unless `replace` is set, in which
/// case all existing rows for that date are dropped first.
pub fn record_pick(
    history: &mut Vec<HistoryEntry>,
    entry: HistoryEntry,
    replace: bool,
) -> Result<(), HistoryError> {
    if let Some(date) = entry.date {
        if let Some(existing) = todays_pick(history, date) {
            if !replace {
                return Err(HistoryError::AlreadyPicked {
                    date,
                    recipe: existing.recipe.clone(),
                });
            }
            remove_entries_on(history, date);
        }
    }
    history.push(entry);
    Ok(())
}

/// Drop every entry dated `date`, returning how many were removed.
pub fn remove_entries_on(history: &mut Vec<HistoryEntry>, date: NaiveDate) -> usize {
    let before = history.len();
    history.retain(|e| e.date != Some(date));
    before - history.len()
}
