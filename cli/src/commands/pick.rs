use anyhow::Result;

use nextbite_core::service::NextBiteService;

use super::helpers::{display_date, exit_not_found, is_not_found, parse_date};

pub(crate) fn cmd_pick(
    svc: &NextBiteService,
    recipe: &str,
    date: Option<String>,
    replace: bool,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let entry = match svc.save_pick(recipe, date, replace) {
        Ok(entry) => entry,
        Err(e) if is_not_found(&e) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Saved {} for {}", entry.recipe, display_date(entry.date));
    }
    Ok(())
}

pub(crate) fn cmd_today(svc: &NextBiteService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let Some(entry) = svc.todays_pick(date)? else {
        exit_not_found(
            &format!("No pick saved for {}", display_date(Some(date))),
            json,
        );
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        match entry.category.as_deref() {
            Some(category) if !category.is_empty() => {
                println!("{}: {} ({category})", display_date(entry.date), entry.recipe);
            }
            _ => println!("{}: {}", display_date(entry.date), entry.recipe),
        }
    }
    Ok(())
}

pub(crate) fn cmd_unpick(svc: &NextBiteService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let removed = match svc.remove_todays_pick(date) {
        Ok(n) => n,
        Err(e) if is_not_found(&e) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e),
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "date": date, "removed": removed })
        );
    } else {
        println!("Removed pick for {}", display_date(Some(date)));
    }
    Ok(())
}
