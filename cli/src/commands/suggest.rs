use anyhow::Result;

use nextbite_core::models::RecommendOptions;
use nextbite_core::service::NextBiteService;

use super::helpers::{print_candidate_table, today};

pub(crate) fn cmd_suggest(svc: &NextBiteService, min: usize, max: usize, json: bool) -> Result<()> {
    let options = RecommendOptions::new(min, max)?;
    let today = today();
    let suggestions = svc.suggestions(today, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        eprintln!("No recipes to suggest");
        eprintln!("Add some with: nextbite recipe add <name> --category <type>");
        return Ok(());
    }

    println!("Suggestions for {}:", today.format("%A, %d-%m-%Y"));
    print_candidate_table(&suggestions);
    println!("Save your choice with: nextbite pick \"<recipe>\"");
    Ok(())
}
