use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use nextbite_core::service::NextBiteService;

use super::helpers::{exit_not_found, is_not_found, print_candidate_table, today, truncate};

pub(crate) fn cmd_recipe_add(
    svc: &NextBiteService,
    name: &str,
    category: &str,
    json: bool,
) -> Result<()> {
    let recipe = svc.add_recipe(name, category)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else if recipe.category.is_empty() {
        println!("Added recipe: {}", recipe.name);
    } else {
        println!("Added recipe: {} ({})", recipe.name, recipe.category);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_edit(
    svc: &NextBiteService,
    name: &str,
    new_name: Option<&str>,
    new_category: Option<&str>,
    json: bool,
) -> Result<()> {
    if new_name.is_none() && new_category.is_none() {
        bail!("Nothing to change. Pass --name and/or --category");
    }
    let recipe = match svc.edit_recipe(name, new_name, new_category) {
        Ok(r) => r,
        Err(e) if is_not_found(&e) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        println!("Updated recipe: {} ({})", recipe.name, recipe.category);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &NextBiteService, name: &str, json: bool) -> Result<()> {
    let recipe = match svc.delete_recipe(name) {
        Ok(r) => r,
        Err(e) if is_not_found(&e) => exit_not_found(&e.to_string(), json),
        Err(e) => return Err(e),
    };
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.name }));
    } else {
        println!("Deleted recipe: {}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &NextBiteService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "Recipe")]
        name: String,
        #[tabled(rename = "Item Type")]
        category: String,
    }

    let recipes = svc.list_recipes()?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        std::process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            name: truncate(&r.name, 40),
            category: truncate(&r.category, 20),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_categories(svc: &NextBiteService, json: bool) -> Result<()> {
    let categories = svc.categories()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }
    if categories.is_empty() {
        eprintln!("No categories found");
        return Ok(());
    }
    for category in &categories {
        println!("{category}");
    }
    Ok(())
}

pub(crate) fn cmd_browse(svc: &NextBiteService, category: &str, json: bool) -> Result<()> {
    let candidates = svc.recipes_in_category(category, today())?;
    if candidates.is_empty() {
        exit_not_found(&format!("No recipes in category '{category}'"), json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else {
        print_candidate_table(&candidates);
    }
    Ok(())
}
