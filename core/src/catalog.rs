use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::CatalogError;
use crate::history::last_eaten_by_recipe;
use crate::models::{Candidate, HistoryEntry, Recipe, name_key, same_name};

fn position(catalog: &[Recipe], name: &str) -> Option<usize> {
    catalog.iter().position(|r| same_name(&r.name, name))
}

#[must_use]
pub fn find_recipe<'a>(catalog: &'a [Recipe], name: &str) -> Option<&'a Recipe> {
    position(catalog, name).map(|i| &catalog[i])
}

/// Append a recipe. Names are trimmed and must be unique ignoring case.
pub fn add_recipe(
    catalog: &mut Vec<Recipe>,
    name: &str,
    category: &str,
) -> Result<Recipe, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    if let Some(existing) = find_recipe(catalog, name) {
        return Err(CatalogError::Duplicate(existing.name.clone()));
    }
    let recipe = Recipe::new(name, category.trim());
    catalog.push(recipe.clone());
    Ok(recipe)
}

/// Rename and/or re-categorize a recipe in place.
pub fn edit_recipe(
    catalog: &mut [Recipe],
    name: &str,
    new_name: Option<&str>,
    new_category: Option<&str>,
) -> Result<Recipe, CatalogError> {
    let idx = position(catalog, name).ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

    if let Some(new_name) = new_name {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let clash = catalog
            .iter()
            .enumerate()
            .find(|(i, r)| *i != idx && same_name(&r.name, new_name));
        if let Some((_, other)) = clash {
            return Err(CatalogError::Duplicate(other.name.clone()));
        }
        catalog[idx].name = new_name.to_string();
    }
    if let Some(category) = new_category {
        catalog[idx].category = category.trim().to_string();
    }
    Ok(catalog[idx].clone())
}

/// Remove a recipe. Its history rows are kept.
pub fn delete_recipe(catalog: &mut Vec<Recipe>, name: &str) -> Result<Recipe, CatalogError> {
    let idx = position(catalog, name).ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
    Ok(catalog.remove(idx))
}

/// Distinct non-blank categories in order of first appearance.
#[must_use]
pub fn categories(catalog: &[Recipe]) -> Vec<String> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .filter(|r| !r.category.trim().is_empty())
        .filter(|r| seen.insert(name_key(&r.category)))
        .map(|r| r.category.clone())
        .collect()
}

/// Every recipe of one category with its recency, in catalog order.
#[must_use]
pub fn recipes_in_category(
    catalog: &[Recipe],
    history: &[HistoryEntry],
    category: &str,
    today: NaiveDate,
) -> Vec<Candidate> {
    let last_eaten = last_eaten_by_recipe(history);
    catalog
        .iter()
        .filter(|r| same_name(&r.category, category))
        .map(|r| Candidate::from_recipe(r, last_eaten.get(&name_key(&r.name)).copied(), today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Vec<Recipe> {
        vec![
            Recipe::new("Idli", "Breakfast"),
            Recipe::new("Dosa", "Breakfast"),
            Recipe::new("Soup", "Dinner"),
        ]
    }

    #[test]
    fn test_add_recipe_trims() {
        let mut catalog = sample_catalog();
        let added = add_recipe(&mut catalog, "  Pongal ", " Breakfast ").unwrap();
        assert_eq!(added.name, "Pongal");
        assert_eq!(added.category, "Breakfast");
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_add_recipe_duplicate_ignores_case() {
        let mut catalog = sample_catalog();
        let err = add_recipe(&mut catalog, "idli", "Snack").unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("Idli".to_string()));
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_add_recipe_empty_name() {
        let mut catalog = sample_catalog();
        assert_eq!(
            add_recipe(&mut catalog, "   ", "Dinner").unwrap_err(),
            CatalogError::EmptyName
        );
    }

    #[test]
    fn test_add_recipe_blank_category_allowed() {
        let mut catalog = Vec::new();
        let added = add_recipe(&mut catalog, "Toast", "").unwrap();
        assert_eq!(added.category, "");
    }

    #[test]
    fn test_edit_recipe_rename_and_category() {
        let mut catalog = sample_catalog();
        let edited = edit_recipe(&mut catalog, "soup", Some("Tomato Soup"), Some("Lunch")).unwrap();
        assert_eq!(edited, Recipe::new("Tomato Soup", "Lunch"));
        assert_eq!(catalog[2], edited);
    }

    #[test]
    fn test_edit_recipe_same_name_different_case() {
        let mut catalog = sample_catalog();
        let edited = edit_recipe(&mut catalog, "Idli", Some("IDLI"), None).unwrap();
        assert_eq!(edited.name, "IDLI");
        assert_eq!(edited.category, "Breakfast");
    }

    #[test]
    fn test_edit_recipe_rename_clash() {
        let mut catalog = sample_catalog();
        let err = edit_recipe(&mut catalog, "Idli", Some("dosa"), None).unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("Dosa".to_string()));
        assert_eq!(catalog[0].name, "Idli");
    }

    #[test]
    fn test_edit_recipe_not_found() {
        let mut catalog = sample_catalog();
        assert_eq!(
            edit_recipe(&mut catalog, "Pizza", None, Some("Dinner")).unwrap_err(),
            CatalogError::NotFound("Pizza".to_string())
        );
    }

    #[test]
    fn test_delete_recipe() {
        let mut catalog = sample_catalog();
        let removed = delete_recipe(&mut catalog, "DOSA").unwrap();
        assert_eq!(removed.name, "Dosa");
        assert_eq!(catalog.len(), 2);
        assert!(delete_recipe(&mut catalog, "Dosa").is_err());
    }

    #[test]
    fn test_categories_distinct_in_order() {
        let mut catalog = sample_catalog();
        catalog.push(Recipe::new("Poha", "breakfast"));
        catalog.push(Recipe::new("Mystery", ""));
        assert_eq!(categories(&catalog), vec!["Breakfast", "Dinner"]);
    }

    #[test]
    fn test_recipes_in_category_with_recency() {
        let catalog = sample_catalog();
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        let history = vec![HistoryEntry::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            "Dosa",
            "Breakfast",
        )];

        let rows = recipes_in_category(&catalog, &history, "breakfast", today);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Idli");
        assert_eq!(rows[0].days_since, None);
        assert_eq!(rows[1].name, "Dosa");
        assert_eq!(rows[1].days_since, Some(3));
    }
}
