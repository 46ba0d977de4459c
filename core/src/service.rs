use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use rand::Rng;

use crate::catalog;
use crate::error::{CatalogError, HistoryError};
use crate::history::{self, backfill_categories};
use crate::models::{
    Candidate, HistoryEntry, HistoryRange, HistoryView, Recipe, RecommendOptions,
};
use crate::recommend::recommend;
use crate::store::Store;

/// One method per user action. Each call reads the files it needs, computes,
/// and writes back, so nothing is cached between calls.
pub struct NextBiteService {
    store: Store,
}

impl NextBiteService {
    pub fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            store: Store::open(data_dir)?,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    // --- Catalog ---

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Ok(self.store.load_catalog()?.rows)
    }

    pub fn add_recipe(&self, name: &str, category: &str) -> Result<Recipe> {
        let mut snapshot = self.store.load_catalog()?;
        let recipe = catalog::add_recipe(&mut snapshot.rows, name, category)?;
        self.store
            .save_catalog(&snapshot.rows, snapshot.version.as_deref())?;
        tracing::info!(recipe = %recipe.name, category = %recipe.category, "added recipe");
        Ok(recipe)
    }

    pub fn edit_recipe(
        &self,
        name: &str,
        new_name: Option<&str>,
        new_category: Option<&str>,
    ) -> Result<Recipe> {
        let mut snapshot = self.store.load_catalog()?;
        let recipe = catalog::edit_recipe(&mut snapshot.rows, name, new_name, new_category)?;
        self.store
            .save_catalog(&snapshot.rows, snapshot.version.as_deref())?;
        tracing::info!(from = %name, recipe = %recipe.name, "edited recipe");
        Ok(recipe)
    }

    pub fn delete_recipe(&self, name: &str) -> Result<Recipe> {
        let mut snapshot = self.store.load_catalog()?;
        let recipe = catalog::delete_recipe(&mut snapshot.rows, name)?;
        self.store
            .save_catalog(&snapshot.rows, snapshot.version.as_deref())?;
        tracing::info!(recipe = %recipe.name, "deleted recipe");
        Ok(recipe)
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        Ok(catalog::categories(&self.list_recipes()?))
    }

    pub fn recipes_in_category(&self, category: &str, today: NaiveDate) -> Result<Vec<Candidate>> {
        let recipes = self.list_recipes()?;
        let entries = self.store.load_history()?.rows;
        Ok(catalog::recipes_in_category(
            &recipes, &entries, category, today,
        ))
    }

    // --- Suggestions ---

    pub fn suggestions(
        &self,
        today: NaiveDate,
        options: RecommendOptions,
    ) -> Result<Vec<Candidate>> {
        self.suggestions_with_rng(today, options, &mut rand::rng())
    }

    pub fn suggestions_with_rng<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        options: RecommendOptions,
        rng: &mut R,
    ) -> Result<Vec<Candidate>> {
        let recipes = self.list_recipes()?;
        let entries = self.store.load_history()?.rows;
        Ok(recommend(&recipes, &entries, today, options, rng))
    }

    // --- History ---

    fn history_with_categories(&self) -> Result<Vec<HistoryEntry>> {
        let recipes = self.list_recipes()?;
        let mut entries = self.store.load_history()?.rows;
        backfill_categories(&mut entries, &recipes);
        Ok(entries)
    }

    pub fn history(&self, range: HistoryRange, today: NaiveDate) -> Result<Vec<HistoryView>> {
        let entries = self.history_with_categories()?;
        Ok(history::entries_in_range(&entries, range, today))
    }

    pub fn todays_pick(&self, today: NaiveDate) -> Result<Option<HistoryEntry>> {
        let entries = self.history_with_categories()?;
        Ok(history::todays_pick(&entries, today).cloned())
    }

    /// Record `recipe` as the pick for `today`, using the catalog's spelling and category.
    pub fn save_pick(&self, recipe: &str, today: NaiveDate, replace: bool) -> Result<HistoryEntry> {
        let recipes = self.list_recipes()?;
        let found = catalog::find_recipe(&recipes, recipe)
            .ok_or_else(|| CatalogError::NotFound(recipe.to_string()))?;
        let entry = HistoryEntry::new(today, found.name.clone(), found.category.clone());

        let mut snapshot = self.store.load_history()?;
        history::record_pick(&mut snapshot.rows, entry.clone(), replace)?;
        self.store
            .save_history(&snapshot.rows, snapshot.version.as_deref())?;
        tracing::info!(recipe = %entry.recipe, date = %today, "saved pick");
        Ok(entry)
    }

    /// Remove every history row dated `today`. Returns how many were removed.
    pub fn remove_todays_pick(&self, today: NaiveDate) -> Result<usize> {
        let mut snapshot = self.store.load_history()?;
        let removed = history::remove_entries_on(&mut snapshot.rows, today);
        if removed == 0 {
            return Err(HistoryError::NothingPicked(today).into());
        }
        self.store
            .save_history(&snapshot.rows, snapshot.version.as_deref())?;
        tracing::info!(removed, date = %today, "removed pick");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_service() -> (tempfile::TempDir, NextBiteService) {
        let dir = tempfile::tempdir().unwrap();
        let svc = NextBiteService::open(dir.path()).unwrap();
        svc.add_recipe("Idli", "Breakfast").unwrap();
        svc.add_recipe("Dosa", "Breakfast").unwrap();
        svc.add_recipe("Soup", "Dinner").unwrap();
        (dir, svc)
    }

    #[test]
    fn test_recipe_crud_round_trip() {
        let (_dir, svc) = seeded_service();
        assert_eq!(svc.list_recipes().unwrap().len(), 3);

        let edited = svc.edit_recipe("soup", None, Some("Lunch")).unwrap();
        assert_eq!(edited, Recipe::new("Soup", "Lunch"));
        assert_eq!(svc.categories().unwrap(), vec!["Breakfast", "Lunch"]);

        let removed = svc.delete_recipe("IDLI").unwrap();
        assert_eq!(removed.name, "Idli");
        let names: Vec<String> = svc.list_recipes().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Dosa", "Soup"]);
    }

    #[test]
    fn test_add_duplicate_is_catalog_error() {
        let (_dir, svc) = seeded_service();
        let err = svc.add_recipe("dosa", "Snack").unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::Duplicate("Dosa".to_string()))
        );
    }

    #[test]
    fn test_save_pick_uses_catalog_spelling() {
        let (_dir, svc) = seeded_service();
        let today = date(2024, 3, 13);
        let entry = svc.save_pick("soup", today, false).unwrap();
        assert_eq!(entry, HistoryEntry::new(today, "Soup", "Dinner"));
        assert_eq!(svc.todays_pick(today).unwrap(), Some(entry));
    }

    #[test]
    fn test_save_pick_unknown_recipe() {
        let (_dir, svc) = seeded_service();
        let err = svc.save_pick("Pizza", date(2024, 3, 13), false).unwrap_err();
        assert!(err.downcast_ref::<CatalogError>().is_some());
        assert!(svc.history(HistoryRange::All, date(2024, 3, 13)).unwrap().is_empty());
    }

    #[test]
    fn test_second_pick_needs_replace() {
        let (_dir, svc) = seeded_service();
        let today = date(2024, 3, 13);
        svc.save_pick("Idli", today, false).unwrap();

        let err = svc.save_pick("Soup", today, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HistoryError>(),
            Some(HistoryError::AlreadyPicked { .. })
        ));

        svc.save_pick("Soup", today, true).unwrap();
        assert_eq!(svc.todays_pick(today).unwrap().unwrap().recipe, "Soup");
        assert_eq!(svc.history(HistoryRange::All, today).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_todays_pick() {
        let (_dir, svc) = seeded_service();
        let today = date(2024, 3, 13);
        svc.save_pick("Dosa", date(2024, 3, 12), false).unwrap();
        svc.save_pick("Idli", today, false).unwrap();

        assert_eq!(svc.remove_todays_pick(today).unwrap(), 1);
        assert!(svc.todays_pick(today).unwrap().is_none());
        let err = svc.remove_todays_pick(today).unwrap_err();
        assert_eq!(
            err.downcast_ref::<HistoryError>(),
            Some(&HistoryError::NothingPicked(today))
        );
        assert_eq!(svc.history(HistoryRange::All, today).unwrap().len(), 1);
    }

    #[test]
    fn test_history_backfills_categories_from_legacy_file() {
        let (dir, svc) = seeded_service();
        std::fs::write(
            dir.path().join("history.csv"),
            "Date,Recipe\n2024-03-12,Soup\n2024-03-01,Removed Dish\n",
        )
        .unwrap();

        let rows = svc.history(HistoryRange::All, date(2024, 3, 13)).unwrap();
        assert_eq!(rows[0].category.as_deref(), Some("Dinner"));
        assert_eq!(rows[0].days_ago, Some(1));
        assert_eq!(rows[1].category, None);
    }

    #[test]
    fn test_suggestions_skip_recent_pick() {
        let (_dir, svc) = seeded_service();
        let today = date(2024, 3, 13);
        svc.save_pick("Soup", date(2024, 3, 10), false).unwrap();

        let options = RecommendOptions::new(2, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let out = svc.suggestions_with_rng(today, options, &mut rng).unwrap();
        let names: Vec<&str> = out.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(out.len(), 2);
        assert!(!names.contains(&"Soup"));
    }

    #[test]
    fn test_suggestions_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let svc = NextBiteService::open(dir.path()).unwrap();
        let out = svc
            .suggestions(date(2024, 3, 13), RecommendOptions::default())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_recipes_in_category() {
        let (_dir, svc) = seeded_service();
        let today = date(2024, 3, 13);
        svc.save_pick("Dosa", date(2024, 3, 3), false).unwrap();

        let rows = svc.recipes_in_category("Breakfast", today).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Dosa");
        assert_eq!(rows[1].days_since, Some(10));
    }
}
