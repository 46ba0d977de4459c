//! Today's suggestions.
//!
//! Candidates are ranked by how long ago they were last picked (never-picked
//! first, ties shuffled), recently picked recipes are dropped when enough
//! others remain, and the selection avoids serving the same category twice in
//! a row.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::catalog::find_recipe;
use crate::history::{last_eaten_by_recipe, most_recent_entry};
use crate::models::{Candidate, HistoryEntry, Recipe, RecommendOptions, name_key, same_name};

/// Pick between `min_count` and `max_count` recipes to offer today.
///
/// Never fails: an empty catalog yields no suggestions, an empty history makes
/// every recipe "never eaten", and undated history rows are ignored. Tie order
/// comes from `rng`, so pass a seeded generator for reproducible output.
pub fn recommend<R: Rng + ?Sized>(
    catalog: &[Recipe],
    history: &[HistoryEntry],
    today: NaiveDate,
    options: RecommendOptions,
    rng: &mut R,
) -> Vec<Candidate> {
    if catalog.is_empty() {
        return Vec::new();
    }

    let candidates = build_candidates(catalog, history, today);
    let mut pool = drop_recent(candidates, options.min_count());

    pool.shuffle(rng);
    pool.sort_by_key(|c| Reverse(c.staleness()));

    let avoid_first = last_category(catalog, history);
    select(pool, avoid_first.as_deref(), options)
}

/// Every catalog recipe joined with its most recent pick.
#[must_use]
pub fn build_candidates(
    catalog: &[Recipe],
    history: &[HistoryEntry],
    today: NaiveDate,
) -> Vec<Candidate> {
    let last_eaten = last_eaten_by_recipe(history);
    catalog
        .iter()
        .map(|r| Candidate::from_recipe(r, last_eaten.get(&name_key(&r.name)).copied(), today))
        .collect()
}

/// Remove recently eaten candidates, unless that would leave fewer than `min_count`.
fn drop_recent(candidates: Vec<Candidate>, min_count: usize) -> Vec<Candidate> {
    let eligible = candidates.iter().filter(|c| !c.is_recent()).count();
    if eligible < min_count {
        tracing::debug!(
            eligible,
            min_count,
            "too few recipes outside the recent window, keeping recent ones"
        );
        return candidates;
    }
    candidates.into_iter().filter(|c| !c.is_recent()).collect()
}

/// Category of the latest pick, falling back to the catalog when the row has none.
fn last_category(catalog: &[Recipe], history: &[HistoryEntry]) -> Option<String> {
    let entry = most_recent_entry(history)?;
    entry
        .category
        .clone()
        .or_else(|| find_recipe(catalog, &entry.recipe).map(|r| r.category.clone()))
}

fn select(
    ranked: Vec<Candidate>,
    avoid_first: Option<&str>,
    options: RecommendOptions,
) -> Vec<Candidate> {
    let mut taken = vec![false; ranked.len()];
    let mut order: Vec<usize> = Vec::with_capacity(options.max_count());

    while order.len() < options.max_count() {
        let slots = options.max_count() - order.len();
        let next = match order.last() {
            Some(&i) => next_pick(&ranked, &taken, &ranked[i].category, slots),
            None => first_pick(&ranked, avoid_first, slots),
        };
        let Some(i) = next else { break };
        taken[i] = true;
        order.push(i);
    }

    // Every remaining candidate shares the previous category; top up to the minimum anyway.
    for i in 0..ranked.len() {
        if order.len() >= options.min_count() {
            break;
        }
        if !taken[i] {
            taken[i] = true;
            order.push(i);
        }
    }

    let mut slots: Vec<Option<Candidate>> = ranked.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// The opening suggestion.
///
/// The last eaten category only lowers priority here, and only while the
/// remaining slots can still alternate without it going first. When nothing
/// else is left the top candidate is offered regardless.
fn first_pick(ranked: &[Candidate], avoid: Option<&str>, slots: usize) -> Option<usize> {
    let all: Vec<usize> = (0..ranked.len()).collect();
    if let Some(key) = crowded_category(ranked, &all, slots) {
        return all
            .into_iter()
            .find(|&i| name_key(&ranked[i].category) == key);
    }
    all.iter()
        .copied()
        .find(|&i| avoid.is_none_or(|a| !same_name(&ranked[i].category, a)))
        .or_else(|| all.first().copied())
}

/// Highest-ranked unpicked candidate whose category differs from `prev`,
/// unless a crowded category has to come next.
fn next_pick(ranked: &[Candidate], taken: &[bool], prev: &str, slots: usize) -> Option<usize> {
    let remaining: Vec<usize> = (0..ranked.len()).filter(|&i| !taken[i]).collect();
    if let Some(key) = crowded_category(ranked, &remaining, slots) {
        if name_key(prev) != key {
            return remaining
                .into_iter()
                .find(|&i| name_key(&ranked[i].category) == key);
        }
    }
    remaining
        .into_iter()
        .find(|&i| !same_name(&ranked[i].category, prev))
}

/// The category that outnumbers the rest so far that the remaining slots
/// could not be filled without repeating it unless it is served next.
fn crowded_category(ranked: &[Candidate], remaining: &[usize], slots: usize) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for &i in remaining {
        *counts.entry(name_key(&ranked[i].category)).or_default() += 1;
    }
    // Only a strict majority can pass the check, so tie order does not matter.
    let (key, count) = counts.into_iter().max_by_key(|(_, n)| *n)?;
    let others = remaining.len() - count;
    let slots = slots.min(remaining.len());
    (others + count.min(others) < slots).then_some(key)
}
