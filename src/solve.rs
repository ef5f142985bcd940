//! Solve entry point
//!
//! A solve runs in three stages. The recursive pass resolves every demand
//! that has a single acyclic producer. Whatever it defers goes to the
//! tableau. The merged rates are then assembled into [`Totals`].

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::cycle::{CycleRecipes, find_cycles};
use crate::data::{ItemId, RecipeId};
use crate::error::{ConfigError, Result};
use crate::rational::Rational;
use crate::spec::Spec;
use crate::tableau::{self, TableauDebug};
use crate::totals::Totals;

#[derive(Debug, Clone, PartialEq)]
pub enum TargetAmount {
    /// Items per second.
    Rate(Rational),
    /// Number of buildings running the target's recipe.
    Buildings(Rational),
}

/// A requested output.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTarget {
    pub item: ItemId,
    /// Forced recipe. Building-count targets without one count buildings of
    /// the item's first producer.
    pub recipe: Option<RecipeId>,
    pub amount: TargetAmount,
}

impl BuildTarget {
    pub fn rate(item: ItemId, rate: Rational) -> Self {
        Self {
            item,
            recipe: None,
            amount: TargetAmount::Rate(rate),
        }
    }

    pub fn buildings(item: ItemId, count: Rational) -> Self {
        Self {
            item,
            recipe: None,
            amount: TargetAmount::Buildings(count),
        }
    }

    pub fn with_recipe(mut self, recipe: RecipeId) -> Self {
        self.recipe = Some(recipe);
        self
    }

    /// Requested rate in items per second.
    pub fn resolve_rate(&self, spec: &Spec) -> Result<Rational> {
        let data = spec.data();
        if let Some(recipe) = self.recipe {
            if !data.recipe(recipe).makes(self.item) {
                return Err(ConfigError::NotProduced {
                    recipe: data.recipe(recipe).key.clone(),
                    item: data.item(self.item).key.clone(),
                }
                .into());
            }
        }
        match &self.amount {
            TargetAmount::Rate(rate) => Ok(rate.clone()),
            TargetAmount::Buildings(count) => {
                let recipe = self
                    .recipe
                    .or_else(|| spec.producers(self.item).first().copied())
                    .ok_or_else(|| ConfigError::NoBuilding(data.item(self.item).key.clone()))?;
                let per_building = spec
                    .recipe_rate(recipe)
                    .ok_or_else(|| ConfigError::NoBuilding(data.recipe(recipe).key.clone()))?;
                Ok(count * &per_building * spec.gives(recipe, self.item))
            }
        }
    }
}

/// A demand whose forced recipe could not be resolved directly. The tableau
/// pins the recipe to at least this rate of the item.
#[derive(Debug, Clone, PartialEq)]
pub struct UnfinishedTarget {
    pub item: ItemId,
    pub recipe: RecipeId,
    pub rate: Rational,
}

/// Outcome of the recursive pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSolution {
    pub solved: IndexMap<RecipeId, Rational>,
    /// Deferred demand, summed per item.
    pub remaining: IndexMap<ItemId, Rational>,
    pub unfinished: Vec<UnfinishedTarget>,
}

impl PartialSolution {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty() && self.unfinished.is_empty()
    }
}

/// A resolved request: item, optional forced recipe and rate.
pub type Request = (ItemId, Option<RecipeId>, Rational);

/// Resolve demands through single-producer, single-product, acyclic
/// recipes. Anything else is deferred. Uses an explicit stack, so chain
/// depth is bounded only by memory.
pub fn solve_recursive(
    spec: &Spec,
    requests: &[Request],
    cycles: &CycleRecipes,
) -> PartialSolution {
    let data = spec.data();
    let mut result = PartialSolution::default();
    let mut stack: Vec<Request> = requests.iter().rev().cloned().collect();

    while let Some((item, forced, rate)) = stack.pop() {
        let recipe = match forced {
            Some(recipe) => {
                let r = data.recipe(recipe);
                if r.products.len() > 1 || cycles.contains(recipe) {
                    *result.remaining.entry(item).or_insert_with(Rational::zero) += &rate;
                    result.unfinished.push(UnfinishedTarget { item, recipe, rate });
                    continue;
                }
                recipe
            }
            None => {
                let candidates = spec.producers(item);
                let &[recipe] = candidates.as_slice() else {
                    *result.remaining.entry(item).or_insert_with(Rational::zero) += rate;
                    continue;
                };
                if data.recipe(recipe).products.len() > 1 || cycles.contains(recipe) {
                    *result.remaining.entry(item).or_insert_with(Rational::zero) += rate;
                    continue;
                }
                recipe
            }
        };

        let Ok(recipe_rate) = rate.try_div(&spec.gives(recipe, item)) else {
            *result.remaining.entry(item).or_insert_with(Rational::zero) += rate;
            continue;
        };
        if spec.expands(recipe) {
            for ing in data.recipe(recipe).ingredients.iter().rev() {
                stack.push((ing.item, None, &recipe_rate * &ing.amount));
            }
        }
        *result.solved.entry(recipe).or_insert_with(Rational::zero) += recipe_rate;
    }
    result
}

/// Every enabled recipe that can contribute to `items` or to the
/// ingredients of `recipes`, in breadth-first discovery order.
pub fn reachable_recipes(
    spec: &Spec,
    items: &[ItemId],
    recipes: &[RecipeId],
) -> IndexSet<RecipeId> {
    let data = spec.data();
    let mut found = IndexSet::new();
    let mut seen_items = IndexSet::new();
    let mut queue: VecDeque<ItemId> = items.iter().copied().collect();

    let enqueue = |recipe: RecipeId, queue: &mut VecDeque<ItemId>, found: &mut IndexSet<RecipeId>| {
        if found.insert(recipe) && spec.expands(recipe) {
            queue.extend(data.recipe(recipe).ingredients.iter().map(|i| i.item));
        }
    };
    for &recipe in recipes {
        enqueue(recipe, &mut queue, &mut found);
    }
    while let Some(item) = queue.pop_front() {
        if !seen_items.insert(item) {
            continue;
        }
        for recipe in spec.producers(item) {
            enqueue(recipe, &mut queue, &mut found);
        }
    }
    found
}

/// Runs solves and keeps the tableau of the most recent one for inspection.
#[derive(Debug, Default)]
pub struct Solver {
    last_tableau: Option<TableauDebug>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labelled initial and solved tableau of the last solve, present only
    /// when that solve needed the linear program.
    pub fn last_tableau(&self) -> Option<&TableauDebug> {
        self.last_tableau.as_ref()
    }

    pub fn solve(&mut self, spec: &Spec, targets: &[BuildTarget]) -> Result<Totals> {
        self.last_tableau = None;

        let mut requests = Vec::with_capacity(targets.len());
        let mut outputs: IndexMap<ItemId, Rational> = IndexMap::new();
        for target in targets {
            let rate = target.resolve_rate(spec)?;
            *outputs.entry(target.item).or_insert_with(Rational::zero) += &rate;
            requests.push((target.item, target.recipe, rate));
        }

        let items: Vec<ItemId> = targets.iter().map(|t| t.item).collect();
        let forced: Vec<RecipeId> = targets.iter().filter_map(|t| t.recipe).collect();
        let candidates = reachable_recipes(spec, &items, &forced);
        let cycles = find_cycles(spec, &candidates);

        let partial = solve_recursive(spec, &requests, &cycles);
        debug!(
            "recursive pass: {} recipes solved, {} items remaining, {} unfinished targets",
            partial.solved.len(),
            partial.remaining.len(),
            partial.unfinished.len()
        );

        let mut rates = partial.solved;
        let mut surplus = IndexMap::new();
        if !partial.remaining.is_empty() || !partial.unfinished.is_empty() {
            let solution = tableau::solve_tableau(
                spec,
                &items,
                &partial.remaining,
                &partial.unfinished,
                &cycles,
            )?;
            for (recipe, rate) in solution.rates {
                *rates.entry(recipe).or_insert_with(Rational::zero) += rate;
            }
            surplus = solution.surplus;
            self.last_tableau = Some(solution.debug);
        }

        Ok(Totals::assemble(spec, rates, outputs, surplus))
    }
}

/// One-shot solve without keeping the tableau.
pub fn solve(spec: &Spec, targets: &[BuildTarget]) -> Result<Totals> {
    Solver::new().solve(spec, targets)
}
