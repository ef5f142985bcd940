//! Linear program for the part of a solve the recursive pass deferred
//!
//! Layout (primal form, one column per recipe):
//!
//! ```text
//!              recipes   tax   surplus (one per row)   rhs
//! item rows    net amt    0        -1 on diagonal       remaining demand
//! target rows  net amt    0        -1 on diagonal       pinned rate
//! tax row        -1       1        -1 on diagonal       0
//! objective     cost      1         0                   0
//! ```
//!
//! The surplus columns form the initial basis. Every constraint therefore
//! reads `production - surplus = demand`, which phase 0 of the simplex turns
//! into a feasible basis. The objective charges one unit per unit of recipe
//! rate through the tax column, plus a tiered cost for resource recipes: each
//! priority tier costs more than all cheaper tiers combined, and last-resort
//! producers cost more than every tier.

use std::fmt::Write as _;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::cycle::CycleRecipes;
use crate::data::{GameData, ItemId, RecipeId};
use crate::error::Result;
use crate::matrix::Matrix;
use crate::rational::Rational;
use crate::simplex::Simplex;
use crate::solve::{UnfinishedTarget, reachable_recipes};
use crate::spec::Spec;

/// Labelled copy of the tableau before and after the simplex ran.
#[derive(Debug, Clone)]
pub struct TableauDebug {
    /// Labels of the item rows, in row order.
    pub items: Vec<ItemId>,
    /// Labels of the recipe columns, in column order.
    pub recipes: Vec<RecipeId>,
    /// Pinned recipes, one row each after the item rows.
    pub targets: Vec<UnfinishedTarget>,
    pub initial: Matrix,
    pub solved: Matrix,
}

impl TableauDebug {
    /// Recipes whose columns are linearly independent in the item block of
    /// the initial tableau.
    pub fn independent_recipes(&self) -> Vec<RecipeId> {
        let mut block = self.initial.block(0..self.items.len(), 0..self.recipes.len());
        block
            .rref()
            .into_iter()
            .map(|col| self.recipes[col])
            .collect()
    }

    pub fn describe(&self, data: &GameData) -> String {
        let mut out = String::new();
        let rows: Vec<&str> = self.items.iter().map(|&i| data.item(i).key.as_str()).collect();
        let cols: Vec<&str> = self
            .recipes
            .iter()
            .map(|&r| data.recipe(r).key.as_str())
            .collect();
        let _ = writeln!(
            out,
            "rows: {} | pinned: {} | tax | cost",
            rows.join(", "),
            self.targets.len()
        );
        let _ = writeln!(out, "columns: {} | tax | surplus... | rhs", cols.join(", "));
        let _ = writeln!(out, "\ninitial:\n{}", self.initial);
        let _ = writeln!(out, "solved:\n{}", self.solved);
        out
    }
}

#[derive(Debug, Clone)]
pub struct TableauSolution {
    /// Recipes with a strictly positive rate.
    pub rates: IndexMap<RecipeId, Rational>,
    /// Items produced beyond demand.
    pub surplus: IndexMap<ItemId, Rational>,
    pub debug: TableauDebug,
}

struct Layout {
    items: IndexSet<ItemId>,
    recipes: IndexSet<RecipeId>,
    last_resort: IndexSet<RecipeId>,
}

impl Layout {
    fn new(
        spec: &Spec,
        targets: &[ItemId],
        remaining: &IndexMap<ItemId, Rational>,
        unfinished: &[UnfinishedTarget],
        cycles: &CycleRecipes,
    ) -> Self {
        let data = spec.data();
        let mut seeds: Vec<ItemId> = remaining.keys().copied().collect();
        seeds.extend(unfinished.iter().map(|u| u.item));
        let forced: Vec<RecipeId> = unfinished.iter().map(|u| u.recipe).collect();
        let mut recipes = reachable_recipes(spec, &seeds, &forced);

        // Ingredients that only their own loop can make get a last-resort
        // producer, unless the item is itself a requested target.
        let pinned: IndexSet<ItemId> = targets.iter().copied().collect();
        let mut last_resort = IndexSet::new();
        for &recipe in &recipes {
            let Some(component) = cycles.component_of(recipe) else {
                continue;
            };
            if !spec.expands(recipe) {
                continue;
            }
            for ing in &data.recipe(recipe).ingredients {
                if pinned.contains(&ing.item) {
                    continue;
                }
                let closed = spec
                    .producers(ing.item)
                    .iter()
                    .all(|&p| cycles.component_of(p) == Some(component));
                if !closed {
                    continue;
                }
                if let Some(disable) = spec.last_resort(ing.item) {
                    last_resort.insert(disable);
                }
            }
        }
        recipes.extend(last_resort.iter().copied());

        let mut items: IndexSet<ItemId> = remaining.keys().copied().collect();
        for &recipe in &recipes {
            let r = data.recipe(recipe);
            items.extend(r.products.iter().map(|p| p.item));
            if spec.expands(recipe) {
                items.extend(r.ingredients.iter().map(|i| i.item));
            }
        }

        Self {
            items,
            recipes,
            last_resort,
        }
    }
}

/// Build the tableau for the deferred demand and solve it. `targets` are
/// the items originally requested.
pub fn solve_tableau(
    spec: &Spec,
    targets: &[ItemId],
    remaining: &IndexMap<ItemId, Rational>,
    unfinished: &[UnfinishedTarget],
    cycles: &CycleRecipes,
) -> Result<TableauSolution> {
    let data = spec.data();
    let layout = Layout::new(spec, targets, remaining, unfinished, cycles);
    let item_rows = layout.items.len();
    let recipe_cols = layout.recipes.len();
    let tax_row = item_rows + unfinished.len();
    let constraints = tax_row + 1;
    let tax_col = recipe_cols;
    let surplus_col = |row: usize| recipe_cols + 1 + row;
    let rhs = recipe_cols + 1 + constraints;
    let objective = constraints;

    debug!(
        "tableau: {} items, {} recipes ({} last resort), {} pinned targets",
        item_rows,
        recipe_cols,
        layout.last_resort.len(),
        unfinished.len()
    );

    let mut a = Matrix::new(constraints + 1, rhs + 1);
    for (col, &recipe) in layout.recipes.iter().enumerate() {
        let r = data.recipe(recipe);
        let mut touched: IndexSet<ItemId> = r.products.iter().map(|p| p.item).collect();
        if spec.expands(recipe) {
            touched.extend(r.ingredients.iter().map(|i| i.item));
        }
        for item in touched {
            if let Some(row) = layout.items.get_index_of(&item) {
                a.set(row, col, spec.net_amount(recipe, item));
            }
        }
        a.set(tax_row, col, Rational::from(-1));
    }
    a.set(tax_row, tax_col, Rational::one());
    for row in 0..constraints {
        a.set(row, surplus_col(row), Rational::from(-1));
    }
    for (item, rate) in remaining {
        if let Some(row) = layout.items.get_index_of(item) {
            a.set(row, rhs, rate.clone());
        }
    }
    for (k, target) in unfinished.iter().enumerate() {
        let row = item_rows + k;
        if let Some(col) = layout.recipes.get_index_of(&target.recipe) {
            a.set(row, col, spec.net_amount(target.recipe, target.item));
        }
        a.set(row, rhs, target.rate.clone());
    }

    set_costs(spec, &mut a, &layout, tax_row, objective, tax_col)?;

    let initial = a.clone();
    let basis = (0..constraints).map(surplus_col).collect();
    let mut simplex = Simplex::new(a, basis);
    simplex.solve()?;
    let values = simplex.values();

    let mut rates = IndexMap::new();
    for (col, &recipe) in layout.recipes.iter().enumerate() {
        if values[col].is_positive() {
            rates.insert(recipe, values[col].clone());
        }
    }
    let mut surplus = IndexMap::new();
    for (row, &item) in layout.items.iter().enumerate() {
        let extra = &values[surplus_col(row)];
        if extra.is_positive() && !spec.is_ignored(item) {
            surplus.insert(item, extra.clone());
        }
    }
    debug!(
        "tableau solved: {} recipes running, {} items in surplus",
        rates.len(),
        surplus.len()
    );

    Ok(TableauSolution {
        rates,
        surplus,
        debug: TableauDebug {
            items: layout.items.into_iter().collect(),
            recipes: layout.recipes.into_iter().collect(),
            targets: unfinished.to_vec(),
            initial,
            solved: simplex.into_tableau(),
        },
    })
}

/// Ratio between successive priority tiers: twice the spread of coefficient
/// magnitudes in the constraint block, and never less than two.
fn cost_ratio(a: &Matrix, rows: usize, cols: usize) -> Result<Rational> {
    let mut min: Option<Rational> = None;
    let mut max: Option<Rational> = None;
    for row in 0..rows {
        for col in 0..cols {
            let x = a.get(row, col);
            if x.is_zero() {
                continue;
            }
            let x = x.abs();
            if min.as_ref().is_none_or(|m| x < *m) {
                min = Some(x.clone());
            }
            if max.as_ref().is_none_or(|m| x > *m) {
                max = Some(x);
            }
        }
    }
    let two = Rational::from(2);
    let (Some(min), Some(max)) = (min, max) else {
        return Ok(two);
    };
    Ok((max.try_div(&min)? * &two).max(two))
}

fn set_costs(
    spec: &Spec,
    a: &mut Matrix,
    layout: &Layout,
    tax_row: usize,
    objective: usize,
    tax_col: usize,
) -> Result<()> {
    let ratio = cost_ratio(a, tax_row, layout.recipes.len())?;
    a.set(objective, tax_col, Rational::one());

    let mut cost = Rational::one();
    for tier in spec.priority().tiers() {
        let Some(min_weight) = tier.iter().map(|(_, w)| w).min() else {
            continue;
        };
        let base = &cost * &ratio;
        let mut total = Rational::zero();
        for (recipe, weight) in tier {
            let scaled = weight.try_div(min_weight)?;
            if let Some(col) = layout.recipes.get_index_of(recipe) {
                a.set(objective, col, &base * &scaled);
            }
            total += scaled;
        }
        cost = base * total;
    }

    let max_cost = cost * ratio;
    for recipe in &layout.last_resort {
        if let Some(col) = layout.recipes.get_index_of(recipe) {
            a.set(objective, col, max_cost.clone());
        }
    }
    Ok(())
}
