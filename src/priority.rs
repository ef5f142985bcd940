//! Tiered resource priorities
//!
//! Tier 0 is the cheapest: the solver draws on it before anything in tier 1,
//! and so on. Within a tier, weights set the relative cost of each recipe.

use crate::data::RecipeId;
use crate::rational::Rational;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityList {
    tiers: Vec<Vec<(RecipeId, Rational)>>,
}

impl PriorityList {
    pub fn new(tiers: Vec<Vec<(RecipeId, Rational)>>) -> Self {
        let mut list = Self { tiers };
        list.normalize();
        list
    }

    pub fn tiers(&self) -> &[Vec<(RecipeId, Rational)>] {
        &self.tiers
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tier_of(&self, recipe: RecipeId) -> Option<usize> {
        self.tiers
            .iter()
            .position(|tier| tier.iter().any(|(r, _)| *r == recipe))
    }

    /// Move `recipe` into `tier` with `weight`. A tier index past the end
    /// appends a new lowest-priority tier.
    pub fn set(&mut self, recipe: RecipeId, tier: usize, weight: Rational) {
        self.take(recipe);
        if tier >= self.tiers.len() {
            self.tiers.push(vec![(recipe, weight)]);
        } else {
            self.tiers[tier].push((recipe, weight));
        }
        self.normalize();
    }

    pub fn remove(&mut self, recipe: RecipeId) -> bool {
        let found = self.take(recipe);
        self.normalize();
        found
    }

    // leaves emptied tiers in place so indices stay stable
    fn take(&mut self, recipe: RecipeId) -> bool {
        let mut found = false;
        for tier in &mut self.tiers {
            let before = tier.len();
            tier.retain(|(r, _)| *r != recipe);
            found |= tier.len() != before;
        }
        found
    }

    // heaviest first, no empty tiers
    fn normalize(&mut self) {
        self.tiers.retain(|tier| !tier.is_empty());
        for tier in &mut self.tiers {
            tier.sort_by(|a, b| b.1.cmp(&a.1));
        }
    }
}
