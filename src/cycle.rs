//! Detection of recipes that take part in production loops
//!
//! Strongly connected components over the recipe graph, found with two
//! depth-first passes (Kosaraju). A recipe's forward neighbours are the
//! candidate producers of its ingredients; the reverse pass follows products
//! to candidate consumers instead.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use log::debug;

use crate::data::RecipeId;
use crate::spec::Spec;

/// Cyclic components, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleRecipes {
    components: Vec<Vec<RecipeId>>,
    membership: HashMap<RecipeId, usize>,
}

impl CycleRecipes {
    pub fn contains(&self, recipe: RecipeId) -> bool {
        self.membership.contains_key(&recipe)
    }

    /// Index of the component `recipe` belongs to.
    pub fn component_of(&self, recipe: RecipeId) -> Option<usize> {
        self.membership.get(&recipe).copied()
    }

    pub fn components(&self) -> &[Vec<RecipeId>] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.membership.len()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Reverse,
}

fn neighbours(
    spec: &Spec,
    candidates: &IndexSet<RecipeId>,
    recipe: RecipeId,
    direction: Direction,
) -> Vec<RecipeId> {
    let data = spec.data();
    let mut result = IndexSet::new();
    match direction {
        Direction::Forward => {
            if !spec.expands(recipe) {
                return Vec::new();
            }
            for ing in &data.recipe(recipe).ingredients {
                for r in spec.producers(ing.item) {
                    if candidates.contains(&r) {
                        result.insert(r);
                    }
                }
            }
        }
        Direction::Reverse => {
            // only enabled producers have forward edges pointing at them
            if spec.is_disabled(recipe) || data.recipe(recipe).is_disable() {
                return Vec::new();
            }
            for product in &data.recipe(recipe).products {
                for &r in &data.item(product.item).uses {
                    if candidates.contains(&r) && spec.expands(r) {
                        result.insert(r);
                    }
                }
            }
        }
    }
    result.into_iter().collect()
}

/// Iterative depth-first search from `root`, returning newly reached nodes
/// in post-order.
fn visit(
    spec: &Spec,
    candidates: &IndexSet<RecipeId>,
    root: RecipeId,
    seen: &mut HashSet<RecipeId>,
    direction: Direction,
) -> Vec<RecipeId> {
    let mut order = Vec::new();
    if !seen.insert(root) {
        return order;
    }
    let mut stack = vec![(root, neighbours(spec, candidates, root, direction), 0usize)];
    while let Some((node, next, idx)) = stack.last_mut() {
        if let Some(&n) = next.get(*idx) {
            *idx += 1;
            if seen.insert(n) {
                let ns = neighbours(spec, candidates, n, direction);
                stack.push((n, ns, 0));
            }
        } else {
            order.push(*node);
            stack.pop();
        }
    }
    order
}

/// Find every candidate recipe that lies on a production loop. Components
/// of one recipe count only when that recipe consumes one of its own
/// products.
pub fn find_cycles(spec: &Spec, candidates: &IndexSet<RecipeId>) -> CycleRecipes {
    let mut seen = HashSet::new();
    let mut finished = Vec::with_capacity(candidates.len());
    for &recipe in candidates {
        finished.extend(visit(spec, candidates, recipe, &mut seen, Direction::Forward));
    }

    let mut cycles = CycleRecipes::default();
    seen.clear();
    for &root in finished.iter().rev() {
        if seen.contains(&root) {
            continue;
        }
        let component = visit(spec, candidates, root, &mut seen, Direction::Reverse);
        let cyclic = component.len() > 1
            || (spec.expands(root) && spec.data().recipe(root).is_self_loop());
        if cyclic {
            let index = cycles.components.len();
            for &r in &component {
                cycles.membership.insert(r, index);
            }
            cycles.components.push(component);
        }
    }
    debug!(
        "{} of {} candidate recipes are cyclic ({} components)",
        cycles.len(),
        candidates.len(),
        cycles.components.len()
    );
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameData;
    use crate::models::{DataSet, RecipeDef};

    fn spec_of(recipes: Vec<RecipeDef>) -> Spec {
        let set = DataSet {
            recipes,
            ..Default::default()
        };
        Spec::new(GameData::from_data_set(&set).unwrap())
    }

    fn crafted(spec: &Spec) -> IndexSet<RecipeId> {
        spec.data()
            .recipes()
            .iter()
            .filter(|r| !r.is_disable())
            .map(|r| r.id)
            .collect()
    }

    fn id(spec: &Spec, key: &str) -> RecipeId {
        spec.data().recipe_id(key).unwrap()
    }

    #[test]
    fn three_recipe_loop_is_one_component() {
        let spec = spec_of(vec![
            RecipeDef::new("a", 1).ingredient("b", 1).product("a", 1),
            RecipeDef::new("b", 1).ingredient("c", 1).product("b", 1),
            RecipeDef::new("c", 1).ingredient("a", 1).product("c", 1),
        ]);
        let cycles = find_cycles(&spec, &crafted(&spec));
        assert_eq!(cycles.components().len(), 1);
        assert_eq!(cycles.len(), 3);
        for key in ["a", "b", "c"] {
            assert!(cycles.contains(id(&spec, key)));
        }
        assert_eq!(
            cycles.component_of(id(&spec, "a")),
            cycles.component_of(id(&spec, "c"))
        );
    }

    #[test]
    fn acyclic_chain_has_no_cycles() {
        let spec = spec_of(vec![
            RecipeDef::new("a", 1).ingredient("b", 1).product("a", 1),
            RecipeDef::new("b", 1).ingredient("c", 1).product("b", 1),
            RecipeDef::new("c", 1).ingredient("ore", 1).product("c", 1),
        ]);
        let cycles = find_cycles(&spec, &crafted(&spec));
        assert!(cycles.is_empty());
    }

    #[test]
    fn self_loop_is_cyclic() {
        let spec = spec_of(vec![
            RecipeDef::new("breed", 1)
                .ingredient("seed", 1)
                .ingredient("water", 1)
                .product("seed", 2),
        ]);
        let cycles = find_cycles(&spec, &crafted(&spec));
        assert!(cycles.contains(id(&spec, "breed")));
        assert!(!cycles.contains(id(&spec, "water")));
    }

    #[test]
    fn loop_outside_candidates_is_ignored() {
        let spec = spec_of(vec![
            RecipeDef::new("a", 1).ingredient("q", 1).product("p", 1),
            RecipeDef::new("b", 1).ingredient("p", 1).product("q", 1),
        ]);
        let only_a: IndexSet<RecipeId> = [id(&spec, "a")].into_iter().collect();
        assert!(find_cycles(&spec, &only_a).is_empty());
    }

    #[test]
    fn ignored_item_breaks_loop() {
        let mut spec = spec_of(vec![
            RecipeDef::new("a", 1).ingredient("q", 1).product("p", 1),
            RecipeDef::new("b", 1).ingredient("p", 1).product("q", 1),
        ]);
        spec.ignore("p").unwrap();
        assert!(find_cycles(&spec, &crafted(&spec)).is_empty());
    }
}
