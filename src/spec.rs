//! Per-solve configuration snapshot
//!
//! A [`Spec`] wraps the game data together with everything the user can
//! change between solves: disabled recipes, ignored items, resource
//! priorities and per-recipe building/module choices. Solves only ever take
//! `&Spec`, so a configuration cannot change underneath a running solve.

use std::collections::{HashMap, HashSet};

use crate::data::{Building, BuildingId, GameData, ItemId, ModuleId, RecipeId};
use crate::error::{ConfigError, Result};
use crate::priority::PriorityList;
use crate::rational::Rational;

#[derive(Debug, Clone, PartialEq)]
pub struct Beacon {
    pub module: ModuleId,
    pub count: Rational,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeSettings {
    pub building: Option<BuildingId>,
    pub modules: Vec<ModuleId>,
    pub beacon: Option<Beacon>,
}

#[derive(Debug, Clone)]
pub struct Spec {
    data: GameData,
    disabled: HashSet<RecipeId>,
    ignore: HashSet<ItemId>,
    priority: PriorityList,
    settings: HashMap<RecipeId, RecipeSettings>,
}

impl Spec {
    pub fn new(data: GameData) -> Self {
        let priority = PriorityList::new(data.default_priority().to_vec());
        Self {
            data,
            disabled: HashSet::new(),
            ignore: HashSet::new(),
            priority,
            settings: HashMap::new(),
        }
    }

    pub fn data(&self) -> &GameData {
        &self.data
    }

    pub fn priority(&self) -> &PriorityList {
        &self.priority
    }

    pub fn priority_mut(&mut self) -> &mut PriorityList {
        &mut self.priority
    }

    pub fn disable(&mut self, recipe: &str) -> Result<()> {
        let id = self.data.recipe_id(recipe)?;
        self.disabled.insert(id);
        Ok(())
    }

    pub fn enable(&mut self, recipe: &str) -> Result<()> {
        let id = self.data.recipe_id(recipe)?;
        self.disabled.remove(&id);
        Ok(())
    }

    pub fn is_disabled(&self, recipe: RecipeId) -> bool {
        self.disabled.contains(&recipe)
    }

    pub fn ignore(&mut self, item: &str) -> Result<()> {
        let id = self.data.item_id(item)?;
        self.ignore.insert(id);
        Ok(())
    }

    pub fn is_ignored(&self, item: ItemId) -> bool {
        self.ignore.contains(&item)
    }

    pub fn settings(&self, recipe: RecipeId) -> Option<&RecipeSettings> {
        self.settings.get(&recipe)
    }

    pub fn set_building(&mut self, recipe: &str, building: &str) -> Result<()> {
        let recipe_id = self.data.recipe_id(recipe)?;
        let building_id = self.data.building_id(building)?;
        if !self
            .data
            .building(building_id)
            .can_craft(self.data.recipe(recipe_id))
        {
            return Err(ConfigError::IncompatibleBuilding {
                recipe: recipe.to_string(),
                building: building.to_string(),
            }
            .into());
        }
        self.settings.entry(recipe_id).or_default().building = Some(building_id);
        Ok(())
    }

    /// Replace the module list of `recipe`. The list may not exceed the
    /// module slots of the recipe's building.
    pub fn set_modules(&mut self, recipe: &str, modules: &[&str]) -> Result<()> {
        let recipe_id = self.data.recipe_id(recipe)?;
        let ids = modules
            .iter()
            .map(|m| self.data.module_id(m))
            .collect::<Result<Vec<_>>>()?;
        let slots = self.building(recipe_id).map_or(0, |b| b.module_slots);
        if ids.len() > slots {
            return Err(ConfigError::ModuleSlots {
                recipe: recipe.to_string(),
                slots,
            }
            .into());
        }
        self.settings.entry(recipe_id).or_default().modules = ids;
        Ok(())
    }

    pub fn set_beacon(&mut self, recipe: &str, module: &str, count: Rational) -> Result<()> {
        let recipe_id = self.data.recipe_id(recipe)?;
        let module = self.data.module_id(module)?;
        self.settings.entry(recipe_id).or_default().beacon = Some(Beacon { module, count });
        Ok(())
    }

    /// Enabled recipes that produce `item`.
    pub fn producers(&self, item: ItemId) -> Vec<RecipeId> {
        self.data
            .item(item)
            .recipes
            .iter()
            .copied()
            .filter(|r| !self.disabled.contains(r))
            .collect()
    }

    /// Last-resort producer of `item`, if it has one.
    pub fn last_resort(&self, item: ItemId) -> Option<RecipeId> {
        self.data.item(item).disable
    }

    /// Whether the ingredients of `recipe` are drawn. Recipes producing an
    /// ignored item are treated as sources.
    pub fn expands(&self, recipe: RecipeId) -> bool {
        !self
            .data
            .recipe(recipe)
            .products
            .iter()
            .any(|p| self.ignore.contains(&p.item))
    }

    /// Building assigned to `recipe`: the explicit choice, or the first
    /// building able to craft it.
    pub fn building(&self, recipe: RecipeId) -> Option<&Building> {
        match self.settings.get(&recipe).and_then(|s| s.building) {
            Some(id) => Some(self.data.building(id)),
            None => self.data.buildings_for(recipe).next(),
        }
    }

    pub fn speed_effect(&self, recipe: RecipeId) -> Rational {
        let mut effect = Rational::one();
        let Some(settings) = self.settings.get(&recipe) else {
            return effect;
        };
        for &m in &settings.modules {
            effect += &self.data.module(m).speed;
        }
        if let Some(beacon) = &settings.beacon {
            effect += &self.data.module(beacon.module).speed * &beacon.count * Rational::half();
        }
        effect
    }

    pub fn prod_effect(&self, recipe: RecipeId) -> Rational {
        let mut effect = Rational::one();
        if let Some(settings) = self.settings.get(&recipe) {
            for &m in &settings.modules {
                effect += &self.data.module(m).productivity;
            }
        }
        effect
    }

    /// Net amount of `item` one craft yields, productivity included. Zero
    /// when the recipe does not gain the item.
    pub fn gives(&self, recipe: RecipeId, item: ItemId) -> Rational {
        let net = self.net_amount(recipe, item);
        if net.is_positive() { net } else { Rational::zero() }
    }

    /// Net change of `item` per craft: products minus ingredients, with
    /// productivity scaling a net gain only. Ingredients of non-expanding
    /// recipes are not counted.
    pub fn net_amount(&self, recipe: RecipeId, item: ItemId) -> Rational {
        let r = self.data.recipe(recipe);
        let mut net = r.product_amount(item);
        if self.expands(recipe) {
            net -= r.ingredient_amount(item);
        }
        if net.is_positive() {
            net * self.prod_effect(recipe)
        } else {
            net
        }
    }

    /// Crafts per second of one building, or `None` when the recipe has no
    /// building or takes no time.
    pub fn recipe_rate(&self, recipe: RecipeId) -> Option<Rational> {
        let building = self.building(recipe)?;
        building.recipe_rate(self.data.recipe(recipe), &self.speed_effect(recipe))
    }

    pub fn building_count(&self, recipe: RecipeId, rate: &Rational) -> Option<Rational> {
        let per_building = self.recipe_rate(recipe)?;
        rate.try_div(&per_building).ok()
    }
}
