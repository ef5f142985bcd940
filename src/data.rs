//! Immutable arena of items, recipes, buildings and modules
//!
//! Items and recipes refer to each other in both directions (producers,
//! consumers, products, ingredients). The arena stores them in vectors and
//! links them with copyable ids, so the graph can be walked without any
//! ownership juggling and without reference cycles.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::models::{BuildingKind, DataSet, Phase};
use crate::rational::Rational;

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);
    };
}

arena_id!(ItemId);
arena_id!(RecipeId);
arena_id!(BuildingId);
arena_id!(ModuleId);

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub key: String,
    pub name: String,
    pub phase: Phase,
    /// Producing recipes. Disable recipes are never listed here.
    pub recipes: Vec<RecipeId>,
    /// Consuming recipes.
    pub uses: Vec<RecipeId>,
    /// Synthetic last-resort producer.
    pub disable: Option<RecipeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    Crafted,
    Resource,
    /// Last-resort producer of a single item.
    Disable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub item: ItemId,
    pub amount: Rational,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: RecipeId,
    pub key: String,
    pub name: String,
    pub category: Option<String>,
    pub time: Rational,
    pub kind: RecipeKind,
    pub ingredients: Vec<Ingredient>,
    pub products: Vec<Ingredient>,
}

impl Recipe {
    pub fn is_resource(&self) -> bool {
        self.kind == RecipeKind::Resource
    }

    pub fn is_disable(&self) -> bool {
        self.kind == RecipeKind::Disable
    }

    /// Base amount of `item` produced per craft, before productivity.
    pub fn product_amount(&self, item: ItemId) -> Rational {
        self.products
            .iter()
            .filter(|p| p.item == item)
            .map(|p| &p.amount)
            .sum()
    }

    pub fn ingredient_amount(&self, item: ItemId) -> Rational {
        self.ingredients
            .iter()
            .filter(|i| i.item == item)
            .map(|i| &i.amount)
            .sum()
    }

    pub fn makes(&self, item: ItemId) -> bool {
        self.products.iter().any(|p| p.item == item)
    }

    /// True when an item appears among both ingredients and products.
    pub fn is_self_loop(&self) -> bool {
        self.ingredients.iter().any(|i| self.makes(i.item))
    }
}

#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    pub key: String,
    pub name: String,
    pub kind: BuildingKind,
    pub categories: Vec<String>,
    pub module_slots: usize,
}

impl Building {
    pub fn can_craft(&self, recipe: &Recipe) -> bool {
        recipe
            .category
            .as_ref()
            .is_some_and(|c| self.categories.contains(c))
    }

    /// Crafts per second at the given speed effect, or `None` for recipes
    /// that take no time.
    pub fn recipe_rate(&self, recipe: &Recipe, speed_effect: &Rational) -> Option<Rational> {
        if recipe.time.is_zero() {
            return None;
        }
        let per_second = recipe.time.reciprocal().ok()?;
        Some(match &self.kind {
            BuildingKind::Crafter { speed } => per_second * speed * speed_effect,
            BuildingKind::Miner { mining_speed } => per_second * mining_speed * speed_effect,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub key: String,
    pub name: String,
    pub speed: Rational,
    pub productivity: Rational,
}

#[derive(Debug, Clone, Default)]
pub struct GameData {
    items: Vec<Item>,
    recipes: Vec<Recipe>,
    buildings: Vec<Building>,
    modules: Vec<Module>,
    item_index: HashMap<String, ItemId>,
    recipe_index: HashMap<String, RecipeId>,
    building_index: HashMap<String, BuildingId>,
    module_index: HashMap<String, ModuleId>,
    default_priority: Vec<Vec<(RecipeId, Rational)>>,
}

impl GameData {
    /// Resolve a set of definitions.
    ///
    /// Items that are referenced but never declared are created with their
    /// key as name. Every item nothing produces gets a resource recipe, and
    /// every item that allows it gets a disable recipe.
    pub fn from_data_set(set: &DataSet) -> Result<Self> {
        let mut data = GameData::default();
        let mut last_resort: HashMap<ItemId, bool> = HashMap::new();

        for def in &set.items {
            let id = data.intern_item(&def.key);
            let item = &mut data.items[id.0];
            item.name = def.name.clone();
            item.phase = def.phase;
            last_resort.insert(id, def.last_resort);
        }

        for def in &set.recipes {
            if data.recipe_index.contains_key(&def.key) {
                warn!("duplicate recipe {}, keeping the first definition", def.key);
                continue;
            }
            let ingredients = def
                .ingredients
                .iter()
                .map(|a| Ingredient {
                    item: data.intern_item(&a.item),
                    amount: a.amount.clone(),
                })
                .collect();
            let products = def
                .products
                .iter()
                .map(|a| Ingredient {
                    item: data.intern_item(&a.item),
                    amount: a.amount.clone(),
                })
                .collect();
            let kind = if def.resource {
                RecipeKind::Resource
            } else {
                RecipeKind::Crafted
            };
            data.push_recipe(Recipe {
                id: RecipeId(0),
                key: def.key.clone(),
                name: def.name.clone(),
                category: def.category.clone(),
                time: def.time.clone(),
                kind,
                ingredients,
                products,
            });
        }

        for recipe in 0..data.recipes.len() {
            data.link_recipe(RecipeId(recipe));
        }

        let bare: Vec<ItemId> = data
            .items
            .iter()
            .filter(|i| i.recipes.is_empty())
            .map(|i| i.id)
            .collect();
        for item in bare {
            let key = data.free_recipe_key(data.items[item.0].key.clone(), "-resource");
            let id = data.push_recipe(Recipe {
                id: RecipeId(0),
                key,
                name: data.items[item.0].name.clone(),
                category: None,
                time: Rational::zero(),
                kind: RecipeKind::Resource,
                ingredients: Vec::new(),
                products: vec![Ingredient {
                    item,
                    amount: Rational::one(),
                }],
            });
            data.link_recipe(id);
        }

        for item in 0..data.items.len() {
            if !last_resort.get(&ItemId(item)).copied().unwrap_or(true) {
                continue;
            }
            let base = format!("disable:{}", data.items[item].key);
            let key = data.free_recipe_key(base, "-last-resort");
            let id = data.push_recipe(Recipe {
                id: RecipeId(0),
                key,
                name: format!("{} (last resort)", data.items[item].name),
                category: None,
                time: Rational::zero(),
                kind: RecipeKind::Disable,
                ingredients: Vec::new(),
                products: vec![Ingredient {
                    item: ItemId(item),
                    amount: Rational::one(),
                }],
            });
            data.items[item].disable = Some(id);
        }

        for def in &set.buildings {
            let id = BuildingId(data.buildings.len());
            data.building_index.insert(def.key.clone(), id);
            data.buildings.push(Building {
                id,
                key: def.key.clone(),
                name: def.name.clone(),
                kind: def.kind.clone(),
                categories: def.categories.clone(),
                module_slots: def.module_slots,
            });
        }

        for def in &set.modules {
            let id = ModuleId(data.modules.len());
            data.module_index.insert(def.key.clone(), id);
            data.modules.push(Module {
                id,
                key: def.key.clone(),
                name: def.name.clone(),
                speed: def.speed.clone(),
                productivity: def.productivity.clone(),
            });
        }

        data.default_priority = if set.priorities.is_empty() {
            vec![
                data.recipes
                    .iter()
                    .filter(|r| r.is_resource())
                    .map(|r| (r.id, Rational::one()))
                    .collect(),
            ]
        } else {
            let mut tiers: BTreeMap<usize, Vec<(RecipeId, Rational)>> = BTreeMap::new();
            for def in &set.priorities {
                let recipe = data.recipe_id(&def.recipe)?;
                tiers
                    .entry(def.tier)
                    .or_default()
                    .push((recipe, def.weight.clone()));
            }
            tiers.into_values().collect()
        };

        debug!(
            "loaded {} items, {} recipes, {} buildings, {} modules",
            data.items.len(),
            data.recipes.len(),
            data.buildings.len(),
            data.modules.len()
        );
        Ok(data)
    }

    fn intern_item(&mut self, key: &str) -> ItemId {
        if let Some(&id) = self.item_index.get(key) {
            return id;
        }
        let id = ItemId(self.items.len());
        self.items.push(Item {
            id,
            key: key.to_string(),
            name: key.to_string(),
            phase: Phase::Solid,
            recipes: Vec::new(),
            uses: Vec::new(),
            disable: None,
        });
        self.item_index.insert(key.to_string(), id);
        id
    }

    /// `key`, or `key` with `suffix` appended until no recipe uses it.
    fn free_recipe_key(&self, mut key: String, suffix: &str) -> String {
        while self.recipe_index.contains_key(&key) {
            key.push_str(suffix);
        }
        key
    }

    fn push_recipe(&mut self, mut recipe: Recipe) -> RecipeId {
        let id = RecipeId(self.recipes.len());
        recipe.id = id;
        self.recipe_index.insert(recipe.key.clone(), id);
        self.recipes.push(recipe);
        id
    }

    fn link_recipe(&mut self, id: RecipeId) {
        let recipe = &self.recipes[id.0];
        for p in &recipe.products {
            let producers = &mut self.items[p.item.0].recipes;
            if !producers.contains(&id) {
                producers.push(id);
            }
        }
        for i in &recipe.ingredients {
            let uses = &mut self.items[i.item.0].uses;
            if !uses.contains(&id) {
                uses.push(id);
            }
        }
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0]
    }

    pub fn recipe(&self, id: RecipeId) -> &Recipe {
        &self.recipes[id.0]
    }

    pub fn building(&self, id: BuildingId) -> &Building {
        &self.buildings[id.0]
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn item_id(&self, key: &str) -> Result<ItemId> {
        self.item_index
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::UnknownItem(key.to_string()).into())
    }

    pub fn recipe_id(&self, key: &str) -> Result<RecipeId> {
        self.recipe_index
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::UnknownRecipe(key.to_string()).into())
    }

    pub fn building_id(&self, key: &str) -> Result<BuildingId> {
        self.building_index
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::UnknownBuilding(key.to_string()).into())
    }

    pub fn module_id(&self, key: &str) -> Result<ModuleId> {
        self.module_index
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::UnknownModule(key.to_string()).into())
    }

    /// Buildings able to craft `recipe`, in definition order.
    pub fn buildings_for(&self, recipe: RecipeId) -> impl Iterator<Item = &Building> {
        let recipe = self.recipe(recipe);
        self.buildings.iter().filter(move |b| b.can_craft(recipe))
    }

    pub fn default_priority(&self) -> &[Vec<(RecipeId, Rational)>] {
        &self.default_priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemDef, PriorityDef, RecipeDef};

    fn gears() -> DataSet {
        DataSet {
            items: vec![ItemDef::new("iron-plate").named("Iron plate")],
            recipes: vec![
                RecipeDef::new("gear", 1)
                    .category("crafting")
                    .ingredient("iron-plate", 2)
                    .product("gear", 1),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn links_producers_and_uses() {
        let data = GameData::from_data_set(&gears()).unwrap();
        let gear = data.item_id("gear").unwrap();
        let plate = data.item_id("iron-plate").unwrap();
        let recipe = data.recipe_id("gear").unwrap();
        assert_eq!(data.item(gear).recipes, vec![recipe]);
        assert_eq!(data.item(plate).uses, vec![recipe]);
        assert_eq!(data.item(plate).name, "Iron plate");
        assert_eq!(data.recipe(recipe).ingredient_amount(plate), Rational::from(2));
    }

    #[test]
    fn bare_items_get_resource_recipes() {
        let data = GameData::from_data_set(&gears()).unwrap();
        let plate = data.item_id("iron-plate").unwrap();
        let producers = &data.item(plate).recipes;
        assert_eq!(producers.len(), 1);
        let resource = data.recipe(producers[0]);
        assert!(resource.is_resource());
        assert_eq!(resource.key, "iron-plate");
        assert_eq!(data.default_priority(), &[vec![(resource.id, Rational::one())]]);
    }

    #[test]
    fn resource_key_avoids_collisions() {
        let set = DataSet {
            recipes: vec![
                RecipeDef::new("ore", 1).ingredient("ore", 1).product("slag", 1),
                RecipeDef::new("smelt", 1).ingredient("slag", 1).product("ore", 1),
            ],
            ..Default::default()
        };
        let data = GameData::from_data_set(&set).unwrap();
        // both items are produced, so nothing synthetic beyond disable recipes
        assert!(data.recipe_id("ore-resource").is_err());

        let set = DataSet {
            recipes: vec![RecipeDef::new("ore", 1).ingredient("ore", 1).product("slag", 1)],
            ..Default::default()
        };
        let data = GameData::from_data_set(&set).unwrap();
        let ore = data.item_id("ore").unwrap();
        let resource = data.recipe_id("ore-resource").unwrap();
        assert_eq!(data.item(ore).recipes, vec![resource]);
    }

    #[test]
    fn disable_key_avoids_collisions() {
        let set = DataSet {
            recipes: vec![
                RecipeDef::new("disable:ore", 1)
                    .ingredient("ore", 1)
                    .product("slag", 1),
            ],
            ..Default::default()
        };
        let data = GameData::from_data_set(&set).unwrap();
        let ore = data.item_id("ore").unwrap();
        let user = data.recipe_id("disable:ore").unwrap();
        assert!(!data.recipe(user).is_disable());
        assert_eq!(data.recipe(user).products[0].item, data.item_id("slag").unwrap());

        let disable = data.item(ore).disable.unwrap();
        assert_eq!(data.recipe(disable).key, "disable:ore-last-resort");
        assert_eq!(data.recipe_id("disable:ore-last-resort").unwrap(), disable);
    }

    #[test]
    fn disable_recipes_stay_out_of_producers() {
        let mut set = gears();
        set.items.push(ItemDef::new("gear").without_last_resort());
        let data = GameData::from_data_set(&set).unwrap();
        let plate = data.item_id("iron-plate").unwrap();
        let gear = data.item_id("gear").unwrap();

        let disable = data.item(plate).disable.unwrap();
        assert!(data.recipe(disable).is_disable());
        assert_eq!(data.recipe(disable).key, "disable:iron-plate");
        assert!(!data.item(plate).recipes.contains(&disable));
        assert!(data.item(gear).disable.is_none());
    }

    #[test]
    fn stored_priorities_are_grouped_by_tier() {
        let mut set = gears();
        set.recipes.push(RecipeDef::new("scrap", 1).resource().product("iron-plate", 1));
        set.priorities = vec![
            PriorityDef {
                tier: 5,
                recipe: "scrap".into(),
                weight: Rational::one(),
            },
            PriorityDef {
                tier: 2,
                recipe: "iron-plate".into(),
                weight: Rational::from(3),
            },
        ];
        let err = GameData::from_data_set(&set);
        // iron-plate has a producer now, so no resource recipe of that key exists
        assert!(err.is_err());

        set.priorities[1].recipe = "scrap".into();
        let data = GameData::from_data_set(&set).unwrap();
        let scrap = data.recipe_id("scrap").unwrap();
        assert_eq!(data.default_priority().len(), 2);
        assert_eq!(data.default_priority()[0], vec![(scrap, Rational::from(3))]);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let data = GameData::from_data_set(&gears()).unwrap();
        assert!(matches!(
            data.item_id("copper"),
            Err(crate::Error::Config(ConfigError::UnknownItem(_)))
        ));
        assert!(data.building_id("assembler").is_err());
        assert!(data.module_id("speed-1").is_err());
    }
}
