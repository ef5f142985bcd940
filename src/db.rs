//! Database schema and operations
//!
//! Rationals are stored as exact text (`3/2`, `7`) and parsed back on load.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{
    Amount, BuildingDef, BuildingKind, DataSet, ItemDef, ModuleDef, Phase, PriorityDef, RecipeDef,
};
use crate::rational::Rational;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Items; anything referenced but not listed here is created on load
        CREATE TABLE IF NOT EXISTS items (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            phase TEXT NOT NULL DEFAULT 'solid',
            last_resort INTEGER NOT NULL DEFAULT 1
        );

        -- Recipe definitions; time is a rational in seconds
        CREATE TABLE IF NOT EXISTS recipes (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            time TEXT NOT NULL,
            resource INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_key TEXT,
            position INTEGER,
            item_key TEXT NOT NULL,
            amount TEXT NOT NULL,
            PRIMARY KEY (recipe_key, position)
        );

        CREATE TABLE IF NOT EXISTS recipe_products (
            recipe_key TEXT,
            position INTEGER,
            item_key TEXT NOT NULL,
            amount TEXT NOT NULL,
            PRIMARY KEY (recipe_key, position)
        );

        -- Buildings: kind is 'crafter' or 'miner'
        CREATE TABLE IF NOT EXISTS buildings (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            speed TEXT NOT NULL,
            module_slots INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS building_categories (
            building_key TEXT,
            category TEXT,
            PRIMARY KEY (building_key, category)
        );

        CREATE TABLE IF NOT EXISTS modules (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            speed TEXT NOT NULL,
            productivity TEXT NOT NULL
        );

        -- Default resource priorities; tier 0 is used first
        CREATE TABLE IF NOT EXISTS resource_priorities (
            recipe_key TEXT PRIMARY KEY,
            tier INTEGER NOT NULL,
            weight TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_products_item ON recipe_products(item_key);
        CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_item ON recipe_ingredients(item_key);
        "#,
    )?;
    Ok(())
}

fn parse_rational(text: &str) -> Result<Rational> {
    text.parse::<Rational>()
        .with_context(|| format!("Invalid number '{}' in database", text))
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &ItemDef) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (key, name, phase, last_resort) VALUES (?1, ?2, ?3, ?4)",
        (&item.key, &item.name, item.phase.as_str(), item.last_resort),
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its ingredient and product lists
pub fn upsert_recipe(conn: &Connection, recipe: &RecipeDef) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO recipes (key, name, category, time, resource)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &recipe.key,
            &recipe.name,
            &recipe.category,
            recipe.time.to_string(),
            recipe.resource,
        ),
    )?;
    conn.execute("DELETE FROM recipe_ingredients WHERE recipe_key = ?1", [&recipe.key])?;
    conn.execute("DELETE FROM recipe_products WHERE recipe_key = ?1", [&recipe.key])?;
    for (position, ing) in recipe.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_key, position, item_key, amount)
             VALUES (?1, ?2, ?3, ?4)",
            (&recipe.key, position as i64, &ing.item, ing.amount.to_string()),
        )?;
    }
    for (position, product) in recipe.products.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_products (recipe_key, position, item_key, amount)
             VALUES (?1, ?2, ?3, ?4)",
            (&recipe.key, position as i64, &product.item, product.amount.to_string()),
        )?;
    }
    Ok(())
}

/// Insert or replace a building and its crafting categories
pub fn upsert_building(conn: &Connection, building: &BuildingDef) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO buildings (key, name, kind, speed, module_slots)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &building.key,
            &building.name,
            building.kind.name(),
            building.kind.speed().to_string(),
            building.module_slots as i64,
        ),
    )?;
    conn.execute(
        "DELETE FROM building_categories WHERE building_key = ?1",
        [&building.key],
    )?;
    for category in &building.categories {
        conn.execute(
            "INSERT OR IGNORE INTO building_categories (building_key, category) VALUES (?1, ?2)",
            (&building.key, category),
        )?;
    }
    Ok(())
}

/// Insert or replace a module
pub fn upsert_module(conn: &Connection, module: &ModuleDef) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO modules (key, name, speed, productivity) VALUES (?1, ?2, ?3, ?4)",
        (
            &module.key,
            &module.name,
            module.speed.to_string(),
            module.productivity.to_string(),
        ),
    )?;
    Ok(())
}

/// Insert or replace the priority of a resource recipe
pub fn upsert_priority(conn: &Connection, priority: &PriorityDef) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO resource_priorities (recipe_key, tier, weight) VALUES (?1, ?2, ?3)",
        (&priority.recipe, priority.tier as i64, priority.weight.to_string()),
    )?;
    Ok(())
}

/// Clear all stored data (for re-import)
pub fn clear_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM resource_priorities;
        DELETE FROM modules;
        DELETE FROM building_categories;
        DELETE FROM buildings;
        DELETE FROM recipe_products;
        DELETE FROM recipe_ingredients;
        DELETE FROM recipes;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// Store a whole data set in one transaction
pub fn save_data_set(conn: &Connection, set: &DataSet) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for item in &set.items {
        upsert_item(&tx, item)?;
    }
    for recipe in &set.recipes {
        upsert_recipe(&tx, recipe)?;
    }
    for building in &set.buildings {
        upsert_building(&tx, building)?;
    }
    for module in &set.modules {
        upsert_module(&tx, module)?;
    }
    for priority in &set.priorities {
        upsert_priority(&tx, priority)?;
    }
    tx.commit()?;
    Ok(())
}

/// Load everything, in insertion order
pub fn load_data_set(conn: &Connection) -> Result<DataSet> {
    Ok(DataSet {
        items: list_items(conn)?,
        recipes: list_recipes(conn)?,
        buildings: list_buildings(conn)?,
        modules: list_modules(conn)?,
        priorities: list_priorities(conn)?,
    })
}

/// List all declared items
pub fn list_items(conn: &Connection) -> Result<Vec<ItemDef>> {
    let mut stmt = conn.prepare("SELECT key, name, phase, last_resort FROM items ORDER BY rowid")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (key, name, phase, last_resort) = row?;
        let phase: Phase = phase
            .parse()
            .with_context(|| format!("Item '{}' has an invalid phase", key))?;
        results.push(ItemDef {
            key,
            name,
            phase,
            last_resort,
        });
    }
    Ok(results)
}

fn load_amounts(conn: &Connection, table: &str, recipe_key: &str) -> Result<Vec<Amount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_key, amount FROM {} WHERE recipe_key = ?1 ORDER BY position",
        table
    ))?;

    let rows = stmt.query_map([recipe_key], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (item, amount) = row?;
        results.push(Amount {
            item,
            amount: parse_rational(&amount)?,
        });
    }
    Ok(results)
}

type RecipeRow = (String, String, Option<String>, String, bool);

fn recipe_from_row(conn: &Connection, row: RecipeRow) -> Result<RecipeDef> {
    let (key, name, category, time, resource) = row;
    Ok(RecipeDef {
        ingredients: load_amounts(conn, "recipe_ingredients", &key)?,
        products: load_amounts(conn, "recipe_products", &key)?,
        time: parse_rational(&time).with_context(|| format!("Recipe '{}'", key))?,
        key,
        name,
        category,
        resource,
    })
}

fn read_recipe_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

/// List all recipes with their ingredients and products
pub fn list_recipes(conn: &Connection) -> Result<Vec<RecipeDef>> {
    let mut stmt = conn.prepare(
        "SELECT key, name, category, time, resource FROM recipes ORDER BY rowid",
    )?;

    let rows = stmt.query_map([], read_recipe_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(recipe_from_row(conn, row?)?);
    }
    Ok(results)
}

/// Get a single recipe by key
pub fn get_recipe(conn: &Connection, key: &str) -> Result<Option<RecipeDef>> {
    let row = conn
        .query_row(
            "SELECT key, name, category, time, resource FROM recipes WHERE key = ?1",
            [key],
            read_recipe_row,
        )
        .optional()?;
    row.map(|row| recipe_from_row(conn, row)).transpose()
}

/// Get all recipes that produce a given item, with the amount per craft
pub fn get_producers(conn: &Connection, item_key: &str) -> Result<Vec<(String, Rational)>> {
    let mut stmt = conn.prepare(
        "SELECT r.key, rp.amount
         FROM recipes r
         JOIN recipe_products rp ON r.key = rp.recipe_key
         WHERE rp.item_key = ?1
         ORDER BY r.rowid",
    )?;

    let rows = stmt.query_map([item_key], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (key, amount) = row?;
        let amount = parse_rational(&amount)?;
        results.push((key, amount));
    }
    Ok(results)
}

/// List all buildings in the database
pub fn list_buildings(conn: &Connection) -> Result<Vec<BuildingDef>> {
    let mut stmt = conn.prepare(
        "SELECT key, name, kind, speed, module_slots FROM buildings ORDER BY rowid",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (key, name, kind, speed, slots) = row?;
        let kind = BuildingKind::from_parts(&kind, parse_rational(&speed)?)
            .with_context(|| format!("Building '{}' has an invalid kind", key))?;

        let mut cat_stmt = conn.prepare(
            "SELECT category FROM building_categories WHERE building_key = ?1 ORDER BY rowid",
        )?;
        let cats = cat_stmt.query_map([&key], |row| row.get::<_, String>(0))?;
        let mut categories = Vec::new();
        for cat in cats {
            categories.push(cat?);
        }

        results.push(BuildingDef {
            key,
            name,
            kind,
            categories,
            module_slots: usize::try_from(slots).unwrap_or(0),
        });
    }
    Ok(results)
}

/// List all modules in the database
pub fn list_modules(conn: &Connection) -> Result<Vec<ModuleDef>> {
    let mut stmt =
        conn.prepare("SELECT key, name, speed, productivity FROM modules ORDER BY rowid")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (key, name, speed, productivity) = row?;
        results.push(ModuleDef {
            key,
            name,
            speed: parse_rational(&speed)?,
            productivity: parse_rational(&productivity)?,
        });
    }
    Ok(results)
}

/// List the stored resource priorities, by tier
pub fn list_priorities(conn: &Connection) -> Result<Vec<PriorityDef>> {
    let mut stmt = conn.prepare(
        "SELECT tier, recipe_key, weight FROM resource_priorities ORDER BY tier, rowid",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (tier, recipe, weight) = row?;
        results.push(PriorityDef {
            tier: usize::try_from(tier).with_context(|| format!("Negative tier for '{}'", recipe))?,
            weight: parse_rational(&weight)?,
            recipe,
        });
    }
    Ok(results)
}
