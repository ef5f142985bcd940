//! Line-oriented importer for `.recipes` data files
//!
//! One definition per line:
//!
//! ```text
//! item KEY [solid|fluid] ["Name"] [no-last-resort]
//! recipe KEY [category=CAT] [time=T] [resource]: AMT ITEM, ... -> AMT ITEM, ...
//! building KEY crafter|miner SPEED CAT[,CAT...] [slots=N] ["Name"]
//! module KEY speed=R productivity=R ["Name"]
//! priority TIER RECIPE [WEIGHT]
//! ```
//!
//! Numbers may be integers, decimals or fractions and are kept exact.
//! Recipe time defaults to one second.
//! Blank lines and `#` comments are skipped. Malformed lines are logged and
//! counted, and the rest of the file is still imported.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::db;
use crate::models::{
    Amount, BuildingDef, BuildingKind, DataSet, ItemDef, ModuleDef, Phase, PriorityDef, RecipeDef,
};
use crate::rational::Rational;

/// Find all *.recipes files under `dir`
pub fn find_recipe_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "recipes") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// One parsed definition
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Item(ItemDef),
    Recipe(RecipeDef),
    Building(BuildingDef),
    Module(ModuleDef),
    Priority(PriorityDef),
}

pub struct LineParser {
    item: Regex,
    recipe: Regex,
    amount: Regex,
    building: Regex,
    module: Regex,
    priority: Regex,
}

fn number(text: &str) -> Result<Rational> {
    text.parse::<Rational>()
        .with_context(|| format!("invalid number '{}'", text))
}

impl LineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            item: Regex::new(
                r#"^item\s+(\S+)(?:\s+(solid|fluid))?(?:\s+"([^"]*)")?(\s+no-last-resort)?\s*$"#,
            )?,
            recipe: Regex::new(r"^recipe\s+([^\s:]+)((?:\s+[^\s:]+)*)\s*:(.*)->(.*)$")?,
            amount: Regex::new(r"^(\S+)\s+(\S+)$")?,
            building: Regex::new(
                r#"^building\s+(\S+)\s+(crafter|miner)\s+(\S+)\s+(\S+)(?:\s+slots=(\d+))?(?:\s+"([^"]*)")?\s*$"#,
            )?,
            module: Regex::new(
                r#"^module\s+(\S+)\s+speed=(\S+)\s+productivity=(\S+)(?:\s+"([^"]*)")?\s*$"#,
            )?,
            priority: Regex::new(r"^priority\s+(\d+)\s+(\S+)(?:\s+(\S+))?\s*$")?,
        })
    }

    /// Parse one line. Blank lines and comments give `None`.
    pub fn parse(&self, line: &str) -> Result<Option<Line>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let keyword = line.split_whitespace().next().unwrap_or_default();
        let parsed = match keyword {
            "item" => self.parse_item(line)?,
            "recipe" => self.parse_recipe(line)?,
            "building" => self.parse_building(line)?,
            "module" => self.parse_module(line)?,
            "priority" => self.parse_priority(line)?,
            other => bail!("unknown definition '{}'", other),
        };
        Ok(Some(parsed))
    }

    fn parse_item(&self, line: &str) -> Result<Line> {
        let Some(cap) = self.item.captures(line) else {
            bail!("malformed item line");
        };
        let mut item = ItemDef::new(&cap[1]);
        if let Some(phase) = cap.get(2) {
            item.phase = phase.as_str().parse::<Phase>()?;
        }
        if let Some(name) = cap.get(3) {
            item.name = name.as_str().to_string();
        }
        item.last_resort = cap.get(4).is_none();
        Ok(Line::Item(item))
    }

    fn parse_amounts(&self, list: &str) -> Result<Vec<Amount>> {
        let mut amounts = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some(cap) = self.amount.captures(part) else {
                bail!("malformed amount '{}'", part);
            };
            amounts.push(Amount {
                amount: number(&cap[1])?,
                item: cap[2].to_string(),
            });
        }
        Ok(amounts)
    }

    fn parse_recipe(&self, line: &str) -> Result<Line> {
        let Some(cap) = self.recipe.captures(line) else {
            bail!("malformed recipe line");
        };
        let mut recipe = RecipeDef::new(&cap[1], 1);
        for option in cap[2].split_whitespace() {
            match option.split_once('=') {
                Some(("category", cat)) => recipe.category = Some(cat.to_string()),
                Some(("time", time)) => recipe.time = number(time)?,
                None if option == "resource" => recipe.resource = true,
                _ => bail!("unknown recipe option '{}'", option),
            }
        }
        recipe.ingredients = self.parse_amounts(&cap[3])?;
        recipe.products = self.parse_amounts(&cap[4])?;
        if recipe.products.is_empty() {
            bail!("recipe '{}' has no products", recipe.key);
        }
        Ok(Line::Recipe(recipe))
    }

    fn parse_building(&self, line: &str) -> Result<Line> {
        let Some(cap) = self.building.captures(line) else {
            bail!("malformed building line");
        };
        let key = cap[1].to_string();
        let kind = BuildingKind::from_parts(&cap[2], number(&cap[3])?)?;
        let module_slots = match cap.get(5) {
            Some(slots) => slots.as_str().parse::<usize>()?,
            None => 0,
        };
        Ok(Line::Building(BuildingDef {
            name: cap.get(6).map_or_else(|| key.clone(), |m| m.as_str().to_string()),
            key,
            kind,
            categories: cap[4].split(',').map(str::to_string).collect(),
            module_slots,
        }))
    }

    fn parse_module(&self, line: &str) -> Result<Line> {
        let Some(cap) = self.module.captures(line) else {
            bail!("malformed module line");
        };
        let key = cap[1].to_string();
        Ok(Line::Module(ModuleDef {
            name: cap.get(4).map_or_else(|| key.clone(), |m| m.as_str().to_string()),
            key,
            speed: number(&cap[2])?,
            productivity: number(&cap[3])?,
        }))
    }

    fn parse_priority(&self, line: &str) -> Result<Line> {
        let Some(cap) = self.priority.captures(line) else {
            bail!("malformed priority line");
        };
        let weight = match cap.get(3) {
            Some(w) => number(w.as_str())?,
            None => Rational::one(),
        };
        if !weight.is_positive() {
            bail!("priority weight must be positive");
        }
        Ok(Line::Priority(PriorityDef {
            tier: cap[1].parse()?,
            recipe: cap[2].to_string(),
            weight,
        }))
    }
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub items: usize,
    pub recipes: usize,
    pub buildings: usize,
    pub modules: usize,
    pub priorities: usize,
    pub errors: usize,
}

impl ImportStats {
    fn record(&mut self, set: &mut DataSet, line: Line) {
        match line {
            Line::Item(item) => {
                self.items += 1;
                set.items.push(item);
            }
            Line::Recipe(recipe) => {
                self.recipes += 1;
                set.recipes.push(recipe);
            }
            Line::Building(building) => {
                self.buildings += 1;
                set.buildings.push(building);
            }
            Line::Module(module) => {
                self.modules += 1;
                set.modules.push(module);
            }
            Line::Priority(priority) => {
                self.priorities += 1;
                set.priorities.push(priority);
            }
        }
    }
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} recipes, {} buildings, {} modules, {} priorities from {} files. Errors: {}",
            self.items,
            self.recipes,
            self.buildings,
            self.modules,
            self.priorities,
            self.files,
            self.errors
        )
    }
}

/// Parse the text of one file into `set`. `origin` labels log messages.
pub fn parse_text(
    parser: &LineParser,
    origin: &str,
    text: &str,
    set: &mut DataSet,
    stats: &mut ImportStats,
) {
    for (lineno, line) in text.lines().enumerate() {
        match parser.parse(line) {
            Ok(Some(parsed)) => stats.record(set, parsed),
            Ok(None) => {}
            Err(e) => {
                warn!("{}:{}: {:#}", origin, lineno + 1, e);
                stats.errors += 1;
            }
        }
    }
}

/// Import every *.recipes file under `dir` and store the result
pub fn import_to_database(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut set = DataSet::default();
    let parser = LineParser::new()?;

    info!("Scanning {} for recipe files...", dir.display());
    let files = find_recipe_files(dir)?;
    info!("Found {} recipe files", files.len());

    for path in &files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let before = stats.recipes;
        parse_text(&parser, &path.display().to_string(), &text, &mut set, &mut stats);
        stats.files += 1;
        info!("  Parsed: {} ({} recipes)", path.display(), stats.recipes - before);
    }

    db::save_data_set(conn, &set)?;
    Ok(stats)
}
