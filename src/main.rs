//! Rate Solver
//!
//! Command line front end: manages the SQLite data store and runs solves.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use rusqlite::Connection;

use rate_solver::models::{
    BuildingDef, BuildingKind, DataSet, ItemDef, ModuleDef, PriorityDef, RecipeDef,
};
use rate_solver::{BuildTarget, GameData, RateUnit, Rational, Solver, Spec, db, import};

#[derive(Parser)]
#[command(name = "rate-solver")]
#[command(about = "Exact production rate calculator for factory-building games")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "factory_data.db", global = true)]
    database: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import definitions from *.recipes files
    Import {
        /// Directory to scan recursively
        source_dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },

    /// Solve for one or more targets
    Calc(CalcArgs),

    /// List all declared items
    ListItems,

    /// List all recipes
    ListRecipes,

    /// Show details for a specific recipe
    Recipe {
        /// Recipe key
        key: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample oil, plastic and iron data
    LoadSample,
}

#[derive(Args)]
struct CalcArgs {
    /// ITEM[:RECIPE]=AMOUNT for a rate, ITEM[:RECIPE]=COUNTx for a building count
    #[arg(required = true)]
    targets: Vec<String>,

    /// Treat an item as a raw input and do not expand its recipe
    #[arg(long, value_name = "ITEM")]
    ignore: Vec<String>,

    /// Never use a recipe
    #[arg(long, value_name = "RECIPE")]
    disable: Vec<String>,

    /// Building for a recipe
    #[arg(long, value_name = "RECIPE=BUILDING")]
    building: Vec<String>,

    /// Modules for a recipe
    #[arg(long, value_name = "RECIPE=MODULE[,MODULE...]")]
    modules: Vec<String>,

    /// Beacons around a recipe's buildings
    #[arg(long, value_name = "RECIPE=MODULE:COUNT")]
    beacon: Vec<String>,

    /// Rate unit for targets and output (second, minute, hour)
    #[arg(short, long, default_value = "second")]
    unit: String,

    /// Show item flows between recipes
    #[arg(long)]
    flows: bool,

    /// Show the linear program tableau
    #[arg(long)]
    debug: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { source_dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_data(&conn)?;
            }

            let stats = import::import_to_database(&conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::Calc(args) => run_calc(&conn, &args)?,

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<24} {:<30} {:>6}", "Item", "Name", "Phase");
                println!("{}", "-".repeat(62));
                for item in items {
                    println!("{:<24} {:<30} {:>6}", item.key, item.name, item.phase);
                }
            }
        }

        Commands::ListRecipes => {
            let recipes = db::list_recipes(&conn)?;
            if recipes.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<30} {:>8}  {}", "Recipe", "Time (s)", "Ingredients -> Products");
                println!("{}", "-".repeat(72));
                for r in recipes {
                    println!(
                        "{:<30} {:>8}  {} -> {}",
                        r.key,
                        r.time.to_decimal(3),
                        format_amounts(&r.ingredients),
                        format_amounts(&r.products)
                    );
                }
            }
        }

        Commands::Recipe { key } => match db::get_recipe(&conn, &key)? {
            Some(r) => {
                println!("Recipe: {}", r.name);
                println!("  Key: {}", r.key);
                if let Some(category) = &r.category {
                    println!("  Category: {}", category);
                }
                println!("  Time: {}s", r.time.to_decimal(3));
                if r.resource {
                    println!("  Resource extraction");
                }

                if !r.ingredients.is_empty() {
                    println!("  Ingredients:");
                    for a in &r.ingredients {
                        println!("    {} {}", a.amount.to_decimal(3), a.item);
                    }
                }

                println!("  Products:");
                for a in &r.products {
                    println!("    {} {}", a.amount.to_decimal(3), a.item);
                    for (other, amount) in db::get_producers(&conn, &a.item)? {
                        if other != r.key {
                            println!("      also made by {} ({})", other, amount.to_decimal(3));
                        }
                    }
                }
            }
            None => println!("Recipe '{}' not found", key),
        },

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            db::clear_data(&conn)?;
            let set = sample_data()?;
            db::save_data_set(&conn, &set)?;
            println!(
                "Loaded {} sample recipes and {} buildings",
                set.recipes.len(),
                set.buildings.len()
            );
        }
    }

    Ok(())
}

fn format_amounts(amounts: &[rate_solver::models::Amount]) -> String {
    if amounts.is_empty() {
        return "(nothing)".to_string();
    }
    amounts
        .iter()
        .map(|a| format!("{} {}", a.amount.to_decimal(3), a.item))
        .collect::<Vec<_>>()
        .join(", ")
}

fn split_pair<'a>(text: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    text.split_once('=')
        .with_context(|| format!("Expected {} in '{}'", what, text))
}

/// Parse `ITEM[:RECIPE]=AMOUNT[x]`. Rates are given in `unit`.
fn parse_target(data: &GameData, text: &str, unit: RateUnit) -> Result<BuildTarget> {
    let (lhs, amount) = split_pair(text, "ITEM=AMOUNT")?;
    let (item, recipe) = match lhs.split_once(':') {
        Some((item, recipe)) => (item, Some(recipe)),
        None => (lhs, None),
    };
    let item = data.item_id(item)?;

    let mut target = match amount.strip_suffix('x') {
        Some(count) => BuildTarget::buildings(item, count.parse::<Rational>()?),
        None => BuildTarget::rate(item, amount.parse::<Rational>()?.try_div(&unit.factor())?),
    };
    if let Some(recipe) = recipe {
        target = target.with_recipe(data.recipe_id(recipe)?);
    }
    Ok(target)
}

fn build_spec(conn: &Connection, args: &CalcArgs) -> Result<Option<Spec>> {
    let set = db::load_data_set(conn)?;
    if set.recipes.is_empty() {
        return Ok(None);
    }
    let mut spec = Spec::new(GameData::from_data_set(&set)?);

    for item in &args.ignore {
        spec.ignore(item)?;
    }
    for recipe in &args.disable {
        spec.disable(recipe)?;
    }
    for pair in &args.building {
        let (recipe, building) = split_pair(pair, "RECIPE=BUILDING")?;
        spec.set_building(recipe, building)?;
    }
    for pair in &args.modules {
        let (recipe, modules) = split_pair(pair, "RECIPE=MODULES")?;
        let modules: Vec<&str> = modules.split(',').filter(|m| !m.is_empty()).collect();
        spec.set_modules(recipe, &modules)?;
    }
    for pair in &args.beacon {
        let (recipe, beacon) = split_pair(pair, "RECIPE=MODULE:COUNT")?;
        let Some((module, count)) = beacon.split_once(':') else {
            bail!("Expected MODULE:COUNT in '{}'", pair);
        };
        spec.set_beacon(recipe, module, count.parse()?)?;
    }
    Ok(Some(spec))
}

fn run_calc(conn: &Connection, args: &CalcArgs) -> Result<()> {
    let unit: RateUnit = args.unit.parse()?;
    let Some(spec) = build_spec(conn, args)? else {
        println!("No recipes in database. Run 'import' or 'load-sample' first.");
        return Ok(());
    };

    let targets = args
        .targets
        .iter()
        .map(|t| parse_target(spec.data(), t, unit))
        .collect::<Result<Vec<_>>>()?;

    let mut solver = Solver::new();
    let totals = solver.solve(&spec, &targets)?;
    println!("{}", totals.summary(&spec, unit));

    if args.flows {
        println!("{}", totals.flows(&spec, unit));
    }

    if args.debug {
        match solver.last_tableau() {
            Some(tableau) => {
                println!("=== Tableau ===");
                println!("{}", tableau.describe(spec.data()));
                let independent: Vec<&str> = tableau
                    .independent_recipes()
                    .into_iter()
                    .map(|r| spec.data().recipe(r).key.as_str())
                    .collect();
                println!("Independent recipes: {}", independent.join(", "));
            }
            None => println!("Solved directly; no tableau was built."),
        }
    }
    Ok(())
}

fn building(
    key: &str,
    name: &str,
    kind: BuildingKind,
    categories: &[&str],
    slots: usize,
) -> BuildingDef {
    BuildingDef {
        key: key.to_string(),
        name: name.to_string(),
        kind,
        categories: categories.iter().map(|c| c.to_string()).collect(),
        module_slots: slots,
    }
}

fn decimal(text: &str) -> Result<Rational> {
    text.parse().with_context(|| format!("Invalid sample constant {}", text))
}

fn priority(tier: usize, recipe: &str) -> PriorityDef {
    PriorityDef {
        tier,
        recipe: recipe.to_string(),
        weight: Rational::one(),
    }
}

/// Sample oil, plastic and iron data for trying the solver without an import
fn sample_data() -> Result<DataSet> {
    let one = || BuildingKind::Crafter {
        speed: Rational::one(),
    };
    Ok(DataSet {
        items: vec![
            ItemDef::new("crude-oil").fluid().named("Crude oil"),
            ItemDef::new("water").fluid().named("Water"),
            ItemDef::new("steam").fluid().named("Steam"),
            ItemDef::new("heavy-oil").fluid().named("Heavy oil"),
            ItemDef::new("light-oil").fluid().named("Light oil"),
            ItemDef::new("petroleum-gas").fluid().named("Petroleum gas"),
            ItemDef::new("coal").named("Coal"),
            ItemDef::new("plastic-bar").named("Plastic bar"),
            ItemDef::new("iron-ore").named("Iron ore"),
            ItemDef::new("iron-plate").named("Iron plate"),
            ItemDef::new("iron-gear-wheel").named("Iron gear wheel"),
        ],
        recipes: vec![
            RecipeDef::new("advanced-oil-processing", 5)
                .category("oil-processing")
                .ingredient("crude-oil", 100)
                .ingredient("water", 50)
                .product("heavy-oil", 25)
                .product("light-oil", 45)
                .product("petroleum-gas", 55),
            RecipeDef::new("heavy-oil-cracking", 2)
                .category("chemistry")
                .ingredient("heavy-oil", 40)
                .ingredient("water", 30)
                .product("light-oil", 30),
            RecipeDef::new("light-oil-cracking", 2)
                .category("chemistry")
                .ingredient("light-oil", 30)
                .ingredient("water", 30)
                .product("petroleum-gas", 20),
            RecipeDef::new("coal-liquefaction", 5)
                .category("oil-processing")
                .ingredient("coal", 10)
                .ingredient("heavy-oil", 25)
                .ingredient("steam", 50)
                .product("heavy-oil", 90)
                .product("light-oil", 20)
                .product("petroleum-gas", 10),
            RecipeDef::new("plastic-bar", 1)
                .category("chemistry")
                .ingredient("petroleum-gas", 20)
                .ingredient("coal", 1)
                .product("plastic-bar", 2),
            RecipeDef::new("iron-plate", decimal("3.2")?)
                .category("smelting")
                .ingredient("iron-ore", 1)
                .product("iron-plate", 1),
            RecipeDef::new("iron-gear-wheel", decimal("0.5")?)
                .category("crafting")
                .ingredient("iron-plate", 2)
                .product("iron-gear-wheel", 1),
            RecipeDef::new("crude-oil", 1)
                .category("basic-fluid")
                .resource()
                .product("crude-oil", 10),
            RecipeDef::new("water", 1)
                .category("water-pumping")
                .resource()
                .product("water", 1200),
            RecipeDef::new("steam", 1)
                .category("boiling")
                .ingredient("water", 60)
                .product("steam", 60),
            RecipeDef::new("coal", 1)
                .category("basic-solid")
                .resource()
                .product("coal", 1),
            RecipeDef::new("iron-ore", 1)
                .category("basic-solid")
                .resource()
                .product("iron-ore", 1),
        ],
        buildings: vec![
            building("stone-furnace", "Stone furnace", one(), &["smelting"], 0),
            building(
                "assembling-machine-2",
                "Assembling machine 2",
                BuildingKind::Crafter {
                    speed: decimal("0.75")?,
                },
                &["crafting"],
                2,
            ),
            building("chemical-plant", "Chemical plant", one(), &["chemistry"], 3),
            building("oil-refinery", "Oil refinery", one(), &["oil-processing"], 3),
            building("boiler", "Boiler", one(), &["boiling"], 0),
            building(
                "electric-mining-drill",
                "Electric mining drill",
                BuildingKind::Miner {
                    mining_speed: decimal("0.5")?,
                },
                &["basic-solid"],
                3,
            ),
            building(
                "pumpjack",
                "Pumpjack",
                BuildingKind::Miner {
                    mining_speed: Rational::one(),
                },
                &["basic-fluid"],
                2,
            ),
            building(
                "offshore-pump",
                "Offshore pump",
                BuildingKind::Miner {
                    mining_speed: Rational::one(),
                },
                &["water-pumping"],
                0,
            ),
        ],
        modules: vec![
            ModuleDef {
                key: "speed-module".into(),
                name: "Speed module".into(),
                speed: decimal("0.2")?,
                productivity: Rational::zero(),
            },
            ModuleDef {
                key: "productivity-module".into(),
                name: "Productivity module".into(),
                speed: decimal("-0.05")?,
                productivity: decimal("0.04")?,
            },
        ],
        priorities: vec![
            priority(0, "water"),
            priority(1, "crude-oil"),
            priority(1, "iron-ore"),
            priority(2, "coal"),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_constants_are_exact() {
        let set = sample_data().unwrap();
        let plate = set.recipes.iter().find(|r| r.key == "iron-plate").unwrap();
        assert_eq!(plate.time, Rational::new(16, 5).unwrap());
        let prod = set
            .modules
            .iter()
            .find(|m| m.key == "productivity-module")
            .unwrap();
        assert_eq!(prod.speed, Rational::new(-1, 20).unwrap());
        assert_eq!(prod.productivity, Rational::new(1, 25).unwrap());
        assert!(GameData::from_data_set(&set).is_ok());
    }

    #[test]
    fn malformed_constant_is_reported() {
        let err = decimal("3,2").unwrap_err();
        assert!(format!("{:#}", err).contains("3,2"));
    }
}
