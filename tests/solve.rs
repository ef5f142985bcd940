use rate_solver::models::{BuildingDef, BuildingKind, DataSet, ItemDef, ModuleDef, RecipeDef};
use rate_solver::solve::UnfinishedTarget;
use rate_solver::{
    BuildTarget, ConfigError, Error, GameData, PriorityList, Rational, Solver, Spec, Step, Totals,
    solve,
};

fn q(numer: i64, denom: i64) -> Rational {
    Rational::new(numer, denom).unwrap()
}

fn n(value: i64) -> Rational {
    Rational::from(value)
}

fn spec_of(recipes: Vec<RecipeDef>) -> Spec {
    spec_from(DataSet {
        recipes,
        ..Default::default()
    })
}

fn spec_from(set: DataSet) -> Spec {
    Spec::new(GameData::from_data_set(&set).unwrap())
}

fn target(spec: &Spec, item: &str, rate: Rational) -> BuildTarget {
    BuildTarget::rate(spec.data().item_id(item).unwrap(), rate)
}

fn rate(spec: &Spec, totals: &Totals, recipe: &str) -> Rational {
    totals.rate(spec.data().recipe_id(recipe).unwrap())
}

fn surplus(spec: &Spec, totals: &Totals, item: &str) -> Rational {
    let id = spec.data().item_id(item).unwrap();
    totals.surplus.get(&id).cloned().unwrap_or_else(Rational::zero)
}

fn assert_conserved(spec: &Spec, totals: &Totals) {
    for (item, produced) in &totals.produced {
        if spec.is_ignored(*item) {
            continue;
        }
        let consumed = totals.consumed.get(item).cloned().unwrap_or_else(Rational::zero);
        let extra = totals.surplus.get(item).cloned().unwrap_or_else(Rational::zero);
        assert_eq!(
            *produced,
            consumed + extra,
            "item {} is not balanced",
            spec.data().item(*item).key
        );
    }
}

fn oil_recipes() -> Vec<RecipeDef> {
    vec![
        RecipeDef::new("advanced-oil-processing", 5)
            .ingredient("crude-oil", 100)
            .ingredient("water", 50)
            .product("heavy-oil", 25)
            .product("light-oil", 45)
            .product("petroleum-gas", 55),
        RecipeDef::new("heavy-oil-cracking", 2)
            .ingredient("heavy-oil", 40)
            .ingredient("water", 30)
            .product("light-oil", 30),
        RecipeDef::new("light-oil-cracking", 2)
            .ingredient("light-oil", 30)
            .ingredient("water", 30)
            .product("petroleum-gas", 20),
        RecipeDef::new("crude-oil", 1).resource().product("crude-oil", 1),
        RecipeDef::new("water", 1).resource().product("water", 1),
    ]
}

fn oil_and_plastic() -> Vec<RecipeDef> {
    let mut recipes = oil_recipes();
    recipes.insert(
        3,
        RecipeDef::new("plastic-bar", 1)
            .ingredient("petroleum-gas", 20)
            .ingredient("coal", 1)
            .product("plastic-bar", 2),
    );
    recipes.insert(
        4,
        RecipeDef::new("coal-liquefaction", 5)
            .ingredient("coal", 10)
            .ingredient("heavy-oil", 25)
            .ingredient("water", 50)
            .product("heavy-oil", 90)
            .product("light-oil", 20)
            .product("petroleum-gas", 10),
    );
    recipes.push(RecipeDef::new("coal", 1).resource().product("coal", 1));
    recipes
}

#[test]
fn single_producer_chain_skips_the_tableau() {
    let spec = spec_of(vec![RecipeDef::new("r1", 1).ingredient("y", 1).product("x", 2)]);
    let mut solver = Solver::new();
    let totals = solver.solve(&spec, &[target(&spec, "x", n(10))]).unwrap();

    assert_eq!(rate(&spec, &totals, "r1"), n(5));
    let y = spec.data().item_id("y").unwrap();
    assert_eq!(totals.consumed[&y], n(5));
    assert!(solver.last_tableau().is_none());
    assert_conserved(&spec, &totals);
}

#[test]
fn loop_is_fed_by_last_resort_producer() {
    let spec = spec_of(vec![
        RecipeDef::new("a", 1).ingredient("p", 1).product("q", 1),
        RecipeDef::new("b", 1).ingredient("q", 1).product("p", 1),
    ]);
    let mut solver = Solver::new();
    let totals = solver.solve(&spec, &[target(&spec, "q", n(10))]).unwrap();

    assert_eq!(rate(&spec, &totals, "a"), n(10));
    assert_eq!(rate(&spec, &totals, "disable:p"), n(10));
    assert!(rate(&spec, &totals, "b").is_zero());
    assert!(totals.rates.values().all(|r| r.is_positive()));
    assert!(solver.last_tableau().is_some());
    assert_conserved(&spec, &totals);
}

#[test]
fn loop_feeding_two_targets_draws_on_both_last_resorts() {
    let spec = spec_of(vec![
        RecipeDef::new("a", 1).ingredient("p", 1).product("q", 1),
        RecipeDef::new("b", 1).ingredient("q", 1).product("p", 1),
        RecipeDef::new("c", 1).ingredient("p", 1).product("x", 1),
        RecipeDef::new("d", 1).ingredient("q", 1).product("y", 1),
    ]);
    let totals = solve(&spec, &[target(&spec, "x", n(10)), target(&spec, "y", n(10))]).unwrap();

    assert_eq!(rate(&spec, &totals, "c"), n(10));
    assert_eq!(rate(&spec, &totals, "d"), n(10));
    assert_eq!(rate(&spec, &totals, "disable:p"), n(10));
    assert_eq!(rate(&spec, &totals, "disable:q"), n(10));
    assert!(rate(&spec, &totals, "a").is_zero());
    assert!(rate(&spec, &totals, "b").is_zero());
    assert_conserved(&spec, &totals);
}

#[test]
fn closed_loop_without_last_resort_is_infeasible() {
    let spec = spec_from(DataSet {
        items: vec![
            ItemDef::new("p").without_last_resort(),
            ItemDef::new("q").without_last_resort(),
        ],
        recipes: vec![
            RecipeDef::new("a", 1).ingredient("p", 1).product("q", 1),
            RecipeDef::new("b", 1).ingredient("q", 1).product("p", 1),
        ],
        ..Default::default()
    });
    let result = solve(&spec, &[target(&spec, "q", n(10))]);
    assert!(matches!(result, Err(Error::InfeasibleNetwork(_))));
}

#[test]
fn higher_priority_tier_is_used_first() {
    let mut spec = spec_of(vec![
        RecipeDef::new("x", 1).resource().product("r", 1),
        RecipeDef::new("y", 1).resource().product("r", 1),
    ]);
    let x = spec.data().recipe_id("x").unwrap();
    let y = spec.data().recipe_id("y").unwrap();

    *spec.priority_mut() = PriorityList::new(vec![vec![(x, n(1))], vec![(y, n(1))]]);
    let totals = solve(&spec, &[target(&spec, "r", n(10))]).unwrap();
    assert_eq!(totals.rate(x), n(10));
    assert!(totals.rate(y).is_zero());

    *spec.priority_mut() = PriorityList::new(vec![vec![(y, n(1))], vec![(x, n(1))]]);
    let totals = solve(&spec, &[target(&spec, "r", n(10))]).unwrap();
    assert!(totals.rate(x).is_zero());
    assert_eq!(totals.rate(y), n(10));
}

#[test]
fn co_products_end_up_as_surplus() {
    let spec = spec_of(vec![
        RecipeDef::new("split", 1)
            .ingredient("ore", 1)
            .product("a", 1)
            .product("b", 1),
    ]);
    let totals = solve(&spec, &[target(&spec, "a", n(10))]).unwrap();
    assert_eq!(rate(&spec, &totals, "split"), n(10));
    assert_eq!(rate(&spec, &totals, "ore"), n(10));
    assert_eq!(surplus(&spec, &totals, "b"), n(10));

    let b = spec.data().item_id("b").unwrap();
    let split = spec.data().recipe_id("split").unwrap();
    assert_eq!(totals.consumers[&b][&Step::Surplus], n(10));
    assert!(
        totals
            .edges
            .iter()
            .any(|e| e.item == b && e.source == split && e.target == Step::Surplus)
    );
}

#[test]
fn oil_processing_is_exact() {
    let spec = spec_of(oil_recipes());
    let mut solver = Solver::new();
    let totals = solver
        .solve(&spec, &[target(&spec, "petroleum-gas", n(100))])
        .unwrap();

    assert_eq!(rate(&spec, &totals, "advanced-oil-processing"), q(20, 17));
    assert_eq!(rate(&spec, &totals, "light-oil-cracking"), q(30, 17));
    assert_eq!(rate(&spec, &totals, "crude-oil"), q(2000, 17));
    assert_eq!(rate(&spec, &totals, "water"), q(1900, 17));
    assert!(rate(&spec, &totals, "heavy-oil-cracking").is_zero());
    assert_eq!(surplus(&spec, &totals, "heavy-oil"), q(500, 17));
    assert_conserved(&spec, &totals);

    let tableau = solver.last_tableau().unwrap();
    let pet = spec.data().item_id("petroleum-gas").unwrap();
    assert_eq!(tableau.items[0], pet);
    assert_eq!(tableau.recipes.len(), 5);
    assert_eq!(tableau.initial.rows(), tableau.solved.rows());
}

#[test]
fn forced_recipe_draws_its_own_inputs() {
    let spec = spec_of(oil_recipes());
    let light = spec.data().item_id("light-oil").unwrap();
    let cracking = spec.data().recipe_id("heavy-oil-cracking").unwrap();
    let totals = solve(&spec, &[BuildTarget::rate(light, n(10)).with_recipe(cracking)]).unwrap();

    assert_eq!(totals.rate(cracking), q(1, 3));
    assert_eq!(rate(&spec, &totals, "advanced-oil-processing"), q(8, 15));
    assert_eq!(rate(&spec, &totals, "crude-oil"), q(160, 3));
    assert_eq!(rate(&spec, &totals, "water"), q(110, 3));
    assert_eq!(surplus(&spec, &totals, "light-oil"), n(24));
    assert_eq!(surplus(&spec, &totals, "petroleum-gas"), q(88, 3));
    assert_conserved(&spec, &totals);
}

#[test]
fn plastic_with_liquefaction_is_stable() {
    let spec = spec_of(oil_and_plastic());
    let targets = [target(&spec, "plastic-bar", n(10))];
    let first = solve(&spec, &targets).unwrap();
    let second = solve(&spec, &targets).unwrap();

    assert_eq!(rate(&spec, &first, "plastic-bar"), n(5));
    assert_eq!(rate(&spec, &first, "coal"), n(5));
    assert_eq!(rate(&spec, &first, "advanced-oil-processing"), q(20, 17));
    assert!(rate(&spec, &first, "coal-liquefaction").is_zero());
    assert_conserved(&spec, &first);

    let order = |t: &Totals| t.rates.iter().map(|(r, v)| (*r, v.clone())).collect::<Vec<_>>();
    assert_eq!(order(&first), order(&second));
    assert_eq!(first, second);
}

#[test]
fn coal_first_priority_switches_to_liquefaction() {
    let mut spec = spec_of(oil_and_plastic());
    let id = |key: &str| spec.data().recipe_id(key).unwrap();
    let tiers = vec![
        vec![(id("coal"), n(1)), (id("water"), n(1))],
        vec![(id("crude-oil"), n(1))],
    ];
    *spec.priority_mut() = PriorityList::new(tiers);

    let totals = solve(&spec, &[target(&spec, "plastic-bar", n(10))]).unwrap();
    assert_eq!(rate(&spec, &totals, "coal-liquefaction"), q(120, 67));
    assert_eq!(rate(&spec, &totals, "coal"), q(1535, 67));
    assert_eq!(rate(&spec, &totals, "water"), n(300));
    assert!(rate(&spec, &totals, "crude-oil").is_zero());
    assert_conserved(&spec, &totals);
}

#[test]
fn self_consuming_recipe_is_solved() {
    let spec = spec_of(vec![
        RecipeDef::new("breed", 1)
            .ingredient("seed", 1)
            .ingredient("water", 1)
            .product("seed", 2),
    ]);
    let totals = solve(&spec, &[target(&spec, "seed", n(10))]).unwrap();
    assert_eq!(rate(&spec, &totals, "breed"), n(10));
    assert_eq!(rate(&spec, &totals, "water"), n(10));
    assert_conserved(&spec, &totals);
}

fn nursery() -> DataSet {
    DataSet {
        recipes: vec![
            RecipeDef::new("breed", 1)
                .category("growing")
                .ingredient("seed", 1)
                .ingredient("water", 1)
                .product("seed", 2),
        ],
        buildings: vec![BuildingDef {
            key: "nursery".into(),
            name: "Nursery".into(),
            kind: BuildingKind::Crafter { speed: n(1) },
            categories: vec!["growing".into()],
            module_slots: 1,
        }],
        modules: vec![ModuleDef {
            key: "prod".into(),
            name: "Productivity".into(),
            speed: Rational::zero(),
            productivity: q(1, 10),
        }],
        ..Default::default()
    }
}

#[test]
fn productivity_applies_to_net_gain_of_catalyst() {
    let mut spec = spec_from(nursery());
    spec.set_modules("breed", &["prod"]).unwrap();
    let totals = solve(&spec, &[target(&spec, "seed", n(11))]).unwrap();

    // one net seed per craft, times 11/10
    assert_eq!(rate(&spec, &totals, "breed"), n(10));
    assert_eq!(rate(&spec, &totals, "water"), n(10));
    let seed = spec.data().item_id("seed").unwrap();
    assert_eq!(totals.produced[&seed], n(11));
    assert_conserved(&spec, &totals);
}

#[test]
fn building_target_on_cyclic_recipe_is_pinned() {
    let spec = spec_from(nursery());
    let seed = spec.data().item_id("seed").unwrap();
    let breed = spec.data().recipe_id("breed").unwrap();
    let mut solver = Solver::new();
    let totals = solver
        .solve(&spec, &[BuildTarget::buildings(seed, n(2)).with_recipe(breed)])
        .unwrap();

    assert_eq!(totals.outputs[&seed], n(2));
    assert_eq!(totals.rate(breed), n(2));
    assert_eq!(totals.building_count(&spec, breed), Some(n(2)));
    assert_eq!(rate(&spec, &totals, "water"), n(2));
    assert_conserved(&spec, &totals);

    let tableau = solver.last_tableau().unwrap();
    assert_eq!(
        tableau.targets,
        vec![UnfinishedTarget {
            item: seed,
            recipe: breed,
            rate: n(2)
        }]
    );
}

#[test]
fn forced_co_product_recipe_is_pinned() {
    let spec = spec_of(oil_and_plastic());
    let heavy = spec.data().item_id("heavy-oil").unwrap();
    let aop = spec.data().recipe_id("advanced-oil-processing").unwrap();
    let mut solver = Solver::new();
    let totals = solver
        .solve(&spec, &[BuildTarget::rate(heavy, n(25)).with_recipe(aop)])
        .unwrap();

    assert_eq!(totals.rate(aop), n(1));
    assert!(rate(&spec, &totals, "coal-liquefaction").is_zero());
    assert_eq!(rate(&spec, &totals, "crude-oil"), n(100));
    assert_eq!(rate(&spec, &totals, "water"), n(50));
    assert_eq!(surplus(&spec, &totals, "light-oil"), n(45));
    assert_eq!(surplus(&spec, &totals, "petroleum-gas"), n(55));
    assert_conserved(&spec, &totals);

    let tableau = solver.last_tableau().unwrap();
    assert_eq!(
        tableau.targets,
        vec![UnfinishedTarget {
            item: heavy,
            recipe: aop,
            rate: n(25)
        }]
    );
}

#[test]
fn ignored_item_is_not_expanded() {
    let mut spec = spec_of(vec![
        RecipeDef::new("gear", 1).ingredient("plate", 2).product("gear", 1),
        RecipeDef::new("plate", 1).ingredient("ore", 1).product("plate", 1),
    ]);
    spec.ignore("plate").unwrap();
    let totals = solve(&spec, &[target(&spec, "gear", n(3))]).unwrap();
    assert_eq!(rate(&spec, &totals, "gear"), n(3));
    assert_eq!(rate(&spec, &totals, "plate"), n(6));
    let ore = spec.data().item_id("ore").unwrap();
    assert!(!totals.consumed.contains_key(&ore));
}

#[test]
fn building_count_targets() {
    let spec = spec_from(DataSet {
        recipes: vec![
            RecipeDef::new("iron-plate", q(16, 5))
                .category("smelting")
                .ingredient("iron-ore", 1)
                .product("iron-plate", 1),
            RecipeDef::new("iron-ore", 1)
                .category("basic-solid")
                .resource()
                .product("iron-ore", 1),
        ],
        buildings: vec![
            BuildingDef {
                key: "furnace".into(),
                name: "Furnace".into(),
                kind: BuildingKind::Crafter { speed: n(1) },
                categories: vec!["smelting".into()],
                module_slots: 0,
            },
            BuildingDef {
                key: "drill".into(),
                name: "Drill".into(),
                kind: BuildingKind::Miner { mining_speed: q(1, 2) },
                categories: vec!["basic-solid".into()],
                module_slots: 0,
            },
        ],
        ..Default::default()
    });
    let plate = spec.data().item_id("iron-plate").unwrap();
    let smelt = spec.data().recipe_id("iron-plate").unwrap();
    let mine = spec.data().recipe_id("iron-ore").unwrap();

    let totals = solve(&spec, &[BuildTarget::buildings(plate, n(8))]).unwrap();
    assert_eq!(totals.outputs[&plate], q(5, 2));
    assert_eq!(totals.building_count(&spec, smelt), Some(n(8)));
    assert_eq!(totals.building_count(&spec, mine), Some(n(5)));
}

#[test]
fn configuration_errors_abort_the_solve() {
    let spec = spec_of(oil_recipes());
    let water = spec.data().item_id("water").unwrap();
    let cracking = spec.data().recipe_id("light-oil-cracking").unwrap();
    let err = solve(&spec, &[BuildTarget::rate(water, n(1)).with_recipe(cracking)]).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::NotProduced { .. })));

    assert!(matches!(
        spec.data().item_id("unobtainium"),
        Err(Error::Config(ConfigError::UnknownItem(_)))
    ));
}
