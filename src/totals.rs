//! Result assembly: per-item flows, proportionate edges and summaries

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};

use crate::data::{ItemId, RecipeId};
use crate::error::ConfigError;
use crate::rational::Rational;
use crate::spec::Spec;

/// Consumer of an item: a recipe, the requested output, or surplus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Recipe(RecipeId),
    Output,
    Surplus,
}

/// Flow of one item from a producing recipe to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub item: ItemId,
    pub source: RecipeId,
    pub target: Step,
    pub rate: Rational,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    /// Crafts per second of every running recipe.
    pub rates: IndexMap<RecipeId, Rational>,
    /// Requested items per second.
    pub outputs: IndexMap<ItemId, Rational>,
    pub produced: IndexMap<ItemId, Rational>,
    /// Recipe ingredient draws plus requested output. Surplus is not
    /// included.
    pub consumed: IndexMap<ItemId, Rational>,
    pub surplus: IndexMap<ItemId, Rational>,
    pub producers: IndexMap<ItemId, IndexMap<RecipeId, Rational>>,
    pub consumers: IndexMap<ItemId, IndexMap<Step, Rational>>,
    pub edges: Vec<Edge>,
}

fn accumulate<K: std::hash::Hash + Eq>(map: &mut IndexMap<K, Rational>, key: K, amount: &Rational) {
    *map.entry(key).or_insert_with(Rational::zero) += amount;
}

impl Totals {
    pub fn assemble(
        spec: &Spec,
        rates: IndexMap<RecipeId, Rational>,
        outputs: IndexMap<ItemId, Rational>,
        surplus: IndexMap<ItemId, Rational>,
    ) -> Self {
        let data = spec.data();
        let mut totals = Totals {
            rates: rates.into_iter().filter(|(_, r)| r.is_positive()).collect(),
            outputs,
            surplus,
            ..Default::default()
        };

        // items a recipe both consumes and makes are netted, as in the tableau
        for (&recipe, rate) in &totals.rates {
            let r = data.recipe(recipe);
            let mut touched: IndexSet<ItemId> = r.products.iter().map(|p| p.item).collect();
            if spec.expands(recipe) {
                touched.extend(r.ingredients.iter().map(|i| i.item));
            }
            for item in touched {
                let amount = rate * spec.net_amount(recipe, item);
                if amount.is_positive() {
                    accumulate(&mut totals.produced, item, &amount);
                    accumulate(totals.producers.entry(item).or_default(), recipe, &amount);
                } else if amount.is_negative() {
                    let amount = -amount;
                    accumulate(&mut totals.consumed, item, &amount);
                    accumulate(
                        totals.consumers.entry(item).or_default(),
                        Step::Recipe(recipe),
                        &amount,
                    );
                }
            }
        }
        for (&item, rate) in &totals.outputs {
            accumulate(&mut totals.consumed, item, rate);
            accumulate(totals.consumers.entry(item).or_default(), Step::Output, rate);
        }
        for (&item, rate) in &totals.surplus {
            accumulate(totals.consumers.entry(item).or_default(), Step::Surplus, rate);
        }

        totals.edges = proportionate_edges(&totals);
        totals
    }

    /// Rate of `recipe`, zero when it is not running.
    pub fn rate(&self, recipe: RecipeId) -> Rational {
        self.rates.get(&recipe).cloned().unwrap_or_else(Rational::zero)
    }

    pub fn building_count(&self, spec: &Spec, recipe: RecipeId) -> Option<Rational> {
        spec.building_count(recipe, self.rates.get(&recipe)?)
    }

    pub fn summary<'a>(&'a self, spec: &'a Spec, unit: RateUnit) -> Summary<'a> {
        Summary {
            spec,
            totals: self,
            unit,
        }
    }

    pub fn flows<'a>(&'a self, spec: &'a Spec, unit: RateUnit) -> Flows<'a> {
        Flows {
            spec,
            totals: self,
            unit,
        }
    }
}

/// Split every consumer's draw across the producers of the item in
/// proportion to their share of its production.
fn proportionate_edges(totals: &Totals) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (&item, consumers) in &totals.consumers {
        let (Some(producers), Some(total)) =
            (totals.producers.get(&item), totals.produced.get(&item))
        else {
            continue;
        };
        for (&target, demand) in consumers {
            for (&source, made) in producers {
                let Ok(share) = made.try_div(total) else {
                    continue;
                };
                edges.push(Edge {
                    item,
                    source,
                    target,
                    rate: demand * share,
                });
            }
        }
    }
    edges
}

/// Unit rates are displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateUnit {
    #[default]
    Second,
    Minute,
    Hour,
}

impl RateUnit {
    /// Seconds per unit.
    pub fn factor(&self) -> Rational {
        match self {
            RateUnit::Second => Rational::one(),
            RateUnit::Minute => Rational::from(60),
            RateUnit::Hour => Rational::from(3600),
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            RateUnit::Second => "/s",
            RateUnit::Minute => "/m",
            RateUnit::Hour => "/h",
        }
    }

    /// Render a per-second rate in this unit.
    pub fn display(&self, rate: &Rational) -> String {
        format!("{}{}", (rate * self.factor()).to_decimal(3), self.suffix())
    }
}

impl FromStr for RateUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" => Ok(RateUnit::Second),
            "m" | "min" | "minute" => Ok(RateUnit::Minute),
            "h" | "hour" => Ok(RateUnit::Hour),
            other => Err(ConfigError::InvalidValue(format!("rate unit '{}'", other))),
        }
    }
}

pub struct Summary<'a> {
    spec: &'a Spec,
    totals: &'a Totals,
    unit: RateUnit,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.spec.data();
        let unit = self.unit;
        writeln!(f, "=== Production Summary ===")?;
        for (&item, rate) in &self.totals.outputs {
            writeln!(f, "Target: {} @ {}", data.item(item).name, unit.display(rate))?;
        }
        writeln!(f)?;

        writeln!(f, "Recipes:")?;
        for (&recipe, rate) in &self.totals.rates {
            let r = data.recipe(recipe);
            if r.is_resource() || r.is_disable() {
                continue;
            }
            write!(f, "  {:<30} {:>12}", r.name, unit.display(rate))?;
            match (self.spec.building(recipe), self.totals.building_count(self.spec, recipe)) {
                (Some(building), Some(count)) => {
                    writeln!(f, "  {}x {}", count.to_up_decimal(2), building.name)?
                }
                _ => writeln!(f)?,
            }
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (&recipe, rate) in &self.totals.rates {
            let r = data.recipe(recipe);
            if !(r.is_resource() || r.is_disable()) {
                continue;
            }
            for product in &r.products {
                let amount = rate * self.spec.gives(recipe, product.item);
                let marker = if r.is_disable() { " (last resort)" } else { "" };
                writeln!(
                    f,
                    "  {} @ {}{}",
                    data.item(product.item).name,
                    unit.display(&amount),
                    marker
                )?;
            }
        }

        if !self.totals.surplus.is_empty() {
            writeln!(f)?;
            writeln!(f, "Surplus:")?;
            for (&item, rate) in &self.totals.surplus {
                writeln!(f, "  {} @ {}", data.item(item).name, unit.display(rate))?;
            }
        }
        Ok(())
    }
}

pub struct Flows<'a> {
    spec: &'a Spec,
    totals: &'a Totals,
    unit: RateUnit,
}

impl fmt::Display for Flows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.spec.data();
        writeln!(f, "=== Flows ===")?;
        for edge in &self.totals.edges {
            let target = match edge.target {
                Step::Recipe(r) => data.recipe(r).key.as_str(),
                Step::Output => "[output]",
                Step::Surplus => "[surplus]",
            };
            writeln!(
                f,
                "  {:<24} -> {:<24} {:<20} {:>12}",
                data.recipe(edge.source).key,
                target,
                data.item(edge.item).key,
                self.unit.display(&edge.rate)
            )?;
        }
        Ok(())
    }
}
