use crate::common::config::{PopulationNames, SpeciesConfig};
use crate::domain::{HybridError, HybridResult};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopulationCategory {
    Uniform,
    SolarWind,
    Ionosphere,
    Exosphere,
}

impl PopulationCategory {
    /// Construction order.
    pub const ALL: [PopulationCategory; 4] = [
        Self::Uniform,
        Self::SolarWind,
        Self::Ionosphere,
        Self::Exosphere,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::SolarWind => "solar wind",
            Self::Ionosphere => "ionospheric",
            Self::Exosphere => "exospheric",
        }
    }
}

impl Display for PopulationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    pub name: String,
    pub category: PopulationCategory,
    pub charge: f64,
    pub mass: f64,
    pub density: f64,
    pub velocity: f64,
    pub vth: f64,
    pub output_tag: String,
    pub include_in_plasma: bool,
}

pub trait PopulationFactory {
    fn construct(&self, category: PopulationCategory, name: &str) -> HybridResult<Population>;
}

/// Builds populations from the species definitions of the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesTable<'a> {
    species: &'a BTreeMap<String, SpeciesConfig>,
}

impl<'a> SpeciesTable<'a> {
    pub fn new(species: &'a BTreeMap<String, SpeciesConfig>) -> Self {
        Self { species }
    }
}

impl PopulationFactory for SpeciesTable<'_> {
    fn construct(&self, category: PopulationCategory, name: &str) -> HybridResult<Population> {
        let species = self.species.get(name).ok_or_else(|| {
            HybridError::configuration(
                "CONFIG.SPECIES",
                format!("no species definition for {category} population '{name}'"),
            )
        })?;
        if !(species.mass > 0.0) || species.charge == 0.0 {
            return Err(HybridError::configuration(
                "CONFIG.SPECIES",
                format!(
                    "species '{name}' needs positive mass and non-zero charge (m = {}, q = {})",
                    species.mass, species.charge
                ),
            ));
        }
        Ok(Population {
            name: name.to_string(),
            category,
            charge: species.charge,
            mass: species.mass,
            density: species.density,
            velocity: species.velocity,
            vth: species.vth,
            output_tag: species.output_str.clone(),
            include_in_plasma: species.include_in_plasma,
        })
    }
}

/// Population names per category with empty entries erased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopulationPlan {
    entries: Vec<(PopulationCategory, String)>,
}

impl PopulationPlan {
    pub fn from_names(names: &PopulationNames) -> Self {
        let lists = [
            (PopulationCategory::Uniform, &names.uniform),
            (PopulationCategory::SolarWind, &names.solarwind),
            (PopulationCategory::Ionosphere, &names.ionosphere),
            (PopulationCategory::Exosphere, &names.exosphere),
        ];
        let entries = lists
            .into_iter()
            .flat_map(|(category, list)| {
                list.iter()
                    .filter(|name| !name.is_empty())
                    .map(move |name| (category, name.clone()))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, category: PopulationCategory) -> usize {
        self.entries
            .iter()
            .filter(|(entry_category, _)| *entry_category == category)
            .count()
    }

    pub fn entries(&self) -> impl Iterator<Item = (PopulationCategory, &str)> {
        self.entries
            .iter()
            .map(|(category, name)| (*category, name.as_str()))
    }
}
