mod aggregate;
mod model;

pub use aggregate::{EXCLUDED_TAG, OutputVariableGroup, OutputVariables, RESERVED_TAG};
pub use model::{
    Population, PopulationCategory, PopulationFactory, PopulationPlan, SpeciesTable,
};

use crate::domain::HybridResult;
use tracing::info;

/// Constructs every planned population in category order.
pub fn construct_populations<F: PopulationFactory + ?Sized>(
    plan: &PopulationPlan,
    factory: &F,
) -> HybridResult<Vec<Population>> {
    let mut populations = Vec::with_capacity(plan.len());
    for (category, name) in plan.entries() {
        info!("initializing {category} particle population: {name}");
        populations.push(factory.construct(category, name)?);
    }
    Ok(populations)
}
