//! Arrays the hybrid solver keeps on the grid.

use super::{FieldSpec, Multiplicity};
use crate::common::config::Capabilities;
use crate::grid::Stencil;

pub const FACE_B: &str = "faceB";
pub const CELL_B: &str = "cellB";
pub const NODE_ETA: &str = "nodeEta";
pub const INNER_FLAG_FIELD: &str = "innerFlagField";
pub const INNER_FLAG_NODE: &str = "innerFlagNode";
pub const INNER_FLAG_PARTICLE: &str = "innerFlagParticle";
pub const XMIN_FLAG: &str = "xMinFlag";
pub const SPECTRA_FLAG: &str = "spectraFlag";
pub const CELL_AVERAGE_B: &str = "cellAverageB";

fn exchanged(name: &str, multiplicity: Multiplicity) -> FieldSpec {
    FieldSpec::real(name, multiplicity).bound_to(Stencil::Default)
}

fn accumulated(name: &str, multiplicity: Multiplicity) -> FieldSpec {
    exchanged(name, multiplicity).bound_to(Stencil::Accumulation)
}

/// Core field set in registration order.
pub fn core_field_catalog(
    capabilities: &Capabilities,
    ionosphere_populations: usize,
    exosphere_populations: usize,
) -> Vec<FieldSpec> {
    use Multiplicity::{Populations, Scalar, Vector};

    let mut catalog = vec![
        exchanged(FACE_B, Vector),
        exchanged("faceJ", Vector),
        accumulated("cellRhoQi", Scalar),
        exchanged(CELL_B, Vector),
        exchanged("cellJ", Vector),
        exchanged("cellUe", Vector),
        accumulated("cellJi", Vector),
        exchanged("cellIonosphere", Populations(ionosphere_populations)),
        exchanged("cellExosphere", Populations(exosphere_populations)),
        exchanged("nodeRhoQi", Scalar),
        exchanged("nodeE", Vector),
        exchanged("nodeB", Vector),
        exchanged("nodeJ", Vector),
        exchanged("nodeUe", Vector),
        exchanged("nodeJi", Vector),
    ];
    if capabilities.resistivity {
        catalog.push(FieldSpec::real(NODE_ETA, Scalar));
    }

    catalog.extend([
        FieldSpec::real("counterCellMaxUe", Scalar),
        FieldSpec::real("counterCellMaxVi", Scalar),
        FieldSpec::real("counterCellMinRhoQi", Scalar),
    ]);
    if capabilities.ecut {
        catalog.push(FieldSpec::real("counterNodeEcut", Scalar));
    }

    catalog.extend([
        FieldSpec::flag(INNER_FLAG_FIELD),
        FieldSpec::flag(INNER_FLAG_NODE),
        FieldSpec::flag(INNER_FLAG_PARTICLE).per_block(),
    ]);
    if capabilities.xmin_boundary {
        catalog.push(FieldSpec::flag(XMIN_FLAG));
    }
    if capabilities.orbit_spectra {
        catalog.push(FieldSpec::flag(SPECTRA_FLAG).per_block());
    }
    catalog
}

/// Averaging arrays, one density/velocity pair per output variable.
pub fn average_field_catalog(output_variables: usize) -> Vec<FieldSpec> {
    let mut catalog = vec![exchanged(CELL_AVERAGE_B, Multiplicity::Vector)];
    for index in 0..output_variables {
        catalog.push(accumulated(
            &format!("cellDensityAverage_pop{index}"),
            Multiplicity::Scalar,
        ));
        catalog.push(accumulated(
            &format!("cellVelocityAverage_pop{index}"),
            Multiplicity::Vector,
        ));
    }
    catalog
}
