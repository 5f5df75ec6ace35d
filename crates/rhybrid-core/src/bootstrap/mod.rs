//! Late initialization and finalization of a hybrid run.
//!
//! `HybridBootstrap` owns everything the initialization creates: the field
//! registry, derived parameters, populations and their output grouping, the
//! spectra cell records and the coordinator's run logs. Every rank constructs
//! one, calls `initialize` collectively and `finalize` once the run is over.

mod parameters;

pub use parameters::{
    DerivedParameters, GAUSS_KERNEL_SHELLS, IntrinsicFieldSettings, ResistivitySettings,
    gauss_kernel_coefficients,
};

use crate::common::config::HybridConfig;
use crate::common::output::OutputSelection;
use crate::common::profiles::{MagneticFieldProfile, ResistivityProfile};
use crate::domain::{HybridError, HybridResult};
use crate::grid::ParGrid;
use crate::modules::diagnostics::UpstreamDiagnostics;
use crate::modules::geometry::{
    BlockClassification, BoundaryClassifier, CellFlags, cell_center, face_centers, node_position,
};
use crate::modules::logs::RunLogs;
use crate::modules::orbit::{
    OrbitPoint, SpectraCellRecord, SpectraSchedule, collect_orbit_points, distribute_orbit_points,
    gather_spectra_records, match_orbit_cells, write_spectra_index,
};
use crate::modules::population::{
    OutputVariables, Population, PopulationCategory, PopulationFactory, PopulationPlan,
    SpeciesTable, construct_populations,
};
use crate::modules::registry::catalog::{
    CELL_B, FACE_B, INNER_FLAG_FIELD, INNER_FLAG_NODE, INNER_FLAG_PARTICLE, NODE_ETA,
    SPECTRA_FLAG, XMIN_FLAG, average_field_catalog, core_field_catalog,
};
use crate::modules::registry::{FieldHandle, FieldRegistry, TeardownReport};
use crate::parallel::Communicator;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Per-population particle counters, zeroed at bootstrap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticleCounters {
    pub escape: Vec<f64>,
    pub impact: Vec<f64>,
    pub inject: Vec<f64>,
    pub inject_macroparticles: Vec<f64>,
    pub time_start: f64,
}

impl ParticleCounters {
    pub fn zeroed(populations: usize, time_start: f64) -> Self {
        Self {
            escape: vec![0.0; populations],
            impact: vec![0.0; populations],
            inject: vec![0.0; populations],
            inject_macroparticles: vec![0.0; populations],
            time_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectraCells {
    pub schedule: SpectraSchedule,
    pub orbit_points: usize,
    /// Matched cells owned by this rank.
    pub local_cells: usize,
    /// All matched cells, sorted by global id. Coordinator only.
    pub records: Option<Vec<SpectraCellRecord>>,
    pub index_path: Option<PathBuf>,
}

/// Agrees on the cell size across ranks and checks that cells are cubes.
///
/// Ranks without cells report `-1` on every axis so the element-wise maximum
/// picks up a real block.
pub fn agree_cell_size<C, G>(comm: &C, grid: &G) -> HybridResult<f64>
where
    C: Communicator + ?Sized,
    G: ParGrid + ?Sized,
{
    let local = if grid.local_cell_count() > 0 {
        grid.block_cell_size(0).to_vec()
    } else {
        vec![-1.0; 3]
    };
    let mut size = comm.reduce_max(&local)?.unwrap_or(local);
    comm.broadcast_reals(&mut size)?;

    let [dx, dy, dz] = <[f64; 3]>::try_from(size.as_slice()).map_err(|_| {
        HybridError::protocol(
            "PROTOCOL.CELL_SIZE",
            format!("received cell size with {} components", size.len()),
        )
    })?;
    if dx != dy || dx != dz {
        return Err(HybridError::configuration(
            "CONFIG.CELL_SHAPE",
            format!(
                "only cube shaped cells allowed (dx = {} km, dy = {} km, dz = {} km)",
                dx / 1e3,
                dy / 1e3,
                dz / 1e3
            ),
        ));
    }
    if dx.is_nan() || dx <= 0.0 {
        return Err(HybridError::configuration(
            "CONFIG.CELL_SHAPE",
            "no rank owns a grid cell",
        ));
    }
    Ok(dx)
}

#[derive(Debug)]
pub struct HybridBootstrap {
    config: HybridConfig,
    registry: FieldRegistry,
    parameters: Option<DerivedParameters>,
    output_selection: Option<OutputSelection>,
    populations: Vec<Population>,
    output_variables: OutputVariables,
    diagnostics: Option<UpstreamDiagnostics>,
    spectra: Option<SpectraCells>,
    logs: Option<RunLogs>,
    counters: ParticleCounters,
    average_counter: u64,
}

impl HybridBootstrap {
    pub fn new(config: HybridConfig) -> Self {
        let registry = FieldRegistry::new(config.simulation.restarted);
        Self {
            config,
            registry,
            parameters: None,
            output_selection: None,
            populations: Vec::new(),
            output_variables: OutputVariables::default(),
            diagnostics: None,
            spectra: None,
            logs: None,
            counters: ParticleCounters::default(),
            average_counter: 0,
        }
    }

    /// Runs the initialization sequence, stopping at the first fatal error.
    ///
    /// The error is logged and any open run logs are closed before it is
    /// returned. Fields registered up to that point stay live until
    /// `finalize`.
    pub fn initialize<C, G, F>(&mut self, comm: &C, grid: &mut G, factory: &F) -> HybridResult<()>
    where
        C: Communicator + ?Sized,
        G: ParGrid + ?Sized,
        F: PopulationFactory + ?Sized,
    {
        let result = self.run_initialization(comm, grid, factory);
        if let Err(failure) = &result {
            error!(rank = comm.rank(), "{}", failure.log_line());
            if let Some(logs) = self.logs.take() {
                if let Err(close_error) = logs.close() {
                    warn!(rank = comm.rank(), "{}", close_error.log_line());
                }
            }
        }
        result
    }

    /// `initialize` with populations built from the configured species table.
    pub fn initialize_with_species<C, G>(&mut self, comm: &C, grid: &mut G) -> HybridResult<()>
    where
        C: Communicator + ?Sized,
        G: ParGrid + ?Sized,
    {
        let species = self.config.species.clone();
        self.initialize(comm, grid, &SpeciesTable::new(&species))
    }

    /// Removes every registered field and closes the run logs. Failures are
    /// collected rather than stopping the teardown.
    pub fn finalize<G: ParGrid + ?Sized>(&mut self, grid: &mut G) -> TeardownReport {
        let mut report = self.registry.teardown(grid);
        if let Some(logs) = self.logs.take() {
            if let Err(failure) = logs.close() {
                report.failures.push(failure);
            }
        }
        for failure in &report.failures {
            error!("{}", failure.log_line());
        }
        report
    }

    fn run_initialization<C, G, F>(&mut self, comm: &C, grid: &mut G, factory: &F) -> HybridResult<()>
    where
        C: Communicator + ?Sized,
        G: ParGrid + ?Sized,
        F: PopulationFactory + ?Sized,
    {
        let rank = comm.rank();
        let root = comm.is_root();
        let capabilities = self.config.capabilities;
        let restarted = self.config.simulation.restarted;

        self.config.validate()?;
        let dx = agree_cell_size(comm, grid)?;
        let parameters = DerivedParameters::derive(&self.config, dx)?;
        if root {
            for warning in &parameters.warnings {
                warn!(rank, "{warning}");
            }
            for line in parameters.report_lines() {
                info!(rank, "{line}");
            }
            let enabled = capabilities
                .enabled_subsystems()
                .iter()
                .map(|subsystem| subsystem.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            info!(rank, "enabled subsystems: {enabled}");
        }
        self.parameters = Some(parameters.clone());

        let selection = OutputSelection::new(&capabilities, &self.config.hybrid.output_parameters);
        if root {
            info!(
                rank,
                "available output parameters: {}",
                selection.available().collect::<Vec<_>>().join(" ")
            );
            info!(
                rank,
                "selected output parameters: {}",
                selection.selected().collect::<Vec<_>>().join(" ")
            );
            for warning in selection.warnings(&capabilities) {
                warn!(rank, "{warning}");
            }
        }
        self.output_selection = Some(selection);

        let plan = PopulationPlan::from_names(&self.config.populations);
        let catalog = core_field_catalog(
            &capabilities,
            plan.count(PopulationCategory::Ionosphere),
            plan.count(PopulationCategory::Exosphere),
        );
        for spec in &catalog {
            self.registry.register_field(grid, spec)?;
        }

        let orbit_points = if capabilities.orbit_spectra {
            let schedule = SpectraSchedule::from_config(&self.config.analysis);
            if root {
                for line in schedule.summary_lines() {
                    info!(rank, "{line}");
                }
            }
            let collected = if root {
                collect_orbit_points(&self.config.analysis.orbit_files)
            } else {
                Ok(Vec::new())
            };
            let points = distribute_orbit_points(comm, collected)?;
            self.spectra = Some(SpectraCells {
                schedule,
                orbit_points: points.len(),
                local_cells: 0,
                records: None,
                index_path: None,
            });
            points
        } else {
            Vec::new()
        };

        if !restarted {
            self.classify_boundaries(grid, &parameters)?;
            if let Some(resistivity) = &parameters.resistivity {
                self.evaluate_resistivity(grid, &resistivity.profile, dx)?;
            }
            if capabilities.orbit_spectra {
                self.select_spectra_cells(comm, grid, dx, &orbit_points)?;
            }
            if capabilities.initial_b {
                if let Some(field) = &parameters.intrinsic_field {
                    self.apply_initial_field(grid, &field.profile, dx)?;
                }
            }
        }

        self.populations = construct_populations(&plan, factory)?;
        self.output_variables = OutputVariables::aggregate(&self.populations, plan.len())?;
        let diagnostics = UpstreamDiagnostics::compute(&self.populations, parameters.imf, dx);
        if root {
            info!(
                rank,
                "population output variables: {}",
                self.output_variables.count()
            );
            for line in self.output_variables.summary_lines(&self.populations) {
                info!(rank, "{line}");
            }
            for line in diagnostics
                .imf_lines(parameters.imf)
                .into_iter()
                .chain(diagnostics.report_lines(parameters.dt, dx, parameters.r_object))
            {
                info!(rank, "{line}");
            }
        }
        self.diagnostics = Some(diagnostics);

        if root {
            self.logs = Some(RunLogs::open(
                &self.config.simulation.output_dir,
                &self.populations,
            )?);
        }
        self.counters = ParticleCounters::zeroed(self.populations.len(), self.config.simulation.time);

        if capabilities.population_averages {
            for spec in average_field_catalog(self.output_variables.count()) {
                self.registry.register_field(grid, &spec)?;
            }
            if !restarted {
                self.average_counter = 0;
            }
        }
        debug!(rank, fields = self.registry.live_names().len(), "bootstrap complete");
        Ok(())
    }

    fn field_handle(&self, name: &str) -> HybridResult<FieldHandle> {
        self.registry.handle(name).ok_or_else(|| {
            HybridError::internal(
                "INTERNAL.FIELD_HANDLE",
                format!("{name} array is not registered"),
            )
        })
    }

    fn store_flags<G: ParGrid + ?Sized>(&self, grid: &mut G, name: &str, local: &[bool]) -> HybridResult<()> {
        let handle = self.field_handle(name)?;
        let values = self.registry.flag_values_mut(grid, handle)?;
        let target = values.get_mut(..local.len()).ok_or_else(|| {
            HybridError::internal(
                "INTERNAL.FIELD_SIZE",
                format!("{name} array is shorter than the local cells"),
            )
        })?;
        target.copy_from_slice(local);
        Ok(())
    }

    fn store_reals<G: ParGrid + ?Sized>(&self, grid: &mut G, name: &str, local: &[f64]) -> HybridResult<()> {
        let handle = self.field_handle(name)?;
        let values = self.registry.real_values_mut(grid, handle)?;
        let target = values.get_mut(..local.len()).ok_or_else(|| {
            HybridError::internal(
                "INTERNAL.FIELD_SIZE",
                format!("{name} array is shorter than the local cells"),
            )
        })?;
        target.copy_from_slice(local);
        Ok(())
    }

    fn classify_boundaries<G: ParGrid + ?Sized>(
        &self,
        grid: &mut G,
        parameters: &DerivedParameters,
    ) -> HybridResult<()> {
        let layout = grid.block_layout();
        let classifier = BoundaryClassifier::new(
            parameters.obstacle_origin,
            parameters.boundary_thresholds(),
            parameters.dx,
        );
        let blocks: Vec<BlockClassification> = (0..grid.local_cell_count())
            .map(|block| classifier.classify_block(grid.block_origin(block), layout))
            .collect();
        let per_cell = |select: fn(&CellFlags) -> bool| -> Vec<bool> {
            blocks
                .iter()
                .flat_map(|block| block.cells.iter().map(select))
                .collect()
        };

        let field_inner = per_cell(|flags| flags.field_inner);
        let particle_inner: Vec<bool> = blocks.iter().map(|block| block.particle_inner).collect();
        debug!(
            field_cells = field_inner.iter().filter(|inner| **inner).count(),
            particle_blocks = particle_inner.iter().filter(|inner| **inner).count(),
            "inner boundary classified"
        );
        self.store_flags(grid, INNER_FLAG_FIELD, &field_inner)?;
        self.store_flags(grid, INNER_FLAG_NODE, &per_cell(|flags| flags.node_inner))?;
        self.store_flags(grid, INNER_FLAG_PARTICLE, &particle_inner)?;
        if parameters.xmin.is_some() {
            self.store_flags(
                grid,
                XMIN_FLAG,
                &per_cell(|flags| flags.below_xmin.unwrap_or(false)),
            )?;
        }
        Ok(())
    }

    fn evaluate_resistivity<G: ParGrid + ?Sized>(
        &self,
        grid: &mut G,
        profile: &ResistivityProfile,
        dx: f64,
    ) -> HybridResult<()> {
        let layout = grid.block_layout();
        let mut eta = Vec::with_capacity(grid.local_cell_count() * layout.size());
        for block in 0..grid.local_cell_count() {
            let origin = grid.block_origin(block);
            eta.extend(
                layout
                    .cells()
                    .map(|cell| profile.evaluate(node_position(origin, cell, dx))),
            );
        }
        self.store_reals(grid, NODE_ETA, &eta)
    }

    /// Matches the orbit against local cells and gathers the records at the
    /// coordinator, which writes the index file. Flags are stored only after
    /// the gather so every rank finishes the collectives.
    fn select_spectra_cells<C, G>(
        &mut self,
        comm: &C,
        grid: &mut G,
        dx: f64,
        points: &[OrbitPoint],
    ) -> HybridResult<()>
    where
        C: Communicator + ?Sized,
        G: ParGrid + ?Sized,
    {
        let matched = match_orbit_cells(&*grid, dx, points);
        let local_cells = matched.records.len();
        let gathered = gather_spectra_records(comm, matched.records)?;
        let index_path = match &gathered {
            Some(records) => Some(write_spectra_index(
                &self.config.simulation.output_dir,
                records,
            )?),
            None => None,
        };
        self.store_flags(grid, SPECTRA_FLAG, &matched.block_flags)?;

        if let Some(spectra) = self.spectra.as_mut() {
            spectra.local_cells = local_cells;
            spectra.records = gathered;
            spectra.index_path = index_path;
        }
        Ok(())
    }

    /// Face B takes the normal component at each face centre, cell B the full
    /// vector at the cell centre.
    fn apply_initial_field<G: ParGrid + ?Sized>(
        &self,
        grid: &mut G,
        profile: &MagneticFieldProfile,
        dx: f64,
    ) -> HybridResult<()> {
        let layout = grid.block_layout();
        let capacity = grid.local_cell_count() * layout.size() * 3;
        let mut face_b = Vec::with_capacity(capacity);
        let mut cell_b = Vec::with_capacity(capacity);
        for block in 0..grid.local_cell_count() {
            let origin = grid.block_origin(block);
            for cell in layout.cells() {
                let faces = face_centers(origin, cell, dx);
                for (axis, face) in faces.iter().enumerate() {
                    face_b.push(profile.evaluate(*face)[axis]);
                }
                cell_b.extend(profile.evaluate(cell_center(origin, cell, dx)));
            }
        }
        self.store_reals(grid, FACE_B, &face_b)?;
        self.store_reals(grid, CELL_B, &cell_b)
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn parameters(&self) -> Option<&DerivedParameters> {
        self.parameters.as_ref()
    }

    pub fn output_selection(&self) -> Option<&OutputSelection> {
        self.output_selection.as_ref()
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn output_variables(&self) -> &OutputVariables {
        &self.output_variables
    }

    pub fn diagnostics(&self) -> Option<&UpstreamDiagnostics> {
        self.diagnostics.as_ref()
    }

    pub fn spectra(&self) -> Option<&SpectraCells> {
        self.spectra.as_ref()
    }

    pub fn logs_mut(&mut self) -> Option<&mut RunLogs> {
        self.logs.as_mut()
    }

    pub fn counters(&self) -> &ParticleCounters {
        &self.counters
    }

    pub fn average_counter(&self) -> u64 {
        self.average_counter
    }
}
