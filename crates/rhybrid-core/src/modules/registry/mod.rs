//! Named-field registry: allocation, transfer binding and teardown of the
//! solver arrays held by the grid engine.

pub mod catalog;

use crate::domain::{HybridError, HybridResult};
use crate::grid::{ArrayId, BlockLayout, ElementKind, ParGrid, Stencil};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Scalar,
    Vector,
    Populations(usize),
}

impl Multiplicity {
    pub const fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector => 3,
            Self::Populations(count) => count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    PerCell,
    PerBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ElementKind,
    pub multiplicity: Multiplicity,
    pub extent: Extent,
    pub stencils: Vec<Stencil>,
}

impl FieldSpec {
    pub fn real(name: impl Into<String>, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.into(),
            kind: ElementKind::Real,
            multiplicity,
            extent: Extent::PerCell,
            stencils: Vec::new(),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ElementKind::Flag,
            multiplicity: Multiplicity::Scalar,
            extent: Extent::PerCell,
            stencils: Vec::new(),
        }
    }

    pub fn per_block(mut self) -> Self {
        self.extent = Extent::PerBlock;
        self
    }

    pub fn bound_to(mut self, stencil: Stencil) -> Self {
        self.stencils.push(stencil);
        self
    }

    pub fn elements_per_block(&self, layout: BlockLayout) -> usize {
        let cells = match self.extent {
            Extent::PerCell => layout.size(),
            Extent::PerBlock => 1,
        };
        cells * self.multiplicity.components()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(usize);

impl FieldHandle {
    pub const INVALID: FieldHandle = FieldHandle(usize::MAX);
}

#[derive(Debug, Clone)]
struct FieldEntry {
    spec: FieldSpec,
    array: Option<ArrayId>,
}

#[derive(Debug, Default)]
pub struct TeardownReport {
    pub removed: Vec<String>,
    pub failures: Vec<HybridError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_result(self) -> HybridResult<Vec<String>> {
        if self.failures.is_empty() {
            return Ok(self.removed);
        }
        let details = self
            .failures
            .iter()
            .map(|failure| failure.message().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(HybridError::allocation(
            "ALLOC.TEARDOWN",
            format!("finalization failed for {} item(s): {details}", self.failures.len()),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    restarted: bool,
    entries: Vec<FieldEntry>,
}

impl FieldRegistry {
    pub fn new(restarted: bool) -> Self {
        Self {
            restarted,
            entries: Vec::new(),
        }
    }

    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Allocates the field, zero-fills it on a fresh start and binds the
    /// stencils listed in `spec`.
    pub fn register_field<G: ParGrid + ?Sized>(
        &mut self,
        grid: &mut G,
        spec: &FieldSpec,
    ) -> HybridResult<FieldHandle> {
        if self.handle(&spec.name).is_some() {
            return Err(HybridError::allocation(
                "ALLOC.FIELD",
                format!("failed to add {} array to grid: name already registered", spec.name),
            ));
        }

        let elements = spec.elements_per_block(grid.block_layout());
        let array = grid
            .allocate_array(&spec.name, spec.kind, elements)
            .map_err(|error| {
                HybridError::allocation(
                    "ALLOC.FIELD",
                    format!("failed to add {} array to grid ({error})", spec.name),
                )
            })?;

        if !self.restarted {
            if let Some(values) = grid.real_data_mut(array) {
                values.fill(0.0);
            }
            if let Some(values) = grid.flag_data_mut(array) {
                values.fill(false);
            }
        }

        let handle = FieldHandle(self.entries.len());
        self.entries.push(FieldEntry {
            spec: FieldSpec {
                stencils: Vec::new(),
                ..spec.clone()
            },
            array: Some(array),
        });
        debug!(field = %spec.name, elements, "registered field");

        for stencil in &spec.stencils {
            self.bind_transfer(grid, handle, *stencil)?;
        }
        Ok(handle)
    }

    pub fn bind_transfer<G: ParGrid + ?Sized>(
        &mut self,
        grid: &mut G,
        handle: FieldHandle,
        stencil: Stencil,
    ) -> HybridResult<()> {
        let (name, array) = self.live_entry(handle).ok_or_else(|| {
            HybridError::allocation(
                "ALLOC.TRANSFER",
                format!("failed to add data transfer on {stencil} stencil: field handle is invalid"),
            )
        })?;
        let name = name.to_string();

        grid.register_transfer(array, stencil).map_err(|error| {
            HybridError::allocation(
                "ALLOC.TRANSFER",
                format!("failed to add {name} data transfer ({error})"),
            )
        })?;
        if let Some(entry) = self.entries.get_mut(handle.0) {
            if !entry.spec.stencils.contains(&stencil) {
                entry.spec.stencils.push(stencil);
            }
        }
        Ok(())
    }

    /// An invalid handle is rejected without touching the grid.
    pub fn unregister_field<G: ParGrid + ?Sized>(
        &mut self,
        grid: &mut G,
        handle: FieldHandle,
    ) -> HybridResult<()> {
        let (name, array) = self.live_entry(handle).ok_or_else(|| {
            HybridError::allocation(
                "ALLOC.REMOVE",
                "failed to remove array: field handle is invalid",
            )
        })?;
        let name = name.to_string();

        grid.deallocate_array(array).map_err(|error| {
            HybridError::allocation(
                "ALLOC.REMOVE",
                format!("failed to remove {name} array from grid ({error})"),
            )
        })?;
        if let Some(entry) = self.entries.get_mut(handle.0) {
            entry.array = None;
        }
        Ok(())
    }

    /// Attempts to remove every live field, in registration order, and
    /// reports each outcome.
    pub fn teardown<G: ParGrid + ?Sized>(&mut self, grid: &mut G) -> TeardownReport {
        let mut report = TeardownReport::default();
        for index in 0..self.entries.len() {
            let handle = FieldHandle(index);
            if !self.is_live(handle) {
                continue;
            }
            let name = self.entries[index].spec.name.clone();
            match self.unregister_field(grid, handle) {
                Ok(()) => report.removed.push(name),
                Err(error) => report.failures.push(error),
            }
        }
        report
    }

    pub fn handle(&self, name: &str) -> Option<FieldHandle> {
        self.entries
            .iter()
            .position(|entry| entry.array.is_some() && entry.spec.name == name)
            .map(FieldHandle)
    }

    pub fn is_live(&self, handle: FieldHandle) -> bool {
        self.live_entry(handle).is_some()
    }

    pub fn array(&self, handle: FieldHandle) -> Option<ArrayId> {
        self.live_entry(handle).map(|(_, array)| array)
    }

    pub fn spec(&self, handle: FieldHandle) -> Option<&FieldSpec> {
        self.entries
            .get(handle.0)
            .filter(|entry| entry.array.is_some())
            .map(|entry| &entry.spec)
    }

    pub fn live_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.array.is_some())
            .map(|entry| entry.spec.name.as_str())
            .collect()
    }

    pub fn real_values_mut<'g, G: ParGrid + ?Sized>(
        &self,
        grid: &'g mut G,
        handle: FieldHandle,
    ) -> HybridResult<&'g mut [f64]> {
        let (name, array) = self.require(handle)?;
        grid.real_data_mut(array).ok_or_else(|| {
            HybridError::internal("INTERNAL.FIELD_KIND", format!("{name} is not a real array"))
        })
    }

    pub fn flag_values_mut<'g, G: ParGrid + ?Sized>(
        &self,
        grid: &'g mut G,
        handle: FieldHandle,
    ) -> HybridResult<&'g mut [bool]> {
        let (name, array) = self.require(handle)?;
        grid.flag_data_mut(array).ok_or_else(|| {
            HybridError::internal("INTERNAL.FIELD_KIND", format!("{name} is not a flag array"))
        })
    }

    fn require(&self, handle: FieldHandle) -> HybridResult<(&str, ArrayId)> {
        self.live_entry(handle).ok_or_else(|| {
            HybridError::internal("INTERNAL.FIELD_HANDLE", "field handle is not live")
        })
    }

    fn live_entry(&self, handle: FieldHandle) -> Option<(&str, ArrayId)> {
        let entry = self.entries.get(handle.0)?;
        entry.array.map(|array| (entry.spec.name.as_str(), array))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldHandle, FieldRegistry, FieldSpec, Multiplicity};
    use crate::domain::HybridErrorCategory;
    use crate::grid::{ArrayData, BlockGeometry, BlockLayout, MemoryGrid, ParGrid, Stencil};

    fn grid() -> MemoryGrid {
        MemoryGrid::new(
            BlockLayout::new([2, 2, 2]),
            vec![BlockGeometry {
                origin: [0.0; 3],
                cell_size: [1.0; 3],
                global_id: 1,
            }],
            2,
        )
    }

    #[test]
    fn register_zero_fills_and_binds_requested_stencils() {
        let mut grid = grid();
        let mut registry = FieldRegistry::new(false);
        let spec = FieldSpec::real("cellRhoQi", Multiplicity::Scalar)
            .bound_to(Stencil::Default)
            .bound_to(Stencil::Accumulation);

        let handle = registry
            .register_field(&mut grid, &spec)
            .expect("registration should succeed");

        assert!(registry.is_live(handle));
        let array = registry.array(handle).expect("live handle should map to an array");
        let values = grid.real_data(array).expect("array should hold reals");
        assert_eq!(values.len(), 3 * 8);
        assert!(values.iter().all(|value| *value == 0.0));
        assert_eq!(
            grid.transfers(array),
            Some(&[Stencil::Default, Stencil::Accumulation][..])
        );
        assert_eq!(
            registry.spec(handle).map(|spec| spec.stencils.len()),
            Some(2)
        );
    }

    #[test]
    fn restarted_registry_keeps_existing_contents() {
        let mut grid = grid();
        grid.preload_restart("nodeB", ArrayData::Real(vec![1.5; 3 * 8 * 3]));
        let mut registry = FieldRegistry::new(true);
        let handle = registry
            .register_field(&mut grid, &FieldSpec::real("nodeB", Multiplicity::Vector))
            .expect("registration should succeed");
        let values = registry
            .real_values_mut(&mut grid, handle)
            .expect("values should be accessible");
        assert!(values.iter().all(|value| *value == 1.5));
    }

    #[test]
    fn round_trip_leaves_no_live_fields() {
        let mut grid = grid();
        let mut registry = FieldRegistry::new(false);
        let flag = registry
            .register_field(&mut grid, &FieldSpec::flag("innerFlagParticle").per_block())
            .expect("registration should succeed");
        assert_eq!(
            registry
                .flag_values_mut(&mut grid, flag)
                .expect("flag values should be accessible")
                .len(),
            3
        );

        registry
            .unregister_field(&mut grid, flag)
            .expect("removal should succeed");
        assert!(!registry.is_live(flag));
        assert!(grid.live_array_names().is_empty());
        assert!(registry.live_names().is_empty());
    }

    #[test]
    fn invalid_handles_are_rejected_without_side_effects() {
        let mut grid = grid();
        let mut registry = FieldRegistry::new(false);
        registry
            .register_field(&mut grid, &FieldSpec::real("faceB", Multiplicity::Vector))
            .expect("registration should succeed");

        let error = registry
            .unregister_field(&mut grid, FieldHandle::INVALID)
            .expect_err("invalid handle should fail");
        assert_eq!(error.category(), HybridErrorCategory::AllocationError);
        assert_eq!(grid.live_array_names(), vec!["faceB"]);

        let error = registry
            .bind_transfer(&mut grid, FieldHandle::INVALID, Stencil::Default)
            .expect_err("binding an invalid handle should fail");
        assert_eq!(error.placeholder(), "ALLOC.TRANSFER");
    }

    #[test]
    fn unknown_stencil_and_duplicate_names_fail() {
        let mut grid = grid();
        let mut registry = FieldRegistry::new(false);
        let handle = registry
            .register_field(&mut grid, &FieldSpec::real("cellJ", Multiplicity::Vector))
            .expect("registration should succeed");

        let error = registry
            .bind_transfer(&mut grid, handle, Stencil::Custom(3))
            .expect_err("unknown stencil should fail");
        assert!(error.message().contains("cellJ"));

        let error = registry
            .register_field(&mut grid, &FieldSpec::real("cellJ", Multiplicity::Vector))
            .expect_err("duplicate name should fail");
        assert_eq!(error.placeholder(), "ALLOC.FIELD");
    }

    #[test]
    fn allocation_failure_names_the_field() {
        let mut grid = grid();
        grid.fail_allocation_of("cellUe");
        let mut registry = FieldRegistry::new(false);
        let error = registry
            .register_field(&mut grid, &FieldSpec::real("cellUe", Multiplicity::Vector))
            .expect_err("allocation should fail");
        assert_eq!(error.exit_code(), 4);
        assert!(error.log_line().starts_with("(USER) ERROR: failed to add cellUe array"));
        assert!(registry.live_names().is_empty());
    }

    #[test]
    fn teardown_attempts_every_removal_and_accumulates_failures() {
        let mut grid = grid();
        grid.fail_removal_of("cellB");
        let mut registry = FieldRegistry::new(false);
        for name in ["faceB", "cellB", "nodeB"] {
            registry
                .register_field(&mut grid, &FieldSpec::real(name, Multiplicity::Vector))
                .expect("registration should succeed");
        }

        let report = registry.teardown(&mut grid);
        assert_eq!(report.removed, vec!["faceB".to_string(), "nodeB".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message().contains("cellB"));
        assert!(!report.is_clean());
        assert_eq!(grid.live_array_names(), vec!["cellB"]);

        let error = report.into_result().expect_err("report should carry the failure");
        assert_eq!(error.placeholder(), "ALLOC.TEARDOWN");
    }
}
