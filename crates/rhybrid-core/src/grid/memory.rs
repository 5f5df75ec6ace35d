use super::{ArrayId, BlockLayout, ElementKind, GridError, ParGrid, Stencil};
use crate::domain::{GlobalCellId, Vec3};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockGeometry {
    pub origin: Vec3,
    pub cell_size: Vec3,
    pub global_id: GlobalCellId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Real(Vec<f64>),
    Flag(Vec<bool>),
}

impl ArrayData {
    fn kind(&self) -> ElementKind {
        match self {
            Self::Real(_) => ElementKind::Real,
            Self::Flag(_) => ElementKind::Flag,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Real(values) => values.len(),
            Self::Flag(values) => values.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct GridArray {
    name: String,
    data: ArrayData,
    transfers: Vec<Stencil>,
}

/// Single-rank grid holding its arrays in memory.
///
/// Freshly allocated real arrays are filled with NaN, standing in for the
/// uninitialised memory a real engine hands out.
#[derive(Debug, Clone)]
pub struct MemoryGrid {
    layout: BlockLayout,
    blocks: Vec<BlockGeometry>,
    ghost_count: usize,
    stencils: BTreeSet<Stencil>,
    arrays: BTreeMap<ArrayId, GridArray>,
    next_id: ArrayId,
    restart_data: BTreeMap<String, ArrayData>,
    failing_allocations: BTreeSet<String>,
    failing_removals: BTreeSet<String>,
}

impl MemoryGrid {
    pub fn new(layout: BlockLayout, blocks: Vec<BlockGeometry>, ghost_count: usize) -> Self {
        Self {
            layout,
            blocks,
            ghost_count,
            stencils: BTreeSet::from([Stencil::Default, Stencil::Accumulation]),
            arrays: BTreeMap::new(),
            next_id: 0,
            restart_data: BTreeMap::new(),
            failing_allocations: BTreeSet::new(),
            failing_removals: BTreeSet::new(),
        }
    }

    pub fn with_stencil(mut self, stencil: Stencil) -> Self {
        self.stencils.insert(stencil);
        self
    }

    /// Contents handed out instead of fresh memory when `name` is allocated.
    pub fn preload_restart(&mut self, name: impl Into<String>, data: ArrayData) {
        self.restart_data.insert(name.into(), data);
    }

    pub fn fail_allocation_of(&mut self, name: impl Into<String>) {
        self.failing_allocations.insert(name.into());
    }

    pub fn fail_removal_of(&mut self, name: impl Into<String>) {
        self.failing_removals.insert(name.into());
    }

    pub fn array_id(&self, name: &str) -> Option<ArrayId> {
        self.arrays
            .iter()
            .find(|(_, array)| array.name == name)
            .map(|(id, _)| *id)
    }

    pub fn transfers(&self, array: ArrayId) -> Option<&[Stencil]> {
        self.arrays
            .get(&array)
            .map(|array| array.transfers.as_slice())
    }

    pub fn live_array_names(&self) -> Vec<&str> {
        self.arrays.values().map(|array| array.name.as_str()).collect()
    }

    pub fn real_array(&self, name: &str) -> Option<&[f64]> {
        self.array_id(name).and_then(|id| self.real_data(id))
    }

    pub fn flag_array(&self, name: &str) -> Option<&[bool]> {
        self.array_id(name).and_then(|id| self.flag_data(id))
    }
}

impl ParGrid for MemoryGrid {
    fn allocate_array(
        &mut self,
        name: &str,
        kind: ElementKind,
        elements_per_block: usize,
    ) -> Result<ArrayId, GridError> {
        if self.failing_allocations.contains(name) {
            return Err(GridError::AllocationFailed {
                name: name.to_string(),
            });
        }
        if self.array_id(name).is_some() {
            return Err(GridError::DuplicateArray {
                name: name.to_string(),
            });
        }

        let len = self.all_cell_count() * elements_per_block;
        let data = match self.restart_data.remove(name) {
            Some(preloaded) if preloaded.kind() == kind && preloaded.len() == len => preloaded,
            _ => match kind {
                ElementKind::Real => ArrayData::Real(vec![f64::NAN; len]),
                ElementKind::Flag => ArrayData::Flag(vec![false; len]),
            },
        };

        let id = self.next_id;
        self.next_id += 1;
        self.arrays.insert(
            id,
            GridArray {
                name: name.to_string(),
                data,
                transfers: Vec::new(),
            },
        );
        Ok(id)
    }

    fn register_transfer(&mut self, array: ArrayId, stencil: Stencil) -> Result<(), GridError> {
        if !self.stencils.contains(&stencil) {
            return Err(GridError::UnknownStencil { stencil });
        }
        let entry = self
            .arrays
            .get_mut(&array)
            .ok_or(GridError::UnknownArray { array })?;
        if !entry.transfers.contains(&stencil) {
            entry.transfers.push(stencil);
        }
        Ok(())
    }

    fn deallocate_array(&mut self, array: ArrayId) -> Result<(), GridError> {
        let name = self
            .arrays
            .get(&array)
            .map(|entry| entry.name.clone())
            .ok_or(GridError::UnknownArray { array })?;
        if self.failing_removals.contains(&name) {
            return Err(GridError::DeallocationFailed { name });
        }
        self.arrays.remove(&array);
        Ok(())
    }

    fn real_data(&self, array: ArrayId) -> Option<&[f64]> {
        match &self.arrays.get(&array)?.data {
            ArrayData::Real(values) => Some(values),
            ArrayData::Flag(_) => None,
        }
    }

    fn real_data_mut(&mut self, array: ArrayId) -> Option<&mut [f64]> {
        match &mut self.arrays.get_mut(&array)?.data {
            ArrayData::Real(values) => Some(values),
            ArrayData::Flag(_) => None,
        }
    }

    fn flag_data(&self, array: ArrayId) -> Option<&[bool]> {
        match &self.arrays.get(&array)?.data {
            ArrayData::Flag(values) => Some(values),
            ArrayData::Real(_) => None,
        }
    }

    fn flag_data_mut(&mut self, array: ArrayId) -> Option<&mut [bool]> {
        match &mut self.arrays.get_mut(&array)?.data {
            ArrayData::Flag(values) => Some(values),
            ArrayData::Real(_) => None,
        }
    }

    fn local_cell_count(&self) -> usize {
        self.blocks.len()
    }

    fn all_cell_count(&self) -> usize {
        self.blocks.len() + self.ghost_count
    }

    fn block_origin(&self, block: usize) -> Vec3 {
        self.blocks[block].origin
    }

    fn block_cell_size(&self, block: usize) -> Vec3 {
        self.blocks[block].cell_size
    }

    fn global_id(&self, block: usize) -> GlobalCellId {
        self.blocks[block].global_id
    }

    fn block_layout(&self) -> BlockLayout {
        self.layout
    }
}
