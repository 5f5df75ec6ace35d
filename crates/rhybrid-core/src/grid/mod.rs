//! Grid/partitioning engine seam.
//!
//! The grid stores one record per block; each block holds
//! `BlockLayout::size()` cells. Named arrays are sized over local plus ghost
//! blocks, so every array has `all_cell_count() * elements_per_block`
//! entries.

mod memory;
mod uniform;

pub use memory::{ArrayData, BlockGeometry, MemoryGrid};
pub use uniform::UniformGrid;

use crate::domain::{GlobalCellId, HybridError, Vec3};
use std::fmt::{Display, Formatter};

pub type ArrayId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stencil {
    /// Neighbour exchange of ghost copies.
    Default,
    /// Inverse exchange that sums ghost contributions into the owner.
    Accumulation,
    Custom(u32),
}

impl Display for Stencil {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Accumulation => f.write_str("accumulation"),
            Self::Custom(id) => write!(f, "custom#{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Real,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub width: [usize; 3],
}

impl BlockLayout {
    pub const fn new(width: [usize; 3]) -> Self {
        Self { width }
    }

    pub const fn size(&self) -> usize {
        self.width[0] * self.width[1] * self.width[2]
    }

    pub const fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.width[0] * (j + self.width[1] * k)
    }

    /// Cell offsets `(i, j, k)` in storage order.
    pub fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [wx, wy, wz] = self.width;
        (0..wz).flat_map(move |k| (0..wy).flat_map(move |j| (0..wx).map(move |i| [i, j, k])))
    }
}

pub trait ParGrid {
    fn allocate_array(
        &mut self,
        name: &str,
        kind: ElementKind,
        elements_per_block: usize,
    ) -> Result<ArrayId, GridError>;

    fn register_transfer(&mut self, array: ArrayId, stencil: Stencil) -> Result<(), GridError>;

    fn deallocate_array(&mut self, array: ArrayId) -> Result<(), GridError>;

    fn real_data(&self, array: ArrayId) -> Option<&[f64]>;

    fn real_data_mut(&mut self, array: ArrayId) -> Option<&mut [f64]>;

    fn flag_data(&self, array: ArrayId) -> Option<&[bool]>;

    fn flag_data_mut(&mut self, array: ArrayId) -> Option<&mut [bool]>;

    fn local_cell_count(&self) -> usize;

    /// Local plus ghost blocks.
    fn all_cell_count(&self) -> usize;

    fn block_origin(&self, block: usize) -> Vec3;

    fn block_cell_size(&self, block: usize) -> Vec3;

    fn global_id(&self, block: usize) -> GlobalCellId;

    fn block_layout(&self) -> BlockLayout;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid refused to allocate array '{name}'")]
    AllocationFailed { name: String },
    #[error("array '{name}' already exists on the grid")]
    DuplicateArray { name: String },
    #[error("array id {array} is not allocated")]
    UnknownArray { array: ArrayId },
    #[error("stencil {stencil} is not known to the grid")]
    UnknownStencil { stencil: Stencil },
    #[error("grid refused to remove array '{name}'")]
    DeallocationFailed { name: String },
}

impl From<GridError> for HybridError {
    fn from(error: GridError) -> Self {
        match &error {
            GridError::UnknownStencil { .. } => {
                HybridError::configuration("CONFIG.STENCIL", error.to_string())
            }
            _ => HybridError::allocation("ALLOC.GRID", error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BlockLayout;

    #[test]
    fn block_index_is_x_fastest() {
        let layout = BlockLayout::new([2, 3, 4]);
        assert_eq!(layout.size(), 24);
        assert_eq!(layout.index(1, 0, 0), 1);
        assert_eq!(layout.index(0, 1, 0), 2);
        assert_eq!(layout.index(0, 0, 1), 6);

        let order: Vec<usize> = layout
            .cells()
            .map(|[i, j, k]| layout.index(i, j, k))
            .collect();
        assert_eq!(order, (0..24).collect::<Vec<_>>());
    }
}
