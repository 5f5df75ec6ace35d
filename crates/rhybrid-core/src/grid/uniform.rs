use super::memory::{BlockGeometry, MemoryGrid};
use super::BlockLayout;
use crate::common::config::GridLayoutConfig;
use crate::domain::Vec3;
use std::ops::Range;

/// Box of equally sized blocks split into contiguous per-rank chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformGrid {
    pub min: Vec3,
    pub cell_size: Vec3,
    pub blocks_per_axis: [usize; 3],
    pub layout: BlockLayout,
}

impl UniformGrid {
    /// Expects a layout that already passed configuration validation.
    pub fn from_layout(config: &GridLayoutConfig) -> Self {
        let blocks_per_axis = [
            config.cells[0] / config.block_width[0],
            config.cells[1] / config.block_width[1],
            config.cells[2] / config.block_width[2],
        ];
        Self {
            min: config.min,
            cell_size: config.cell_size,
            blocks_per_axis,
            layout: BlockLayout::new(config.block_width),
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks_per_axis.iter().product()
    }

    /// Linear block indices owned by `rank`; the first `count % size` ranks
    /// take one extra block.
    pub fn partition(&self, rank: usize, size: usize) -> Range<usize> {
        let count = self.block_count();
        if size == 0 || rank >= size {
            return 0..0;
        }
        let base = count / size;
        let remainder = count % size;
        let start = rank * base + rank.min(remainder);
        let len = base + usize::from(rank < remainder);
        start..start + len
    }

    fn coordinates(&self, linear: usize) -> [usize; 3] {
        let [nx, ny, _] = self.blocks_per_axis;
        [linear % nx, (linear / nx) % ny, linear / (nx * ny)]
    }

    pub fn block_geometry(&self, linear: usize) -> BlockGeometry {
        let index = self.coordinates(linear);
        let origin = std::array::from_fn(|axis| {
            self.min[axis]
                + (index[axis] * self.layout.width[axis]) as f64 * self.cell_size[axis]
        });
        BlockGeometry {
            origin,
            cell_size: self.cell_size,
            global_id: linear as u64 + 1,
        }
    }

    /// Blocks outside `owned` that touch it across a face, edge or corner.
    pub fn ghost_count(&self, owned: Range<usize>) -> usize {
        (0..self.block_count())
            .filter(|linear| !owned.contains(linear))
            .filter(|linear| {
                let [x, y, z] = self.coordinates(*linear);
                owned.clone().any(|other| {
                    let [ox, oy, oz] = self.coordinates(other);
                    x.abs_diff(ox) <= 1 && y.abs_diff(oy) <= 1 && z.abs_diff(oz) <= 1
                })
            })
            .count()
    }

    pub fn build_rank_grid(&self, rank: usize, size: usize) -> MemoryGrid {
        let owned = self.partition(rank, size);
        let blocks = owned
            .clone()
            .map(|linear| self.block_geometry(linear))
            .collect();
        MemoryGrid::new(self.layout, blocks, self.ghost_count(owned))
    }
}

#[cfg(test)]
mod tests {
    use super::UniformGrid;
    use crate::common::config::GridLayoutConfig;
    use crate::grid::ParGrid;

    fn layout() -> GridLayoutConfig {
        GridLayoutConfig {
            min: [-4.0, -2.0, -2.0],
            cells: [8, 4, 4],
            cell_size: [1.0, 1.0, 1.0],
            block_width: [2, 2, 2],
        }
    }

    #[test]
    fn partitions_cover_every_block_exactly_once() {
        let grid = UniformGrid::from_layout(&layout());
        assert_eq!(grid.blocks_per_axis, [4, 2, 2]);
        assert_eq!(grid.block_count(), 16);

        let size = 3;
        let mut covered = Vec::new();
        for rank in 0..size {
            covered.extend(grid.partition(rank, size));
        }
        assert_eq!(covered, (0..16).collect::<Vec<_>>());
        assert_eq!(grid.partition(0, size).len(), 6);
        assert_eq!(grid.partition(2, size).len(), 5);
        assert!(grid.partition(5, size).is_empty());
    }

    #[test]
    fn block_geometry_follows_linear_order() {
        let grid = UniformGrid::from_layout(&layout());
        let first = grid.block_geometry(0);
        assert_eq!(first.origin, [-4.0, -2.0, -2.0]);
        assert_eq!(first.global_id, 1);

        let last = grid.block_geometry(15);
        assert_eq!(last.origin, [2.0, 0.0, 0.0]);
        assert_eq!(last.global_id, 16);
    }

    #[test]
    fn single_rank_owns_everything_without_ghosts() {
        let grid = UniformGrid::from_layout(&layout());
        let rank_grid = grid.build_rank_grid(0, 1);
        assert_eq!(rank_grid.local_cell_count(), 16);
        assert_eq!(rank_grid.all_cell_count(), 16);
    }

    #[test]
    fn ghosts_are_adjacent_foreign_blocks() {
        let grid = UniformGrid::from_layout(&GridLayoutConfig {
            min: [0.0; 3],
            cells: [4, 1, 1],
            cell_size: [1.0; 3],
            block_width: [1, 1, 1],
        });
        assert_eq!(grid.ghost_count(0..2), 1);
        assert_eq!(grid.ghost_count(1..2), 2);
        assert_eq!(grid.ghost_count(0..4), 0);
    }
}
