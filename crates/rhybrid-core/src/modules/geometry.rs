//! Inner-boundary classification of cells and nodes.
//!
//! Everything here is a pure function of coordinates and thresholds, so the
//! same cell yields the same flags on whichever rank owns it.

use crate::common::constants::HALF_CUBE_DIAGONAL;
use crate::domain::{Vec3, squared_norm};
use crate::grid::BlockLayout;

/// Squared radii; `-1` disables a spherical boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryThresholds {
    pub field_r2: f64,
    pub particle_r2: f64,
    pub xmin: Option<f64>,
}

impl BoundaryThresholds {
    pub fn from_radii(field_radius: f64, particle_radius: f64, xmin: Option<f64>) -> Self {
        Self {
            field_r2: squared_threshold(field_radius),
            particle_r2: squared_threshold(particle_radius),
            xmin,
        }
    }
}

pub fn squared_threshold(radius: f64) -> f64 {
    if radius > 0.0 { radius * radius } else { -1.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellFlags {
    pub field_inner: bool,
    pub node_inner: bool,
    /// Conservative particle test for this cell alone; blocks OR these.
    pub particle_inner: bool,
    pub below_xmin: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockClassification {
    /// Indexed by `BlockLayout::index`.
    pub cells: Vec<CellFlags>,
    pub particle_inner: bool,
}

pub fn cell_center(block_origin: Vec3, cell: [usize; 3], dx: f64) -> Vec3 {
    std::array::from_fn(|axis| block_origin[axis] + (cell[axis] as f64 + 0.5) * dx)
}

/// Upper corner of the cell, where the solver stores node quantities.
pub fn node_position(block_origin: Vec3, cell: [usize; 3], dx: f64) -> Vec3 {
    std::array::from_fn(|axis| block_origin[axis] + (cell[axis] as f64 + 1.0) * dx)
}

/// Centre of the +x, +y and +z faces of a cell.
pub fn face_centers(block_origin: Vec3, cell: [usize; 3], dx: f64) -> [Vec3; 3] {
    let center = cell_center(block_origin, cell, dx);
    std::array::from_fn(|face| {
        let mut position = center;
        position[face] += 0.5 * dx;
        position
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryClassifier {
    origin: Vec3,
    thresholds: BoundaryThresholds,
    dx: f64,
}

impl BoundaryClassifier {
    pub fn new(origin: Vec3, thresholds: BoundaryThresholds, dx: f64) -> Self {
        Self {
            origin,
            thresholds,
            dx,
        }
    }

    pub fn thresholds(&self) -> BoundaryThresholds {
        self.thresholds
    }

    fn distance2(&self, position: Vec3) -> f64 {
        squared_norm([
            position[0] - self.origin[0],
            position[1] - self.origin[1],
            position[2] - self.origin[2],
        ])
    }

    pub fn classify_cell(&self, center: Vec3) -> CellFlags {
        let r2 = self.distance2(center);
        let node = center.map(|coordinate| coordinate + 0.5 * self.dx);
        let shifted = r2.sqrt() - HALF_CUBE_DIAGONAL * self.dx;

        CellFlags {
            field_inner: r2 < self.thresholds.field_r2,
            node_inner: self.distance2(node) < self.thresholds.field_r2,
            particle_inner: shifted * shifted < self.thresholds.particle_r2,
            below_xmin: self.thresholds.xmin.map(|xmin| center[0] < xmin),
        }
    }

    pub fn classify_block(&self, block_origin: Vec3, layout: BlockLayout) -> BlockClassification {
        let mut cells = vec![CellFlags::default(); layout.size()];
        let mut particle_inner = false;
        for cell in layout.cells() {
            let flags = self.classify_cell(cell_center(block_origin, cell, self.dx));
            particle_inner |= flags.particle_inner;
            cells[layout.index(cell[0], cell[1], cell[2])] = flags;
        }
        BlockClassification {
            cells,
            particle_inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BoundaryClassifier, BoundaryThresholds, cell_center, face_centers, node_position,
        squared_threshold,
    };
    use crate::grid::BlockLayout;

    #[test]
    fn field_boundary_marks_only_cells_inside_radius() {
        let classifier = BoundaryClassifier::new(
            [0.0; 3],
            BoundaryThresholds::from_radii(8.0, -1.0, None),
            5.0,
        );

        let near = classifier.classify_cell([0.0, 0.0, 0.0]);
        let far = classifier.classify_cell([10.0, 10.0, 10.0]);
        assert!(near.field_inner);
        assert!(!far.field_inner);
        assert!(!near.particle_inner);
        assert_eq!(near.below_xmin, None);
    }

    #[test]
    fn non_positive_radius_disables_boundary() {
        assert_eq!(squared_threshold(0.0), -1.0);
        assert_eq!(squared_threshold(-3.0), -1.0);
        assert_eq!(squared_threshold(3.0), 9.0);

        let classifier = BoundaryClassifier::new(
            [0.0; 3],
            BoundaryThresholds::from_radii(0.0, 0.0, None),
            1.0,
        );
        let flags = classifier.classify_cell([0.0; 3]);
        assert!(!flags.field_inner);
        assert!(!flags.node_inner);
        assert!(!flags.particle_inner);
    }

    #[test]
    fn particle_test_offsets_radius_by_half_diagonal() {
        let dx = 2.0;
        let classifier = BoundaryClassifier::new(
            [0.0; 3],
            BoundaryThresholds::from_radii(10.0, 10.0, None),
            dx,
        );
        let half_diagonal = 0.5 * 3.0_f64.sqrt() * dx;

        let just_outside = [10.0 + 0.5 * half_diagonal, 0.0, 0.0];
        let flags = classifier.classify_cell(just_outside);
        assert!(!flags.field_inner);
        assert!(flags.particle_inner);
    }

    #[test]
    fn node_flag_uses_upper_cell_corner() {
        let classifier = BoundaryClassifier::new(
            [0.0; 3],
            BoundaryThresholds::from_radii(1.0, -1.0, None),
            1.0,
        );
        let flags = classifier.classify_cell([-0.5, -0.5, -0.5]);
        assert!(flags.field_inner);
        assert!(flags.node_inner);

        let flags = classifier.classify_cell([0.5, 0.5, 0.5]);
        assert!(flags.field_inner);
        assert!(!flags.node_inner);
    }

    #[test]
    fn classification_is_deterministic_and_origin_relative() {
        let layout = BlockLayout::new([2, 2, 2]);
        let thresholds = BoundaryThresholds::from_radii(3.0, 2.0, Some(-1.0));
        let centred = BoundaryClassifier::new([0.0; 3], thresholds, 1.0);
        let shifted = BoundaryClassifier::new([100.0, 0.0, 0.0], thresholds, 1.0);

        let first = centred.classify_block([-2.0, -1.0, -1.0], layout);
        let second = centred.classify_block([-2.0, -1.0, -1.0], layout);
        assert_eq!(first, second);
        assert!(first.particle_inner);
        assert_eq!(first.cells[0].below_xmin, Some(true));
        assert_eq!(first.cells[1].below_xmin, Some(false));

        let moved = shifted.classify_block([98.0, -1.0, -1.0], layout);
        assert_eq!(
            moved
                .cells
                .iter()
                .map(|flags| (flags.field_inner, flags.node_inner, flags.particle_inner))
                .collect::<Vec<_>>(),
            first
                .cells
                .iter()
                .map(|flags| (flags.field_inner, flags.node_inner, flags.particle_inner))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn positions_follow_cell_offsets() {
        assert_eq!(cell_center([1.0, 2.0, 3.0], [0, 1, 2], 2.0), [2.0, 5.0, 8.0]);
        assert_eq!(node_position([1.0, 2.0, 3.0], [0, 1, 2], 2.0), [3.0, 6.0, 9.0]);
        let faces = face_centers([0.0; 3], [0, 0, 0], 2.0);
        assert_eq!(faces[0], [2.0, 1.0, 1.0]);
        assert_eq!(faces[2], [1.0, 1.0, 2.0]);
    }
}
