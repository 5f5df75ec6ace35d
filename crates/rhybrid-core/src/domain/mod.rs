pub mod errors;

pub use errors::{HybridError, HybridErrorCategory, HybridResult};

use std::fmt::{Display, Formatter};

pub type Vec3 = [f64; 3];

/// Grid-wide identifier of a block, as assigned by the partitioning engine.
pub type GlobalCellId = u64;

/// Optional subsystems that used to be compile-time switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Resistivity,
    OrbitSpectra,
    PopulationAverages,
    XminBoundary,
    Ecut,
    InitialB,
    ConstantB,
}

impl Subsystem {
    pub const ALL: [Subsystem; 7] = [
        Self::Resistivity,
        Self::OrbitSpectra,
        Self::PopulationAverages,
        Self::XminBoundary,
        Self::Ecut,
        Self::InitialB,
        Self::ConstantB,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resistivity => "RESISTIVITY",
            Self::OrbitSpectra => "ORBIT_SPECTRA",
            Self::PopulationAverages => "POPULATION_AVERAGES",
            Self::XminBoundary => "XMIN_BOUNDARY",
            Self::Ecut => "ECUT",
            Self::InitialB => "B_INITIAL",
            Self::ConstantB => "B_CONSTANT",
        }
    }
}

impl Display for Subsystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

pub fn squared_norm(v: Vec3) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

pub fn norm(v: Vec3) -> f64 {
    squared_norm(v).sqrt()
}

pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
