pub mod diagnostics;
pub mod geometry;
pub mod logs;
pub mod orbit;
pub mod population;
pub mod registry;
pub mod serialization;
