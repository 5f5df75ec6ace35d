pub mod config;
pub mod constants;
pub mod output;
pub mod profiles;

pub use config::{
    AnalysisConfig, Capabilities, GridLayoutConfig, HybridConfig, HybridConfigError,
    HybridParameters, IntrinsicFieldConfig, PopulationNames, SpeciesConfig, load_hybrid_config,
};
pub use output::OutputSelection;
pub use profiles::{
    MagneticFieldProfile, MagneticFieldProfileKind, ResistivityProfile, ResistivityProfileKind,
};
