use super::CliError;
use super::helpers::*;
use rhybrid_core::bootstrap::HybridBootstrap;
use rhybrid_core::common::config::{HybridConfig, load_hybrid_config};
use rhybrid_core::common::profiles::{MagneticFieldProfileKind, ResistivityProfileKind};
use rhybrid_core::domain::{HybridError, Subsystem};
use rhybrid_core::grid::UniformGrid;
use rhybrid_core::modules::orbit::collect_orbit_points;
use rhybrid_core::parallel::{Communicator, LocalCluster, LocalCommunicator};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct BootstrapArgs {
    /// Run configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Number of in-process ranks
    #[arg(long, default_value_t = 1)]
    ranks: usize,

    /// Directory for run logs and the spectra cell index
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Treat the run as continuing from a restart
    #[arg(long)]
    restarted: bool,

    /// Write the coordinator summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct OrbitCheckArgs {
    /// Orbit files with one `x y z` row per line, in metres
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,
}

impl BootstrapArgs {
    fn into_config(self) -> Result<(HybridConfig, usize, Option<PathBuf>), CliError> {
        if self.ranks == 0 {
            return Err(CliError::Usage("--ranks must be at least 1".to_string()));
        }
        let mut config = load_hybrid_config(&self.config).map_err(HybridError::from)?;
        if let Some(output_dir) = self.output_dir {
            config.simulation.output_dir = output_dir;
        }
        if self.restarted {
            config.simulation.restarted = true;
        }
        Ok((config, self.ranks, self.summary))
    }
}

pub(super) fn run_bootstrap_command(args: BootstrapArgs) -> Result<i32, CliError> {
    let (config, ranks, summary_path) = args.into_config()?;
    config.validate()?;
    ensure_directory(&config.simulation.output_dir)?;

    let layout = UniformGrid::from_layout(&config.grid);
    info!(
        ranks,
        blocks = layout.block_count(),
        "starting bootstrap on in-process ranks"
    );
    let outcomes = LocalCluster::run(ranks, |comm| run_rank(&config, &layout, comm));
    let summary = settle_outcomes(outcomes)?;

    println!("{}", summary.render());
    if let Some(path) = summary_path {
        write_summary_json(&path, &summary)?;
    }
    Ok(0)
}

fn run_rank(config: &HybridConfig, layout: &UniformGrid, comm: LocalCommunicator) -> RankOutcome {
    let mut grid = layout.build_rank_grid(comm.rank(), comm.size());
    let mut bootstrap = HybridBootstrap::new(config.clone());
    let result = bootstrap.initialize_with_species(&comm, &mut grid);
    let summary = (result.is_ok() && comm.is_root())
        .then(|| BootstrapSummary::collect(&mut bootstrap, comm.size()));
    let teardown = bootstrap.finalize(&mut grid);
    RankOutcome {
        result,
        summary,
        teardown,
    }
}

pub(super) fn run_orbit_check_command(args: OrbitCheckArgs) -> Result<i32, CliError> {
    let points = collect_orbit_points(&args.files)?;
    println!("orbit files: {}", args.files.len());
    println!("orbit points: {}", points.len());

    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for point in &points {
        for axis in 0..3 {
            min[axis] = min[axis].min(point[axis]);
            max[axis] = max[axis].max(point[axis]);
        }
    }
    if !points.is_empty() {
        for (axis, label) in ["x", "y", "z"].iter().enumerate() {
            println!(
                "{label}: {} .. {} km",
                min[axis] / 1e3,
                max[axis] / 1e3
            );
        }
    }
    Ok(0)
}

pub(super) fn run_profiles_command() -> Result<i32, CliError> {
    let resistivity = ResistivityProfileKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>();
    let magnetic = MagneticFieldProfileKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>();
    let subsystems = Subsystem::ALL
        .iter()
        .map(|subsystem| subsystem.as_str())
        .collect::<Vec<_>>();

    println!("resistivity profiles: {}", resistivity.join(" "));
    println!("magnetic field profiles: {}", magnetic.join(" "));
    println!("subsystems: {}", subsystems.join(" "));
    Ok(0)
}
