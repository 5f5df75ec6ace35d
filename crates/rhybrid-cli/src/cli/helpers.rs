use super::CliError;
use anyhow::Context;
use rhybrid_core::bootstrap::HybridBootstrap;
use rhybrid_core::domain::{HybridError, HybridResult};
use rhybrid_core::modules::registry::TeardownReport;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber; `RUST_LOG` overrides the `info` default.
pub(super) fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(super) struct BootstrapSummary {
    pub(super) ranks: usize,
    pub(super) restarted: bool,
    pub(super) cell_size: f64,
    pub(super) fields: Vec<String>,
    pub(super) populations: Vec<String>,
    pub(super) output_variables: Vec<String>,
    pub(super) spectra_cells: Option<usize>,
    pub(super) spectra_index: Option<PathBuf>,
    pub(super) run_logs: Vec<PathBuf>,
}

impl BootstrapSummary {
    /// Snapshot of the coordinator's state; taken before finalization
    /// releases the fields and closes the logs.
    pub(super) fn collect(bootstrap: &mut HybridBootstrap, ranks: usize) -> Self {
        let run_logs = bootstrap
            .logs_mut()
            .map(|logs| logs.paths())
            .unwrap_or_default();
        let spectra = bootstrap.spectra();
        Self {
            ranks,
            restarted: bootstrap.config().simulation.restarted,
            cell_size: bootstrap
                .parameters()
                .map(|parameters| parameters.dx)
                .unwrap_or_default(),
            fields: bootstrap
                .registry()
                .live_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            populations: bootstrap
                .populations()
                .iter()
                .map(|population| population.name.clone())
                .collect(),
            output_variables: bootstrap
                .output_variables()
                .groups
                .iter()
                .map(|group| group.tag.clone())
                .collect(),
            spectra_cells: spectra
                .and_then(|spectra| spectra.records.as_ref())
                .map(Vec::len),
            spectra_index: spectra.and_then(|spectra| spectra.index_path.clone()),
            run_logs,
        }
    }

    pub(super) fn render(&self) -> String {
        let mut lines = vec![
            "Bootstrap status: OK".to_string(),
            format!("ranks: {}", self.ranks),
            format!("restarted: {}", self.restarted),
            format!("cell size: {} m", self.cell_size),
            format!("fields registered: {}", self.fields.len()),
            format!("populations: {}", self.populations.join(" ")),
            format!("output variables: {}", self.output_variables.join(" ")),
        ];
        if let Some(cells) = self.spectra_cells {
            lines.push(format!("spectra cells: {cells}"));
        }
        if let Some(path) = &self.spectra_index {
            lines.push(format!("spectra index: {}", path.display()));
        }
        lines.extend(
            self.run_logs
                .iter()
                .map(|path| format!("run log: {}", path.display())),
        );
        lines.join("\n")
    }
}

#[derive(Debug)]
pub(super) struct RankOutcome {
    pub(super) result: HybridResult<()>,
    pub(super) summary: Option<BootstrapSummary>,
    pub(super) teardown: TeardownReport,
}

/// Reduces per-rank outcomes to the coordinator summary or the first failure
/// in rank order. Teardown failures count as failures.
pub(super) fn settle_outcomes(outcomes: Vec<RankOutcome>) -> Result<BootstrapSummary, HybridError> {
    let mut first_failure = None;
    let mut summary = None;
    for outcome in outcomes {
        if let Err(error) = outcome.result {
            first_failure.get_or_insert(error);
        }
        if let Err(error) = outcome.teardown.into_result() {
            first_failure.get_or_insert(error);
        }
        if outcome.summary.is_some() {
            summary = outcome.summary;
        }
    }

    match (first_failure, summary) {
        (Some(error), _) => Err(error),
        (None, Some(summary)) => Ok(summary),
        (None, None) => Err(HybridError::internal(
            "INTERNAL.CLI_SUMMARY",
            "coordinator rank did not report a bootstrap summary",
        )),
    }
}

pub(super) fn ensure_directory(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create output directory '{}'", path.display()))?;
    Ok(())
}

pub(super) fn write_summary_json(path: &Path, summary: &BootstrapSummary) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    let content = serde_json::to_string_pretty(summary).context("failed to serialize summary")?;
    fs::write(path, format!("{content}\n"))
        .with_context(|| format!("failed to write summary '{}'", path.display()))?;
    Ok(())
}
