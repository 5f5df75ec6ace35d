use crate::common::config::AnalysisConfig;

/// When particle spectra are recorded along the orbit cells and how often
/// recorded particles are flushed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectraSchedule {
    pub t_start: f64,
    pub t_end: f64,
    pub max_particles: f64,
    pub write_interval_timesteps: f64,
}

impl SpectraSchedule {
    pub fn from_config(analysis: &AnalysisConfig) -> Self {
        Self {
            t_start: analysis.orbit_spectra_t_start,
            t_end: analysis.orbit_spectra_t_end,
            max_particles: analysis.orbit_spectra_max_particles,
            write_interval_timesteps: analysis.orbit_spectra_write_interval_timesteps,
        }
    }

    pub fn records_at(&self, time: f64, recorded_particles: f64) -> bool {
        time >= self.t_start && time <= self.t_end && recorded_particles < self.max_particles
    }

    pub fn write_due(&self, timesteps_since_write: f64) -> bool {
        timesteps_since_write >= self.write_interval_timesteps
    }

    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!(
                "cell spectra: recording particle spectra between: t = {} ... {} s",
                self.t_start, self.t_end
            ),
            format!(
                "cell spectra: maximum number of recorded spectra particles: {}",
                self.max_particles
            ),
            format!(
                "cell spectra: writing interval of spectra particles: {} timesteps",
                self.write_interval_timesteps
            ),
        ]
    }
}
