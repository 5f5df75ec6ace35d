use crate::domain::{HybridError, HybridResult};
use crate::modules::population::Population;
use crate::modules::serialization::format_scientific;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FIELD_LOG_FILE: &str = "field.log";
pub const LOG_PRECISION: usize = 10;

pub const POPULATION_LOG_COLUMNS: [&str; 12] = [
    "Time [s]",
    "Particles [#]",
    "Macroparticles [#]",
    "avg(Vx) [m/s]",
    "avg(Vy) [m/s]",
    "avg(Vz) [m/s]",
    "avg(|V|) [m/s]",
    "Kinetic energy [J]",
    "Escape rate [#/s]",
    "Impact rate [#/s]",
    "Inject rate [#/s]",
    "Macroparticle inject rate [#/dt]",
];

pub const FIELD_LOG_COLUMNS: [&str; 10] = [
    "Time [s]",
    "avg(Bx) [T]",
    "avg(By) [T]",
    "avg(Bz) [T]",
    "avg(|B|) [T]",
    "max(|B|) [T]",
    "avg(div(B)) [T/m]",
    "max(div(B)) [T/m]",
    "max(dx*div(B)/B) [-]",
    "energy(sum(dV*B^2/2*mu0)) [J]",
];

pub fn population_log_name(index: usize, name: &str) -> String {
    format!("pop{:03}_{name}.log", index + 1)
}

fn io_error(path: &Path, action: &str, error: std::io::Error) -> HybridError {
    HybridError::io_system(
        "IO.RUN_LOG",
        format!("failed to {action} log '{}': {error}", path.display()),
    )
}

/// One `%`-headed, whitespace-separated log file.
#[derive(Debug)]
pub struct LogStream {
    path: PathBuf,
    columns: usize,
    writer: BufWriter<File>,
}

impl LogStream {
    pub fn create(path: PathBuf, preamble: &[String], columns: &[&str]) -> HybridResult<Self> {
        let file = File::create(&path).map_err(|error| io_error(&path, "create", error))?;
        let mut stream = Self {
            path,
            columns: columns.len(),
            writer: BufWriter::new(file),
        };

        let mut header = String::new();
        for line in preamble {
            header.push_str(&format!("% {line}\n"));
        }
        header.push_str(&format!("% columns = {}\n", columns.len()));
        for (index, column) in columns.iter().enumerate() {
            header.push_str(&format!("% {:02}. {column}\n", index + 1));
        }
        stream
            .writer
            .write_all(header.as_bytes())
            .map_err(|error| io_error(&stream.path, "write", error))?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_record(&mut self, values: &[f64]) -> HybridResult<()> {
        if values.len() != self.columns {
            return Err(HybridError::internal(
                "INTERNAL.RUN_LOG",
                format!(
                    "log '{}' expects {} columns, got {}",
                    self.path.display(),
                    self.columns,
                    values.len()
                ),
            ));
        }
        let row = values
            .iter()
            .map(|value| format_scientific(*value, LOG_PRECISION, true))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.writer, "{row}").map_err(|error| io_error(&self.path, "write", error))
    }

    pub fn close(mut self) -> HybridResult<()> {
        self.writer
            .flush()
            .map_err(|error| io_error(&self.path, "close", error))
    }
}

/// Coordinator-owned run logs: one stream per population plus `field.log`.
/// Dropping the handle still flushes the buffers; `close` reports failures.
#[derive(Debug, Default)]
pub struct RunLogs {
    populations: Vec<LogStream>,
    field: Option<LogStream>,
}

impl RunLogs {
    pub fn open(directory: &Path, populations: &[Population]) -> HybridResult<Self> {
        let mut logs = Self::default();
        for (index, population) in populations.iter().enumerate() {
            let preamble = [
                population.name.clone(),
                format!("m [kg] = {}", format_scientific(population.mass, LOG_PRECISION, true)),
                format!("q [C] = {}", format_scientific(population.charge, LOG_PRECISION, true)),
            ];
            let path = directory.join(population_log_name(index, &population.name));
            match LogStream::create(path, &preamble, &POPULATION_LOG_COLUMNS) {
                Ok(stream) => logs.populations.push(stream),
                Err(error) => {
                    let _ = logs.close();
                    return Err(error);
                }
            }
        }
        match LogStream::create(
            directory.join(FIELD_LOG_FILE),
            &["field".to_string()],
            &FIELD_LOG_COLUMNS,
        ) {
            Ok(stream) => logs.field = Some(stream),
            Err(error) => {
                let _ = logs.close();
                return Err(error);
            }
        }
        Ok(logs)
    }

    pub fn population(&mut self, index: usize) -> Option<&mut LogStream> {
        self.populations.get_mut(index)
    }

    pub fn field(&mut self) -> Option<&mut LogStream> {
        self.field.as_mut()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.populations
            .iter()
            .chain(self.field.iter())
            .map(|stream| stream.path().to_path_buf())
            .collect()
    }

    /// Closes every stream and returns the first failure.
    pub fn close(self) -> HybridResult<()> {
        let mut first_error = None;
        for stream in self.populations.into_iter().chain(self.field) {
            if let Err(error) = stream.close() {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FIELD_LOG_FILE, RunLogs, population_log_name};
    use crate::domain::HybridErrorCategory;
    use crate::modules::population::{Population, PopulationCategory};
    use std::fs;
    use tempfile::TempDir;

    fn population(name: &str) -> Population {
        Population {
            name: name.to_string(),
            category: PopulationCategory::SolarWind,
            charge: 1.602_176_634e-19,
            mass: 1.672_621_923_69e-27,
            density: 1.0e6,
            velocity: 4.0e5,
            vth: 4.0e4,
            output_tag: "-".to_string(),
            include_in_plasma: true,
        }
    }

    #[test]
    fn log_names_are_one_based_and_zero_padded() {
        assert_eq!(population_log_name(0, "H+sw"), "pop001_H+sw.log");
        assert_eq!(population_log_name(9, "O+"), "pop010_O+.log");
        assert_eq!(population_log_name(120, "e"), "pop121_e.log");
    }

    #[test]
    fn headers_and_records_are_written_on_close() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut logs = RunLogs::open(temp.path(), &[population("H+sw"), population("O+")])
            .expect("logs should open");
        assert_eq!(logs.paths().len(), 3);

        logs.field()
            .expect("field log should exist")
            .write_record(&[1.0; 10])
            .expect("record should be written");
        let error = logs
            .population(0)
            .expect("population log should exist")
            .write_record(&[1.0; 3])
            .expect_err("short record should fail");
        assert_eq!(error.category(), HybridErrorCategory::InternalError);
        logs.close().expect("logs should close");

        let pop = fs::read_to_string(temp.path().join("pop001_H+sw.log")).expect("pop log");
        let lines: Vec<&str> = pop.lines().collect();
        assert_eq!(lines[0], "% H+sw");
        assert_eq!(lines[1], "% m [kg] = +1.6726219237e-27");
        assert_eq!(lines[3], "% columns = 12");
        assert_eq!(lines[15], "% 12. Macroparticle inject rate [#/dt]");
        assert_eq!(lines.len(), 16);

        let field = fs::read_to_string(temp.path().join(FIELD_LOG_FILE)).expect("field log");
        assert!(field.starts_with("% field\n% columns = 10\n% 01. Time [s]\n"));
        assert!(field.ends_with(&format!("{}\n", ["+1.0000000000e+00"; 10].join(" "))));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = RunLogs::open(&temp.path().join("absent"), &[population("H+sw")])
            .expect_err("open should fail");
        assert_eq!(error.category(), HybridErrorCategory::IoSystemError);
        assert_eq!(error.placeholder(), "IO.RUN_LOG");
    }
}
