use crate::domain::HybridError;
use std::fs;
use std::path::{Path, PathBuf};

pub type OrbitPoint = [f64; 3];

pub const ORBIT_COLUMNS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum OrbitFileError {
    #[error("failed to read orbit file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("bad orbit file ({}): no orbit points", path.display())]
    Empty { path: PathBuf },
    #[error("bad orbit file ({}): line {line} has {width} columns, expected {ORBIT_COLUMNS}", path.display())]
    RowWidth {
        path: PathBuf,
        line: usize,
        width: usize,
    },
    #[error("bad orbit file ({}): line {line} has non-numeric value '{token}'", path.display())]
    InvalidNumber {
        path: PathBuf,
        line: usize,
        token: String,
    },
}

impl From<OrbitFileError> for HybridError {
    fn from(error: OrbitFileError) -> Self {
        match &error {
            OrbitFileError::Read { .. } => {
                HybridError::io_system("IO.ORBIT_FILE", error.to_string())
            }
            _ => HybridError::configuration("CONFIG.ORBIT_FILE", error.to_string()),
        }
    }
}

/// Parses whitespace-separated `x y z` rows. Every line counts as a row, so a
/// blank line is a malformed row rather than a separator.
pub fn parse_orbit_text(path: &Path, source: &str) -> Result<Vec<OrbitPoint>, OrbitFileError> {
    let mut points = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut row = Vec::with_capacity(ORBIT_COLUMNS);
        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| OrbitFileError::InvalidNumber {
                    path: path.to_path_buf(),
                    line: line_number,
                    token: token.to_string(),
                })?;
            row.push(value);
        }
        match <[f64; ORBIT_COLUMNS]>::try_from(row.as_slice()) {
            Ok(point) => points.push(point),
            Err(_) => {
                return Err(OrbitFileError::RowWidth {
                    path: path.to_path_buf(),
                    line: line_number,
                    width: row.len(),
                });
            }
        }
    }

    if points.is_empty() {
        return Err(OrbitFileError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(points)
}

pub fn read_orbit_file(path: &Path) -> Result<Vec<OrbitPoint>, OrbitFileError> {
    let source = fs::read_to_string(path).map_err(|source| OrbitFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_orbit_text(path, &source)
}

#[cfg(test)]
mod tests {
    use super::{OrbitFileError, parse_orbit_text, read_orbit_file};
    use crate::domain::{HybridError, HybridErrorCategory};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn rows_of_three_reals_are_accepted() {
        let points = parse_orbit_text(
            Path::new("orbit.txt"),
            "1.0 2.0 3.0\n  -4e6\t5e6 6e6  \n",
        )
        .expect("orbit should parse");
        assert_eq!(points, vec![[1.0, 2.0, 3.0], [-4e6, 5e6, 6e6]]);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let path = Path::new("orbit.txt");
        assert!(matches!(
            parse_orbit_text(path, "1 2 3\n4 5\n"),
            Err(OrbitFileError::RowWidth { line: 2, width: 2, .. })
        ));
        assert!(matches!(
            parse_orbit_text(path, "1 2 3\n\n4 5 6\n"),
            Err(OrbitFileError::RowWidth { line: 2, width: 0, .. })
        ));
        assert!(matches!(
            parse_orbit_text(path, "1 2 x\n"),
            Err(OrbitFileError::InvalidNumber { line: 1, .. })
        ));
        assert!(matches!(
            parse_orbit_text(path, ""),
            Err(OrbitFileError::Empty { .. })
        ));
    }

    #[test]
    fn file_errors_map_to_categories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = read_orbit_file(&temp.path().join("missing.txt"))
            .expect_err("missing file should fail");
        assert_eq!(
            HybridError::from(missing).category(),
            HybridErrorCategory::IoSystemError
        );

        let bad = temp.path().join("bad.txt");
        fs::write(&bad, "1 2 3 4\n").expect("fixture should be written");
        let error = HybridError::from(read_orbit_file(&bad).expect_err("wide row should fail"));
        assert_eq!(error.category(), HybridErrorCategory::ConfigurationError);
        assert!(error.message().contains("bad.txt"));
    }
}
