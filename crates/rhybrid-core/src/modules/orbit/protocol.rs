//! Distributed orbit-to-cell matching: collect on the coordinator,
//! distribute to every rank, match local cells, gather the matches back.

use super::parser::{ORBIT_COLUMNS, OrbitPoint, read_orbit_file};
use crate::domain::{GlobalCellId, HybridError, HybridResult, Vec3};
use crate::grid::ParGrid;
use crate::modules::geometry::cell_center;
use crate::modules::serialization::{format_scientific, write_text_artifact};
use crate::parallel::Communicator;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const SPECTRA_INDEX_FILE: &str = "spectra_cell_indices.dat";
pub const SPECTRA_RECORD_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectraCellRecord {
    pub global_id: GlobalCellId,
    pub center: Vec3,
}

impl SpectraCellRecord {
    pub fn to_row(&self) -> [f64; SPECTRA_RECORD_WIDTH] {
        [
            self.global_id as f64,
            self.center[0],
            self.center[1],
            self.center[2],
        ]
    }

    pub fn from_row(row: &[f64]) -> Option<Self> {
        let [id, x, y, z] = <[f64; SPECTRA_RECORD_WIDTH]>::try_from(row).ok()?;
        Some(Self {
            global_id: id as GlobalCellId,
            center: [x, y, z],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectraMatch {
    pub block_flags: Vec<bool>,
    pub records: Vec<SpectraCellRecord>,
}

/// Reads and concatenates every orbit file. Coordinator only.
pub fn collect_orbit_points(files: &[PathBuf]) -> HybridResult<Vec<OrbitPoint>> {
    let mut points = Vec::new();
    for file in files {
        info!("cell spectra: reading a spacecraft orbit file: {}", file.display());
        points.extend(read_orbit_file(file)?);
    }
    info!("cell spectra: total of {} orbit points read", points.len());
    Ok(points)
}

/// Broadcasts the coordinator's points as a `[rows, columns]` header followed
/// by one broadcast per row.
///
/// A coordinator that failed to collect, or has nothing to send, broadcasts
/// a `[0, 0]` header so every rank leaves the collective with an error.
pub fn distribute_orbit_points<C: Communicator + ?Sized>(
    comm: &C,
    collected: HybridResult<Vec<OrbitPoint>>,
) -> HybridResult<Vec<OrbitPoint>> {
    if comm.is_root() {
        let points = match collected {
            Ok(points) if !points.is_empty() => points,
            Ok(_) => {
                comm.broadcast_counts(&mut vec![0, 0])?;
                return Err(HybridError::protocol(
                    "PROTOCOL.ORBIT_DISTRIBUTE",
                    "cell spectra: failed to distribute orbit coordinates to all ranks (no orbit points)",
                ));
            }
            Err(collect_error) => {
                error!("{}", collect_error.log_line());
                comm.broadcast_counts(&mut vec![0, 0])?;
                return Err(collect_error);
            }
        };

        comm.broadcast_counts(&mut vec![points.len() as u64, ORBIT_COLUMNS as u64])?;
        for point in &points {
            comm.broadcast_reals(&mut point.to_vec())?;
        }
        return Ok(points);
    }

    let mut header = Vec::new();
    comm.broadcast_counts(&mut header)?;
    let (rows, columns) = match header.as_slice() {
        [rows, columns] => (*rows, *columns as usize),
        _ => {
            return Err(HybridError::protocol(
                "PROTOCOL.ORBIT_DISTRIBUTE",
                format!("malformed orbit header of length {}", header.len()),
            ));
        }
    };
    if rows == 0 {
        return Err(HybridError::protocol(
            "PROTOCOL.ORBIT_DISTRIBUTE",
            "cell spectra: coordinator aborted orbit coordinate distribution",
        ));
    }
    if columns != ORBIT_COLUMNS {
        return Err(HybridError::protocol(
            "PROTOCOL.ORBIT_DISTRIBUTE",
            format!("orbit rows have {columns} columns, expected {ORBIT_COLUMNS}"),
        ));
    }

    let mut points = Vec::with_capacity(rows as usize);
    for _ in 0..rows {
        let mut row = Vec::new();
        comm.broadcast_reals(&mut row)?;
        let point = <[f64; ORBIT_COLUMNS]>::try_from(row.as_slice()).map_err(|_| {
            HybridError::protocol(
                "PROTOCOL.ORBIT_DISTRIBUTE",
                format!("received orbit row with {} values", row.len()),
            )
        })?;
        points.push(point);
    }
    Ok(points)
}

/// Whether `point` lies in cell `cell` of the block at `block_origin`.
///
/// Both bounds use `origin + i * dx`, so neighbouring cells of a block compute
/// their shared face from the same expression and the box stays half-open.
pub fn cell_contains(block_origin: Vec3, cell: [usize; 3], dx: f64, point: OrbitPoint) -> bool {
    (0..3).all(|axis| {
        let min = block_origin[axis] + cell[axis] as f64 * dx;
        let max = block_origin[axis] + (cell[axis] + 1) as f64 * dx;
        point[axis] >= min && point[axis] < max
    })
}

/// Scans each local cell once; the first contained point qualifies the cell.
pub fn match_orbit_cells<G: ParGrid + ?Sized>(
    grid: &G,
    dx: f64,
    points: &[OrbitPoint],
) -> SpectraMatch {
    let layout = grid.block_layout();
    let mut result = SpectraMatch {
        block_flags: vec![false; grid.local_cell_count()],
        records: Vec::new(),
    };

    for block in 0..grid.local_cell_count() {
        let origin = grid.block_origin(block);
        for cell in layout.cells() {
            if points
                .iter()
                .any(|point| cell_contains(origin, cell, dx, *point))
            {
                result.block_flags[block] = true;
                result.records.push(SpectraCellRecord {
                    global_id: grid.global_id(block),
                    center: cell_center(origin, cell, dx),
                });
            }
        }
    }
    result
}

/// Gathers all records at the coordinator, sorted by global id.
///
/// The reduction completes before any record moves. The coordinator keeps
/// receiving until the expected count is reached and only then reports a
/// malformed record, so no sender is left blocked.
pub fn gather_spectra_records<C: Communicator + ?Sized>(
    comm: &C,
    local: Vec<SpectraCellRecord>,
) -> HybridResult<Option<Vec<SpectraCellRecord>>> {
    let local_count = local.len() as u64;
    let total = comm.reduce_sum(local_count)?;
    comm.barrier()?;

    if !comm.is_root() {
        for record in &local {
            comm.send(comm.root(), &record.to_row())?;
        }
        comm.barrier()?;
        return Ok(None);
    }

    let total = total.unwrap_or(local_count);
    let expected = total.saturating_sub(local_count);
    let mut records = local;
    let mut malformed: Option<(usize, usize)> = None;
    for _ in 0..expected {
        let (source, row) = comm.receive_any()?;
        match SpectraCellRecord::from_row(&row) {
            Some(record) => records.push(record),
            None => {
                malformed.get_or_insert((source, row.len()));
            }
        }
    }
    comm.barrier()?;

    if let Some((source, width)) = malformed {
        let failure = HybridError::protocol(
            "PROTOCOL.SPECTRA_GATHER",
            format!(
                "cell spectra: error with cell indices and coordinates row from rank {source} ({width} values, expected {SPECTRA_RECORD_WIDTH})"
            ),
        );
        error!("{}", failure.log_line());
        return Err(failure);
    }

    records.sort_by_key(|record| record.global_id);
    info!("cell spectra: recording ion spectra in {total} cells");
    Ok(Some(records))
}

pub fn render_spectra_index(records: &[SpectraCellRecord]) -> String {
    let mut content = String::from("% globalid x y z\n");
    for record in records {
        content.push_str(&format!(
            "{} {} {} {}\n",
            record.global_id,
            format_scientific(record.center[0], 3, false),
            format_scientific(record.center[1], 3, false),
            format_scientific(record.center[2], 3, false),
        ));
    }
    content
}

pub fn write_spectra_index(directory: &Path, records: &[SpectraCellRecord]) -> HybridResult<PathBuf> {
    let path = directory.join(SPECTRA_INDEX_FILE);
    write_text_artifact(&path, &render_spectra_index(records)).map_err(|source| {
        HybridError::io_system(
            "IO.SPECTRA_INDEX",
            format!("failed to write '{}': {source}", path.display()),
        )
    })?;
    Ok(path)
}
