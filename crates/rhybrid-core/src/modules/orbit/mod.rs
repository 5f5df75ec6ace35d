mod parser;
mod protocol;
mod schedule;

pub use parser::{ORBIT_COLUMNS, OrbitFileError, OrbitPoint, parse_orbit_text, read_orbit_file};
pub use protocol::{
    SPECTRA_INDEX_FILE, SPECTRA_RECORD_WIDTH, SpectraCellRecord, SpectraMatch, cell_contains,
    collect_orbit_points, distribute_orbit_points, gather_spectra_records, match_orbit_cells,
    render_spectra_index, write_spectra_index,
};
pub use schedule::SpectraSchedule;
