//! Timing files: one CSV row per [`TrialRecord`].

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use fabfruit_core::TrialRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::design::Design;
use crate::error::{DesignError, Result};

pub fn write_records<W: Write>(writer: W, records: &[TrialRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<TrialRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    let records = csv.deserialize().collect::<std::result::Result<Vec<TrialRecord>, _>>()?;
    Ok(records)
}

pub fn write_timing(path: &Path, records: &[TrialRecord]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| DesignError::io(path, e))?;
    write_records(file, records)?;
    info!(path = %path.display(), rows = records.len(), "wrote timing");
    Ok(())
}

/// Concatenate timing files in order.
pub fn read_timing_files<P: AsRef<Path>>(paths: &[P]) -> Result<Design> {
    let mut records = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| DesignError::io(path, e))?;
        let rows = read_records(file)?;
        info!(path = %path.display(), rows = rows.len(), "read timing");
        records.extend(rows);
    }
    Ok(Design::from_records(records))
}

/// Shuffle frozen timing files with `seed` and take `runs` of them, so a
/// participant's scanner runs are a reproducible pick from the pool.
pub fn select_runs(mut paths: Vec<PathBuf>, seed: u64, runs: Range<usize>) -> Result<Vec<PathBuf>> {
    if runs.start >= runs.end || runs.end > paths.len() {
        return Err(DesignError::RunRange {
            start: runs.start,
            end: runs.end,
            available: paths.len(),
        });
    }
    paths.sort();
    paths.shuffle(&mut StdRng::seed_from_u64(seed));
    Ok(paths[runs].to_vec())
}

/// CSV files in `dir`, sorted by name.
pub fn timing_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| DesignError::io(dir, e))? {
        let path = entry.map_err(|e| DesignError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// One line per block of space separated onsets, for the scanner analysis.
pub fn onsets_by_block(records: &[TrialRecord]) -> String {
    let mut blocks: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for record in records {
        blocks.entry(record.block).or_default().push(record.onset);
    }
    let mut out = String::new();
    for onsets in blocks.values() {
        let line: Vec<String> = onsets.iter().map(|o| format!("{o:.2}")).collect();
        let _ = writeln!(out, "{}", line.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use fabfruit_core::{Phase, TrialKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::PhasePlan;

    #[test]
    fn timeline_survives_a_round_trip() {
        let mut rng = StdRng::seed_from_u64(1234);
        let design = Design::generate(&PhasePlan::default(), 6, &mut rng).unwrap();

        let mut buf = Vec::new();
        write_records(&mut buf, &design.records).unwrap();
        let back = read_records(buf.as_slice()).unwrap();

        assert_eq!(back.len(), design.records.len());
        for (a, b) in design.records.iter().zip(&back) {
            assert_eq!((a.phase, a.kind, a.block, a.trial, a.deval), (b.phase, b.kind, b.block, b.trial, b.deval));
            assert_eq!((&a.lr1, &a.lr2, a.cor_side), (&b.lr1, &b.lr2, b.cor_side));
            assert!((a.onset - b.onset).abs() < 1e-9);
            assert!((a.dur - b.dur).abs() < 1e-9);
            assert!((a.end - b.end).abs() < 1e-9);
        }
        assert_eq!(Design::from_records(back).devaluations, design.devaluations);
    }

    #[test]
    fn files_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let soa = Design::generate(&PhasePlan::default_only(Phase::Soa).unwrap(), 6, &mut rng).unwrap();
        let od = Design::generate(&PhasePlan::default_only(Phase::Od).unwrap(), 6, &mut rng).unwrap();
        let (a, b) = (dir.path().join("SOA.csv"), dir.path().join("OD.csv"));
        write_timing(&a, &soa.records).unwrap();
        write_timing(&b, &od.records).unwrap();

        let both = read_timing_files(&[a, b]).unwrap();
        assert_eq!(both.records.len(), soa.records.len() + od.records.len());
        assert_eq!(both.phases(), vec![Phase::Soa, Phase::Od]);
        assert_eq!(both.box_count, 6);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_timing_files(&["/no/such/timing.csv"]).unwrap_err();
        assert!(err.to_string().contains("/no/such/timing.csv"));
    }

    #[test]
    fn run_selection_is_seeded() {
        let pool: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("DD/{i}.csv"))).collect();
        let a = select_runs(pool.clone(), 42, 0..2).unwrap();
        let b = select_runs(pool.clone(), 42, 0..2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(select_runs(pool, 42, 6..9).is_err());
    }

    #[test]
    fn onset_lines_per_block() {
        let records = vec![
            TrialRecord::new(Phase::Dd, TrialKind::Grid, 0, None, 3.0, 5.0),
            TrialRecord::new(Phase::Dd, TrialKind::Show, 0, Some(0), 8.0, 1.0),
            TrialRecord::new(Phase::Dd, TrialKind::Show, 1, Some(0), 3.0, 1.0),
        ];
        assert_eq!(onsets_by_block(&records), "3.00 8.00\n3.00\n");
    }
}
