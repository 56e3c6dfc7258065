use std::{fs::{File, OpenOptions}, path::Path};

use csv::WriterBuilder;

use crate::config::Strategy;
use crate::error::{CompileError, Result};

/// Counters gathered during one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSummary {
    pub strategy: Strategy,
    pub leaves: usize,      // Leaves visited by the path walk
    pub reachable: usize,   // Leaves that produced a rule
    pub unreachable: usize, // Leaves dropped for an empty range
    pub entries: usize,     // Total entries emitted, all tables
    pub range_entries: usize,
    pub code_entries: usize,
    pub distinct_codes: usize,
    pub overlapping_ranges: usize,
}

impl CompileSummary {
    pub fn new(strategy: Strategy) -> Self {
        CompileSummary {
            strategy,
            leaves: 0,
            reachable: 0,
            unreachable: 0,
            entries: 0,
            range_entries: 0,
            code_entries: 0,
            distinct_codes: 0,
            overlapping_ranges: 0,
        }
    }
}

/// Prints a formatted summary table of compilation results to the console.
pub fn print_summary_table(source: &str, results: &[CompileSummary]) {
    println!("\n======== COMPILATION SUMMARY ({}) ========", source);
    println!("Strategy   | Leaves | Unreachable | Entries | Range | Code  | Overlaps");
    println!("-----------|--------|-------------|---------|-------|-------|---------");
    for result in results {
        println!(
            "{:<10} | {:>6} | {:>11} | {:>7} | {:>5} | {:>5} | {:>8}",
            result.strategy.to_string(),
            result.leaves,
            result.unreachable,
            result.entries,
            result.range_entries,
            result.code_entries,
            result.overlapping_ranges
        );
    }
    println!("=======================================================================");
}

const CSV_HEADERS: [&str; 10] = [
    "Source", "Strategy", "Leaves", "Reachable", "Unreachable", "Entries", "RangeEntries", "CodeEntries", "DistinctCodes", "OverlappingRanges",
];

/// Writes only the header row to the specified CSV file. Creates or truncates it.
pub fn write_csv_header(csv_path: &Path) -> Result<()> {
    let file = File::create(csv_path).map_err(|e| CompileError::io(csv_path, e))?;
    let mut wtr = WriterBuilder::new().from_writer(file);
    wtr.write_record(CSV_HEADERS)?;
    wtr.flush().map_err(|e| CompileError::io(csv_path, e))?;
    Ok(())
}

/// Appends one row per summary to an existing CSV file.
pub fn append_results_to_csv(source: &str, results: &[CompileSummary], csv_path: &Path) -> Result<()> {
    let file = OpenOptions::new().append(true).open(csv_path).map_err(|e| CompileError::io(csv_path, e))?;
    let mut wtr = WriterBuilder::new()
        .has_headers(false) // Don't write headers again
        .from_writer(file);

    for result in results {
        let record = vec![
            source.to_string(),
            result.strategy.to_string(),
            result.leaves.to_string(),
            result.reachable.to_string(),
            result.unreachable.to_string(),
            result.entries.to_string(),
            result.range_entries.to_string(),
            result.code_entries.to_string(),
            result.distinct_codes.to_string(),
            result.overlapping_ranges.to_string(),
        ];
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| CompileError::io(csv_path, e))?;
    Ok(())
}

/// Appends `results` to `csv_path`, writing the header first if the file does not exist yet.
pub fn record_results(source: &str, results: &[CompileSummary], csv_path: &Path) -> Result<()> {
    if !csv_path.exists() {
        write_csv_header(csv_path)?;
    }
    append_results_to_csv(source, results, csv_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");

        let mut summary = CompileSummary::new(Strategy::Decomposed);
        summary.leaves = 4;
        summary.reachable = 3;
        summary.unreachable = 1;
        summary.entries = 9;
        record_results("tree.json", &[summary.clone()], &path).unwrap();
        record_results("tree.json", &[summary], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Source,Strategy,Leaves"));
        assert_eq!(lines[1], "tree.json,decomposed,4,3,1,9,0,0,0,0");
        assert_eq!(lines[1], lines[2]);
    }
}
