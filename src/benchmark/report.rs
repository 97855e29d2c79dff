use crate::benchmark::metrics::RunMetrics;
use csv::Writer;
use nalgebra::DVector;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// one row of the end-of-batch summary, also exportable as CSV
#[derive(Debug, Clone)]
pub struct SummaryRecord {
    pub matrix: String,
    pub status: String,
    pub metrics: Option<RunMetrics>,
}

/// path of the solution file derived from the metrics path:
/// `GT01R.txt` -> `GT01R_approx.txt`
pub fn approx_solution_path(metrics_path: &Path) -> PathBuf {
    let stem = metrics_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match metrics_path.extension() {
        Some(ext) => format!("{}_approx.{}", stem, ext.to_string_lossy()),
        None => format!("{}_approx", stem),
    };
    metrics_path.with_file_name(file_name)
}

/// write the four metrics, one value per line, in the fixed order
/// [load_time, solve_time, relative_error, peak_memory]. Overwrites.
pub fn save_metrics_to_file(metrics: &RunMetrics, path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    for value in metrics.as_report_lines() {
        writeln!(file, "{}", value)?;
    }
    Ok(())
}

/// write the approximate solution vector, one value per line. Overwrites.
pub fn save_solution_to_file(x_approx: &DVector<f64>, path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    for value in x_approx.iter() {
        writeln!(file, "{}", value)?;
    }
    Ok(())
}

/// persist both report files of one run: the metrics file at `metrics_path`
/// and the solution vector at the derived `_approx` path
pub fn write_report(
    metrics: &RunMetrics,
    x_approx: &DVector<f64>,
    metrics_path: &Path,
) -> io::Result<()> {
    save_metrics_to_file(metrics, metrics_path)?;
    save_solution_to_file(x_approx, &approx_solution_path(metrics_path))?;
    Ok(())
}

/// optional per-batch CSV summary with one row per matrix
pub fn save_summary_to_csv(records: &[SummaryRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = Writer::from_writer(file);
    writer.write_record([
        "matrix",
        "status",
        "load_time_s",
        "solve_time_s",
        "relative_error",
        "peak_memory_mb",
    ])?;
    for record in records {
        let row = match &record.metrics {
            Some(m) => vec![
                record.matrix.clone(),
                record.status.clone(),
                m.load_time_seconds.to_string(),
                m.solve_time_seconds.to_string(),
                m.relative_error.to_string(),
                m.peak_memory_megabytes.to_string(),
            ],
            None => vec![
                record.matrix.clone(),
                record.status.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
