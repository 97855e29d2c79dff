use crate::benchmark::metrics::{self, MemoryProbe, RunMetrics, time_phase};
use crate::benchmark::reference_problem::build_reference_problem;
use crate::benchmark::report::{self, SummaryRecord};
use crate::benchmark::solver_selector::{SolveError, SolveStrategy, solve_sparse_system};
use crate::matrix_io::{LoadError, load_matrix_market};
use log::{info, warn};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// one (matrix source, report destination) pair of the batch
#[derive(Debug, Clone)]
pub struct MatrixTask {
    pub name: String,
    pub matrix_path: PathBuf,
    pub report_path: PathBuf,
}

impl MatrixTask {
    /// path convention of the matrix suites: `<dir>/<Name>/<Name>.mtx`,
    /// report goes to `<output_dir>/<Name>.txt`
    pub fn from_dirs(name: &str, matrices_dir: &Path, output_dir: &Path) -> Self {
        MatrixTask {
            name: name.to_string(),
            matrix_path: matrices_dir.join(name).join(format!("{}.mtx", name)),
            report_path: output_dir.join(format!("{}.txt", name)),
        }
    }
}

/// the whole batch: which matrices to run and whether the preferred
/// Cholesky attempt is made at all. The flag replaces the original
/// with-/without-Cholesky script duplication.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub tasks: Vec<MatrixTask>,
    pub attempt_cholesky: bool,
}

impl BatchConfig {
    pub fn from_dirs(names: &[String], matrices_dir: &Path, output_dir: &Path) -> Self {
        let tasks = names
            .iter()
            .map(|name| MatrixTask::from_dirs(name, matrices_dir, output_dir))
            .collect();
        BatchConfig {
            tasks,
            attempt_cholesky: true,
        }
    }

    /// read a batch description from a TOML file with keys `matrices_dir`,
    /// `output_dir`, `matrices = ["Name", ...]` and optional
    /// `attempt_cholesky`
    pub fn from_toml_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let table: toml::Table = text.parse()?;

        let matrices_dir = table
            .get("matrices_dir")
            .and_then(|v| v.as_str())
            .ok_or("batch config: missing string key 'matrices_dir'")?;
        let output_dir = table
            .get("output_dir")
            .and_then(|v| v.as_str())
            .ok_or("batch config: missing string key 'output_dir'")?;
        let matrices = table
            .get("matrices")
            .and_then(|v| v.as_array())
            .ok_or("batch config: missing array key 'matrices'")?;
        let names: Vec<String> = matrices
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.to_string())
                    .ok_or("batch config: 'matrices' entries must be strings")
            })
            .collect::<Result<_, _>>()?;
        let attempt_cholesky = table
            .get("attempt_cholesky")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let mut config = BatchConfig::from_dirs(
            &names,
            Path::new(matrices_dir),
            Path::new(output_dir),
        );
        config.attempt_cholesky = attempt_cholesky;
        Ok(config)
    }
}

/// matrix-scoped failures. Caught at the batch boundary - a failure on one
/// matrix never aborts the rest of the batch.
#[derive(Debug)]
pub enum BenchError {
    Load(LoadError),
    Solve(SolveError),
    Write(std::io::Error),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Load(e) => write!(f, "load failed: {}", e),
            BenchError::Solve(e) => write!(f, "solve failed: {}", e),
            BenchError::Write(e) => write!(f, "report write failed: {}", e),
        }
    }
}

impl Error for BenchError {}

impl From<LoadError> for BenchError {
    fn from(e: LoadError) -> Self {
        BenchError::Load(e)
    }
}

impl From<SolveError> for BenchError {
    fn from(e: SolveError) -> Self {
        BenchError::Solve(e)
    }
}

impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        BenchError::Write(e)
    }
}

/// what a successful pipeline run produced, beyond the files on disk
#[derive(Debug, Clone)]
pub struct RunReport {
    pub metrics: RunMetrics,
    pub strategy: SolveStrategy,
}

/// result of one matrix of the batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<RunReport, BenchError>,
}

/// run the full pipeline for one matrix: load, build the reference problem,
/// solve with fallback, collect metrics, persist the report
pub fn run_single(
    task: &MatrixTask,
    attempt_cholesky: bool,
    probe: &mut dyn MemoryProbe,
) -> Result<RunReport, BenchError> {
    let (loaded, load_time_seconds) = time_phase(|| load_matrix_market(&task.matrix_path));
    let a = loaded?;
    // capture the load-phase footprint before the solve allocates and frees
    // its own working memory
    probe.sample_peak_mb();

    let problem = build_reference_problem(&a);

    let (solved, solve_time_seconds) =
        time_phase(|| solve_sparse_system(&a, &problem.b, attempt_cholesky));
    let outcome = solved?;

    // the reported value is the probe's process-wide high-water mark over
    // every sample taken so far, not a phase-local measurement
    let peak_memory_megabytes = probe.sample_peak_mb();
    let relative_error = metrics::relative_error(&problem.x_true, &outcome.x_approx);

    let run_metrics = RunMetrics {
        load_time_seconds,
        solve_time_seconds,
        relative_error,
        peak_memory_megabytes,
    };
    report::write_report(&run_metrics, &outcome.x_approx, &task.report_path)?;
    info!(
        "{}: strategy = {}, load = {:.4} s, solve = {:.4} s, rel. error = {:.3e}, peak memory = {:.1} MB",
        task.name,
        outcome.strategy,
        load_time_seconds,
        solve_time_seconds,
        relative_error,
        peak_memory_megabytes
    );
    Ok(RunReport {
        metrics: run_metrics,
        strategy: outcome.strategy,
    })
}

/// run every task of the batch sequentially. Per-matrix failures are logged
/// and recorded, never propagated.
pub fn run_batch(config: &BatchConfig, probe: &mut dyn MemoryProbe) -> Vec<BatchOutcome> {
    let mut outcomes = Vec::with_capacity(config.tasks.len());
    for task in &config.tasks {
        info!("processing matrix {}", task.name);
        let result = run_single(task, config.attempt_cholesky, probe);
        if let Err(e) = &result {
            warn!("matrix {} failed: {}", task.name, e);
        }
        outcomes.push(BatchOutcome {
            name: task.name.clone(),
            result,
        });
    }
    outcomes
}

pub fn to_summary_records(outcomes: &[BatchOutcome]) -> Vec<SummaryRecord> {
    outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(report) => SummaryRecord {
                matrix: outcome.name.clone(),
                status: format!("ok ({})", report.strategy),
                metrics: Some(report.metrics),
            },
            Err(e) => SummaryRecord {
                matrix: outcome.name.clone(),
                status: e.to_string(),
                metrics: None,
            },
        })
        .collect()
}

#[derive(Tabled)]
struct SummaryRow {
    matrix: String,
    status: String,
    load_s: String,
    solve_s: String,
    rel_error: String,
    peak_mb: String,
}

/// pretty-print the success/failure summary of a finished batch
pub fn summary_table(outcomes: &[BatchOutcome]) -> String {
    let rows: Vec<SummaryRow> = to_summary_records(outcomes)
        .into_iter()
        .map(|record| match record.metrics {
            Some(m) => SummaryRow {
                matrix: record.matrix,
                status: record.status,
                load_s: format!("{:.4}", m.load_time_seconds),
                solve_s: format!("{:.4}", m.solve_time_seconds),
                rel_error: format!("{:.3e}", m.relative_error),
                peak_mb: format!("{:.1}", m.peak_memory_megabytes),
            },
            None => SummaryRow {
                matrix: record.matrix,
                status: record.status,
                load_s: String::new(),
                solve_s: String::new(),
                rel_error: String::new(),
                peak_mb: String::new(),
            },
        })
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    struct FixedProbe(f64);
    impl MemoryProbe for FixedProbe {
        fn sample_peak_mb(&mut self) -> f64 {
            self.0
        }
    }

    struct CountingProbe {
        value: f64,
        samples: usize,
    }
    impl MemoryProbe for CountingProbe {
        fn sample_peak_mb(&mut self) -> f64 {
            self.samples += 1;
            self.value
        }
    }

    fn write_identity_mtx(dir: &Path, name: &str) -> PathBuf {
        let matrix_dir = dir.join(name);
        fs::create_dir_all(&matrix_dir).unwrap();
        let path = matrix_dir.join(format!("{}.mtx", name));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "%%MatrixMarket matrix coordinate real general").unwrap();
        writeln!(file, "3 3 3").unwrap();
        writeln!(file, "1 1 1.0").unwrap();
        writeln!(file, "2 2 1.0").unwrap();
        writeln!(file, "3 3 1.0").unwrap();
        path
    }

    #[test]
    fn test_task_path_convention() {
        let task = MatrixTask::from_dirs("GT01R", Path::new("/data"), Path::new("/out"));
        assert_eq!(task.matrix_path, PathBuf::from("/data/GT01R/GT01R.mtx"));
        assert_eq!(task.report_path, PathBuf::from("/out/GT01R.txt"));
    }

    #[test]
    fn test_run_single_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_mtx(dir.path(), "eye3");
        let task = MatrixTask::from_dirs("eye3", dir.path(), dir.path());
        let mut probe = FixedProbe(12.5);

        let report = run_single(&task, true, &mut probe).unwrap();
        assert_eq!(report.strategy, SolveStrategy::Cholesky);
        assert!(report.metrics.relative_error < 1e-12);
        assert!(report.metrics.load_time_seconds >= 0.0);
        assert!(report.metrics.solve_time_seconds >= 0.0);
        assert_eq!(report.metrics.peak_memory_megabytes, 12.5);
        assert!(task.report_path.exists());
        assert!(dir.path().join("eye3_approx.txt").exists());

        // identity with b = A*1: the solution file holds n lines of ones
        let text = fs::read_to_string(dir.path().join("eye3_approx.txt")).unwrap();
        let parsed: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_run_single_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_mtx(dir.path(), "eye3");
        let task = MatrixTask::from_dirs("eye3", dir.path(), dir.path());
        let mut probe = FixedProbe(1.0);

        let first = run_single(&task, true, &mut probe).unwrap();
        let second = run_single(&task, true, &mut probe).unwrap();
        assert_eq!(
            first.metrics.relative_error,
            second.metrics.relative_error
        );
    }

    fn write_singular_mtx(dir: &Path, name: &str) {
        let matrix_dir = dir.join(name);
        fs::create_dir_all(&matrix_dir).unwrap();
        let mut file = fs::File::create(matrix_dir.join(format!("{}.mtx", name))).unwrap();
        writeln!(file, "%%MatrixMarket matrix coordinate real general").unwrap();
        writeln!(file, "2 2 4").unwrap();
        writeln!(file, "1 1 1.0").unwrap();
        writeln!(file, "1 2 1.0").unwrap();
        writeln!(file, "2 1 1.0").unwrap();
        writeln!(file, "2 2 1.0").unwrap();
    }

    #[test]
    fn test_probe_sampled_after_load_and_solve() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_mtx(dir.path(), "eye3");
        let task = MatrixTask::from_dirs("eye3", dir.path(), dir.path());
        let mut probe = CountingProbe {
            value: 8.0,
            samples: 0,
        };

        run_single(&task, true, &mut probe).unwrap();
        // once after the load phase, once after the solve phase
        assert_eq!(probe.samples, 2);
    }

    #[test]
    fn test_singular_matrix_fails_without_aborting_batch() {
        // rank-deficient [[1,1],[1,1]]: the solver must report a failure
        // for this matrix only, and the following matrix must still run
        let dir = tempfile::tempdir().unwrap();
        write_singular_mtx(dir.path(), "rank1");
        write_identity_mtx(dir.path(), "eye3");
        let config = BatchConfig::from_dirs(
            &["rank1".to_string(), "eye3".to_string()],
            dir.path(),
            dir.path(),
        );
        let mut probe = FixedProbe(1.0);

        let outcomes = run_batch(&config, &mut probe);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(BenchError::Solve(SolveError::SingularMatrix(_)))
        ));
        assert!(outcomes[1].result.is_ok());
        // the failed matrix left no report files behind
        assert!(!dir.path().join("rank1.txt").exists());
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_mtx(dir.path(), "eye3");
        let config = BatchConfig::from_dirs(
            &["missing".to_string(), "eye3".to_string()],
            dir.path(),
            dir.path(),
        );
        let mut probe = FixedProbe(1.0);

        let outcomes = run_batch(&config, &mut probe);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(BenchError::Load(LoadError::Read(_)))
        ));
        assert!(outcomes[1].result.is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(
            &path,
            r#"
matrices_dir = "/data/suite"
output_dir = "/data/results"
attempt_cholesky = false
matrices = ["GT01R", "ns3Da"]
"#,
        )
        .unwrap();

        let config = BatchConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.tasks.len(), 2);
        assert!(!config.attempt_cholesky);
        assert_eq!(config.tasks[0].name, "GT01R");
        assert_eq!(
            config.tasks[1].matrix_path,
            PathBuf::from("/data/suite/ns3Da/ns3Da.mtx")
        );
    }

    #[test]
    fn test_config_missing_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(&path, "output_dir = \"/out\"\n").unwrap();
        assert!(BatchConfig::from_toml_file(&path).is_err());
    }

    #[test]
    fn test_summary_table_lists_every_matrix() {
        let outcomes = vec![
            BatchOutcome {
                name: "good".to_string(),
                result: Ok(RunReport {
                    metrics: RunMetrics {
                        load_time_seconds: 0.1,
                        solve_time_seconds: 0.2,
                        relative_error: 1e-12,
                        peak_memory_megabytes: 42.0,
                    },
                    strategy: SolveStrategy::GeneralElimination,
                }),
            },
            BatchOutcome {
                name: "bad".to_string(),
                result: Err(BenchError::Solve(SolveError::SingularMatrix(
                    "zero pivot".to_string(),
                ))),
            },
        ];
        let table = summary_table(&outcomes);
        assert!(table.contains("good"));
        assert!(table.contains("bad"));
        assert!(table.contains("singular"));
    }
}
