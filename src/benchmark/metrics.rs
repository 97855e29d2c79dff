use nalgebra::DVector;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// the four scalars persisted per matrix, in report order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    pub load_time_seconds: f64,
    pub solve_time_seconds: f64,
    pub relative_error: f64,
    pub peak_memory_megabytes: f64,
}

impl RunMetrics {
    /// fixed serialization order of the metrics file
    pub fn as_report_lines(&self) -> [f64; 4] {
        [
            self.load_time_seconds,
            self.solve_time_seconds,
            self.relative_error,
            self.peak_memory_megabytes,
        ]
    }
}

/// wall-clock timer bounding exactly the given phase
pub fn time_phase<T, F: FnOnce() -> T>(f: F) -> (T, f64) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed().as_secs_f64())
}

/// relative error against the known true solution, Euclidean norm
pub fn relative_error(x_true: &DVector<f64>, x_approx: &DVector<f64>) -> f64 {
    (x_true - x_approx).norm() / x_true.norm()
}

/// queried external resource for process memory. Injected into the pipeline
/// rather than read from ambient global state, so a per-matrix-isolated
/// probe can be substituted where a phase-local measurement is needed.
pub trait MemoryProbe {
    /// peak resident memory observed so far, in megabytes
    fn sample_peak_mb(&mut self) -> f64;
}

/// memory probe backed by the sysinfo crate. Tracks the high-water mark of
/// the hosting process resident set over all samples taken through this
/// probe, so the quality of the "peak" depends on sampling at phase
/// boundaries: the pipeline samples after the load phase and again right
/// after the solve phase, before transient factorization memory can be
/// mistaken for freed-and-forgotten. The value is process-wide and
/// cumulative: when one probe is shared across a batch, the peak reported
/// for the Nth matrix reflects the maximum over all matrices processed so
/// far, not just the current one.
pub struct SysinfoProbe {
    system: System,
    pid: Pid,
    peak_bytes: u64,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        SysinfoProbe {
            system: System::new_all(),
            pid: Pid::from_u32(std::process::id()),
            peak_bytes: 0,
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoProbe {
    fn sample_peak_mb(&mut self) -> f64 {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let rss = self
            .system
            .process(self.pid)
            .map(|p| p.memory())
            .unwrap_or(0);
        self.peak_bytes = self.peak_bytes.max(rss);
        self.peak_bytes as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_phase_bounds_only_its_closure() {
        let (value, elapsed) = time_phase(|| 41 + 1);
        assert_eq!(value, 42);
        assert!(elapsed >= 0.0);
        assert!(elapsed.is_finite());
    }

    #[test]
    fn test_relative_error_exact_solution() {
        let x = DVector::from_element(5, 1.0);
        assert_relative_eq!(relative_error(&x, &x.clone()), 0.0);
    }

    #[test]
    fn test_relative_error_scaled() {
        let x_true = DVector::from_element(4, 1.0);
        let x_approx = DVector::from_element(4, 0.5);
        assert_relative_eq!(relative_error(&x_true, &x_approx), 0.5);
    }

    #[test]
    fn test_sysinfo_probe_positive_and_monotonic() {
        let mut probe = SysinfoProbe::new();
        let first = probe.sample_peak_mb();
        assert!(first > 0.0);
        assert!(first.is_finite());
        // consume some memory between the two samples
        let filler: Vec<f64> = vec![1.5; 4_000_000];
        let second = probe.sample_peak_mb();
        assert!(second >= first);
        drop(filler);
        // high-water mark never decreases
        let third = probe.sample_peak_mb();
        assert!(third >= second);
    }
}
