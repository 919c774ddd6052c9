use std::fmt;
use std::time::{Duration, Instant};

/// Records named timing measurements for driver phases (load, check, analyze, apply).
#[derive(Default)]
pub struct Profiler {
    phases: Vec<PhaseTiming>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_phase<F, T>(&mut self, name: impl Into<String>, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let name = name.into();
        let start = Instant::now();
        let output = f();
        let duration = start.elapsed();
        self.phases.push(PhaseTiming { name, duration });
        output
    }

    pub fn push_phase(&mut self, name: impl Into<String>, duration: Duration) {
        self.phases.push(PhaseTiming {
            name: name.into(),
            duration,
        });
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|phase| phase.duration).sum()
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phase in &self.phases {
            writeln!(
                f,
                "{:<12} {:>9.3}ms",
                phase.name,
                phase.duration.as_secs_f64() * 1000.0
            )?;
        }
        write!(f, "{:<12} {:>9.3}ms", "total", self.total().as_secs_f64() * 1000.0)
    }
}

#[derive(Clone, Debug)]
pub struct PhaseTiming {
    pub name: String,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_phase_returns_output() {
        let mut profiler = Profiler::new();
        let value = profiler.record_phase("load", || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(profiler.phases().len(), 1);
        assert_eq!(profiler.phases()[0].name, "load");
    }

    #[test]
    fn test_display_lists_total() {
        let mut profiler = Profiler::new();
        profiler.push_phase("check", Duration::from_millis(2));
        let rendered = profiler.to_string();
        assert!(rendered.contains("check"));
        assert!(rendered.contains("total"));
    }
}
