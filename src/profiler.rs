use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Where a script sample was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryPoint {
    WorldLoaded,
    Tick,
    Callback,
}

impl EntryPoint {
    pub fn label(self) -> &'static str {
        match self {
            EntryPoint::WorldLoaded => "WorldLoaded",
            EntryPoint::Tick => "Tick",
            EntryPoint::Callback => "callback",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleSummary {
    pub entry: EntryPoint,
    pub calls: u64,
    pub failures: u64,
    pub last_ms: f32,
    pub average_ms: f32,
    pub max_ms: f32,
}

#[derive(Default)]
struct EntryTiming {
    calls: u64,
    failures: u64,
    last: Duration,
    total: Duration,
    max: Duration,
}

/// Wall-clock time spent inside script code, per entry point. Timings are
/// diagnostics only and never feed back into the simulation.
#[derive(Default)]
pub struct ScriptProfiler {
    timings: BTreeMap<EntryPoint, EntryTiming>,
}

impl ScriptProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Times `call` without holding the profiler, so script code may re-enter
    /// the host while it runs.
    pub fn measure<T, E>(cell: &RefCell<Self>, entry: EntryPoint, call: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let start = Instant::now();
        let result = call();
        cell.borrow_mut().record(entry, start.elapsed(), result.is_err());
        result
    }

    pub fn record(&mut self, entry: EntryPoint, elapsed: Duration, failed: bool) {
        let timing = self.timings.entry(entry).or_default();
        timing.calls += 1;
        timing.failures += u64::from(failed);
        timing.last = elapsed;
        timing.total += elapsed;
        timing.max = timing.max.max(elapsed);
    }

    pub fn calls(&self, entry: EntryPoint) -> u64 {
        self.timings.get(&entry).map_or(0, |timing| timing.calls)
    }

    /// One summary per sampled entry point, in `EntryPoint` order.
    pub fn summaries(&self) -> Vec<SampleSummary> {
        self.timings
            .iter()
            .map(|(&entry, timing)| SampleSummary {
                entry,
                calls: timing.calls,
                failures: timing.failures,
                last_ms: millis(timing.last),
                average_ms: millis(timing.total) / timing.calls.max(1) as f32,
                max_ms: millis(timing.max),
            })
            .collect()
    }
}

fn millis(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_counts_calls_and_failures() {
        let profiler = RefCell::new(ScriptProfiler::new());
        let ok: Result<u8, &str> = ScriptProfiler::measure(&profiler, EntryPoint::Tick, || Ok(1));
        assert_eq!(ok, Ok(1));
        let failed: Result<u8, &str> = ScriptProfiler::measure(&profiler, EntryPoint::Tick, || Err("boom"));
        assert!(failed.is_err());
        let _ = ScriptProfiler::measure::<(), ()>(&profiler, EntryPoint::WorldLoaded, || Ok(()));

        let profiler = profiler.into_inner();
        assert_eq!(profiler.calls(EntryPoint::Tick), 2);
        assert_eq!(profiler.calls(EntryPoint::Callback), 0);
        let summaries = profiler.summaries();
        assert_eq!(summaries.iter().map(|s| s.entry).collect::<Vec<_>>(), vec![EntryPoint::WorldLoaded, EntryPoint::Tick]);
        assert_eq!(summaries[1].failures, 1);
    }

    #[test]
    fn averages_divide_total_time_by_calls() {
        let mut profiler = ScriptProfiler::new();
        profiler.record(EntryPoint::Callback, Duration::from_millis(2), false);
        profiler.record(EntryPoint::Callback, Duration::from_millis(6), false);
        let summary = profiler.summaries()[0];
        assert_eq!(summary.calls, 2);
        assert!((summary.average_ms - 4.0).abs() < 1e-3);
        assert!((summary.max_ms - 6.0).abs() < 1e-3);
        assert!((summary.last_ms - 6.0).abs() < 1e-3);
    }
}
