//! Probe function bodies.
//!
//! Each probe is a pure function of (thread sample, inputs): the thread id is
//! folded into the numeric result, so two calls with the same input but
//! different executing threads produce distinguishably different outputs.
//! That is the whole detection mechanism — if the host claims multi-threaded
//! recalculation and every result carries the same thread id, the claim is
//! false.
//!
//! The optional delay widens the window in which a thread-safety violation
//! (two logical calls unexpectedly sharing a thread, or a racing registry)
//! would manifest. Tests construct a `ProbeSet` with zero delay.

use std::time::Duration;

use gridprobe_host::ThreadSample;

/// Maximum element count for the vector probe, bounding host marshalling cost.
pub const MAX_VECTOR_LEN: usize = 100;

/// Maximum iterations for the power-sum probe.
pub const MAX_POWER_SUM_ITERATIONS: i64 = 100;

/// Default artificial delay inside the slow probes.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);

/// The probe function set, parameterized by the artificial delay.
#[derive(Debug, Clone)]
pub struct ProbeSet {
    delay: Duration,
}

impl ProbeSet {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }

    /// `number^2 + sin(number) + thread_id`, after the delay.
    pub fn thread_calc(&self, sample: ThreadSample, number: f64) -> f64 {
        self.pause();
        number * number + number.sin() + sample.thread_id as f64
    }

    /// `sqrt(input * 3) + thread_id`, after the delay.
    pub fn scaled_root(&self, sample: ThreadSample, input: f64) -> f64 {
        self.pause();
        (input * 3.0).sqrt() + sample.thread_id as f64
    }

    /// `input * 2 + thread_id`. No delay: the fast comparison target.
    pub fn doubled(&self, sample: ThreadSample, input: f64) -> f64 {
        input * 2.0 + sample.thread_id as f64
    }

    /// Pure addition, no thread identity. The inner target for
    /// registry-mediated nested call tests.
    pub fn add(x: f64, y: f64) -> f64 {
        x + y
    }

    /// Vertical vector of `thread_id + i`, size clamped to 1..=100.
    pub fn thread_vector(&self, sample: ThreadSample, size: f64) -> Vec<f64> {
        let size = (size as i64).clamp(1, MAX_VECTOR_LEN as i64) as usize;
        (0..size).map(|i| sample.thread_id as f64 + i as f64).collect()
    }

    /// Thread/timing report, e.g. `Thread: 3, Time: 1200`.
    pub fn thread_report(&self, sample: ThreadSample) -> String {
        format!("Thread: {}, Time: {}", sample.thread_id, sample.tick)
    }

    /// Inner half of the nested-call report, e.g. `InnerThread:3`.
    pub fn inner_thread_info(sample: ThreadSample) -> String {
        format!("InnerThread:{}", sample.thread_id)
    }

    /// Iterated `(input + i)^1.5` sum with a textual report.
    /// Iterations clamped to 1..=100.
    pub fn power_sum(&self, sample: ThreadSample, input: f64, iterations: i64) -> String {
        let iterations = iterations.clamp(1, MAX_POWER_SUM_ITERATIONS);
        let mut sum = 0.0;
        for i in 0..iterations {
            sum += (input + i as f64).powf(1.5);
        }
        format!(
            "Advanced: Thread {}, Sum: {:.2}, Iterations: {}",
            sample.thread_id, sum, iterations
        )
    }
}

impl Default for ProbeSet {
    fn default() -> Self {
        Self::new()
    }
}
