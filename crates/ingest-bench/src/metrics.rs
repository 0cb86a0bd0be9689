//! Per-batch process resource sampling.

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error as ThisError;

/// Process resource usage at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricSample {
    /// Resident set size.
    pub memory_bytes: u64,
    /// CPU utilization since the previous sample, in percent of one core.
    pub cpu_percent: f64,
}

#[derive(Debug, ThisError)]
pub enum ProbeError {
    #[error("process metrics are not supported on this platform")]
    Unsupported,

    #[error("failed to read process metrics: {0}")]
    Process(String),
}

/// Source of process resource samples.
pub trait ResourceProbe {
    fn sample(&mut self) -> Result<MetricSample, ProbeError>;

    /// Best-effort resident memory reading used when [`Self::sample`] fails.
    fn fallback_memory_bytes(&mut self) -> u64;
}

/// Samples the current process through `psutil`, falling back to `statm`
/// for memory.
pub struct ProcessProbe {
    #[cfg(any(target_os = "macos", target_os = "linux"))]
    process: Option<psutil::process::Process>,
}

impl ProcessProbe {
    pub fn new() -> Self {
        #[cfg(any(target_os = "macos", target_os = "linux"))]
        {
            let process = psutil::process::Process::current()
                .map_err(|e| warn!("unable to inspect the current process, metrics will use fallback values: {e}"))
                .ok();
            Self { process }
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self {}
        }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for ProcessProbe {
    #[cfg(any(target_os = "macos", target_os = "linux"))]
    fn sample(&mut self) -> Result<MetricSample, ProbeError> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| ProbeError::Process("no handle to the current process".to_string()))?;

        let memory_bytes = process
            .memory_info()
            .map_err(|e| ProbeError::Process(e.to_string()))?
            .rss();
        let cpu_percent = process
            .cpu_percent()
            .map_err(|e| ProbeError::Process(e.to_string()))?;

        Ok(MetricSample {
            memory_bytes,
            cpu_percent: cpu_percent as f64,
        })
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn sample(&mut self) -> Result<MetricSample, ProbeError> {
        Err(ProbeError::Unsupported)
    }

    fn fallback_memory_bytes(&mut self) -> u64 {
        memory_stats::memory_stats()
            .map(|stats| stats.physical_mem as u64)
            .unwrap_or(0)
    }
}

/// Memory and CPU series, one entry per flushed batch, together with their
/// running maxima.
///
/// All four series always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsRecorder {
    memory_usage: Vec<u64>,
    memory_spikes: Vec<u64>,
    cpu_usage: Vec<f64>,
    cpu_spikes: Vec<f64>,
    /// Samples that were replaced by fallback values.
    #[serde(skip)]
    fallbacks: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes one sample from `probe` and appends it.
    ///
    /// A failed sample is replaced by the probe's fallback memory reading and
    /// 0% CPU. Only the first failure of a run is logged at `warn`.
    pub fn record<P: ResourceProbe + ?Sized>(&mut self, probe: &mut P) -> MetricSample {
        let sample = match probe.sample() {
            Ok(sample) => sample,
            Err(e) => {
                if self.fallbacks == 0 {
                    warn!("{e}; using fallback metrics");
                } else {
                    debug!("{e}; using fallback metrics");
                }
                self.fallbacks += 1;
                MetricSample {
                    memory_bytes: probe.fallback_memory_bytes(),
                    cpu_percent: 0.0,
                }
            }
        };
        self.push(sample);
        sample
    }

    pub fn push(&mut self, sample: MetricSample) {
        let memory_spike = self
            .memory_spikes
            .last()
            .copied()
            .unwrap_or(0)
            .max(sample.memory_bytes);
        let cpu_spike = self
            .cpu_spikes
            .last()
            .copied()
            .unwrap_or(0.0)
            .max(sample.cpu_percent);

        self.memory_usage.push(sample.memory_bytes);
        self.memory_spikes.push(memory_spike);
        self.cpu_usage.push(sample.cpu_percent);
        self.cpu_spikes.push(cpu_spike);
    }

    pub fn len(&self) -> usize {
        self.memory_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory_usage.is_empty()
    }

    pub fn memory_usage(&self) -> &[u64] {
        &self.memory_usage
    }

    pub fn memory_spikes(&self) -> &[u64] {
        &self.memory_spikes
    }

    pub fn cpu_usage(&self) -> &[f64] {
        &self.cpu_usage
    }

    pub fn cpu_spikes(&self) -> &[f64] {
        &self.cpu_spikes
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub fn peak_memory_bytes(&self) -> u64 {
        self.memory_spikes.last().copied().unwrap_or(0)
    }

    pub fn peak_cpu_percent(&self) -> f64 {
        self.cpu_spikes.last().copied().unwrap_or(0.0)
    }
}
