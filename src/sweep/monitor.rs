use anyhow::{Context, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Host resource usage of one prover invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    /// Wall-clock time from launch to exit, in milliseconds
    pub wall_time_ms: f64,
    /// Exit code, absent when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Largest resident set seen across the process tree, in bytes
    pub peak_memory_bytes: u64,
    /// Largest virtual memory seen across the process tree, in bytes
    pub peak_virtual_memory_bytes: u64,
    /// Cumulative bytes read from disk
    pub disk_read_bytes: u64,
    /// Cumulative bytes written to disk
    pub disk_written_bytes: u64,
    /// Number of samples the peaks are taken from
    pub samples: usize,
}

impl ResourceReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json_data =
            serde_json::to_string_pretty(self).context("Failed to serialize resource usage")?;
        std::fs::write(path, json_data)
            .with_context(|| format!("Failed to write resource usage to {path:?}"))?;
        Ok(())
    }
}

/// How often the sampling loop checks whether the prover has exited
const POLL_TICK: Duration = Duration::from_millis(1);

/// Blocks on a child process while sampling its process tree
pub struct ResourceMonitor {
    sample_interval: Duration,
}

impl ResourceMonitor {
    pub fn new(sample_interval: Duration) -> Self {
        Self { sample_interval }
    }

    /// Wait for `child` to exit, returning its status and resource usage.
    ///
    /// A dedicated thread blocks in `wait` and stamps the exit time, so the
    /// wall time is independent of the sampling interval.
    pub fn watch(&self, mut child: Child, started: Instant) -> Result<(ExitStatus, ResourceReport)> {
        let root = Pid::from_u32(child.id());
        debug!("Monitoring process with PID: {}", root.as_u32());

        let waiter = thread::spawn(move || {
            let status = child.wait();
            (status, started.elapsed())
        });

        let mut sys = System::new();
        let mut report = ResourceReport::default();

        while !waiter.is_finished() {
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let sample = collect_tree_sample(&sys, root);
            trace!(
                "Sample {}: memory {:.2}MB, virtual {:.2}MB",
                report.samples,
                sample.memory as f64 / (1024.0 * 1024.0),
                sample.virtual_memory as f64 / (1024.0 * 1024.0)
            );

            report.peak_memory_bytes = report.peak_memory_bytes.max(sample.memory);
            report.peak_virtual_memory_bytes =
                report.peak_virtual_memory_bytes.max(sample.virtual_memory);
            report.disk_read_bytes = report.disk_read_bytes.max(sample.disk_read);
            report.disk_written_bytes = report.disk_written_bytes.max(sample.disk_written);
            report.samples += 1;

            let next_sample = Instant::now() + self.sample_interval;
            while !waiter.is_finished() && Instant::now() < next_sample {
                thread::sleep(POLL_TICK.min(self.sample_interval));
            }
        }

        let (status, elapsed) = waiter
            .join()
            .map_err(|_| anyhow::anyhow!("Prover wait thread panicked"))?;
        let status = status.context("Failed to wait for prover")?;
        report.wall_time_ms = elapsed.as_secs_f64() * 1000.0;
        report.exit_code = status.code();

        debug!(
            "Process {} exited after {:.3}ms ({} samples)",
            root.as_u32(),
            report.wall_time_ms,
            report.samples
        );
        Ok((status, report))
    }
}

#[derive(Debug, Default)]
struct TreeSample {
    memory: u64,
    virtual_memory: u64,
    disk_read: u64,
    disk_written: u64,
}

/// Sum usage over a process and all of its descendants
fn collect_tree_sample(sys: &System, root: Pid) -> TreeSample {
    let mut pids = Vec::new();
    collect_descendants(sys, root, &mut pids);

    let mut sample = TreeSample::default();
    for pid in pids {
        if let Some(process) = sys.process(pid) {
            sample.memory += process.memory();
            sample.virtual_memory += process.virtual_memory();
            let disk_usage = process.disk_usage();
            sample.disk_read += disk_usage.total_read_bytes;
            sample.disk_written += disk_usage.total_written_bytes;
        }
    }
    sample
}

fn collect_descendants(sys: &System, parent: Pid, result: &mut Vec<Pid>) {
    if result.contains(&parent) || sys.process(parent).is_none() {
        return;
    }
    result.push(parent);
    for process in sys.processes().values() {
        if process.parent() == Some(parent) {
            collect_descendants(sys, process.pid(), result);
        }
    }
}
