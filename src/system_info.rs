use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use sysinfo::System;

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "<unknown>".to_owned())
}

/// Record the host a sweep ran on next to its logs
#[rustfmt::skip]
pub fn dump_sys_info(path: &Path) -> Result<()> {
    info!("Writing system info to {path:?}");
    let mut file = File::create(path).with_context(|| format!("Failed to create {path:?}"))?;
    let mut sys = System::new_all();
    sys.refresh_all();

    writeln!(file, "{:<25}{}", "Host name:", or_unknown(System::host_name()))?;
    writeln!(file, "{:<25}{}", "System name:", or_unknown(System::name()))?;
    writeln!(file, "{:<25}{}", "Kernel version:", or_unknown(System::kernel_version()))?;
    writeln!(file, "{:<25}{}", "OS version:", or_unknown(System::long_os_version()))?;
    writeln!(file, "{:<25}{}", "CPU arch:", System::cpu_arch())?;

    match sys.cpus().first() {
        Some(cpu) => writeln!(file, "{:<25}{} ({} logical) @ {:.2} GHz",
            "CPU:",
            cpu.brand(),
            sys.cpus().len(),
            cpu.frequency() as f64 / 1000.0)?,
        None => writeln!(file, "{:<25}<unknown>", "CPU:")?,
    }

    writeln!(file, "{:<25}{} bytes", "Total memory:", sys.total_memory())?;
    writeln!(file, "{:<25}{} bytes", "Available memory:", sys.available_memory())?;
    writeln!(file, "{:<25}{} bytes", "Total swap:", sys.total_swap())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_dump_sys_info() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("system_info");
        dump_sys_info(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("CPU arch:"));
        assert!(contents.contains("Total memory:"));
    }
}
