//! Host information included in run reports

use std::path::Path;

const KUBERNETES_LOCAL_HOST: &str = ".svc.cluster.local";
const BYTES_PER_GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Host name of this node, or `"unknown"`.
///
/// Long kubernetes service names are cut down to their first label.
pub fn server_id() -> String {
    match sysinfo::System::host_name() {
        Some(name) => short_host_name(&name),
        None => {
            tracing::warn!("Unable to retrieve local host name");
            "unknown".to_string()
        }
    }
}

fn short_host_name(name: &str) -> String {
    if name.ends_with(KUBERNETES_LOCAL_HOST) {
        name.split('.').next().unwrap_or(name).to_string()
    } else {
        name.to_string()
    }
}

/// Describe how full the disk holding `path` is, in the form
/// `"Disk usage is 12.3 GB (45%)"`. `None` when no mounted disk contains it.
pub fn disk_usage(path: &Path) -> Option<String> {
    let path = path.canonicalize().ok()?;
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;
    Some(format_disk_usage(disk.total_space(), disk.available_space()))
}

fn format_disk_usage(total: u64, available: u64) -> String {
    let used = total.saturating_sub(available) as f64;
    let percent = if total == 0 {
        0.0
    } else {
        used / total as f64 * 100.0
    };
    format!(
        "Disk usage is {:.1} GB ({}%)",
        used / BYTES_PER_GIGABYTE,
        percent.round()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_host_name() {
        assert_eq!(
            short_host_name("sparql-updater-0.sparql.prod.svc.cluster.local"),
            "sparql-updater-0"
        );
        assert_eq!(short_host_name("localhost"), "localhost");
    }

    #[test]
    fn test_format_disk_usage() {
        let gb = 1024 * 1024 * 1024;
        assert_eq!(format_disk_usage(100 * gb, 75 * gb), "Disk usage is 25.0 GB (25%)");
        assert_eq!(format_disk_usage(0, 0), "Disk usage is 0.0 GB (0%)");
    }
}
