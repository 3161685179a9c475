/// Format a byte count with fractional KB/MB (e.g., "1.5 KB", "2.3 MB").
///
/// Used for download sizes, which never fall on clean binary boundaries.
pub fn format_bytes_approx(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Whether a reference points at a remote (fetchable) location.
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
