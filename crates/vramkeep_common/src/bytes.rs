//! Human-readable formatting of byte quantities.

/// One mebibyte in bytes.
pub const MIB: u64 = 1024 * 1024;

/// One gibibyte in bytes.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Formats a byte count with a binary unit suffix.
///
/// Quantities below 1 MiB are shown in whole bytes; larger quantities use
/// one decimal place of MiB or GiB. Cache payloads are model weights, so
/// the MiB/GiB ranges are the ones that matter in practice.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{bytes} B")
    }
}
