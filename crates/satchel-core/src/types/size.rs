//! Human-readable byte sizes for log lines and status messages.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count using decimal (1000-based) units.
///
/// Values below one kilobyte are printed as whole bytes (`"512B"`);
/// everything else carries two decimals (`"5.00KB"`, `"1.25GB"`).
/// Negative inputs are formatted by magnitude with a leading minus.
pub fn human_size(bytes: i64) -> String {
    if bytes < 0 {
        return format!("-{}", human_size(bytes.saturating_neg()));
    }
    if bytes < 1000 {
        return format!("{bytes}B");
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.2}{}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_are_bytes() {
        assert_eq!(human_size(0), "0B");
        assert_eq!(human_size(999), "999B");
    }

    #[test]
    fn test_kilobytes() {
        assert_eq!(human_size(5000), "5.00KB");
        assert_eq!(human_size(1500), "1.50KB");
    }

    #[test]
    fn test_larger_units() {
        assert_eq!(human_size(2_500_000), "2.50MB");
        assert_eq!(human_size(3_000_000_000), "3.00GB");
        assert_eq!(human_size(7_000_000_000_000_000), "7000.00TB");
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(human_size(-4900), "-4.90KB");
    }
}
