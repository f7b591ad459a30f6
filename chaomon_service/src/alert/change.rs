//! Categorical change detection for the dam storage value.
//!
//! The published value is compared by identity, not by tolerance: any new
//! figure is news. A missing baseline also counts as a change, so a fresh
//! deployment announces the current figure once.

/// True when `current` differs from the last announced value.
pub fn evaluate(current: &str, previous: Option<&str>) -> bool {
    match previous.map(str::trim).filter(|p| !p.is_empty()) {
        Some(previous) => current.trim() != previous,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_value_does_not_notify() {
        assert!(!evaluate("1234.5", Some("1234.5")));
        assert!(!evaluate("1234.5", Some(" 1234.5\n")));
    }

    #[test]
    fn test_different_value_notifies() {
        assert!(evaluate("1240", Some("1234.5")));
    }

    #[test]
    fn test_formatting_difference_is_a_change() {
        // Identity comparison: "850.0" and "850" are different publications.
        assert!(evaluate("850.0", Some("850")));
    }

    #[test]
    fn test_missing_or_blank_baseline_notifies() {
        assert!(evaluate("1234.5", None));
        assert!(evaluate("1234.5", Some("")));
    }

    #[test]
    fn test_second_run_with_same_value_is_silent() {
        let mut baseline: Option<String> = None;
        let mut sent = 0;
        for _ in 0..2 {
            if evaluate("1234.5", baseline.as_deref()) {
                sent += 1;
            }
            baseline = Some("1234.5".to_string());
        }
        assert_eq!(sent, 1);
    }
}
