//! Dotted version parsing and comparison

use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Numeric components of a dotted version; a component's leading digits
/// are used (`12rc1` is 12) and a component without digits is 0
pub fn parse_components(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Compare component-wise, missing components count as 0
pub fn compare_versions(current: &str, required: &str) -> Ordering {
    let current = parse_components(current);
    let required = parse_components(required);
    let len = current.len().max(required.len());

    for i in 0..len {
        let c = current.get(i).copied().unwrap_or(0);
        let r = required.get(i).copied().unwrap_or(0);
        match c.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// `current` is at least `required`
pub fn version_meets(current: &str, required: &str) -> bool {
    compare_versions(current, required) != Ordering::Less
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)+)").expect("version pattern is valid"))
}

/// Extract the version from `python --version` style output
pub fn extract_version(output: &str) -> Option<String> {
    version_pattern()
        .captures(output)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_meets() {
        assert!(version_meets("3.11.4", "3.8"));
        assert!(version_meets("3.8", "3.8.0"));
        assert!(version_meets("3.10", "3.9"));
        assert!(!version_meets("3.6.9", "3.8"));
        assert!(!version_meets("2.7.18", "3"));
        assert!(version_meets("3.12.0rc1", "3.12"));
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2", "1.2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("0.9", "1"), Ordering::Less);
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("Python 3.11.4\n").as_deref(), Some("3.11.4"));
        assert_eq!(extract_version("Python 2.7.18").as_deref(), Some("2.7.18"));
        assert_eq!(extract_version("no version here"), None);
    }
}
