//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the builder core and CLI MUST NOT call sleep.
//! Progress stages advance on `tokio::time::interval` ticks and streams are
//! awaited, never polled on a timer.
//!
//! **Exceptions**: test code (paused-clock tests advance time with sleep),
//! periodic tasks built on `tokio::time::interval`.

use std::fs;
use std::path::{Path, PathBuf};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        eprintln!("  - Test code (#[test] or #[tokio::test] functions)");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep to 'wait' for stream chunks (await the channel!)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    check_directory(
        &workspace_dir("builder/core/src"),
        &mut violations,
        &SleepPolicy { allow_tests: true },
    );

    check_directory(
        &workspace_dir("builder/cli/src"),
        &mut violations,
        &SleepPolicy { allow_tests: false },
    );

    violations
}

struct SleepPolicy {
    allow_tests: bool,
}

fn workspace_dir(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

fn check_directory(path: &Path, violations: &mut Vec<String>, policy: &SleepPolicy) {
    assert!(path.exists(), "missing source directory {}", path.display());

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), violations, policy);
        }
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>, policy: &SleepPolicy) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        if code_part.contains("::sleep(") || code_part.contains(".sleep(") {
            if policy.allow_tests && is_in_test_function(&lines, idx) {
                continue;
            }

            if is_interval_pattern(&lines, idx) {
                continue;
            }

            violations.push(format!(
                "{}:{} - {}",
                path.display(),
                line_number,
                line.trim()
            ));
        }
    }
}

/// Check if line is inside a test function
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") && !line.contains("test") {
            return false;
        }

        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }

        if line.starts_with("mod ") || line.starts_with("impl") {
            return false;
        }
    }
    false
}

/// Check if this is the tokio::time::interval pattern (acceptable for periodic tasks)
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let context_range = current_idx.saturating_sub(20)..current_idx;
    if lines[context_range]
        .iter()
        .any(|line| line.contains("interval.tick()") || line.contains("tokio::time::interval"))
    {
        return true;
    }

    let forward_range = current_idx..std::cmp::min(current_idx + 5, lines.len());
    lines[forward_range]
        .iter()
        .any(|line| line.contains("interval.tick()"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_violation_detection() {
        let test_code = vec![
            "fn wait_for_chunk() {",
            "    tokio::time::sleep(Duration::from_millis(10)).await;",
            "}",
        ];

        assert!(!is_in_test_function(&test_code, 1));
        assert!(!is_interval_pattern(&test_code, 1));
    }

    #[test]
    fn test_paused_clock_test_detection() {
        let test_code = vec![
            "#[tokio::test(start_paused = true)]",
            "async fn test_ticks() {",
            "    driver.start();",
            "    tokio::time::sleep(Duration::from_millis(600)).await;",
            "}",
        ];

        assert!(is_in_test_function(&test_code, 3));
    }

    #[test]
    fn test_interval_detection() {
        let test_code = vec![
            "let mut ticker = tokio::time::interval(period);",
            "loop {",
            "    ticker.tick().await;",
            "    tokio::time::sleep(Duration::ZERO).await;",
            "}",
        ];

        assert!(is_interval_pattern(&test_code, 3));
    }
}
