//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the builder core and CLI MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::net`, `tokio::io`, not `std::fs`, `std::net`, `std::io::stdin`
//!
//! Synchronous functions (configuration loading before the runtime does any
//! work) and test code are exempt.

use std::fs;
use std::path::{Path, PathBuf};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O calls found in async production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {}", violation);
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::read(), std::fs::write(), std::fs::File");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command::output()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("  - std::io::stdin() / std::io::stdout() inside async functions");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read_to_string().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - reqwest::Client with bytes_stream()");
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Non-async functions (config loading)");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    check_directory(&workspace_dir("builder/core/src"), &mut violations);
    check_directory(&workspace_dir("builder/cli/src"), &mut violations);

    violations
}

fn workspace_dir(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

fn check_directory(path: &Path, violations: &mut Vec<String>) {
    assert!(path.exists(), "missing source directory {}", path.display());

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
            check_file(entry.path(), violations);
        }
    }
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };

    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        if is_in_test_function(&lines, idx) {
            continue;
        }

        if is_in_non_async_function(&lines, idx) {
            continue;
        }

        let mut report = |kind: &str| {
            violations.push(format!(
                "{}:{} - {}: {}",
                path.display(),
                line_number,
                kind,
                line.trim()
            ));
        };

        if code_part.contains("std::fs::") || code_part.contains("use std::fs") {
            report("Blocking file I/O");
        }

        if code_part.contains("std::net::") || code_part.contains("use std::net") {
            report("Blocking network I/O");
        }

        if code_part.contains("std::process::Command") {
            report("Blocking process I/O");
        }

        if code_part.contains("reqwest::blocking") {
            report("Blocking HTTP client");
        }

        if (code_part.contains("std::io::stdin()") || code_part.contains("std::io::stdout()"))
            && is_in_async_function(&lines, idx)
        {
            report("Blocking stdin/stdout in async");
        }
    }
}

/// Strip visibility so `pub fn` and `pub(crate) fn` read like `fn`
fn declaration(line: &str) -> &str {
    let line = line.trim();
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return rest;
        }
    }
    line
}

fn is_sync_fn(line: &str) -> bool {
    declaration(line).starts_with("fn ")
}

fn is_async_fn(line: &str) -> bool {
    declaration(line).starts_with("async fn ")
}

fn is_boundary(line: &str) -> bool {
    let line = declaration(line);
    line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{'))
}

/// Check if line is inside a test function
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        if is_sync_fn(lines[i]) || is_async_fn(lines[i]) {
            found_fn_idx = Some(i);
            break;
        }
        if is_boundary(lines[i]) {
            return false;
        }
    }

    if let Some(fn_idx) = found_fn_idx {
        for i in (0..fn_idx).rev() {
            let line = lines[i].trim();

            if line.starts_with("#[test]")
                || line.starts_with("#[tokio::test")
                || line.starts_with("#[cfg(test)]")
            {
                return true;
            }

            if is_sync_fn(line) || is_async_fn(line) || is_boundary(line) {
                break;
            }
        }
    }

    false
}

/// Check if line is inside an async function
fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        if is_async_fn(lines[i]) {
            return true;
        }
        if is_sync_fn(lines[i]) || is_boundary(lines[i]) {
            return false;
        }
    }
    false
}

/// Check if line is inside a non-async function (acceptable for blocking I/O)
fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        if is_sync_fn(lines[i]) {
            return true;
        }
        if is_async_fn(lines[i]) || is_boundary(lines[i]) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_io_detection() {
        let test_code = vec![
            "    pub async fn load(&self) -> Result<String> {",
            "        let contents = std::fs::read_to_string(\"versions.json\")?;",
            "    }",
        ];

        assert!(is_in_async_function(&test_code, 1));
        assert!(!is_in_non_async_function(&test_code, 1));
    }

    #[test]
    fn test_non_async_function_detection() {
        let test_code = vec![
            "pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BuilderConfig> {",
            "    let contents = std::fs::read_to_string(path)?;",
            "}",
        ];

        assert!(is_in_non_async_function(&test_code, 1));
        assert!(!is_in_async_function(&test_code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let test_code = vec![
            "#[tokio::test]",
            "async fn test_persistence() {",
            "    let contents = std::fs::read_to_string(\"test.txt\").unwrap();",
            "}",
        ];

        assert!(is_in_test_function(&test_code, 2));
    }

    #[test]
    fn test_impl_block_is_boundary() {
        let test_code = vec![
            "impl FileStorage {",
            "    let contents = std::fs::read_to_string(\"x\");",
        ];

        assert!(!is_in_non_async_function(&test_code, 1));
        assert!(!is_in_test_function(&test_code, 1));
    }
}
