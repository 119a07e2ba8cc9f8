//! Hygiene — enforces coding standards at test time
//!
//! Scans the scene crate's production sources for patterns that crash the
//! process or swallow errors. Budgets only ever shrink.

use std::fs;
use std::path::Path;

/// `(pattern, budget)` pairs checked against every non-test source file.
const BUDGETS: &[(&str, usize)] = &[
    (".unwrap()", 0),
    (".expect(", 0),
    ("panic!(", 0),
    ("unreachable!(", 0),
    ("todo!(", 0),
    ("unimplemented!(", 0),
    ("let _ =", 0),
    // presence.rs: malformed peer positions fall back to the origin.
    (".ok()", 1),
    ("#[allow(dead_code)]", 0),
    ("println!(", 0),
    ("eprintln!(", 0),
];

struct SourceFile {
    path: String,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect(Path::new("src"), &mut files);
    files
}

fn collect(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if !path_str.ends_with(".rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .map(|f| (f.path.clone(), f.content.lines().filter(|l| l.contains(pattern)).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

#[test]
fn sources_exist() {
    assert!(source_files().len() >= 10, "expected the scene sources under src/");
}

#[test]
fn pattern_budgets_hold() {
    let files = source_files();
    let mut failures = Vec::new();
    for (pattern, budget) in BUDGETS {
        let found = hits(&files, pattern);
        let count: usize = found.iter().map(|(_, n)| n).sum();
        if count > *budget {
            let detail = found
                .iter()
                .map(|(path, n)| format!("    {path}: {n}"))
                .collect::<Vec<_>>()
                .join("\n");
            failures.push(format!("`{pattern}`: found {count}, max {budget}\n{detail}"));
        }
    }
    assert!(failures.is_empty(), "budget exceeded:\n{}", failures.join("\n"));
}
