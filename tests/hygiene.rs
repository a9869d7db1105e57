//! Hygiene — source budgets checked at test time
//!
//! Scans production sources of the library and the CLI for patterns that
//! crash the process or silently drop errors. Every budget is zero; a new
//! hit means fixing the code, not raising the budget.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

const ROOTS: [&str; 2] = ["src", "cli/src"];

struct Rule {
    pattern: &'static str,
    budget: usize,
}

// Panics.
const PANICS: [Rule; 6] = [
    Rule { pattern: ".unwrap()", budget: 0 },
    Rule { pattern: ".expect(", budget: 0 },
    Rule { pattern: "panic!(", budget: 0 },
    Rule { pattern: "unreachable!(", budget: 0 },
    Rule { pattern: "todo!(", budget: 0 },
    Rule { pattern: "unimplemented!(", budget: 0 },
];

// Silent loss.
const DISCARDS: [Rule; 2] = [Rule { pattern: "let _ =", budget: 0 }, Rule { pattern: ".ok()", budget: 0 }];

const STRUCTURE: [Rule; 1] = [Rule { pattern: "#[allow(dead_code)]", budget: 0 }];

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under the scanned roots; `*_test.rs` is skipped.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    for root in ROOTS {
        collect_rs_files(Path::new(root), &mut files);
    }
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
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
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

fn check(rules: &[Rule]) {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found under {ROOTS:?}");

    let mut failures = Vec::new();
    for rule in rules {
        let found = hits(&files, rule.pattern);
        let count: usize = found.iter().map(|(_, c)| c).sum();
        if count > rule.budget {
            let listing = found.iter().map(|(path, c)| format!("    {path}: {c}")).collect::<Vec<_>>().join("\n");
            failures.push(format!("`{}` budget exceeded: found {count}, max {}\n{listing}", rule.pattern, rule.budget));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn panic_budgets() {
    check(&PANICS);
}

#[test]
fn silent_discard_budgets() {
    check(&DISCARDS);
}

#[test]
fn structure_budgets() {
    check(&STRUCTURE);
}
