//! Aggregates gap checker report files into a single JSON summary (C9).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ALL_FINDING_KINDS;

/// Diagnostic counts found in a single report file, classified by the
/// canonical phrase of each `CheckFindingKind`.
#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
}

/// The aggregate view over every report file in a directory.
#[derive(Debug, Serialize)]
pub struct DirectorySummary {
    pub files_checked: usize,
    pub files_with_findings: usize,
    pub totals: BTreeMap<String, usize>,
    pub files: Vec<FileSummary>,
}

fn classify_line(line: &str, counts: &mut BTreeMap<String, usize>) {
    for kind in ALL_FINDING_KINDS {
        if line.contains(kind.canonical_phrase()) {
            *counts.entry(kind.to_string()).or_insert(0) += 1;
        }
    }
}

fn summarize_file(path: &Path) -> io::Result<FileSummary> {
    let contents = fs::read_to_string(path)?;
    let mut counts = BTreeMap::new();
    for line in contents.lines() {
        classify_line(line, &mut counts);
    }
    let total = counts.values().sum();
    Ok(FileSummary {
        path: path.to_path_buf(),
        counts,
        total,
    })
}

/// Scan every `*.log` report file directly under `dir` and build the
/// aggregate [`DirectorySummary`].
pub fn summarize_directory(dir: &Path) -> io::Result<DirectorySummary> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("log"))
        .collect();
    entries.sort();

    let mut totals = BTreeMap::new();
    let mut files_with_findings = 0;
    for path in entries {
        let summary = summarize_file(&path)?;
        if summary.total > 0 {
            files_with_findings += 1;
        }
        for (kind, count) in &summary.counts {
            *totals.entry(kind.clone()).or_insert(0) += count;
        }
        files.push(summary);
    }

    Ok(DirectorySummary {
        files_checked: files.len(),
        files_with_findings,
        totals,
        files,
    })
}

/// Render a [`DirectorySummary`] as a pretty-printed JSON document.
pub fn to_json(summary: &DirectorySummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}
