//! Plain-text rendering of a [`DiffReport`].
//!
//! The layout is stable so reports can be compared across runs: a header
//! with counts, warnings grouped by where they were recorded, per-resource
//! differences in walk order, table differences, and a closing `RESULT:` line.

use super::{DiffReport, Difference};
use std::fmt::{self, Write};

const RULE: &str = "------------------------------------------------------------";

pub fn render(report: &DiffReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(report, &mut out);
    out
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

fn write_report(report: &DiffReport, out: &mut String) -> fmt::Result {
    writeln!(out, "ROUND-TRIP REPORT")?;
    if let Some(chain) = &report.chain {
        writeln!(out, "chain: {chain}")?;
    }
    writeln!(
        out,
        "resources: {} before, {} after",
        report.old_resources, report.new_resources
    )?;
    writeln!(
        out,
        "tables: {} before, {} after",
        report.old_tables, report.new_tables
    )?;
    writeln!(
        out,
        "warnings: {}, differences: {}",
        report.warnings.len(),
        report.differences().count()
    )?;

    if !report.warnings.is_empty() {
        writeln!(out, "{RULE}")?;
        writeln!(out, "WARNINGS")?;
        let mut current: Option<&str> = None;
        for (origin, warning) in &report.warnings {
            if current != Some(origin.as_str()) {
                writeln!(out, "  {origin}")?;
                current = Some(origin);
            }
            writeln!(out, "    [{}] {}: {}", warning.kind, warning.subject, warning.message)?;
        }
    }

    if !report.structure.is_empty() || !report.resources.is_empty() {
        writeln!(out, "{RULE}")?;
        writeln!(out, "DIFFERENCES")?;
        for difference in &report.structure {
            writeln!(out, "  (tree)")?;
            write_difference(out, difference)?;
        }
        for resource in &report.resources {
            let id = match (&resource.old_id, &resource.new_id) {
                (Some(old), Some(new)) if old != new => format!("{old} -> {new}"),
                (Some(id), _) | (None, Some(id)) => id.clone(),
                (None, None) => String::new(),
            };
            writeln!(out, "  {} [{id}]", resource.path)?;
            for difference in &resource.differences {
                write_difference(out, difference)?;
            }
        }
    }

    if !report.tables.is_empty() {
        writeln!(out, "{RULE}")?;
        writeln!(out, "DATABASES")?;
        for table in &report.tables {
            writeln!(out, "  {}", table.name)?;
            for difference in &table.differences {
                write_difference(out, difference)?;
            }
        }
    }

    writeln!(out, "{RULE}")?;
    write!(out, "{}", report.result_line())
}

fn write_difference(out: &mut String, difference: &Difference) -> fmt::Result {
    write!(
        out,
        "    {:<11} {}",
        difference.severity.label(),
        difference.dimension.label()
    )?;
    if !difference.detail.is_empty() {
        write!(out, " ({})", difference.detail)?;
    }
    writeln!(out)?;
    if let (Some(old), Some(new)) = (&difference.old, &difference.new) {
        writeln!(out, "      before: {}", clip(old))?;
        writeln!(out, "      after:  {}", clip(new))?;
    }
    Ok(())
}

/// Long values are cut to keep the report readable.
fn clip(text: &str) -> String {
    const LIMIT: usize = 120;
    let single_line = text.replace('\n', "\\n");
    if single_line.chars().count() <= LIMIT {
        single_line
    } else {
        let cut: String = single_line.chars().take(LIMIT).collect();
        format!("{cut}...")
    }
}
