//! Conversion chains
//!
//! A chain such as `notion->lk-json->notion` names the format of the source
//! and of every export after it. The runner parses the source with the first
//! stage, then for each following stage exports the current snapshot and
//! parses the export back, so every hop starts from what the previous format
//! actually stored. Hops run sequentially in a scratch directory; a failure
//! stops the run and names the hop.

use crate::diagnostics::Warning;
use crate::diff::{compare, DiffReport};
use crate::error::FormatError;
use crate::formats::{lk_json, lk_md, notion};
use crate::model::ConversionData;
use crate::registry::FormatRegistry;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;
use thiserror::Error;

/// A format a chain can pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Notion,
    LkJson,
    LkMarkdown,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Notion, Stage::LkJson, Stage::LkMarkdown];

    /// Registry name of the stage's format
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Notion => notion::FORMAT_NAME,
            Stage::LkJson => lk_json::FORMAT_NAME,
            Stage::LkMarkdown => lk_md::FORMAT_NAME,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| {
                ChainError::InvalidChain(format!(
                    "unknown stage '{s}', expected one of: notion, lk-json, lk-md"
                ))
            })
    }
}

/// An ordered list of at least two stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ChainError> {
        if stages.len() < 2 {
            return Err(ChainError::InvalidChain(
                "a chain needs at least two stages".to_string(),
            ));
        }
        Ok(Chain { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn source(&self) -> Stage {
        self.stages[0]
    }
}

impl FromStr for Chain {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stages = s
            .split("->")
            .map(str::parse)
            .collect::<Result<Vec<Stage>, _>>()?;
        Chain::new(stages)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(Stage::name).collect();
        f.write_str(&names.join(" -> "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Export,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Parse => "parse",
            Phase::Export => "export",
        })
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    #[error("Source looks like '{detected}' but the chain starts with '{expected}'")]
    SourceMismatch { detected: String, expected: Stage },

    #[error("Hop {hop} failed during {stage} {phase}: {source}")]
    HopFailed {
        hop: usize,
        stage: Stage,
        phase: Phase,
        #[source]
        source: FormatError,
    },

    #[error("Work directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where intermediate exports go.
#[derive(Debug, Clone, Default)]
pub struct ChainOptions {
    /// Fixed directory for the hop outputs; a temporary one is used otherwise
    pub work_dir: Option<PathBuf>,
    /// Keep the temporary directory after the run
    pub keep_intermediates: bool,
    /// Passed to every export, see [`crate::format::Format::export_with_options`]
    pub export_options: HashMap<String, String>,
}

/// One export-and-reparse step.
#[derive(Debug, Clone)]
pub struct Hop {
    /// 1-based
    pub index: usize,
    pub from: Stage,
    pub to: Stage,
    /// What the export returned: the file or the tree root
    pub output: PathBuf,
    /// Export warnings followed by reparse warnings
    pub warnings: Vec<Warning>,
}

impl Hop {
    pub fn label(&self) -> String {
        format!("hop {} ({} -> {})", self.index, self.from, self.to)
    }
}

enum Workspace {
    Temporary(TempDir),
    Kept(PathBuf),
}

impl Workspace {
    fn path(&self) -> &Path {
        match self {
            Workspace::Temporary(dir) => dir.path(),
            Workspace::Kept(path) => path,
        }
    }
}

/// Everything a chain run produced.
pub struct ChainRun {
    pub chain: Chain,
    /// Snapshot parsed from the source
    pub original: ConversionData,
    /// Warnings from parsing the source
    pub source_warnings: Vec<Warning>,
    pub hops: Vec<Hop>,
    /// Snapshot parsed from the last export
    pub result: ConversionData,
    workspace: Workspace,
}

impl ChainRun {
    /// Directory holding the hop outputs. Temporary directories are removed
    /// when the run is dropped.
    pub fn work_dir(&self) -> &Path {
        self.workspace.path()
    }

    pub fn warning_count(&self) -> usize {
        self.source_warnings.len() + self.hops.iter().map(|h| h.warnings.len()).sum::<usize>()
    }

    /// Compare the original and final snapshots and attach every warning
    /// recorded along the way.
    pub fn diff(&self) -> DiffReport {
        let mut report = compare(&self.original, &self.result);
        report.set_chain(self.chain.to_string());
        report.record_warnings(format!("source ({})", self.chain.source()), &self.source_warnings);
        for hop in &self.hops {
            report.record_warnings(hop.label(), &hop.warnings);
        }
        report
    }
}

/// Run `chain` over the export at `source`.
pub fn run_chain(
    registry: &FormatRegistry,
    source: &Path,
    chain: &Chain,
    options: &ChainOptions,
) -> Result<ChainRun, ChainError> {
    let workspace = match &options.work_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Workspace::Kept(dir.clone())
        }
        None => {
            let dir = tempfile::Builder::new().prefix("keeper-chain-").tempdir()?;
            if options.keep_intermediates {
                Workspace::Kept(dir.keep())
            } else {
                Workspace::Temporary(dir)
            }
        }
    };

    let first = chain.source();
    tracing::info!(chain = %chain, source = %source.display(), "starting chain");
    let parsed = registry
        .parse(source, first.name())
        .map_err(|source| ChainError::HopFailed {
            hop: 0,
            stage: first,
            phase: Phase::Parse,
            source,
        })?;
    let (original, source_warnings) = parsed.into_parts();

    let mut hops = Vec::new();
    let mut current = original.clone();
    for (offset, pair) in chain.stages().windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let index = offset + 1;
        let dest = workspace.path().join(format!("hop{index}-{to}"));
        tracing::info!(hop = index, %from, %to, dest = %dest.display(), "running hop");
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }

        let failed = |phase: Phase| {
            move |source: FormatError| ChainError::HopFailed {
                hop: index,
                stage: to,
                phase,
                source,
            }
        };
        let exported = registry
            .export_with_options(&current, &dest, to.name(), &options.export_options)
            .map_err(failed(Phase::Export))?;
        let (output, mut warnings) = exported.into_parts();
        let reparsed = registry.parse(&output, to.name()).map_err(failed(Phase::Parse))?;
        let (next, mut parse_warnings) = reparsed.into_parts();
        warnings.append(&mut parse_warnings);

        tracing::info!(hop = index, warnings = warnings.len(), resources = next.len(), "hop finished");
        hops.push(Hop {
            index,
            from,
            to,
            output,
            warnings,
        });
        current = next;
    }

    Ok(ChainRun {
        chain: chain.clone(),
        original,
        source_warnings,
        hops,
        result: current,
        workspace,
    })
}

/// Reject a chain whose first stage is not what the source looks like.
pub fn check_source(registry: &FormatRegistry, source: &Path, chain: &Chain) -> Result<(), ChainError> {
    let detected = registry.detect_format_from_path(source).ok_or_else(|| {
        ChainError::InvalidChain(format!("'{}' is not a recognizable export", source.display()))
    })?;
    if detected != chain.source().name() {
        return Err(ChainError::SourceMismatch {
            detected,
            expected: chain.source(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chains() {
        let chain: Chain = "notion->lk-json -> notion".parse().unwrap();
        assert_eq!(chain.stages(), [Stage::Notion, Stage::LkJson, Stage::Notion]);
        assert_eq!(chain.to_string(), "notion -> lk-json -> notion");
    }

    #[test]
    fn rejects_short_or_unknown_chains() {
        assert!(matches!(
            "notion".parse::<Chain>(),
            Err(ChainError::InvalidChain(_))
        ));
        assert!(matches!(
            "notion->html".parse::<Chain>(),
            Err(ChainError::InvalidChain(message)) if message.contains("html")
        ));
    }

    #[test]
    fn source_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Realms.json");
        fs::write(&file, "{}").unwrap();
        let chain: Chain = "notion->lk-json".parse().unwrap();
        let err = check_source(&FormatRegistry::default(), &file, &chain).unwrap_err();
        assert!(matches!(err, ChainError::SourceMismatch { ref detected, .. } if detected == "lk-json"));
    }

    #[test]
    fn failing_hops_name_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Realms.json");
        fs::write(&file, r#"{"version": 9, "resources": []}"#).unwrap();
        let chain: Chain = "lk-json->notion".parse().unwrap();
        let err = match run_chain(&FormatRegistry::default(), &file, &chain, &ChainOptions::default()) {
            Err(err) => err,
            Ok(_) => panic!("expected the source parse to fail"),
        };
        assert!(matches!(
            err,
            ChainError::HopFailed {
                hop: 0,
                stage: Stage::LkJson,
                phase: Phase::Parse,
                source: FormatError::UnsupportedVersion(_),
            }
        ));
    }

    #[test]
    fn kept_work_dirs_hold_every_hop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Realms.json");
        fs::write(
            &file,
            r#"{"version": 1, "resources": [{"id": "r", "name": "Realms"}]}"#,
        )
        .unwrap();
        let options = ChainOptions {
            work_dir: Some(dir.path().join("work")),
            ..ChainOptions::default()
        };
        let chain: Chain = "lk-json->lk-md->lk-json".parse().unwrap();
        let run = run_chain(&FormatRegistry::default(), &file, &chain, &options).unwrap();
        assert_eq!(run.hops.len(), 2);
        assert!(run.work_dir().join("hop1-lk-md").join("Realms.md").is_file());
        assert_eq!(run.hops[1].output, run.work_dir().join("hop2-lk-json").join("Realms.json"));
        let roots: Vec<_> = run.result.walk().into_iter().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(roots, vec!["Realms"]);
    }

    #[test]
    fn kept_temporary_dirs_outlive_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Realms.json");
        fs::write(
            &file,
            r#"{"version": 1, "resources": [{"id": "r", "name": "Realms"}]}"#,
        )
        .unwrap();
        let options = ChainOptions {
            keep_intermediates: true,
            ..ChainOptions::default()
        };
        let chain: Chain = "lk-json->lk-md".parse().unwrap();
        let run = run_chain(&FormatRegistry::default(), &file, &chain, &options).unwrap();
        let kept = run.work_dir().to_path_buf();
        drop(run);
        assert!(kept.join("hop1-lk-md").join("Realms.md").is_file());
        fs::remove_dir_all(kept).unwrap();
    }
}
