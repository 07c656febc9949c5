//! Directory listing shared by the folder-based formats.
//!
//! Both markdown tree formats pair a page file `X.md` with an optional
//! directory `X/` holding its children and attachments. [`list_dir`] sorts one
//! directory's entries into those roles, in file name order so that parsing is
//! deterministic on every platform.

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::{FormatError, IoResultExt};
use crate::model::Asset;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirListing {
    /// `*.md` files
    pub pages: Vec<PathBuf>,
    /// `*.csv` files
    pub tables: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
    /// Everything else
    pub assets: Vec<PathBuf>,
}

impl DirListing {
    /// The directory paired with a page file, if present.
    pub fn paired_dir(&self, page: &Path) -> Option<&PathBuf> {
        let stem = page.file_stem()?;
        self.dirs.iter().find(|dir| dir.file_name() == Some(stem))
    }

    /// Directories no page file claims.
    pub fn unpaired_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.dirs.iter().filter(move |dir| {
            !self
                .pages
                .iter()
                .any(|page| page.file_stem() == dir.file_name())
        })
    }
}

pub fn list_dir(dir: &Path) -> Result<DirListing, FormatError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .at_path(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .at_path(dir)?;
    entries.sort();

    let mut listing = DirListing::default();
    for path in entries {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            listing.dirs.push(path);
            continue;
        }
        match extension(&path).as_deref() {
            Some("md") => listing.pages.push(path),
            Some("csv") => listing.tables.push(path),
            _ => listing.assets.push(path),
        }
    }
    Ok(listing)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of `path` relative to the export root, for ids and link lookups.
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Root-relative path rendered with `/` separators on every platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// A single plain file name: no separators, no `.` or `..`, not absolute.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `rel` joined onto `base`, or `None` when `rel` is absolute or climbs out
/// of `base`.
pub fn contained_path(base: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let mut joined = base.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(joined)
}

/// Copy an attachment into `dir`. Attachments without a file on disk, and
/// names that would land outside `dir`, are skipped with a `MissingAsset`
/// warning. Returns whether the file was copied.
pub fn copy_asset(
    asset: &Asset,
    dir: &Path,
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> Result<bool, FormatError> {
    if !is_plain_file_name(&asset.name) {
        diagnostics.warn(
            WarningKind::MissingAsset,
            subject,
            format!("attachment name '{}' is not a plain file name", asset.name),
        );
        return Ok(false);
    }
    let Some(origin) = asset.origin.as_deref().filter(|origin| origin.is_file()) else {
        diagnostics.warn(
            WarningKind::MissingAsset,
            subject,
            format!("no file to copy for attachment '{}'", asset.name),
        );
        return Ok(false);
    };
    create_dir(dir)?;
    let copy = dir.join(&asset.name);
    fs::copy(origin, &copy).at_path(&copy)?;
    Ok(true)
}

pub fn create_dir(path: &Path) -> Result<(), FormatError> {
    fs::create_dir_all(path).at_path(path)
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), FormatError> {
    fs::write(path, contents).at_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_entries_into_roles() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("Realms.md"), "# Realms").unwrap();
        fs::create_dir(root.join("Realms")).unwrap();
        fs::create_dir(root.join("Loose")).unwrap();
        fs::write(root.join("Cities.csv"), "Name\n").unwrap();
        fs::write(root.join("map.png"), [0u8; 4]).unwrap();
        fs::write(root.join(".DS_Store"), "").unwrap();

        let listing = list_dir(root).unwrap();
        assert_eq!(listing.pages, vec![root.join("Realms.md")]);
        assert_eq!(listing.tables, vec![root.join("Cities.csv")]);
        assert_eq!(listing.assets, vec![root.join("map.png")]);
        assert_eq!(
            listing.paired_dir(&root.join("Realms.md")),
            Some(&root.join("Realms"))
        );
        let unpaired: Vec<_> = listing.unpaired_dirs().collect();
        assert_eq!(unpaired, vec![&root.join("Loose")]);
    }

    #[test]
    fn plain_file_names_only() {
        assert!(is_plain_file_name("map.png"));
        assert!(is_plain_file_name("Kaleah map (1).png"));
        for name in ["", ".", "..", "../escaped.txt", "a/b.png", "a\\b.png", "/etc/passwd"] {
            assert!(!is_plain_file_name(name), "{name}");
        }
    }

    #[test]
    fn contained_paths_stay_below_the_base() {
        let base = Path::new("export");
        assert_eq!(
            contained_path(base, "./assets/r/map.png"),
            Some(base.join("assets").join("r").join("map.png"))
        );
        assert_eq!(contained_path(base, "../secret.txt"), None);
        assert_eq!(contained_path(base, "assets/../../secret.txt"), None);
        assert_eq!(contained_path(base, "/etc/passwd"), None);
    }

    #[test]
    fn unsafe_attachment_names_are_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("real.txt");
        fs::write(&origin, "bytes").unwrap();
        let dest = dir.path().join("deep").join("out");
        let mut diagnostics = Diagnostics::new();

        let escaping = Asset::new("../escaped.txt", Some(origin.clone()));
        assert!(!copy_asset(&escaping, &dest, "r", &mut diagnostics).unwrap());
        assert!(!dir.path().join("deep").join("escaped.txt").exists());

        let plain = Asset::new("kept.txt", Some(origin));
        assert!(copy_asset(&plain, &dest, "r", &mut diagnostics).unwrap());
        assert!(dest.join("kept.txt").is_file());

        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MissingAsset);
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let rel = relative_to(Path::new("/x/export"), Path::new("/x/export/A/B.md"));
        assert_eq!(slash_path(&rel), "A/B.md");
    }
}
