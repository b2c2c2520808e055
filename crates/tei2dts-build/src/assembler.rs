//! Output tree assembly.
//!
//! Writes the document descriptor, navigation payloads, the whole document
//! and one fragment per unit into a staging directory next to the target,
//! then moves it into place. The target is either fully replaced or left as
//! it was.
//!
//! ```text
//! {output_dir}/
//! +-- {doc}.json                     # document descriptor
//! +-- {navigation_path}/
//! |   +-- {doc}.json                 # full navigation
//! |   +-- {doc}/{unit}.json          # per-unit navigation
//! +-- {document_path}/
//!     +-- {doc}.xml                  # whole document
//!     +-- {doc}/{unit}.xml           # unit fragments
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tei2dts_core::Conversion;

use crate::payload::PayloadBuilder;
use crate::url::{Resource, UrlScheme};

/// Configuration for output assembly.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Directory receiving the output tree.
    pub output_dir: PathBuf,
    /// Replace an existing non-empty output directory.
    pub force: bool,
    /// URL prefixes and endpoint sub-paths.
    pub urls: UrlScheme,
}

/// Error returned by the output assembler.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Output directory {} already exists and is not empty (use --force to replace it)", .0.display())]
    OutputExists(PathBuf),
}

/// Summary of a committed output tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// Directory the tree was written to.
    pub output_dir: PathBuf,
    /// Number of files written.
    pub files: usize,
    /// Number of units published.
    pub units: usize,
}

/// Writes a [`Conversion`] as a static DTS file tree.
pub struct OutputAssembler {
    config: BuildConfig,
}

impl OutputAssembler {
    /// Create an assembler.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Write and commit the output tree for one document.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutputExists`] if the target holds files and
    /// `force` is off, or an I/O or serialization error. The target is left
    /// untouched on error.
    pub fn assemble(&self, doc_id: &str, conversion: &Conversion) -> Result<BuildReport, BuildError> {
        let target = &self.config.output_dir;
        self.check_target(target)?;

        let parent = parent_dir(target);
        fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".tei2dts-staging-")
            .tempdir_in(&parent)?;
        tracing::debug!(staging = %staging.path().display(), "Created staging directory");

        let files = self.write_tree(staging.path(), doc_id, conversion)?;
        commit(staging.path(), target, &parent)?;

        tracing::info!(
            output = %target.display(),
            files,
            units = conversion.navigation.len(),
            "Wrote output tree"
        );
        Ok(BuildReport {
            output_dir: target.clone(),
            files,
            units: conversion.navigation.len(),
        })
    }

    /// Refuse a non-empty target unless forced.
    fn check_target(&self, target: &Path) -> Result<(), BuildError> {
        let occupied = if target.is_dir() {
            fs::read_dir(target)?.next().is_some()
        } else {
            target.exists()
        };
        if occupied && !self.config.force {
            return Err(BuildError::OutputExists(target.to_path_buf()));
        }
        Ok(())
    }

    /// Write every file under `root`, returning the file count.
    fn write_tree(
        &self,
        root: &Path,
        doc_id: &str,
        conversion: &Conversion,
    ) -> Result<usize, BuildError> {
        let urls = &self.config.urls;
        let nav = &conversion.navigation;
        let payloads = PayloadBuilder::new(doc_id, nav, urls);
        let mut files = 0;

        write_json(
            root,
            &urls.descriptor_file(doc_id),
            &payloads.descriptor(conversion.title.clone()),
        )?;
        write_json(
            root,
            &urls.file(Resource::Navigation, doc_id, None),
            &payloads.navigation(),
        )?;
        write_file(
            root,
            &urls.file(Resource::Document, doc_id, None),
            conversion.document.serialize().as_bytes(),
        )?;
        files += 3;

        for (unit, fragment) in nav.units().iter().zip(&conversion.fragments) {
            write_json(
                root,
                &urls.file(Resource::Navigation, doc_id, Some(&unit.id)),
                &payloads.unit_navigation(unit),
            )?;
            write_file(
                root,
                &urls.file(Resource::Document, doc_id, Some(&fragment.id)),
                fragment.content.as_bytes(),
            )?;
            files += 2;
        }

        Ok(files)
    }
}

/// Directory that holds `target`, the current directory for bare names.
fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Move `staging` to `target`, replacing any existing target.
///
/// An existing target is first moved aside and only removed once the new
/// tree is in place; on failure it is moved back.
fn commit(staging: &Path, target: &Path, parent: &Path) -> Result<(), BuildError> {
    if !target.exists() {
        fs::rename(staging, target)?;
        return Ok(());
    }

    let aside = tempfile::Builder::new()
        .prefix(".tei2dts-previous-")
        .tempdir_in(parent)?;
    let previous = aside.path().join("previous");
    fs::rename(target, &previous)?;

    if let Err(e) = fs::rename(staging, target) {
        if let Err(restore) = fs::rename(&previous, target) {
            tracing::warn!(
                previous = %previous.display(),
                "Failed to restore previous output: {restore}"
            );
            // Keep the old tree on disk rather than deleting it with `aside`.
            let _ = aside.keep();
        }
        return Err(e.into());
    }

    tracing::debug!(output = %target.display(), "Replaced previous output");
    aside.close()?;
    Ok(())
}

fn write_json<T: Serialize>(root: &Path, rel: &Path, value: &T) -> Result<(), BuildError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_file(root, rel, &bytes)
}

fn write_file(root: &Path, rel: &Path, bytes: &[u8]) -> Result<(), BuildError> {
    let path = root.join(rel);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&path, bytes)?;
    tracing::trace!(path = %rel.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tei2dts_core::{ConvertOptions, NavigationMode, convert};

    const TEI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><fileDesc><titleStmt><title>Odes</title></titleStmt></fileDesc></teiHeader>
  <text><body>
    <div type="book" xml:id="unit-7"><head>Book I</head>
      <div type="poem"><pb n="1" facs="img1"/><l>first</l></div>
      <div type="poem"><l>second</l><pb n="2"/><l>third</l></div>
    </div>
  </body></text>
</TEI>
"#;

    fn config(output_dir: PathBuf, force: bool) -> BuildConfig {
        BuildConfig {
            output_dir,
            force,
            urls: UrlScheme::new("https://x.test/dts", "document", "navigation"),
        }
    }

    fn hierarchical() -> Conversion {
        convert(TEI, &ConvertOptions::default()).unwrap()
    }

    /// All files under `root` with their contents, keyed by relative path.
    fn read_tree(root: &Path) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                    files.insert(rel, fs::read_to_string(&path).unwrap());
                }
            }
        }
        files
    }

    #[test]
    fn test_assemble_layout() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        let report = OutputAssembler::new(config(out.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap();

        let files = read_tree(&out);
        let names: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "document/odes.xml",
                "document/odes/1.xml",
                "document/odes/2.xml",
                "document/odes/unit-7.xml",
                "navigation/odes.json",
                "navigation/odes/1.json",
                "navigation/odes/2.json",
                "navigation/odes/unit-7.json",
                "odes.json",
            ]
        );
        assert_eq!(report.files, 9);
        assert_eq!(report.units, 3);
    }

    #[test]
    fn test_assemble_contents_agree() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        OutputAssembler::new(config(out.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap();
        let files = read_tree(&out);

        let fragment = &files["document/odes/unit-7.xml"];
        assert!(fragment.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<TEI"));
        assert!(fragment.contains(r#"<div type="book" xml:id="unit-7">"#));

        let whole = &files["document/odes.xml"];
        assert!(whole.contains(r#"<div type="poem" xml:id="1">"#));

        let nav: serde_json::Value = serde_json::from_str(&files["navigation/odes.json"]).unwrap();
        let ids: Vec<_> = nav["member"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["identifier"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, vec!["unit-7", "1", "2"]);

        let descriptor: serde_json::Value = serde_json::from_str(&files["odes.json"]).unwrap();
        assert_eq!(descriptor["title"], "Odes");
        assert_eq!(descriptor["units"], 3);
    }

    #[test]
    fn test_assemble_flat() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        let conversion = convert(
            TEI,
            &ConvertOptions {
                mode: NavigationMode::Flat,
                id_prefix: "p".to_owned(),
                ..ConvertOptions::default()
            },
        )
        .unwrap();
        OutputAssembler::new(config(out.clone(), false))
            .assemble("odes", &conversion)
            .unwrap();
        let files = read_tree(&out);

        // Leading head text becomes the first unit.
        let unit: serde_json::Value = serde_json::from_str(&files["navigation/odes/p2.json"]).unwrap();
        assert_eq!(unit["unit"]["facsimile"], "img1");
        assert_eq!(unit["previous"]["identifier"], "p1");
        assert_eq!(unit["next"]["identifier"], "p3");
        assert!(files["document/odes/p3.xml"].contains("<l>third</l>"));
    }

    #[test]
    fn test_assemble_is_byte_identical() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");

        OutputAssembler::new(config(first.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap();
        OutputAssembler::new(config(second.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap();

        assert_eq!(read_tree(&first), read_tree(&second));
    }

    #[test]
    fn test_assemble_refuses_non_empty_target() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("keep.txt"), "mine").unwrap();

        let err = OutputAssembler::new(config(out.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap_err();

        assert!(matches!(err, BuildError::OutputExists(_)));
        assert_eq!(fs::read_to_string(out.join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn test_assemble_into_empty_target() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        fs::create_dir_all(&out).unwrap();

        let report = OutputAssembler::new(config(out.clone(), false))
            .assemble("odes", &hierarchical())
            .unwrap();

        assert_eq!(report.files, 9);
    }

    #[test]
    fn test_assemble_force_replaces_target() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.json"), "{}").unwrap();

        OutputAssembler::new(config(out.clone(), true))
            .assemble("odes", &hierarchical())
            .unwrap();

        assert!(!out.join("stale.json").exists());
        assert!(out.join("odes.json").exists());
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("dts")]);
    }

    #[test]
    fn test_assemble_encodes_identifiers() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("dts");
        let conversion = convert(
            r#"<TEI><text><div xml:id="a&#x20;b"/></text></TEI>"#,
            &ConvertOptions::default(),
        )
        .unwrap();

        OutputAssembler::new(config(out.clone(), false))
            .assemble("my doc", &conversion)
            .unwrap();

        assert!(out.join("document/my%20doc/a%20b.xml").exists());
        let nav = fs::read_to_string(out.join("navigation/my%20doc.json")).unwrap();
        assert!(nav.contains("https://x.test/dts/document/my%20doc/a%20b.xml"));
    }
}
