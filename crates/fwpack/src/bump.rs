//! Version bump: increment `FIRMWARE_VERSION` in the source and the template together.
//!
//! Every input is read and validated before the first write, so a malformed
//! source or template leaves both files as they were. The source is written
//! first; if the template write then fails, the source is restored.

use crate::declaration::{self, Declaration};
use crate::output::write_atomic;
use crate::{
    BuildLayout, BumpKind, MetadataStore, PackageError, PackageResult, ProjectConfig,
    SemanticVersion,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files touched by a successful bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpReport {
    pub previous: SemanticVersion,
    pub current: SemanticVersion,
    pub source: PathBuf,
    /// `None` when the project has no metadata template.
    pub template: Option<PathBuf>,
}

/// Bump the firmware version of the project rooted at `project_dir`.
pub fn bump_project(project_dir: &Path, kind: BumpKind) -> PackageResult<BumpReport> {
    let config = ProjectConfig::load(project_dir)?;
    let layout = BuildLayout::from_config(project_dir, &config);

    if !layout.source.is_file() {
        return Err(PackageError::MissingFile(layout.source));
    }
    let source = fs::read_to_string(&layout.source)?;

    let previous = SemanticVersion::parse(&declaration::find(&source, Declaration::Version)?)?;
    let current = previous.bump(kind)?;
    let version = current.to_string();

    let rewritten = declaration::rewrite(&source, Declaration::Version, &version)?;
    let store = MetadataStore::new(&layout.metadata);
    let template = store.render_version(&version)?;

    write_atomic(&layout.source, rewritten.as_bytes())?;

    let template = match template {
        Some(document) => {
            if let Err(e) = write_atomic(store.path(), document.as_bytes()) {
                if let Err(restore) = write_atomic(&layout.source, source.as_bytes()) {
                    warn!(
                        path = %layout.source.display(),
                        error = %restore,
                        "could not restore source after template write failed"
                    );
                }
                return Err(e);
            }
            Some(layout.metadata)
        }
        None => None,
    };

    info!(from = %previous, to = %current, kind = kind.as_str(), "bumped firmware version");
    Ok(BumpReport {
        previous,
        current,
        source: layout.source,
        template,
    })
}
