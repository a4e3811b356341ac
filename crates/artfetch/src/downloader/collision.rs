//! Filename collision handling
//!
//! When a target file already exists the run either skips it or asks the
//! caller for a different base name through [`RenamePrompt`]. The prompt is
//! asked again for as long as the answer also collides; only an explicit
//! skip ends the loop without a name.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::core::files::path_exists;

/// Answer to a rename prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameDecision {
    /// Use this base name (without extension)
    Rename(String),
    /// Skip this item
    Skip,
    /// Skip this item and every later collision of the run without asking
    SkipAll,
}

impl From<Option<String>> for RenameDecision {
    fn from(answer: Option<String>) -> Self {
        match answer {
            Some(name) if !name.trim().is_empty() => RenameDecision::Rename(name),
            _ => RenameDecision::Skip,
        }
    }
}

/// Source of replacement names for colliding files
///
/// Called synchronously from the download loop with the base name that
/// collided. Implemented for any `FnMut(&str) -> RenameDecision`.
pub trait RenamePrompt {
    fn prompt_for_rename(&mut self, base_name: &str) -> RenameDecision;
}

impl<F> RenamePrompt for F
where
    F: FnMut(&str) -> RenameDecision,
{
    fn prompt_for_rename(&mut self, base_name: &str) -> RenameDecision {
        self(base_name)
    }
}

/// Prompt that never renames, for non-interactive runs
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipPrompt;

impl RenamePrompt for SkipPrompt {
    fn prompt_for_rename(&mut self, _base_name: &str) -> RenameDecision {
        RenameDecision::Skip
    }
}

/// Mutable state of one run that collision handling reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Starts as the job's setting; "skip all" turns it on for the rest of the run
    pub skip_existing: bool,
}

impl RunContext {
    pub fn new(skip_existing: bool) -> Self {
        Self { skip_existing }
    }
}

/// Where an item should be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionResolution {
    /// Target was free
    Free(PathBuf),
    /// Target was taken; the user picked `file_name` instead
    Renamed { path: PathBuf, file_name: String },
    /// Do not write this item
    Skip { declined: bool },
}

/// Decide the write target for `<base_name><extension>` inside `dir`
pub async fn resolve_collision(
    dir: &Path,
    base_name: &str,
    extension: &str,
    context: &mut RunContext,
    prompt: &mut dyn RenamePrompt,
) -> CollisionResolution {
    let target = dir.join(format!("{}{}", base_name, extension));
    if !path_exists(&target).await {
        return CollisionResolution::Free(target);
    }

    if context.skip_existing {
        debug!("{} exists, skipping", target.display());
        return CollisionResolution::Skip { declined: false };
    }

    loop {
        match prompt.prompt_for_rename(base_name) {
            RenameDecision::Skip => return CollisionResolution::Skip { declined: true },
            RenameDecision::SkipAll => {
                debug!("Skip all requested; later collisions are skipped silently");
                context.skip_existing = true;
                return CollisionResolution::Skip { declined: true };
            }
            RenameDecision::Rename(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return CollisionResolution::Skip { declined: true };
                }

                let file_name = format!("{}{}", name, extension);
                let candidate = dir.join(&file_name);
                if path_exists(&candidate).await {
                    debug!("{} exists as well, asking again", candidate.display());
                    continue;
                }
                return CollisionResolution::Renamed {
                    path: candidate,
                    file_name,
                };
            }
        }
    }
}
