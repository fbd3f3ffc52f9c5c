//! Locating the active spec directory under the specs root.
//!
//! Resolution order:
//! 1. an explicit name (`--spec`)
//! 2. the current git branch, if a spec directory of that name exists
//! 3. the most recently modified spec directory

use anyhow::{Context, Result, bail};
use git2::Repository;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::debug;

/// Spec directories are conventionally named `NNN-short-name`.
static NUMBERED_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-").expect("valid spec name pattern"));

/// All spec directory names under `specs_dir`, sorted by name.
pub fn list_specs(specs_dir: &Path) -> Result<Vec<String>> {
    if !specs_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = std::fs::read_dir(specs_dir)
        .with_context(|| format!("Failed to read specs directory: {}", specs_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

/// The most recently modified spec directory.
///
/// Numbered directories win over others; ties on modification time go to the
/// lexically greater name so that `002-x` beats `001-y` on coarse clocks.
pub fn latest_spec(specs_dir: &Path) -> Result<Option<String>> {
    let names = list_specs(specs_dir)?;
    let numbered: Vec<&String> = names.iter().filter(|n| NUMBERED_SPEC.is_match(n)).collect();
    let candidates: Vec<&String> = if numbered.is_empty() {
        names.iter().collect()
    } else {
        numbered
    };

    let modified = |name: &str| -> SystemTime {
        specs_dir
            .join(name)
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };

    Ok(candidates
        .into_iter()
        .max_by(|a, b| modified(a).cmp(&modified(b)).then_with(|| a.cmp(b)))
        .cloned())
}

/// Short name of the checked-out branch, including an unborn one.
pub fn current_branch(project_dir: &Path) -> Option<String> {
    let repo = Repository::discover(project_dir).ok()?;
    if let Ok(head) = repo.head() {
        return head.shorthand().map(str::to_string);
    }
    // Fresh repository with no commits: HEAD is still a symbolic ref.
    let head = repo.find_reference("HEAD").ok()?;
    head.symbolic_target()
        .and_then(|target| target.strip_prefix("refs/heads/"))
        .map(str::to_string)
}

/// Resolve which spec to operate on. Returns `None` if there is nothing to pick.
pub fn resolve_spec(
    explicit: Option<&str>,
    project_dir: &Path,
    specs_dir: &Path,
) -> Result<Option<String>> {
    if let Some(name) = explicit {
        let name = name.trim().trim_end_matches('/');
        if name.is_empty() {
            bail!("Spec name must not be empty");
        }
        if !specs_dir.join(name).is_dir() {
            bail!(
                "Spec '{}' not found in {}. Available: {}",
                name,
                specs_dir.display(),
                list_specs(specs_dir)?.join(", ")
            );
        }
        return Ok(Some(name.to_string()));
    }

    if let Some(branch) = current_branch(project_dir)
        && specs_dir.join(&branch).is_dir()
    {
        debug!(branch = %branch, "spec resolved from git branch");
        return Ok(Some(branch));
    }

    let latest = latest_spec(specs_dir)?;
    if let Some(ref name) = latest {
        debug!(spec = %name, "spec resolved as most recent directory");
    }
    Ok(latest)
}
