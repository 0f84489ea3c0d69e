//! Package-to-script mapping file parsing and hook script loading.
//!
//! Format, one mapping per line:
//!
//! ```text
//! # comment line, ignored
//! <package_identifier> <script_file_path>
//! ```
//!
//! Every non-comment line must contain exactly two whitespace-separated
//! tokens. Script contents are read once per distinct path and shared
//! across all packages referencing that path. Any failure aborts startup
//! before monitoring begins; there is no partial success.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{AppError, Result};

/// One monitored-package specification produced by the loader.
///
/// Duplicate package names across config lines are preserved as independent
/// supervision slots, not deduplicated.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    /// Application package identifier, matched against process names.
    pub name: String,
    /// Hook script text, shared by reference between packages that name the
    /// same script file. Read-only after load.
    pub script: Arc<str>,
}

/// Load the mapping file at `path`, reading scripts from the file system.
///
/// # Errors
///
/// Returns `AppError::Config` if the config file cannot be read, any line
/// is malformed, or any referenced script cannot be read.
pub fn load(path: &Path) -> Result<Vec<PackageSpec>> {
    let raw = fs::read_to_string(path).map_err(|err| {
        AppError::Config(format!("cannot open config file {}: {err}", path.display()))
    })?;
    parse_with_reader(&raw, |script_path| fs::read_to_string(script_path))
}

/// Parse config text, resolving script paths through `read_script`.
///
/// `read_script` is called exactly once per distinct script path; the seam
/// exists so tests can count reads and inject failures.
///
/// # Errors
///
/// Returns `AppError::Config` naming the 1-based line number and raw line
/// content for malformed lines, or the failing script path.
pub fn parse_with_reader<R>(raw: &str, mut read_script: R) -> Result<Vec<PackageSpec>>
where
    R: FnMut(&Path) -> std::io::Result<String>,
{
    let mut scripts: HashMap<PathBuf, Arc<str>> = HashMap::new();
    let mut packages = Vec::new();

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;

        // Only lines whose first raw character is '#' are comments.
        if line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(package), Some(script_path), None) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(AppError::Config(format!(
                "malformed mapping at line {line_number} ({}): \
                 expected `<package_identifier> <script_file_path>`",
                line.trim()
            )));
        };

        let script_path = Path::new(script_path);
        let script = match scripts.get(script_path) {
            Some(cached) => Arc::clone(cached),
            None => {
                let text = read_script(script_path).map_err(|err| {
                    AppError::Config(format!(
                        "cannot read script {} (line {line_number}): {err}",
                        script_path.display()
                    ))
                })?;
                let shared: Arc<str> = text.into();
                scripts.insert(script_path.to_path_buf(), Arc::clone(&shared));
                shared
            }
        };

        packages.push(PackageSpec {
            name: package.to_owned(),
            script,
        });
    }

    Ok(packages)
}
