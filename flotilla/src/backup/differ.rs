//! Configuration diffing.
//!
//! Two signals are computed over the cleaned line sets: set-semantic
//! added/removed (order-insensitive, duplicates collapse) and a positional
//! walk reporting same-position mismatches with context. Both matter: a
//! moved line shows up in added *and* removed, a rewritten line shows up
//! positionally.

use regex::Regex;

use crate::error::{PlatformError, Result};

/// Context lines kept either side of a positional mismatch.
const CONTEXT: usize = 3;

/// One same-position mismatch between current and backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedLine {
    /// Position in the cleaned current configuration.
    pub index: usize,

    /// The line as it reads now.
    pub current: String,

    /// The line as it read in the backup.
    pub backup: String,

    /// Cleaned current lines just before the mismatch.
    pub before: Vec<String>,

    /// Cleaned current lines just after the mismatch.
    pub after: Vec<String>,
}

/// Structured difference between two configurations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// Lines present now but absent from the backup. Sorted, deduplicated.
    pub added: Vec<String>,

    /// Lines present in the backup but absent now. Sorted, deduplicated.
    pub removed: Vec<String>,

    /// Same-position mismatches with context.
    pub changed_lines: Vec<ChangedLine>,
}

impl DiffResult {
    /// True iff anything differs.
    pub fn is_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.changed_lines.is_empty()
    }

    /// A diff consisting solely of everything in `current` being new.
    pub(crate) fn all_added(current: &[String]) -> Self {
        Self {
            added: current
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            removed: vec![],
            changed_lines: vec![],
        }
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                PlatformError::InvalidDefinition {
                    message: format!("bad ignore pattern '{}': {}", p, e),
                }
                .into()
            })
        })
        .collect()
}

/// Trim lines, drop blanks and anything matching an ignore pattern.
fn clean(lines: &[String], ignore: &[Regex]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !ignore.iter().any(|re| re.is_match(line)))
        .map(str::to_string)
        .collect()
}

/// Compare two configurations, ignoring blank lines and lines matching any
/// of `ignore_patterns`.
pub fn diff_configs(
    current: &[String],
    backup: &[String],
    ignore_patterns: &[String],
) -> Result<DiffResult> {
    let ignore = compile_patterns(ignore_patterns)?;
    let clean_current = clean(current, &ignore);
    let clean_backup = clean(backup, &ignore);

    let current_set: std::collections::BTreeSet<&str> =
        clean_current.iter().map(String::as_str).collect();
    let backup_set: std::collections::BTreeSet<&str> =
        clean_backup.iter().map(String::as_str).collect();

    let added = current_set
        .difference(&backup_set)
        .map(|s| s.to_string())
        .collect();
    let removed = backup_set
        .difference(&current_set)
        .map(|s| s.to_string())
        .collect();

    let mut changed_lines = Vec::new();
    for (i, line) in clean_current.iter().enumerate() {
        if i < clean_backup.len() && *line != clean_backup[i] {
            let start = i.saturating_sub(CONTEXT);
            let end = (i + CONTEXT + 1).min(clean_current.len());
            changed_lines.push(ChangedLine {
                index: i,
                current: line.clone(),
                backup: clean_backup[i].clone(),
                before: clean_current[start..i].to_vec(),
                after: clean_current[i + 1..end].to_vec(),
            });
        }
    }

    Ok(DiffResult {
        added,
        removed,
        changed_lines,
    })
}

/// Whether two configurations are identical verbatim, after stripping
/// blank lines and lines matching `volatile_patterns`.
///
/// Stricter than [`diff_configs`]: sequence equality, not set equality.
pub fn check_identity(
    current: &[String],
    backup: &[String],
    volatile_patterns: &[String],
) -> Result<bool> {
    let volatile = compile_patterns(volatile_patterns)?;
    Ok(clean(current, &volatile) == clean(backup, &volatile))
}
