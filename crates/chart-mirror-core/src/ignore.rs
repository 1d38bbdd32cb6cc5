//! `.helmignore` rules
//!
//! Same matching as Helm: rules are checked in file order and the first one
//! that fires excludes the path. A rule without `/` matches the file name, a
//! rule with `/` matches the path relative to the chart root. A trailing `/`
//! restricts the rule to directories and a leading `!` inverts it.

use glob::{MatchOptions, Pattern};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Ignore file read from the root of a chart directory
pub const IGNORE_FILE: &str = ".helmignore";

/// Hidden files under `templates/` never reach a chart
const DEFAULT_RULES: &[&str] = &["templates/.?*"];

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    negate: bool,
    dir_only: bool,
    full_path: bool,
}

impl Rule {
    fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (negate, rest) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let (dir_only, rest) = match rest.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Ok(None);
        }

        let pattern = Pattern::new(rest).map_err(|e| CoreError::IgnorePattern {
            pattern: line.to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(Self {
            pattern,
            negate,
            dir_only,
            full_path: rest.contains('/') || line.starts_with('/'),
        }))
    }

    fn matches(&self, path: &str) -> bool {
        if self.full_path {
            return self.pattern.matches_with(path, MATCH);
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        self.pattern.matches_with(name, MATCH)
    }
}

/// Parsed `.helmignore`
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .filter_map(|line| Rule::parse(line).ok().flatten())
                .collect(),
        }
    }
}

impl IgnoreRules {
    /// Parse ignore rules; the default rules come first
    pub fn parse(content: &str) -> Result<Self> {
        let mut rules = Self::default();
        for line in content.lines() {
            if let Some(rule) = Rule::parse(line)? {
                rules.rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Rules of the chart directory at `dir`, defaults when it has none
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(IGNORE_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Whether `path` (relative, `/`-separated) is excluded from the chart
    pub fn ignored(&self, path: &str, is_dir: bool) -> bool {
        if path.is_empty() || path == "." {
            return false;
        }

        for rule in &self.rules {
            if rule.negate {
                if rule.dir_only && !is_dir {
                    return true;
                }
                if !rule.matches(path) {
                    return true;
                }
                continue;
            }

            if rule.dir_only && !is_dir {
                continue;
            }
            if rule.matches(path) {
                return true;
            }
        }
        false
    }
}
