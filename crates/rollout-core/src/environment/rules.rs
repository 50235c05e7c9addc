//! Branch pattern rules.

use serde::Serialize;

use crate::types::Environment;

/// A single branch pattern and the environment it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "lowercase")]
pub enum BranchRule {
    /// Branch name equals the pattern.
    Exact(&'static str),
    /// Branch name starts with the pattern.
    Prefix(&'static str),
}

/// Rules in priority order. The classes are disjoint, so order only matters
/// for documentation; the first match wins.
pub const BRANCH_RULES: [(BranchRule, Environment); 6] = [
    (BranchRule::Exact("main"), Environment::Production),
    (BranchRule::Exact("test"), Environment::Test),
    (BranchRule::Exact("dev"), Environment::Development),
    (BranchRule::Prefix("feature/"), Environment::Development),
    (BranchRule::Prefix("bug/"), Environment::Development),
    (BranchRule::Prefix("refactor/"), Environment::Development),
];

impl BranchRule {
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchRule::Exact(name) => branch == *name,
            BranchRule::Prefix(prefix) => branch.starts_with(prefix),
        }
    }
}

impl std::fmt::Display for BranchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchRule::Exact(name) => f.write_str(name),
            BranchRule::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Strip a leading `refs/heads/` so full refs match like short names.
pub fn normalize_branch(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

/// Find the rule and environment for a branch, if any.
pub fn match_branch(branch: &str) -> Option<(BranchRule, Environment)> {
    let branch = normalize_branch(branch);
    BRANCH_RULES
        .iter()
        .find(|(rule, _)| rule.matches(branch))
        .copied()
}
