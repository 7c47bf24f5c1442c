//! Peer software version checks.

use semver::{Version, VersionReq};

use satchel_core::error::AppError;

/// A semver requirement applied to the versions peers report.
///
/// Reported versions are often not strict semver (`0.16`, `0.16.0b3`,
/// `v0.17.1-dev+git.12`), so they are reduced to `major.minor.patch`
/// before matching. Pre-release and build suffixes are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFilter {
    requirement: VersionReq,
}

impl VersionFilter {
    /// Parse a requirement such as `>=0.16.0`.
    pub fn parse(requirement: &str) -> Result<Self, AppError> {
        let requirement = VersionReq::parse(requirement).map_err(|e| {
            AppError::configuration(format!("Invalid version requirement '{requirement}': {e}"))
        })?;
        Ok(Self { requirement })
    }

    /// Whether a reported version satisfies the requirement. Unparseable
    /// versions never match.
    pub fn matches(&self, reported: &str) -> bool {
        normalize(reported).is_some_and(|version| self.requirement.matches(&version))
    }
}

impl std::fmt::Display for VersionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.requirement)
    }
}

/// Reduce a reported version to `major.minor.patch`.
pub fn normalize(reported: &str) -> Option<Version> {
    let trimmed = reported.trim().trim_start_matches(['v', 'V']);
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();

    let mut parts = [0u64; 3];
    let mut seen = 0;
    for (slot, component) in parts.iter_mut().zip(core.split('.')) {
        let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            break;
        }
        *slot = digits.parse().ok()?;
        seen += 1;
    }

    if seen == 0 {
        return None;
    }
    Some(Version::new(parts[0], parts[1], parts[2]))
}
