use chrono::DateTime;
use log::debug;

use crate::release::{RawRelease, select_update_url};
use crate::version::VersionComparator;

/// One release the running program can update to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Normalized version string (leading `v`/`.v` stripped from the tag).
    pub version: String,
    /// Release notes body, as published (markdown or plain text).
    pub changes: String,
    /// Human-readable publication date, empty when the feed omitted it.
    pub date: String,
    /// Download URL for the platform artifact, or the release page when the
    /// release ships no matching artifact.
    pub update_url: String,
    pub is_prerelease: bool,
}

/// Releases newer than the running version, newest first. Empty means
/// "already up to date" and is a normal outcome, not an error.
pub type ChangeLog = Vec<VersionEntry>;

pub(crate) fn normalize_tag(tag: &str) -> &str {
    tag.strip_prefix(".v")
        .or_else(|| tag.strip_prefix('v'))
        .unwrap_or(tag)
}

/// Fold the raw release feed into a changelog.
///
/// The feed is scanned in the order supplied by the hosting API, which lists
/// releases newest first. Drafts are skipped. The scan stops at the first
/// non-draft release that is not strictly newer than `current_version`;
/// everything after it is older still and never inspected.
pub fn build_changelog(
    releases: &[RawRelease],
    current_version: &str,
    comparator: &VersionComparator,
    target_extension: &str,
) -> ChangeLog {
    let mut changelog = ChangeLog::new();

    for release in releases {
        if release.draft {
            debug!("Skipping draft release {}", release.tag_name);
            continue;
        }

        let version = normalize_tag(&release.tag_name);
        if !comparator.less_than(current_version, version) {
            break;
        }

        changelog.push(VersionEntry {
            version: version.to_string(),
            changes: release.body.clone().unwrap_or_default(),
            date: format_release_date(release.created_at.as_deref()),
            update_url: select_update_url(release, target_extension),
            is_prerelease: release.prerelease,
        });
    }

    debug!(
        "Changelog holds {} release(s) newer than {current_version}",
        changelog.len()
    );
    changelog
}

fn format_release_date(created_at: Option<&str>) -> String {
    let Some(raw) = created_at else {
        return String::new();
    };

    DateTime::parse_from_rfc3339(raw).map_or_else(
        |_| raw.to_string(),
        |date| date.format("%-d %B %Y").to_string(),
    )
}
