use serde::Deserialize;

/// One downloadable artifact attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAsset {
    #[serde(default)]
    pub name: String,
    pub browser_download_url: String,
}

/// One release record as returned by the hosting API, kept only long enough
/// to be folded into a changelog entry or skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelease {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<RawAsset>,
}

/// Pick the download URL for a release: the first asset (in listed order)
/// whose URL ends with `target_extension`, or the release's web page when no
/// asset matches, so the user can still be pointed at a manual download.
///
/// When several assets share the extension, the first listed one wins.
#[must_use]
pub fn select_update_url(release: &RawRelease, target_extension: &str) -> String {
    release
        .assets
        .iter()
        .find(|asset| asset.browser_download_url.ends_with(target_extension))
        .map_or_else(
            || release.html_url.clone(),
            |asset| asset.browser_download_url.clone(),
        )
}
