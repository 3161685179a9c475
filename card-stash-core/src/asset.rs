//! The asset view of a card's small image.

/// Artifacts at or below this size are treated as corrupt (error pages,
/// truncated transfers).
pub const MIN_ASSET_BYTES: u64 = 100;

/// Where a card's small image currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    /// Still a remote URI, or no reference at all.
    Remote,
    /// A local artifact path, as written in the document.
    LocalPath(String),
    /// The shared placeholder image.
    Placeholder,
}

/// One acquirable image of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Card position inside the record.
    pub index: usize,
    /// Filesystem-safe identifier used to name the artifact.
    pub id: String,
    /// Remote URI to acquire from, when one is known.
    pub source: Option<String>,
    /// Page the card is displayed on, for render-based extraction.
    pub page_url: Option<String>,
    pub state: AssetState,
}

/// Make a card id safe for use in a file name (`base1/58 a` -> `base1-58_a`).
pub fn sanitize_id(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            ' ' => '_',
            c => c,
        })
        .collect()
}

/// Reduce a card name to `[A-Za-z0-9_]`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.chars().all(|c| c == '_') {
        String::new()
    } else {
        cleaned
    }
}
