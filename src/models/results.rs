use serde::{Deserialize, Serialize};

/// Artifacts produced by a completed job, as returned by
/// `GET /api/v1/projects/{id}/results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPayload {
    #[serde(default)]
    pub main_video: Option<MediaAsset>,
    #[serde(default)]
    pub shorts: Vec<ShortClip>,
    #[serde(default)]
    pub subtitles: Option<MediaAsset>,
}

/// A single downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
}

/// A generated short clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortClip {
    pub filename: String,
    pub url: String,
}

impl ResultsPayload {
    /// Human-readable summary printed by the CLI after a successful run.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        if let Some(main) = &self.main_video {
            out.push_str(&format!("Main Video: {}\n", main.url));
        }

        if !self.shorts.is_empty() {
            out.push_str(&format!("Shorts ({} generated):\n", self.shorts.len()));
            for short in &self.shorts {
                out.push_str(&format!("- {}: {}\n", short.filename, short.url));
            }
        }

        if let Some(subtitles) = &self.subtitles {
            out.push_str(&format!("Subtitles: {}\n", subtitles.url));
        }

        if out.is_empty() {
            out.push_str("No artifacts reported.\n");
        }

        out
    }
}
