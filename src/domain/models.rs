use std::path::PathBuf;

use serde::Deserialize;

/// A video file discovered by the scanner, together with the search query
/// derived from its filename. Immutable once scanned.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub path: PathBuf,
    pub query: SearchQuery,
}

impl VideoFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Destination path: same directory, same stem, `.srt` extension.
    /// No language suffix is ever appended, so players pick it up by name.
    pub fn target_srt(&self) -> PathBuf {
        self.path.with_extension("srt")
    }
}

/// Title and optional year extracted from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub year: Option<u16>,
}

/// One search hit from the catalog. API ordering is authoritative and
/// preserved; nothing ever re-sorts these.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleCandidate {
    #[serde(rename = "movieId")]
    pub id: u64,
    pub title: String,
    #[serde(rename = "releaseYear", default)]
    pub year: Option<u16>,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
}

impl TitleCandidate {
    pub fn describe(&self, index: usize) -> String {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        let media_type = self.media_type.as_deref().unwrap_or("?");
        format!("[{}] {} ({}) - {}", index + 1, self.title, year, media_type)
    }
}

/// One subtitle entry for a chosen title.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleCandidate {
    #[serde(rename = "subtitleId")]
    pub id: u64,
    #[serde(rename = "releaseInfo", default)]
    pub release_info: ReleaseInfo,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(rename = "hearingImpaired", default)]
    pub hearing_impaired: Option<bool>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "fileType", default)]
    pub file_type: Option<String>,
}

impl SubtitleCandidate {
    pub fn describe(&self, index: usize) -> String {
        let mut parts = vec![format!("[{}] {}", index + 1, self.release_info.summary())];
        if let Some(rating) = &self.rating {
            if rating.total > 0 {
                parts.push(format!("rating {}/{}", rating.good, rating.total));
            }
        }
        if let Some(hi) = self.hearing_impaired {
            parts.push(format!("HI: {}", if hi { "yes" } else { "no" }));
        }
        if let Some(downloads) = self.downloads {
            parts.push(format!("{downloads} downloads"));
        }
        parts.join(" | ")
    }
}

/// The API serves `releaseInfo` as either a list of release names or a
/// single string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReleaseInfo {
    Many(Vec<String>),
    One(String),
}

impl Default for ReleaseInfo {
    fn default() -> Self {
        ReleaseInfo::Many(Vec::new())
    }
}

impl ReleaseInfo {
    /// Short display form: up to three release names, or "N/A".
    pub fn summary(&self) -> String {
        let text = match self {
            ReleaseInfo::Many(names) => names
                .iter()
                .take(3)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            ReleaseInfo::One(name) => name.chars().take(60).collect(),
        };
        if text.is_empty() {
            "N/A".to_string()
        } else {
            text
        }
    }

    pub fn entries(&self) -> Vec<&str> {
        match self {
            ReleaseInfo::Many(names) => names.iter().map(String::as_str).collect(),
            ReleaseInfo::One(name) => vec![name.as_str()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub good: u64,
    #[serde(default)]
    pub total: u64,
}

/// Final state of one video file. Exactly one of these is recorded per
/// scanned file, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success(PathBuf),
    Skipped(String),
    Failed(String),
}

/// Per-run tally printed at the end, even when every file failed.
#[derive(Debug, Default)]
pub struct RunSummary {
    outcomes: Vec<(String, RunOutcome)>,
}

impl RunSummary {
    pub fn record(&mut self, file_name: String, outcome: RunOutcome) {
        self.outcomes.push((file_name, outcome));
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Success(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&RunOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn print(&self) {
        println!();
        println!("Summary:");
        println!("  success : {}", self.success());
        println!("  skipped : {}", self.skipped());
        println!("  failed  : {}", self.failed());
    }
}
