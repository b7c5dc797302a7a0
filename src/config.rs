//! Analysis configuration.
//!
//! The host application owns settings storage and hands a plain
//! [`AnalysisConfig`] to this crate. Logical directory names must already
//! be resolved to literal paths; the path string is also the cache key for
//! rows recorded under that directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for one corpus analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Catalog subdirectory to load tag data from (default
    /// `danbooru.donmai.us`).
    pub tag_source: String,
    /// When false, the corpus pass is skipped entirely and the built
    /// models carry no usage data (default true).
    pub suggestions_enabled: bool,
    /// Catalog entries below this post count are dropped unless the
    /// corpus uses them (default 10).
    pub post_count_threshold: i64,
    /// Percentage of the analyzed image count below which a tag counts as
    /// low-frequency noise, 0 to 99 (default 1).
    pub low_frequency_threshold_percent: u8,
    /// Directories to scan for generated images.
    pub analysis_directories: Vec<PathBuf>,
    /// Newest-first cap on images per directory, -1 for unlimited
    /// (default 2000).
    pub analysis_image_count: i64,
    /// Root directory holding per-source catalog CSV files.
    pub catalog_dir: PathBuf,
    /// Tags always rendered with underscores by the host completion UI.
    /// Carried through the model verbatim, not used by analysis.
    pub always_underscore_tags: Vec<String>,
    /// Tags always rendered with spaces by the host completion UI.
    /// Carried through the model verbatim, not used by analysis.
    pub always_space_tags: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tag_source: "danbooru.donmai.us".to_string(),
            suggestions_enabled: true,
            post_count_threshold: 10,
            low_frequency_threshold_percent: 1,
            analysis_directories: Vec::new(),
            analysis_image_count: 2000,
            catalog_dir: PathBuf::from("tags"),
            always_underscore_tags: [
                "score_9",
                "score_8_up",
                "score_8",
                "score_7_up",
                "score_7",
                "score_6_up",
                "score_6",
                "score_5_up",
                "score_5",
                "score_4_up",
                "score_4",
                "source_pony",
                "source_furry",
                "source_cartoon",
                "source_anime",
                "rating_safe",
                "rating_questionable",
                "rating_explicit",
            ]
            .map(String::from)
            .to_vec(),
            always_space_tags: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Count threshold below which a tag is considered low-frequency for
    /// this pass. Negative when the image count is unlimited, which keeps
    /// every tag.
    #[must_use]
    pub fn low_frequency_threshold(&self) -> f64 {
        self.analysis_image_count as f64 * f64::from(self.low_frequency_threshold_percent) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.tag_source, "danbooru.donmai.us");
        assert!(config.suggestions_enabled);
        assert_eq!(config.post_count_threshold, 10);
        assert_eq!(config.low_frequency_threshold_percent, 1);
        assert_eq!(config.analysis_image_count, 2000);
    }

    #[test]
    fn low_frequency_threshold_scales_with_image_count() {
        let config = AnalysisConfig {
            analysis_image_count: 2000,
            low_frequency_threshold_percent: 1,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.low_frequency_threshold(), 20.0);
    }

    #[test]
    fn unlimited_image_count_disables_the_low_frequency_filter() {
        let config = AnalysisConfig {
            analysis_image_count: -1,
            ..AnalysisConfig::default()
        };
        assert!(config.low_frequency_threshold() < 0.0);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tag_source, config.tag_source);
        assert_eq!(back.analysis_image_count, config.analysis_image_count);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.post_count_threshold, 10);
        assert!(config.analysis_directories.is_empty());
    }
}
