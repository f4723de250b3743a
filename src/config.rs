use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_FILE_TYPE_FILTER: &str = "jpg,jpeg,png,gif,webp,heic";

/// Fade used for manual navigation, short so the frame stays responsive.
pub const MANUAL_FADE: Duration = Duration::from_millis(50);

/// How long touch-revealed navigation buttons stay visible.
pub const TOUCH_REVEAL: Duration = Duration::from_millis(2500);

/// Intervals below this still work but make the frame feel frantic.
const RECOMMENDED_MIN_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideShowMode {
    #[default]
    Random,
    NameAscending,
    NameDescending,
}

impl SlideShowMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::NameAscending => "name-ascending",
            Self::NameDescending => "name-descending",
        }
    }
}

impl fmt::Display for SlideShowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive file extension allow-list parsed from a comma list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FileTypeFilter {
    extensions: Vec<String>,
}

impl FileTypeFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        let extensions: Vec<String> = raw
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        ensure!(
            !extensions.is_empty(),
            "file-type-filter cannot be empty (default types are {DEFAULT_FILE_TYPE_FILTER})"
        );
        Ok(Self { extensions })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// True when the identifier ends in `.<ext>` for one of the allowed extensions.
    pub fn matches(&self, identifier: &str) -> bool {
        let Some((stem, ext)) = identifier.rsplit_once('.') else {
            return false;
        };
        if stem.is_empty() || ext.contains('/') || ext.contains('\\') {
            return false;
        }
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

impl TryFrom<String> for FileTypeFilter {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).map_err(|err| err.to_string())
    }
}

impl Default for FileTypeFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_FILE_TYPE_FILTER
                .split(',')
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory scanned recursively for images.
    pub images_source: PathBuf,
    /// Minimum time between automatic image changes, in ms.
    pub slide_show_interval: u64,
    /// Order in which images are picked.
    pub slide_show_mode: SlideShowMode,
    /// Pause of the automatic rotation after a manual navigation, in ms.
    pub delay_on_manual_navigation: u64,
    /// Crossfade duration in ms; 0 swaps images without animation.
    pub fade_duration: u64,
    /// Comma-separated list of accepted file extensions.
    pub file_type_filter: FileTypeFilter,
    /// Number of shown images remembered for previous/next navigation.
    pub max_history_size: usize,
    /// Show the first image on the first refresh signal instead of after one interval.
    pub start_immediately: bool,
    /// Raise the default log level to debug.
    pub debug_logs_enabled: bool,
    /// Upper bound on reading the candidate list and on resolving an image.
    #[serde(with = "humantime_serde")]
    pub source_timeout: Duration,
    /// Period of the host refresh signal driving the slideshow.
    #[serde(with = "humantime_serde")]
    pub refresh_signal_interval: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            images_source: PathBuf::from("/media/photo-frame-images"),
            slide_show_interval: 2000,
            slide_show_mode: SlideShowMode::default(),
            delay_on_manual_navigation: 10_000,
            fade_duration: 1000,
            file_type_filter: FileTypeFilter::default(),
            max_history_size: 10,
            start_immediately: false,
            debug_logs_enabled: false,
            source_timeout: Duration::from_secs(10),
            refresh_signal_interval: Duration::from_millis(500),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.images_source.as_os_str().is_empty(),
            "images-source must not be empty"
        );
        ensure!(
            self.slide_show_interval > 0,
            "slide-show-interval must be greater than zero"
        );
        ensure!(
            self.max_history_size >= 1,
            "max-history-size must be at least 1"
        );
        ensure!(
            !self.file_type_filter.extensions().is_empty(),
            "file-type-filter cannot be empty"
        );
        ensure!(
            self.source_timeout > Duration::ZERO,
            "source-timeout must be positive"
        );
        ensure!(
            self.refresh_signal_interval > Duration::ZERO,
            "refresh-signal-interval must be positive"
        );
        if self.slide_show_interval < RECOMMENDED_MIN_INTERVAL_MS {
            warn!(
                interval_ms = self.slide_show_interval,
                recommended_ms = RECOMMENDED_MIN_INTERVAL_MS,
                "slide-show-interval is below the recommended minimum"
            );
        }
        Ok(self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
            .validated()
            .context("invalid configuration values")
    }

    pub fn slideshow_options(&self) -> SlideshowOptions {
        SlideshowOptions {
            interval: Duration::from_millis(self.slide_show_interval),
            mode: self.slide_show_mode,
            manual_delay: Duration::from_millis(self.delay_on_manual_navigation),
            fade: Duration::from_millis(self.fade_duration),
            manual_fade: MANUAL_FADE,
            file_filter: self.file_type_filter.clone(),
            max_history: self.max_history_size.max(1),
            start_immediately: self.start_immediately,
            source_timeout: self.source_timeout,
        }
    }
}

/// Resolved parameters consumed by the navigation engine.
#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub interval: Duration,
    pub mode: SlideShowMode,
    pub manual_delay: Duration,
    pub fade: Duration,
    pub manual_fade: Duration,
    pub file_filter: FileTypeFilter,
    pub max_history: usize,
    pub start_immediately: bool,
    pub source_timeout: Duration,
}

impl Default for SlideshowOptions {
    fn default() -> Self {
        Configuration::default().slideshow_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_extension_case_insensitively() {
        let filter = FileTypeFilter::parse("jpg, PNG,.webp").unwrap();
        assert!(filter.matches("/media/a/IMG_0001.JPG"));
        assert!(filter.matches("holiday.png"));
        assert!(filter.matches("x.webp"));
        assert!(!filter.matches("notes.txt"));
        assert!(!filter.matches("jpg"));
        assert!(!filter.matches("dir.jpg/readme"));
    }

    #[test]
    fn filter_rejects_empty_lists() {
        assert!(FileTypeFilter::parse("").is_err());
        assert!(FileTypeFilter::parse(" , ,").is_err());
    }

    #[test]
    fn options_carry_millisecond_fields_as_durations() {
        let cfg = Configuration {
            slide_show_interval: 5000,
            fade_duration: 0,
            ..Configuration::default()
        };
        let options = cfg.slideshow_options();
        assert_eq!(options.interval, Duration::from_secs(5));
        assert_eq!(options.fade, Duration::ZERO);
        assert_eq!(options.manual_fade, MANUAL_FADE);
        assert_eq!(options.manual_delay, Duration::from_secs(10));
    }
}
