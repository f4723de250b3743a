use rust_photo_slideshow::config::{Configuration, SlideShowMode};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
images-source: "/photos"
slide-show-interval: 8000
slide-show-mode: name-descending
delay-on-manual-navigation: 30000
fade-duration: 0
file-type-filter: "jpg, png"
max-history-size: 25
start-immediately: true
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.images_source, PathBuf::from("/photos"));
    assert_eq!(cfg.slide_show_mode, SlideShowMode::NameDescending);
    assert_eq!(cfg.file_type_filter.extensions(), ["jpg", "png"]);

    let options = cfg.validated().unwrap().slideshow_options();
    assert_eq!(options.interval, Duration::from_secs(8));
    assert_eq!(options.manual_delay, Duration::from_secs(30));
    assert_eq!(options.fade, Duration::ZERO);
    assert_eq!(options.max_history, 25);
    assert!(options.start_immediately);
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let cfg: Configuration = serde_yaml::from_str("images-source: /p\n").unwrap();
    assert_eq!(cfg.slide_show_interval, 2000);
    assert_eq!(cfg.slide_show_mode, SlideShowMode::Random);
    assert_eq!(cfg.delay_on_manual_navigation, 10_000);
    assert_eq!(cfg.fade_duration, 1000);
    assert_eq!(cfg.max_history_size, 10);
    assert!(!cfg.start_immediately);
    assert!(!cfg.debug_logs_enabled);
    assert!(cfg.file_type_filter.matches("photo.heic"));
    assert_eq!(cfg.source_timeout, Duration::from_secs(10));
    assert_eq!(cfg.refresh_signal_interval, Duration::from_millis(500));
}

#[test]
fn humantime_durations_are_accepted() {
    let yaml = r#"
images-source: /p
source-timeout: 3s
refresh-signal-interval: 250ms
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.source_timeout, Duration::from_secs(3));
    assert_eq!(cfg.refresh_signal_interval, Duration::from_millis(250));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = serde_yaml::from_str::<Configuration>("images-source: /p\nshuffle: yes\n");
    assert!(err.is_err());
}

#[test]
fn unknown_mode_is_rejected() {
    let err = serde_yaml::from_str::<Configuration>("slide-show-mode: by-date\n");
    assert!(err.is_err());
}

#[test]
fn empty_file_type_filter_is_rejected() {
    let err = serde_yaml::from_str::<Configuration>("file-type-filter: \" , \"\n").unwrap_err();
    assert!(err.to_string().contains("file-type-filter"), "{err}");
}

#[test]
fn zero_history_fails_validation() {
    let cfg: Configuration = serde_yaml::from_str("max-history-size: 0\n").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("max-history-size"), "{err}");
}

#[test]
fn load_reports_the_offending_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "slide-show-interval: 0").unwrap();
    let err = Configuration::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("slide-show-interval"), "{err:#}");

    let missing = Configuration::load("/definitely/not/here.yaml").unwrap_err();
    assert!(missing.to_string().contains("/definitely/not/here.yaml"));
}
