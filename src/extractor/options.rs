//! Extraction options builder
//!
//! Produces the deterministic configuration bag handed to the extraction
//! engine for every attempt of a job.

use crate::platforms::Platform;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Audio formats the engine may be asked to produce
pub const AUDIO_FORMATS: [&str; 4] = ["mp3", "m4a", "opus", "aac"];

/// Used for unrecognized quality labels
pub const DEFAULT_VIDEO_FORMAT: &str = "best[height<=1080]";

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const INSTAGRAM_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const INSTAGRAM_REFERER: &str = "https://www.instagram.com/";

const QUALITY_TABLE: [(&str, &str); 10] = [
    ("best", "best[height<=2160]"),
    ("worst", "worst"),
    ("4k", "best[height<=2160]"),
    ("1440p", "best[height<=1440]"),
    ("1080p", "best[height<=1080]"),
    ("720p", "best[height<=720]"),
    ("480p", "best[height<=480]"),
    ("360p", "best[height<=360]"),
    ("240p", "best[height<=240]"),
    ("180p", "best[height<=180]"),
];

/// Configuration bag consumed by the extraction engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOptions {
    pub format: String,
    pub extract_audio: bool,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub socket_timeout: u32,
    pub retries: u32,
    pub fragment_retries: u32,
    pub user_agent: String,
    pub http_headers: BTreeMap<String, String>,
    pub no_check_certificate: bool,
    pub write_info_json: bool,
    pub write_subtitles: bool,
    pub write_auto_subtitles: bool,
    pub no_color: bool,
    pub format_sort: Vec<String>,
    pub format_sort_force: bool,
    pub referer: Option<String>,
    pub age_limit: Option<u32>,
}

impl ExtractionOptions {
    /// Set the per-job output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// `{dir}/%(title)s.%(ext)s`
    pub fn output_template(&self) -> Option<String> {
        self.output_dir
            .as_deref()
            .map(|dir| format!("{}/%(title)s.%(ext)s", dir.display()))
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Flags for a metadata-only probe: transport and identity, no output or sidecars
    pub fn metadata_args(&self) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string(), "--skip-download".to_string()];
        args.extend(self.network_args());
        args
    }

    fn network_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push("--socket-timeout".to_string());
        args.push(self.socket_timeout.to_string());
        args.push("--retries".to_string());
        args.push(self.retries.to_string());
        args.push("--fragment-retries".to_string());
        args.push(self.fragment_retries.to_string());

        args.push("--user-agent".to_string());
        args.push(self.user_agent.clone());
        for (name, value) in &self.http_headers {
            if name.eq_ignore_ascii_case("user-agent") {
                continue;
            }
            args.push("--add-header".to_string());
            args.push(format!("{}:{}", name, value));
        }

        if let Some(referer) = &self.referer {
            args.push("--referer".to_string());
            args.push(referer.clone());
        }

        if self.no_check_certificate {
            args.push("--no-check-certificates".to_string());
        }
        if let Some(limit) = self.age_limit {
            args.push("--age-limit".to_string());
            args.push(limit.to_string());
        }

        args
    }

    /// Translate the bag into yt-dlp command-line flags
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.format.clone()];

        if self.extract_audio {
            args.push("-x".to_string());
            if let Some(format) = &self.audio_format {
                args.push("--audio-format".to_string());
                args.push(format.clone());
            }
            if let Some(quality) = &self.audio_quality {
                args.push("--audio-quality".to_string());
                args.push(quality.clone());
            }
        }

        if let Some(template) = self.output_template() {
            args.push("-o".to_string());
            args.push(template);
        }

        args.extend(self.network_args());

        if self.write_info_json {
            args.push("--write-info-json".to_string());
        }
        if self.write_subtitles {
            args.push("--write-subs".to_string());
        }
        if self.write_auto_subtitles {
            args.push("--write-auto-subs".to_string());
        }
        if self.no_color {
            args.push("--no-color".to_string());
        }

        if !self.format_sort.is_empty() {
            args.push("-S".to_string());
            args.push(self.format_sort.join(","));
            if self.format_sort_force {
                args.push("--format-sort-force".to_string());
            }
        }

        args
    }
}

/// Build the options bag for a platform, quality label and audio toggle
pub fn build(platform: Platform, quality: &str, audio_only: bool) -> ExtractionOptions {
    let mut options = baseline();

    if audio_only {
        options.format = "bestaudio/best".to_string();
        options.extract_audio = true;
        options.audio_format = Some(audio_format(quality).to_string());
        options.audio_quality = Some("0".to_string());
    } else {
        options.format = video_format(quality).to_string();
    }

    if platform == Platform::Instagram {
        apply_instagram_overlay(&mut options);
    }

    options
}

/// Requested audio format, or mp3 when outside the allow-list
pub fn audio_format(quality: &str) -> &'static str {
    AUDIO_FORMATS
        .iter()
        .find(|f| **f == quality)
        .copied()
        .unwrap_or("mp3")
}

/// Resolution constraint for a quality label
pub fn video_format(quality: &str) -> &'static str {
    QUALITY_TABLE
        .iter()
        .find(|(label, _)| *label == quality)
        .map(|(_, format)| *format)
        .unwrap_or(DEFAULT_VIDEO_FORMAT)
}

fn baseline() -> ExtractionOptions {
    let http_headers = headers(&[
        ("User-Agent", DESKTOP_USER_AGENT),
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-us,en;q=0.5"),
        ("Accept-Encoding", "gzip,deflate"),
        ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
        ("Connection", "keep-alive"),
    ]);

    ExtractionOptions {
        format: DEFAULT_VIDEO_FORMAT.to_string(),
        extract_audio: false,
        audio_format: None,
        audio_quality: None,
        output_dir: None,
        socket_timeout: 30,
        retries: 3,
        fragment_retries: 3,
        user_agent: DESKTOP_USER_AGENT.to_string(),
        http_headers,
        no_check_certificate: true,
        write_info_json: true,
        write_subtitles: true,
        write_auto_subtitles: true,
        no_color: true,
        format_sort: Vec::new(),
        format_sort_force: false,
        referer: None,
        age_limit: None,
    }
}

fn apply_instagram_overlay(options: &mut ExtractionOptions) {
    options.user_agent = INSTAGRAM_USER_AGENT.to_string();
    options.http_headers = headers(&[
        ("User-Agent", INSTAGRAM_USER_AGENT),
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("DNT", "1"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
        ("Cache-Control", "max-age=0"),
    ]);
    options.format_sort = ["res:1080", "res:720", "res:480", "res:360"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    options.format_sort_force = true;
    options.referer = Some(INSTAGRAM_REFERER.to_string());
    options.age_limit = Some(0);
}

fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_allow_list() {
        let opts = build(Platform::TikTok, "flac", true);
        assert_eq!(opts.audio_format.as_deref(), Some("mp3"));
        assert_eq!(opts.format, "bestaudio/best");
        assert!(opts.extract_audio);
        assert_eq!(opts.audio_quality.as_deref(), Some("0"));

        let opts = build(Platform::TikTok, "opus", true);
        assert_eq!(opts.audio_format.as_deref(), Some("opus"));
    }

    #[test]
    fn test_quality_table() {
        assert_eq!(build(Platform::Twitter, "best", false).format, "best[height<=2160]");
        assert_eq!(build(Platform::Twitter, "4k", false).format, "best[height<=2160]");
        assert_eq!(build(Platform::Twitter, "720p", false).format, "best[height<=720]");
        assert_eq!(build(Platform::Twitter, "180p", false).format, "best[height<=180]");
        assert_eq!(build(Platform::Twitter, "worst", false).format, "worst");
    }

    #[test]
    fn test_unknown_quality_defaults_to_1080p() {
        let opts = build(Platform::Snapchat, "9999p", false);
        assert_eq!(opts.format, "best[height<=1080]");
        assert!(!opts.extract_audio);
        assert_eq!(opts.audio_format, None);
    }

    #[test]
    fn test_baseline_robustness_settings() {
        let opts = build(Platform::TikTok, "best", false);
        assert_eq!(opts.socket_timeout, 30);
        assert_eq!(opts.retries, 3);
        assert_eq!(opts.fragment_retries, 3);
        assert!(opts.no_check_certificate);
        assert!(opts.write_info_json && opts.write_subtitles && opts.write_auto_subtitles);
        assert_eq!(opts.http_headers["Connection"], "keep-alive");
        assert!(opts.referer.is_none());
        assert!(opts.format_sort.is_empty());
    }

    #[test]
    fn test_instagram_overlay() {
        let opts = build(Platform::Instagram, "720p", false);
        assert_eq!(opts.format, "best[height<=720]");
        assert_eq!(opts.referer.as_deref(), Some("https://www.instagram.com/"));
        assert_eq!(opts.format_sort, vec!["res:1080", "res:720", "res:480", "res:360"]);
        assert!(opts.format_sort_force);
        assert_eq!(opts.age_limit, Some(0));
        assert_eq!(opts.http_headers["DNT"], "1");
        assert!(opts.user_agent.contains("Macintosh"));
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(
            build(Platform::Instagram, "best", true),
            build(Platform::Instagram, "best", true)
        );
    }

    #[test]
    fn test_output_template() {
        let opts = build(Platform::TikTok, "best", false).with_output_dir("/data/tiktok/abc");
        assert_eq!(
            opts.output_template().as_deref(),
            Some("/data/tiktok/abc/%(title)s.%(ext)s")
        );
        assert_eq!(build(Platform::TikTok, "best", false).output_template(), None);
    }

    #[test]
    fn test_to_args_audio() {
        let args = build(Platform::TikTok, "m4a", true)
            .with_output_dir("/d")
            .to_args();

        let joined = args.join(" ");
        assert!(joined.starts_with("-f bestaudio/best -x --audio-format m4a --audio-quality 0"));
        assert!(joined.contains("-o /d/%(title)s.%(ext)s"));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        assert!(args.contains(&"--write-info-json".to_string()));
        assert!(args.contains(&"Accept-Language:en-us,en;q=0.5".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("User-Agent:")));
    }

    #[test]
    fn test_to_args_instagram_sort() {
        let args = build(Platform::Instagram, "best", false).to_args();
        let pos = args.iter().position(|a| a == "-S").unwrap();
        assert_eq!(args[pos + 1], "res:1080,res:720,res:480,res:360");
        assert_eq!(args[pos + 2], "--format-sort-force");
        assert!(args.windows(2).any(|w| w[0] == "--age-limit" && w[1] == "0"));
        assert!(args.windows(2).any(|w| w[0] == "--referer" && w[1] == INSTAGRAM_REFERER));
    }

    #[test]
    fn test_metadata_args_skip_output_and_sidecars() {
        let args = build(Platform::Instagram, "best", true)
            .with_output_dir("/d")
            .metadata_args();

        assert_eq!(&args[..2], ["--dump-json", "--skip-download"]);
        assert!(!args.contains(&"-o".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert!(!args.contains(&"--write-info-json".to_string()));
        assert!(args.contains(&"--referer".to_string()));
    }
}
