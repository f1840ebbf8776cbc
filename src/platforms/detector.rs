//! URL to platform detection
//!
//! Pattern groups are evaluated in a fixed order and the first matching group
//! wins, so ambiguous short-link domains always resolve the same way.

use crate::platforms::Platform;
use tracing::debug;

const PATTERN_GROUPS: [(Platform, &[&str]); 4] = [
    (Platform::TikTok, &["tiktok.com", "vm.tiktok.com", "vt.tiktok.com"]),
    (Platform::Instagram, &["instagram.com", "instagr.am"]),
    (Platform::Twitter, &["twitter.com", "x.com", "t.co"]),
    (Platform::Snapchat, &["snapchat.com", "snap.com"]),
];

/// Detect the hosting platform of a URL, case-insensitively
pub fn detect(url: &str) -> Option<Platform> {
    let lowered = url.trim().to_lowercase();
    let host = host_of(&lowered);

    for (platform, patterns) in PATTERN_GROUPS {
        let matched = patterns.iter().any(|pattern| match &host {
            Some(host) => host_matches(host, pattern),
            None => contains_domain(&lowered, pattern),
        });

        if matched {
            debug!("Detected platform {} for {}", platform, url);
            return Some(platform);
        }
    }

    None
}

/// Extract the platform content id from the URL path, when the platform has one
pub fn content_id(url: &str, platform: Platform) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();

    let after = |marker: &str| -> Option<String> {
        let pos = segments.iter().position(|s| *s == marker)?;
        segments.get(pos + 1).map(|s| s.to_string())
    };

    match platform {
        Platform::TikTok => after("video").filter(|id| id.chars().all(|c| c.is_ascii_digit())),
        Platform::Instagram => after("p").or_else(|| after("reel")),
        Platform::Twitter => after("status").filter(|id| id.chars().all(|c| c.is_ascii_digit())),
        Platform::Snapchat => None,
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.trim_start_matches("www.").to_string())
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Fallback for strings that do not parse as URLs ("tiktok.com/@user/video/1")
fn contains_domain(text: &str, domain: &str) -> bool {
    text.match_indices(domain).any(|(idx, _)| {
        let before = text[..idx].chars().next_back();
        let after = text[idx + domain.len()..].chars().next();
        let left_ok = before.map_or(true, |c| !c.is_ascii_alphanumeric() && c != '-');
        let right_ok = after.map_or(true, |c| !c.is_ascii_alphanumeric() && c != '-' && c != '.');
        left_ok && right_ok
    })
}
