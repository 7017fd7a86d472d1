use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The three bounded-concurrency lanes. Short device/connection chatter goes
/// to `Fast`, heavy listings and transfers to `Bulk`, everything else to
/// `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneKind {
    Fast,
    Normal,
    Bulk,
}

impl LaneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LaneKind::Fast => "fast",
            LaneKind::Normal => "normal",
            LaneKind::Bulk => "bulk",
        }
    }
}

const FAST_PATTERNS: &[&str] = &[
    "devices",
    "connect",
    "disconnect",
    "tcpip",
    "ro.build.version",
    "ro.product.manufacturer",
];

fn bulk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            \b(?:ls|stat|find|du|push|pull)\b
            | \bpm\s+(?:list|path|dump)\b
            | \bdumpsys\s+package\b
            | \bpm\s+path\s+[a-zA-Z][\w]*(?:\.[\w]+)+
            ",
        )
        .expect("bulk lane regex")
    })
}

/// Routes a rendered command string to a lane. Substring matching is
/// deliberately approximate; callers that know their intent should submit to
/// an explicit lane instead. Unmatched commands always land in `Normal`.
pub fn classify(command: &str) -> LaneKind {
    if FAST_PATTERNS.iter().any(|pattern| command.contains(pattern)) {
        return LaneKind::Fast;
    }
    if bulk_regex().is_match(command) {
        return LaneKind::Bulk;
    }
    LaneKind::Normal
}
