//! Container format detection for downloaded audio.

use std::fmt;

use lofty::TagType;

use crate::models::Quality;

/// Container formats the tag writer can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Flac,
    Mp4,
}

impl AudioFormat {
    pub fn mime(self) -> &'static str {
        match self {
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Mp4 => "audio/mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Mp4 => "m4a",
        }
    }

    /// Suffix for staging temp files; lofty picks its parser from it.
    pub fn suffix(self) -> &'static str {
        match self {
            AudioFormat::Flac => ".flac",
            AudioFormat::Mp4 => ".m4a",
        }
    }

    pub fn tag_type(self) -> TagType {
        match self {
            AudioFormat::Flac => TagType::VorbisComments,
            AudioFormat::Mp4 => TagType::Mp4Ilst,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Flac => f.write_str("FLAC"),
            AudioFormat::Mp4 => f.write_str("MP4"),
        }
    }
}

/// Classify a downloaded stream. The transport content-type wins when it
/// names FLAC; otherwise the requested quality decides, because upstream
/// responses do not set content-type reliably.
pub fn detect(content_type: Option<&str>, quality: Quality) -> AudioFormat {
    if let Some(content_type) = content_type {
        if content_type.to_ascii_lowercase().contains("flac") {
            return AudioFormat::Flac;
        }
    }
    if quality.is_lossless() {
        AudioFormat::Flac
    } else {
        AudioFormat::Mp4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_naming_flac_wins() {
        assert_eq!(detect(Some("audio/flac"), Quality::Low), AudioFormat::Flac);
        assert_eq!(
            detect(Some("Audio/X-FLAC; charset=binary"), Quality::High),
            AudioFormat::Flac
        );
    }

    #[test]
    fn lossless_tiers_fall_back_to_flac() {
        assert_eq!(detect(None, Quality::Lossless), AudioFormat::Flac);
        assert_eq!(
            detect(Some("application/octet-stream"), Quality::HiResLossless),
            AudioFormat::Flac
        );
    }

    #[test]
    fn lossy_tiers_fall_back_to_mp4() {
        assert_eq!(detect(None, Quality::High), AudioFormat::Mp4);
        assert_eq!(detect(Some("audio/mp4"), Quality::Low), AudioFormat::Mp4);
    }
}
