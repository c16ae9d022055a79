//! Extension → descriptor lookup.
//!
//! A descriptor is the MIME type plus codec list the playback engine needs to
//! interpret a byte stream. The table is static; unknown extensions get the
//! generic MP4 video descriptor.

use phf::phf_map;
use std::fmt;

const MP4_VIDEO: &str = "video/mp4; codecs=\"avc1.42E01E, mp4a.40.2\"";
const WEBM_VIDEO: &str = "video/webm; codecs=\"vp8, vorbis\"";

static DESCRIPTORS: phf::Map<&'static str, &'static str> = phf_map! {
    "m4b" => "audio/mp4; codecs=\"mp4a.40.2\"",
    "mp3" => "audio/mpeg; codecs=\"mp3\"",
    "mp4" => MP4_VIDEO,
    "webm" => WEBM_VIDEO,
    "ogg" => "video/ogg; codecs=\"theora, vorbis\"",
    "mov" => MP4_VIDEO,
    "mkv" => WEBM_VIDEO,
};

/// MIME type and codec string for a media byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(&'static str);

impl Descriptor {
    /// The fallback used when an extension is not in the table.
    pub const DEFAULT: Descriptor = Descriptor(MP4_VIDEO);

    /// Full descriptor string, e.g. `video/webm; codecs="vp8, vorbis"`.
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// The MIME type without parameters.
    pub fn mime_type(&self) -> &'static str {
        self.0.split(';').next().unwrap_or(self.0).trim()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Look up the descriptor for a file name by its last dot-separated segment.
pub fn descriptor_for_name(name: &str) -> Descriptor {
    let lower = name.to_lowercase();
    let extension = lower.rsplit('.').next().unwrap_or("");
    DESCRIPTORS
        .get(extension)
        .map(|d| Descriptor(*d))
        .unwrap_or(Descriptor::DEFAULT)
}
