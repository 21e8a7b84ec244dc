//! Media taxonomy
//!
//! The three fixed top-level folders define the only categories. This module
//! maps MIME types onto them, builds upload paths, raw content URLs and the
//! HTML embed snippets handed out for stored files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Media category, one per fixed repository folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Images,
    Videos,
    Audio,
}

impl MediaType {
    /// Folder listing order used by catalog refreshes
    pub const ALL: [MediaType; 3] = [MediaType::Images, MediaType::Videos, MediaType::Audio];

    /// Top-level folder holding this category
    pub fn folder(&self) -> &'static str {
        match self {
            MediaType::Images => "images",
            MediaType::Videos => "videos",
            MediaType::Audio => "audio",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Images => "Images",
            MediaType::Videos => "Videos",
            MediaType::Audio => "Audio",
        }
    }

    /// Classify a MIME type by its top-level prefix
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaType::Images)
        } else if mime.starts_with("video/") {
            Some(MediaType::Videos)
        } else if mime.starts_with("audio/") {
            Some(MediaType::Audio)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "images" => Ok(MediaType::Images),
            "videos" => Ok(MediaType::Videos),
            "audio" => Ok(MediaType::Audio),
            other => Err(format!("unknown media type '{}'; expected images, videos or audio", other)),
        }
    }
}

/// Active filter of the library view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    Only(MediaType),
}

impl Category {
    /// Navigation entries in display order
    pub const ALL: [Category; 4] = [
        Category::All,
        Category::Only(MediaType::Images),
        Category::Only(MediaType::Videos),
        Category::Only(MediaType::Audio),
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Only(media) => media.folder(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "All Media",
            Category::Only(media) => media.label(),
        }
    }

    pub fn matches(&self, media: MediaType) -> bool {
        match self {
            Category::All => true,
            Category::Only(wanted) => *wanted == media,
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Category::All)
        } else {
            s.parse().map(Category::Only)
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Repository path a file is committed to
pub fn upload_path(media: MediaType, file_name: &str) -> String {
    format!("{}/{}", media.folder(), file_name)
}

/// Direct-fetch URL for a stored file
pub fn raw_url(raw_host: &str, owner: &str, repo: &str, branch: &str, path: &str) -> String {
    format!("https://{}/{}/{}/{}/{}", raw_host, owner, repo, branch, path)
}

/// HTML snippet embedding a stored file
pub fn embed_code(media: MediaType, raw_url: &str, name: &str) -> String {
    match media {
        MediaType::Images => format!(r#"<img src="{}" alt="{}" />"#, raw_url, name),
        MediaType::Videos => format!(r#"<video src="{}" controls></video>"#, raw_url),
        MediaType::Audio => format!(r#"<audio src="{}" controls></audio>"#, raw_url),
    }
}
