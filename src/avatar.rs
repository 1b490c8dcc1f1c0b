use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::DynamicImage;
use tracing::debug;

/// Where an avatar's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource {
    Remote(String),
    Embedded(String),
    File(PathBuf),
}

impl AvatarSource {
    pub fn parse(src: &str) -> Option<Self> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        let lower = src.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(AvatarSource::Remote(src.to_string()))
        } else if lower.starts_with("data:") {
            Some(AvatarSource::Embedded(src[5..].to_string()))
        } else {
            let path = src.strip_prefix("file://").unwrap_or(src);
            Some(AvatarSource::File(PathBuf::from(path)))
        }
    }
}

/// Fetch and decode the avatar at `src`.
pub async fn fetch(client: &reqwest::Client, src: &str) -> Result<DynamicImage> {
    let source = AvatarSource::parse(src).ok_or_else(|| anyhow!("avatar source is empty"))?;
    let bytes = match source {
        AvatarSource::Remote(url) => {
            debug!(%url, "fetching avatar");
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("failed to request avatar {}", url))?
                .error_for_status()
                .with_context(|| format!("avatar request for {} failed", url))?;
            response
                .bytes()
                .await
                .with_context(|| format!("failed to read avatar body from {}", url))?
                .to_vec()
        }
        AvatarSource::Embedded(data) => parse_data_uri(&data)?,
        AvatarSource::File(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read avatar {}", path.display()))?,
    };

    image::load_from_memory(&bytes).with_context(|| "failed to decode avatar image")
}

fn parse_data_uri(input: &str) -> Result<Vec<u8>> {
    let (meta, data) = input
        .split_once(',')
        .ok_or_else(|| anyhow!("data URI is missing payload"))?;

    let is_base64 = meta
        .split(';')
        .any(|segment| segment.eq_ignore_ascii_case("base64"));
    if !is_base64 {
        bail!("avatar data URI is not base64 encoded");
    }

    let filtered: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(filtered)
        .with_context(|| "failed to decode base64 data URI contents")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarState {
    Empty,
    Loading,
    Ready,
    Failed(String),
}

/// Tracks which avatar the screen wants. Results for any other source are
/// dropped, so switching contacts never shows the previous picture.
#[derive(Debug, Clone)]
pub struct AvatarSlot {
    source: Option<String>,
    state: AvatarState,
}

impl Default for AvatarSlot {
    fn default() -> Self {
        Self {
            source: None,
            state: AvatarState::Empty,
        }
    }
}

impl AvatarSlot {
    pub fn state(&self) -> &AvatarState {
        &self.state
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Point the slot at `source`. Returns true when a fetch should start.
    pub fn request(&mut self, source: Option<&str>) -> bool {
        if self.source.as_deref() == source {
            return false;
        }
        self.source = source.map(str::to_string);
        self.state = match source {
            Some(_) => AvatarState::Loading,
            None => AvatarState::Empty,
        };
        self.source.is_some()
    }

    /// Apply a finished fetch. Returns the image only when it is for the
    /// current source and succeeded.
    pub fn accept<T>(&mut self, source: &str, result: Result<T>) -> Option<T> {
        if self.source.as_deref() != Some(source) {
            debug!(source, "dropping stale avatar");
            return None;
        }
        match result {
            Ok(image) => {
                self.state = AvatarState::Ready;
                Some(image)
            }
            Err(err) => {
                self.state = AvatarState::Failed(format!("{:#}", err));
                None
            }
        }
    }
}
