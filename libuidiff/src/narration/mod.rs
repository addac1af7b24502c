//! Optional AI commentary on a changed pair.
//!
//! The engine only knows the [`NarrationProvider`] capability; concrete
//! vendors live in their own submodules and are picked by the caller.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicNarrator;
pub use openai::OpenAiNarrator;

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::NarrationError;
use crate::verdict::ImagePair;

pub const SYSTEM_PROMPT: &str = "You are an expert UI/UX analyst.";

pub const ANALYSIS_PROMPT: &str = "\
Two screenshots of the same screen are attached: the first is the old release, \
the second is the new release. Report the visual changes and inconsistencies \
introduced by the new release, looking in particular at:
1. Component positions
2. Spacing between components
3. Alignment of labels with the elements they describe
4. Styling consistency (colors, fonts, sizes) across similar elements
5. Element sizes and proportions
6. Visual hierarchy and emphasis
7. Navigation elements and user flow

Answer with three sections:
1. List of Changes
2. Impact Assessment
3. Recommendations

Be concise. Ignore pixel-level noise unless it affects design consistency.";

/// Raw image bytes plus the media type sent alongside them.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, media_type: &'static str) -> Self {
        Self { bytes, media_type }
    }

    pub async fn read(path: &Path) -> Result<Self, NarrationError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(bytes, media_type_for(path)))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

pub fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// What a provider receives. Images are always old first, then new.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub old_image: ImagePayload,
    pub new_image: ImagePayload,
    pub prompt: &'static str,
}

impl NarrationRequest {
    pub fn new(old_image: ImagePayload, new_image: ImagePayload) -> Self {
        Self {
            old_image,
            new_image,
            prompt: ANALYSIS_PROMPT,
        }
    }

    /// Reads the original, non-normalized files of a pair.
    pub async fn for_pair(pair: &ImagePair) -> Result<Self, NarrationError> {
        let old_image = ImagePayload::read(&pair.old_path).await?;
        let new_image = ImagePayload::read(&pair.new_path).await?;
        Ok(Self::new(old_image, new_image))
    }

    pub fn images(&self) -> [&ImagePayload; 2] {
        [&self.old_image, &self.new_image]
    }
}

#[async_trait]
pub trait NarrationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}
