//! Core types for the creative agent
//!
//! Defines the data that flows through a pipeline run:
//! - Caller input with optional style knobs
//! - Resolved settings (input with every default applied)
//! - Pipeline stages
//! - The final structured output

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default narrative tone
pub const DEFAULT_TONE: &str = "uplifting";
/// Default narrative style
pub const DEFAULT_STYLE: &str = "modern cinematic";
/// Default visual aesthetic
pub const DEFAULT_ART_STYLE: &str = "ultra-detailed digital concept art";
/// Default lighting focus
pub const DEFAULT_LIGHTING: &str = "volumetric rim lighting with cinematic contrast";
/// Default color palette
pub const DEFAULT_COLOR_PALETTE: &str = "rich complementary palette with luminous accents";
/// Default lens choice
pub const DEFAULT_LENS: &str = "35mm anamorphic lens, wide yet intimate framing";
/// Default rendering medium
pub const DEFAULT_RENDERING: &str = "hybrid octane render with subtle particle FX";
/// Default detail level
pub const DEFAULT_DETAIL_LEVEL: &str = "8k hyper-real microdetail";

/// Caller-supplied creative request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeAgentInput {
    /// Free-text instruction (required)
    pub instruction: String,
    /// Preferred narrative tone
    #[serde(default)]
    pub tone: Option<String>,
    /// Preferred narrative style
    #[serde(default)]
    pub style: Option<String>,
    /// Whether to render an image from the image prompt
    #[serde(default)]
    pub generate_image: bool,
    /// Visual aesthetic
    #[serde(default)]
    pub image_art_style: Option<String>,
    /// Lighting focus
    #[serde(default)]
    pub image_lighting: Option<String>,
    /// Color palette
    #[serde(default)]
    pub image_color_palette: Option<String>,
    /// Lens choice
    #[serde(default)]
    pub image_lens: Option<String>,
    /// Rendering medium
    #[serde(default)]
    pub image_rendering: Option<String>,
    /// Desired detail level
    #[serde(default)]
    pub detail_level: Option<String>,
}

impl CreativeAgentInput {
    /// Create input with only an instruction
    #[inline]
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Self::default()
        }
    }

    /// With tone
    #[inline]
    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// With style
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// With image generation flag
    #[inline]
    #[must_use]
    pub fn with_generate_image(mut self, generate: bool) -> Self {
        self.generate_image = generate;
        self
    }

    /// With visual aesthetic
    #[inline]
    #[must_use]
    pub fn with_art_style(mut self, value: impl Into<String>) -> Self {
        self.image_art_style = Some(value.into());
        self
    }

    /// With lighting focus
    #[inline]
    #[must_use]
    pub fn with_lighting(mut self, value: impl Into<String>) -> Self {
        self.image_lighting = Some(value.into());
        self
    }

    /// With color palette
    #[inline]
    #[must_use]
    pub fn with_color_palette(mut self, value: impl Into<String>) -> Self {
        self.image_color_palette = Some(value.into());
        self
    }

    /// With lens choice
    #[inline]
    #[must_use]
    pub fn with_lens(mut self, value: impl Into<String>) -> Self {
        self.image_lens = Some(value.into());
        self
    }

    /// With rendering medium
    #[inline]
    #[must_use]
    pub fn with_rendering(mut self, value: impl Into<String>) -> Self {
        self.image_rendering = Some(value.into());
        self
    }

    /// With detail level
    #[inline]
    #[must_use]
    pub fn with_detail_level(mut self, value: impl Into<String>) -> Self {
        self.detail_level = Some(value.into());
        self
    }

    /// Trimmed instruction, or `None` when blank
    #[must_use]
    pub fn instruction_text(&self) -> Option<&str> {
        let trimmed = self.instruction.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Image descriptors after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSettings {
    pub art_style: String,
    pub lighting: String,
    pub color_palette: String,
    pub lens: String,
    pub rendering: String,
    pub detail_level: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            art_style: DEFAULT_ART_STYLE.to_string(),
            lighting: DEFAULT_LIGHTING.to_string(),
            color_palette: DEFAULT_COLOR_PALETTE.to_string(),
            lens: DEFAULT_LENS.to_string(),
            rendering: DEFAULT_RENDERING.to_string(),
            detail_level: DEFAULT_DETAIL_LEVEL.to_string(),
        }
    }
}

/// Fully populated configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    pub tone: String,
    pub style: String,
    pub image: ImageSettings,
}

impl ResolvedSettings {
    /// Apply defaults to every optional field of `input`
    ///
    /// A supplied value is kept trimmed. `None` and values that are empty
    /// after trimming both fall back to the field default, so resolving an
    /// already-resolved value yields the same result.
    #[must_use]
    pub fn resolve(input: &CreativeAgentInput) -> Self {
        Self {
            tone: or_default(input.tone.as_deref(), DEFAULT_TONE),
            style: or_default(input.style.as_deref(), DEFAULT_STYLE),
            image: ImageSettings {
                art_style: or_default(input.image_art_style.as_deref(), DEFAULT_ART_STYLE),
                lighting: or_default(input.image_lighting.as_deref(), DEFAULT_LIGHTING),
                color_palette: or_default(
                    input.image_color_palette.as_deref(),
                    DEFAULT_COLOR_PALETTE,
                ),
                lens: or_default(input.image_lens.as_deref(), DEFAULT_LENS),
                rendering: or_default(input.image_rendering.as_deref(), DEFAULT_RENDERING),
                detail_level: or_default(input.detail_level.as_deref(), DEFAULT_DETAIL_LEVEL),
            },
        }
    }
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self::resolve(&CreativeAgentInput::default())
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Three story beats from the instruction
    Planning,
    /// Narrative expansion of the beats
    Writing,
    /// Two-sentence synopsis
    Summarizing,
    /// Image-generation prompt
    Imagining,
    /// Optional image render
    Rendering,
    /// Output assembled
    Done,
}

impl Stage {
    /// Human label used in logs and errors
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Stage::Planning => "Story Plan Generation",
            Stage::Writing => "Story Generation",
            Stage::Summarizing => "Synopsis Generation",
            Stage::Imagining => "Image Prompt Generation",
            Stage::Rendering => "Image Generation",
            Stage::Done => "Done",
        }
    }

    /// Stage that follows this one
    #[must_use]
    pub const fn next(&self, generate_image: bool) -> Stage {
        match self {
            Stage::Planning => Stage::Writing,
            Stage::Writing => Stage::Summarizing,
            Stage::Summarizing => Stage::Imagining,
            Stage::Imagining if generate_image => Stage::Rendering,
            Stage::Imagining | Stage::Rendering | Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeAgentOutput {
    pub story_plan: String,
    pub story: String,
    pub synopsis: String,
    pub image_prompt: String,
    /// Base64-encoded image, when one was requested and produced
    pub image_base64: Option<String>,
    pub image_settings: ImageSettings,
    pub tone: String,
    pub style: String,
    /// Image failure note, only set when image failures degrade the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
}
