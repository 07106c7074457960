//! Prompt templates for the four text stages
//!
//! Each template is a fixed system turn plus a user turn with `{name}`
//! placeholders. Rendering is strict: every placeholder must have a value.

use crate::error::TemplateError;
use crate::inference::ChatMessage;
use std::collections::BTreeMap;

/// Fixed two-turn instruction template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Short identifier used in errors
    pub name: &'static str,
    /// System turn, sent verbatim
    pub system: &'static str,
    /// User turn with `{placeholder}` slots
    pub user: &'static str,
}

/// Story planner: exactly three beats
pub const PLAN: PromptTemplate = PromptTemplate {
    name: "plan",
    system: "You are a meticulous narrative planner for high-end concept art teams. \
Produce exactly three concise story beats that cover world-building, central conflict, \
and climactic resolution. Each beat must highlight vivid sensory cues and potential \
visual motifs suitable for cinematic illustration.",
    user: "Instruction: {instruction}\nPreferred tone: {tone}",
};

/// Storyteller: 280-320 word narrative from the beats
pub const STORY: PromptTemplate = PromptTemplate {
    name: "story",
    system: "You are a vivid storyteller crafting treatments for award-winning animation \
studios. Expand the supplied beats into a 280-320 word narrative that balances pacing, \
emotional stakes, and striking imagery. The prose should surface concrete visual anchors \
that production designers could translate into key frames, all while respecting the \
requested tone and style.",
    user: "Story beats:\n{plan}\n\nDesired style: {style}\nInstruction recap: {instruction}",
};

/// Two-sentence synopsis
pub const SYNOPSIS: PromptTemplate = PromptTemplate {
    name: "synopsis",
    system: "Summarize the story below in two sentences. The first line should anchor the \
protagonist, stakes, and emotional arc. The second line should emphasize the atmosphere \
and visual mood.",
    user: "Story:\n{story}",
};

/// Image prompt: one 55-75 word paragraph in five facets
pub const IMAGE_PROMPT: PromptTemplate = PromptTemplate {
    name: "image_prompt",
    system: "You are an elite concept artist and prompt engineer producing inputs for \
diffusion and transformer-based render models. Deliver a single, polished prompt \
(55-75 words) that feels bespoke, cinematic, and production-ready. Follow this structure \
with richly descriptive language:\n\n\
Primary description: [2-3 clauses capturing subject, setting, and motion]\n\
Camera & lens: [reference lens or perspective that matches the brief]\n\
Lighting: [dramatic lighting cues]\n\
Color & mood: [palette and emotional tone]\n\
Detail & rendering: [materials, texture fidelity, rendering pipeline, quality tags]\n\n\
Avoid mentioning 'text', 'logo', or camera metadata shorthand.",
    user: "Story summary:\n{story}\n\nTone to capture: {tone}\nNarrative style: {style}\n\
Visual aesthetic: {imageArtStyle}\nLighting focus: {imageLighting}\n\
Color palette: {imageColorPalette}\nLens choice: {imageLens}\n\
Rendering medium: {imageRendering}\nDesired detail level: {detailLevel}",
};

/// Placeholder values for one render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    /// Create empty variable set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a placeholder value
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    /// Value for a placeholder
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl PromptTemplate {
    /// Render into a system + user message pair
    ///
    /// # Errors
    /// - `TemplateError::MissingVariable` if a placeholder has no value
    /// - `TemplateError::Unclosed` if a `{` is never closed
    pub fn render(&self, vars: &TemplateVars) -> Result<Vec<ChatMessage>, TemplateError> {
        let mut user = String::with_capacity(self.user.len() * 2);
        let mut rest = self.user;

        while let Some(open) = rest.find('{') {
            user.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or(TemplateError::Unclosed { template: self.name })?;
            let name = &after[..close];
            let value = vars
                .get(name)
                .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
            user.push_str(value);
            rest = &after[close + 1..];
        }
        user.push_str(rest);

        Ok(vec![ChatMessage::system(self.system), ChatMessage::user(user)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Role;

    #[test]
    fn plan_renders_both_turns() {
        let vars = TemplateVars::new()
            .with("instruction", "A lighthouse keeper befriends a sea monster")
            .with("tone", "uplifting");
        let messages = PLAN.render(&vars).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("exactly three concise story beats"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Instruction: A lighthouse keeper befriends a sea monster\nPreferred tone: uplifting"
        );
    }

    #[test]
    fn missing_variable_is_reported() {
        let err = STORY
            .render(&TemplateVars::new().with("plan", "beats"))
            .unwrap_err();
        assert_eq!(err, TemplateError::MissingVariable("style".to_string()));
    }

    #[test]
    fn unclosed_placeholder_is_reported() {
        let broken = PromptTemplate {
            name: "broken",
            system: "",
            user: "Hello {name",
        };
        assert_eq!(
            broken.render(&TemplateVars::new().with("name", "x")).unwrap_err(),
            TemplateError::Unclosed { template: "broken" }
        );
    }

    #[test]
    fn values_are_not_reinterpreted() {
        let messages = SYNOPSIS
            .render(&TemplateVars::new().with("story", "a {curly} tale"))
            .unwrap();
        assert_eq!(messages[1].content, "Story:\na {curly} tale");
    }

    #[test]
    fn textual_contracts() {
        assert!(STORY.system.contains("280-320 word"));
        assert!(SYNOPSIS.system.contains("two sentences"));
        assert!(IMAGE_PROMPT.system.contains("55-75 words"));
        assert!(IMAGE_PROMPT
            .system
            .contains("Avoid mentioning 'text', 'logo', or camera metadata shorthand."));
        for facet in [
            "Primary description:",
            "Camera & lens:",
            "Lighting:",
            "Color & mood:",
            "Detail & rendering:",
        ] {
            assert!(IMAGE_PROMPT.system.contains(facet), "{facet}");
        }
    }

    fn placeholders(template: &PromptTemplate) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = template.user;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else { break };
            names.push(&after[..close]);
            rest = &after[close + 1..];
        }
        names
    }

    #[test]
    fn placeholder_sets() {
        assert_eq!(placeholders(&PLAN), ["instruction", "tone"]);
        assert_eq!(placeholders(&STORY), ["plan", "style", "instruction"]);
        assert_eq!(placeholders(&SYNOPSIS), ["story"]);
        assert_eq!(
            placeholders(&IMAGE_PROMPT),
            [
                "story",
                "tone",
                "style",
                "imageArtStyle",
                "imageLighting",
                "imageColorPalette",
                "imageLens",
                "imageRendering",
                "detailLevel"
            ]
        );
    }
}
