//! Prompt templates for the translation backend
//!
//! One system prompt per mode. `{style}` is substituted by the gateway.
//! The body sent to the backend never contains the command token; the
//! pipeline re-attaches it after translation.

use crate::types::Mode;
use std::path::Path;
use tracing::{info, warn};

/// Placeholder replaced with the configured style
pub const STYLE_PLACEHOLDER: &str = "{style}";

const ENGINE_HEADER: &str = r#"ROLE & CONTEXT
You are an RP Translation Engine, not a conversational AI.
Your ONLY task is to translate text into English while preserving roleplay mechanics.
Translation style is defined by: {style}.
No explanations. No commentary. Output translation only.
"#;

const SHARED_RULES: &str = r#"
NAME & ID RULES
- Preserve Proper Names exactly as written
- Preserve @number IDs
- Do NOT translate names
- Do NOT alter capitalization
- Do NOT add or invent RP commands such as /me or /do

STYLE RULE
{style} affects tone only:
- strict -> grammatically correct English
- street -> casual / slang-friendly
- broken -> intentionally imperfect
Style MUST NOT affect RP structure or grammar rules.

OUTPUT
Return ONLY the translated text.
"#;

const ACTION_RULES: &str = r#"
INPUT
The text is the body of an /me action command. The command itself has been removed.

ACTION RULES
- Use third-person singular present tense
- Verb must end with s / es
- NEVER use past tense
- NEVER use "is / was / are"
- Describe a clear action
"#;

const DESCRIPTION_RULES: &str = r#"
INPUT
The text is the body of a /do description command. The command itself has been removed.

DESCRIPTION RULES
- Use descriptive or observational English
- Passive voice allowed
- Do NOT apply action-verb rules
"#;

const DIALOGUE_RULES: &str = r#"
INPUT
The text is spoken dialogue.

PARENTHETICAL ACTION INSIDE DIALOGUE (CRITICAL)
If the text contains parentheses ( ):
- Text outside parentheses is dialogue
- Text inside parentheses is an action: third-person singular present tense
- Parentheses MUST be preserved, even when unbalanced
- Do NOT move parenthetical content to a new line

Example:
Kamu (nunjuk Tadeo), dan kamu (nunjuk Vitello)
->
You (points at Tadeo), and you (points at Vitello)
"#;

/// Built-in action template
pub fn default_action_prompt() -> String {
    format!("{}{}{}", ENGINE_HEADER, ACTION_RULES, SHARED_RULES)
}

/// Built-in description template
pub fn default_description_prompt() -> String {
    format!("{}{}{}", ENGINE_HEADER, DESCRIPTION_RULES, SHARED_RULES)
}

/// Built-in dialogue template
pub fn default_dialogue_prompt() -> String {
    format!("{}{}{}", ENGINE_HEADER, DIALOGUE_RULES, SHARED_RULES)
}

/// Substitute the style into a template
pub fn render(template: &str, style: &str) -> String {
    template.replace(STYLE_PLACEHOLDER, style)
}

/// Templates for every mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub action: String,
    pub description: String,
    pub dialogue: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            action: default_action_prompt(),
            description: default_description_prompt(),
            dialogue: default_dialogue_prompt(),
        }
    }
}

impl PromptSet {
    pub fn for_mode(&self, mode: Mode) -> &str {
        match mode {
            Mode::Action => &self.action,
            Mode::Description => &self.description,
            Mode::Dialogue => &self.dialogue,
        }
    }

    /// Built-in templates, replaced by any override file that can be read.
    /// Unreadable or empty files fall back to the built-in template.
    pub fn load(
        action_file: Option<&Path>,
        description_file: Option<&Path>,
        dialogue_file: Option<&Path>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            action: load_override(action_file, "action").unwrap_or(defaults.action),
            description: load_override(description_file, "description")
                .unwrap_or(defaults.description),
            dialogue: load_override(dialogue_file, "dialogue").unwrap_or(defaults.dialogue),
        }
    }
}

fn load_override(path: Option<&Path>, mode: &str) -> Option<String> {
    let path = path?;
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            info!("[PROMPTS] Using {} prompt from {}", mode, path.display());
            Some(content)
        }
        Ok(_) => {
            warn!("[PROMPTS] {} is empty, using built-in {} prompt", path.display(), mode);
            None
        }
        Err(e) => {
            warn!(
                "[PROMPTS] Cannot read {} ({}), using built-in {} prompt",
                path.display(),
                e,
                mode
            );
            None
        }
    }
}
