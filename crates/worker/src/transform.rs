//! Upstream record → canonical template.

use tmplsync_core::{CanonicalTemplate, Question, QuestionKind, RawQuestion, RawTemplate, Section};

/// Upstream type codes for checkbox-style questions (compared
/// case-insensitively).
const CHOICE_CODES: &[&str] = &[
    "checkbox",
    "checkboxes",
    "check_box",
    "multiple_choice",
    "multiplechoice",
    "multi_select",
];

/// `CHOICE` for checkbox-style codes, `TEXT` for everything else.
pub fn classify(code: Option<&str>) -> QuestionKind {
    match code {
        Some(code) if CHOICE_CODES.iter().any(|c| c.eq_ignore_ascii_case(code.trim())) => {
            QuestionKind::Choice
        }
        _ => QuestionKind::Text,
    }
}

fn question(raw: &RawQuestion) -> Question {
    Question {
        kind: classify(raw.kind.as_deref()),
        value: raw.value.clone(),
        mandatory: raw.mandatory.unwrap_or(false),
        options: raw.options.clone(),
    }
}

/// Map an upstream record onto the canonical shape.
///
/// Total: missing fields stay absent. Upstream has no sections, so every
/// question lands in one untitled section.
pub fn transform(raw: &RawTemplate) -> CanonicalTemplate {
    let questions = raw
        .questions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(question)
        .collect();

    CanonicalTemplate {
        external_id: raw.id.clone(),
        name: raw.name.clone(),
        description: raw.description.clone(),
        modified: raw.modified,
        created: raw.created,
        sections: vec![Section {
            title: String::new(),
            description: String::new(),
            questions,
        }],
    }
}
