//! Prompt template storage
//!
//! Templates are compiled into the binary. Each one carries the three
//! placeholders `{{$facts}}`, `{{$input}}` and `{{$notFound}}` that
//! [`crate::generation::render_prompt`] substitutes.

use crate::{ExtractError, Result};
use ragner_core::EntityKind;

/// Fixed six-label extraction prompt (single-shot strategy)
pub const PROMPT_NER: &str = "ner-v6-en";

pub const PROMPT_NER_PERSON: &str = "ner_person_en";
pub const PROMPT_NER_ORGANISATION: &str = "ner_organisation_en";
pub const PROMPT_NER_DATE: &str = "ner_date_en";
pub const PROMPT_NER_MINERAL_DEPOSIT: &str = "ner_mineraldeposit_en";
pub const PROMPT_NER_RESERVOIR: &str = "ner_reservoir_en";
pub const PROMPT_NER_NPT: &str = "ner_npt_en";

/// Prompt name for one entity kind's dedicated pass
pub fn per_entity_prompt(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => PROMPT_NER_PERSON,
        EntityKind::Organisation => PROMPT_NER_ORGANISATION,
        EntityKind::Date => PROMPT_NER_DATE,
        EntityKind::MineralDeposit => PROMPT_NER_MINERAL_DEPOSIT,
        EntityKind::Reservoir => PROMPT_NER_RESERVOIR,
        EntityKind::Npt => PROMPT_NER_NPT,
    }
}

/// Lookup of a prompt template by name
pub trait PromptProvider: Send + Sync {
    fn read_prompt(&self, name: &str) -> Result<String>;
}

/// Serves the compiled-in templates
#[derive(Debug, Clone, Default)]
pub struct EmbeddedPrompts;

impl PromptProvider for EmbeddedPrompts {
    fn read_prompt(&self, name: &str) -> Result<String> {
        if name == PROMPT_NER {
            return Ok(NER_V6_EN.to_string());
        }

        if let Some((_, label, description)) =
            PER_ENTITY.iter().find(|(prompt_name, _, _)| *prompt_name == name)
        {
            return Ok(PER_ENTITY_BASE
                .replace("{label}", label)
                .replace("{description}", description));
        }

        Err(ExtractError::UnknownPrompt(name.to_string()))
    }
}

/// (prompt name, label, entity description) per entity kind
const PER_ENTITY: &[(&str, &str, &str)] = &[
    (PROMPT_NER_PERSON, "PERSON", "full names of people"),
    (
        PROMPT_NER_ORGANISATION,
        "ORGANISATION",
        "names of companies, institutions and organisations",
    ),
    (PROMPT_NER_DATE, "DATE", "calendar dates written as dd.MM.yyyy"),
    (
        PROMPT_NER_MINERAL_DEPOSIT,
        "MINERALDEPOSIT",
        "names of mineral deposits and fields",
    ),
    (
        PROMPT_NER_RESERVOIR,
        "RESERVOIR",
        "names or codes of geological reservoirs",
    ),
    (
        PROMPT_NER_NPT,
        "NPT",
        "non-productive-time incident codes",
    ),
];

const NER_V6_EN: &str = r#"You are an information extraction system for geological and drilling documents.

Read the facts below and extract every named entity into a single JSON object
with exactly these keys: "PERSON", "ORGANISATION", "DATE", "MINERALDEPOSIT",
"RESERVOIR", "NPT". Each value is an array of strings.

Rules:
- Use only the facts; never invent entities.
- Wrap every organisation name in angle brackets, e.g. <Gazprom Neft>.
- Write dates as dd.MM.yyyy.
- Leave an array empty when the facts mention no entity of that kind.
- If the facts contain no entities at all, reply with: {{$notFound}}
- Reply with the JSON object only, no commentary.

Facts:
{{$facts}}

Task: {{$input}}

JSON:"#;

const PER_ENTITY_BASE: &str = r#"You are an information extraction system for geological and drilling documents.

Read the facts below and list every {label} entity: {description}.
Write one entity per line, nothing else.
If the facts mention none, reply with: {{$notFound}}

Facts:
{{$facts}}

Task: {{$input}}

Entities:"#;
