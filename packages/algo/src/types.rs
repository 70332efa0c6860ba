//! Common Types and Constants
//!
//! Reference data shared by every engine: verbs, conjugation templates,
//! the exception table and the (verb, template) pair that lessons are made of.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Template id of the dictionary form; never studied on its own
pub const DICTIONARY_TEMPLATE_ID: &str = "plain_dictionary";

/// Kana of the godan verb that gets periodic injections for irregular-sensitive forms
pub const IKU_KANA: &str = "いく";

// ==================== Verb Types ====================

/// Conjugation class of a verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbClass {
    Godan,
    Ichidan,
    Irregular,
}

impl VerbClass {
    pub const ALL: [VerbClass; 3] = [VerbClass::Godan, VerbClass::Ichidan, VerbClass::Irregular];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Godan => "godan",
            Self::Ichidan => "ichidan",
            Self::Irregular => "irregular",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "godan" => Some(Self::Godan),
            "ichidan" => Some(Self::Ichidan),
            "irregular" => Some(Self::Irregular),
            _ => None,
        }
    }
}

impl fmt::Display for VerbClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable verb record, loaded once by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,
    /// Dictionary-form reading in hiragana
    pub kana: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanji: Option<String>,
    pub verb_class: VerbClass,
    #[serde(default, alias = "gloss_en")]
    pub gloss: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Hand-entered forms keyed by template id; always win over the rules
    #[serde(default, rename = "new_conjugations", skip_serializing_if = "HashMap::is_empty")]
    pub manual_forms: HashMap<String, String>,
}

impl Verb {
    pub fn new(id: impl Into<String>, kana: impl Into<String>, verb_class: VerbClass) -> Self {
        Self {
            id: id.into(),
            kana: kana.into(),
            kanji: None,
            verb_class,
            gloss: Vec::new(),
            level: None,
            manual_forms: HashMap::new(),
        }
    }

    pub fn manual_form(&self, template_id: &str) -> Option<&str> {
        self.manual_forms
            .get(template_id)
            .map(String::as_str)
            .filter(|form| !form.is_empty())
    }
}

// ==================== Template Types ====================

/// Conjugation template catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Template {
    /// Active, non-dictionary templates make up the study set
    pub fn is_eligible(&self) -> bool {
        self.active && self.id != DICTIONARY_TEMPLATE_ID
    }
}

// ==================== Exception Types ====================

/// Literal overrides for irregular phonetic shifts, keyed by dictionary kana
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialCases {
    #[serde(default)]
    pub te_form: HashMap<String, String>,
    #[serde(default)]
    pub plain_past: HashMap<String, String>,
}

/// Exception table supplied alongside the verb catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionTable {
    #[serde(default)]
    pub special_cases: SpecialCases,
}

impl ExceptionTable {
    pub fn te_form(&self, kana: &str) -> Option<&str> {
        lookup(&self.special_cases.te_form, kana)
    }

    pub fn plain_past(&self, kana: &str) -> Option<&str> {
        lookup(&self.special_cases.plain_past, kana)
    }
}

fn lookup<'a>(table: &'a HashMap<String, String>, kana: &str) -> Option<&'a str> {
    table
        .get(kana)
        .map(String::as_str)
        .filter(|form| !form.is_empty())
}

// ==================== Study Item Types ====================

/// A (verb, template) pair, the unit a lesson queue is built from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyItem {
    pub verb_id: String,
    #[serde(alias = "conjugation_id")]
    pub template_id: String,
}

impl StudyItem {
    pub fn new(verb_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            verb_id: verb_id.into(),
            template_id: template_id.into(),
        }
    }

    pub fn card_id(&self) -> String {
        crate::srs::make_card_id(&self.verb_id, &self.template_id)
    }
}
