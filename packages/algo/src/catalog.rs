//! Read-only reference data: verbs, templates and the exception table.
//!
//! The host hands the raw documents over once; every engine call then borrows
//! the parsed [`Catalog`].

use std::collections::{HashMap, HashSet};

use crate::srs::{make_card_id, Card};
use crate::types::{ExceptionTable, StudyItem, Template, Verb};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid verb record on line {line}: {source}")]
    Jsonl {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate verb id: {0}")]
    DuplicateVerb(String),
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    verbs: Vec<Verb>,
    verb_index: HashMap<String, usize>,
    templates: Vec<Template>,
    exceptions: ExceptionTable,
}

impl Catalog {
    pub fn new(
        verbs: Vec<Verb>,
        templates: Vec<Template>,
        exceptions: ExceptionTable,
    ) -> Result<Self, CatalogError> {
        let mut verb_index = HashMap::with_capacity(verbs.len());
        for (idx, verb) in verbs.iter().enumerate() {
            if verb_index.insert(verb.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateVerb(verb.id.clone()));
            }
        }
        Ok(Self {
            verbs,
            verb_index,
            templates,
            exceptions,
        })
    }

    /// Parse the three host documents: verbs as JSONL, templates as a JSON
    /// array, exceptions as a JSON object.
    pub fn from_sources(
        verbs_jsonl: &str,
        templates_json: &str,
        exceptions_json: &str,
    ) -> Result<Self, CatalogError> {
        let verbs = parse_verbs_jsonl(verbs_jsonl)?;
        let templates: Vec<Template> = serde_json::from_str(templates_json)?;
        let exceptions: ExceptionTable = serde_json::from_str(exceptions_json)?;
        tracing::debug!(
            verbs = verbs.len(),
            templates = templates.len(),
            "catalog parsed"
        );
        Self::new(verbs, templates, exceptions)
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn exceptions(&self) -> &ExceptionTable {
        &self.exceptions
    }

    pub fn verb(&self, id: &str) -> Option<&Verb> {
        self.verb_index.get(id).map(|&idx| &self.verbs[idx])
    }

    pub fn verb_ids_by_kana(&self, kana: &str) -> Vec<&str> {
        self.verbs
            .iter()
            .filter(|verb| verb.kana == kana)
            .map(|verb| verb.id.as_str())
            .collect()
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|tpl| tpl.id == id)
    }

    /// Active, non-dictionary template ids in catalog order
    pub fn eligible_template_ids(&self) -> Vec<&str> {
        self.templates
            .iter()
            .filter(|tpl| tpl.is_eligible())
            .map(|tpl| tpl.id.as_str())
            .collect()
    }
}

fn parse_verbs_jsonl(raw: &str) -> Result<Vec<Verb>, CatalogError> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| CatalogError::Jsonl {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Every (verb, template) pair in `template_ids` without a card yet, verbs in
/// catalog order.
pub fn unseen_pairs(
    catalog: &Catalog,
    cards: &HashMap<String, Card>,
    template_ids: &[String],
) -> Vec<StudyItem> {
    let mut seen_templates = HashSet::new();
    let templates: Vec<&String> = template_ids
        .iter()
        .filter(|id| seen_templates.insert(id.as_str()))
        .collect();
    let templates = &templates;

    catalog
        .verbs()
        .iter()
        .flat_map(move |verb| {
            templates
                .iter()
                .filter(move |template_id| !cards.contains_key(&make_card_id(&verb.id, template_id)))
                .map(move |template_id| StudyItem::new(verb.id.clone(), template_id.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const VERBS: &str = r#"{"id":"taberu","kana":"たべる","verb_class":"ichidan"}

{"id":"kaku","kana":"かく","verb_class":"godan","gloss":["to write"]}
{"id":"kaku2","kana":"かく","verb_class":"godan","gloss":["to scratch"]}
"#;
    const TEMPLATES: &str = r#"[{"id":"plain_dictionary"},{"id":"plain_past"},{"id":"plain_negative","active":false}]"#;
    const EXCEPTIONS: &str = r#"{"special_cases":{"te_form":{"いく":"いって"}}}"#;

    #[test]
    fn test_from_sources() {
        let catalog = Catalog::from_sources(VERBS, TEMPLATES, EXCEPTIONS).unwrap();
        assert_eq!(catalog.verbs().len(), 3);
        assert_eq!(catalog.verb("kaku").map(|v| v.gloss.len()), Some(1));
        assert_eq!(catalog.verb_ids_by_kana("かく"), vec!["kaku", "kaku2"]);
        assert_eq!(catalog.eligible_template_ids(), vec!["plain_past"]);
        assert!(catalog.template("plain_negative").is_some());
        assert_eq!(catalog.exceptions().te_form("いく"), Some("いって"));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let raw = "{\"id\":\"a\",\"kana\":\"たべる\",\"verb_class\":\"ichidan\"}\n{oops}\n";
        match Catalog::from_sources(raw, "[]", "{}") {
            Err(CatalogError::Jsonl { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_verb_rejected() {
        let raw = "{\"id\":\"a\",\"kana\":\"たべる\",\"verb_class\":\"ichidan\"}\n{\"id\":\"a\",\"kana\":\"みる\",\"verb_class\":\"ichidan\"}";
        assert!(matches!(
            Catalog::from_sources(raw, "[]", "{}"),
            Err(CatalogError::DuplicateVerb(id)) if id == "a"
        ));
    }

    #[test]
    fn test_unseen_pairs_skip_existing_cards() {
        let catalog = Catalog::from_sources(VERBS, TEMPLATES, EXCEPTIONS).unwrap();
        let mut cards = HashMap::new();
        let card = Card::new("kaku", "plain_past", Utc::now());
        cards.insert(card.card_id.clone(), card);

        let templates = vec!["plain_past".to_string(), "plain_past".to_string()];
        let pairs = unseen_pairs(&catalog, &cards, &templates);
        let ids: Vec<String> = pairs.iter().map(StudyItem::card_id).collect();
        assert_eq!(ids, vec!["taberu::plain_past", "kaku2::plain_past"]);
    }
}
