//! Conjugation Engine
//!
//! Maps (verb, template id, exception table) to a kana string.
//!
//! Resolution order:
//! 1. a manual form stored on the verb wins verbatim
//! 2. the progressive family (`plain_te_iru`, `polite_te_imasu`, ...) is the
//!    te-form plus a fixed suffix
//! 3. otherwise the verb class builds a [`Stems`] set (ichidan stem drop,
//!    godan row shifts, irregular table row) and every form is rendered from it
//!
//! Exception-table te/past overrides are folded into the stems, so every form
//! built on them (tara, tari, polite te, te-oku, te-shimau) sees the override.

pub mod forms;
pub mod godan;
pub mod irregular;

pub use forms::Form;

use crate::types::{ExceptionTable, Verb, VerbClass};

/// Casual endings accepted alongside なければいけない
const OBLIGATION_VARIANTS: [&str; 3] = ["なければいけない", "なきゃいけない", "なくちゃいけない"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConjugationError {
    #[error("unsupported template {template_id} for {verb_class} verb {kana}")]
    UnsupportedTemplate {
        template_id: String,
        verb_class: VerbClass,
        kana: String,
    },
    #[error("irregular table missing for kana: {0}")]
    MissingIrregularEntry(String),
    #[error("unsupported godan ending '{ending}' in {kana}")]
    UnsupportedEnding { kana: String, ending: String },
    #[error("missing verb record: {0}")]
    MissingVerb(String),
}

/// Building blocks every form is rendered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stems {
    pub dictionary: String,
    /// Stem before ない
    pub negative: String,
    /// Stem before ます
    pub continuative: String,
    /// Complete ば-conditional
    pub conditional: String,
    pub imperative: String,
    pub passive: String,
    pub causative: String,
    pub causative_passive: String,
    pub te: String,
    pub past: String,
}

impl Stems {
    fn ichidan(kana: &str, exceptions: &ExceptionTable) -> Result<Self, ConjugationError> {
        let mut chars = kana.chars();
        if chars.next_back().is_none() {
            return Err(ConjugationError::UnsupportedEnding {
                kana: String::new(),
                ending: String::new(),
            });
        }
        let stem = chars.as_str();
        Ok(Self {
            dictionary: kana.to_string(),
            negative: stem.to_string(),
            continuative: stem.to_string(),
            conditional: format!("{stem}れば"),
            imperative: format!("{stem}ろ"),
            passive: format!("{stem}られる"),
            causative: format!("{stem}させる"),
            causative_passive: format!("{stem}させられる"),
            te: exceptions
                .te_form(kana)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{stem}て")),
            past: exceptions
                .plain_past(kana)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{stem}た")),
        })
    }

    pub(crate) fn render(&self, form: Form) -> String {
        let Self {
            dictionary,
            negative,
            continuative,
            te,
            past,
            ..
        } = self;
        match form {
            Form::PlainDictionary => dictionary.clone(),
            Form::PlainNegative => format!("{negative}ない"),
            Form::PlainPast => past.clone(),
            Form::PlainPastNegative => format!("{negative}なかった"),
            Form::PlainTeForm => te.clone(),
            Form::PoliteDictionary => format!("{continuative}ます"),
            Form::PoliteNegative => format!("{continuative}ません"),
            Form::PolitePast => format!("{continuative}ました"),
            Form::PolitePastNegative => format!("{continuative}ませんでした"),
            Form::PoliteTeForm => format!("{te}ください"),
            Form::PlainPassive => self.passive.clone(),
            Form::PlainCausative => self.causative.clone(),
            Form::PlainCausativePassive => self.causative_passive.clone(),
            Form::PlainBaConditional => self.conditional.clone(),
            Form::PlainTaraConditional => format!("{past}ら"),
            Form::PlainTariSequence => format!("{past}りする"),
            Form::PlainImperative => self.imperative.clone(),
            Form::PlainProhibitive => format!("{dictionary}な"),
            Form::PlainTeOku => format!("{te}おく"),
            Form::PlainTeShimau => format!("{te}しまう"),
            Form::PlainNagara => format!("{continuative}ながら"),
            Form::PlainYasui => format!("{continuative}やすい"),
            Form::PlainNikui => format!("{continuative}にくい"),
            Form::PoliteNasai => format!("{continuative}なさい"),
            Form::PlainNakerebaIkenai => format!("{negative}{}", OBLIGATION_VARIANTS[0]),
            Form::PlainNakuteMoIi => format!("{negative}なくてもいい"),
            Form::PlainTeIru
            | Form::PoliteTeImasu
            | Form::PoliteTeImasen
            | Form::PoliteTeImashita
            | Form::PoliteTeImasenDeshita => {
                format!("{te}{}", form.progressive_suffix().unwrap_or_default())
            }
        }
    }
}

/// Conjugate `verb` into the form named by `template_id`.
pub fn conjugate(
    verb: &Verb,
    template_id: &str,
    exceptions: &ExceptionTable,
) -> Result<String, ConjugationError> {
    if let Some(manual) = verb.manual_form(template_id) {
        return Ok(manual.to_string());
    }

    let form = Form::parse(template_id).ok_or_else(|| ConjugationError::UnsupportedTemplate {
        template_id: template_id.to_string(),
        verb_class: verb.verb_class,
        kana: verb.kana.clone(),
    })?;

    if let Some(suffix) = form.progressive_suffix() {
        let te = conjugate(verb, Form::PlainTeForm.as_str(), exceptions)?;
        return Ok(format!("{te}{suffix}"));
    }

    let kana = verb.kana.as_str();
    match verb.verb_class {
        VerbClass::Ichidan => {
            if form == Form::PlainDictionary {
                return Ok(kana.to_string());
            }
            Ok(Stems::ichidan(kana, exceptions)?.render(form))
        }
        VerbClass::Godan => {
            if form == Form::PlainDictionary {
                return Ok(kana.to_string());
            }
            Ok(godan::stems(kana, exceptions)?.render(form))
        }
        VerbClass::Irregular => {
            let entry = irregular::entry(kana)?;
            match entry.core_form(form) {
                Some(literal) => Ok(literal.to_string()),
                None => Ok(entry.stems().render(form)),
            }
        }
    }
}

/// Every answer string accepted for `template_id`, canonical form first.
///
/// Only the obligation form has casual equivalents; other templates accept
/// the canonical form alone.
pub fn conjugate_accepted(
    verb: &Verb,
    template_id: &str,
    exceptions: &ExceptionTable,
) -> Result<Vec<String>, ConjugationError> {
    let canonical = conjugate(verb, template_id, exceptions)?;
    if template_id != Form::PlainNakerebaIkenai.as_str() {
        return Ok(vec![canonical]);
    }

    let negative = conjugate(verb, Form::PlainNegative.as_str(), exceptions)?;
    let Some(stem) = negative.strip_suffix("ない") else {
        return Ok(vec![canonical]);
    };

    let mut accepted = vec![canonical];
    for ending in OBLIGATION_VARIANTS {
        let variant = format!("{stem}{ending}");
        if !accepted.contains(&variant) {
            accepted.push(variant);
        }
    }
    Ok(accepted)
}

/// Conjugate a catalog item, reporting a missing verb as a data error.
pub fn conjugate_item(
    catalog: &crate::catalog::Catalog,
    verb_id: &str,
    template_id: &str,
) -> Result<String, ConjugationError> {
    let verb = catalog
        .verb(verb_id)
        .ok_or_else(|| ConjugationError::MissingVerb(verb_id.to_string()))?;
    conjugate(verb, template_id, catalog.exceptions())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exceptions() -> ExceptionTable {
        let mut table = ExceptionTable::default();
        table
            .special_cases
            .te_form
            .insert("いく".to_string(), "いって".to_string());
        table
            .special_cases
            .plain_past
            .insert("いく".to_string(), "いった".to_string());
        table
    }

    fn conj(kana: &str, class: VerbClass, template: &str) -> String {
        conjugate(&Verb::new("v", kana, class), template, &exceptions()).unwrap()
    }

    #[test]
    fn test_ichidan_forms() {
        let c = |t| conj("たべる", VerbClass::Ichidan, t);
        assert_eq!(c("plain_negative"), "たべない");
        assert_eq!(c("plain_past"), "たべた");
        assert_eq!(c("polite_dictionary"), "たべます");
        assert_eq!(c("plain_causative"), "たべさせる");
        assert_eq!(c("plain_passive"), "たべられる");
        assert_eq!(c("plain_ba_conditional"), "たべれば");
        assert_eq!(c("plain_imperative"), "たべろ");
        assert_eq!(c("plain_prohibitive"), "たべるな");
        assert_eq!(c("polite_te_form"), "たべてください");
        assert_eq!(c("plain_tari_sequence"), "たべたりする");
        assert_eq!(c("plain_nakute_mo_ii"), "たべなくてもいい");
    }

    #[test]
    fn test_godan_forms() {
        assert_eq!(conj("かく", VerbClass::Godan, "plain_te_form"), "かいて");
        assert_eq!(conj("およぐ", VerbClass::Godan, "plain_past"), "およいだ");
        assert_eq!(conj("はなす", VerbClass::Godan, "plain_te_form"), "はなして");
        assert_eq!(conj("まつ", VerbClass::Godan, "plain_negative"), "またない");
        assert_eq!(conj("かう", VerbClass::Godan, "plain_negative"), "かわない");
        assert_eq!(conj("しぬ", VerbClass::Godan, "plain_past"), "しんだ");
        assert_eq!(conj("あそぶ", VerbClass::Godan, "plain_tara_conditional"), "あそんだら");
        assert_eq!(conj("のむ", VerbClass::Godan, "polite_past_negative"), "のみませんでした");
        assert_eq!(conj("かえる", VerbClass::Godan, "plain_ba_conditional"), "かえれば");
        assert_eq!(conj("かえる", VerbClass::Godan, "plain_imperative"), "かえれ");
        assert_eq!(conj("よむ", VerbClass::Godan, "plain_causative_passive"), "よませられる");
        assert_eq!(conj("かく", VerbClass::Godan, "plain_nakereba_ikenai"), "かかなければいけない");
    }

    #[test]
    fn test_exception_flows_into_derived_forms() {
        let c = |t| conj("いく", VerbClass::Godan, t);
        assert_eq!(c("plain_te_form"), "いって");
        assert_eq!(c("plain_past"), "いった");
        assert_eq!(c("plain_tara_conditional"), "いったら");
        assert_eq!(c("plain_tari_sequence"), "いったりする");
        assert_eq!(c("polite_te_form"), "いってください");
        assert_eq!(c("plain_te_oku"), "いっておく");
        assert_eq!(c("plain_te_shimau"), "いってしまう");
        assert_eq!(c("plain_te_iru"), "いっている");
        assert_eq!(c("plain_negative"), "いかない");
    }

    #[test]
    fn test_ichidan_exception_reaches_derived_forms() {
        let mut table = ExceptionTable::default();
        table
            .special_cases
            .te_form
            .insert("みる".to_string(), "みって".to_string());
        table
            .special_cases
            .plain_past
            .insert("みる".to_string(), "みった".to_string());
        let verb = Verb::new("miru", "みる", VerbClass::Ichidan);
        let c = |t| conjugate(&verb, t, &table).unwrap();
        assert_eq!(c("plain_te_form"), "みって");
        assert_eq!(c("plain_past"), "みった");
        assert_eq!(c("polite_te_form"), "みってください");
        assert_eq!(c("plain_tara_conditional"), "みったら");
        assert_eq!(c("plain_tari_sequence"), "みったりする");
        assert_eq!(c("plain_te_oku"), "みっておく");
        assert_eq!(c("plain_te_iru"), "みっている");
        assert_eq!(c("polite_te_imashita"), "みっていました");
        // stem forms ignore the table
        assert_eq!(c("plain_negative"), "みない");
        assert_eq!(c("polite_dictionary"), "みます");
    }

    #[test]
    fn test_irregular_forms() {
        let suru = |t| conj("する", VerbClass::Irregular, t);
        let kuru = |t| conj("くる", VerbClass::Irregular, t);
        assert_eq!(suru("plain_negative"), "しない");
        assert_eq!(suru("plain_passive"), "される");
        assert_eq!(suru("plain_nagara"), "しながら");
        assert_eq!(suru("plain_tara_conditional"), "したら");
        assert_eq!(kuru("plain_causative"), "こさせる");
        assert_eq!(kuru("plain_imperative"), "こい");
        assert_eq!(kuru("plain_nakereba_ikenai"), "こなければいけない");
        assert_eq!(kuru("polite_te_imashita"), "きていました");
        assert_eq!(conj("ある", VerbClass::Irregular, "plain_nakute_mo_ii"), "なくてもいい");
    }

    #[test]
    fn test_manual_form_wins() {
        let mut verb = Verb::new("v", "いく", VerbClass::Godan);
        verb.manual_forms
            .insert("plain_te_form".to_string(), "ゆいて".to_string());
        verb.manual_forms
            .insert("plain_tai".to_string(), "いきたい".to_string());
        let ex = exceptions();
        assert_eq!(conjugate(&verb, "plain_tai", &ex).unwrap(), "いきたい");
        assert_eq!(conjugate(&verb, "plain_te_form", &ex).unwrap(), "ゆいて");
        assert_eq!(conjugate(&verb, "plain_te_iru", &ex).unwrap(), "ゆいている");
    }

    #[test]
    fn test_errors() {
        let ex = exceptions();
        let err = conjugate(&Verb::new("v", "たべる", VerbClass::Ichidan), "plain_tai", &ex)
            .unwrap_err();
        assert!(matches!(err, ConjugationError::UnsupportedTemplate { .. }));

        let err = conjugate(
            &Verb::new("v", "いらっしゃる", VerbClass::Irregular),
            "plain_negative",
            &ex,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConjugationError::MissingIrregularEntry("いらっしゃる".to_string())
        );
    }

    #[test]
    fn test_accepted_obligation_variants() {
        let verb = Verb::new("v", "たべる", VerbClass::Ichidan);
        let accepted = conjugate_accepted(&verb, "plain_nakereba_ikenai", &exceptions()).unwrap();
        assert_eq!(
            accepted,
            vec![
                "たべなければいけない".to_string(),
                "たべなきゃいけない".to_string(),
                "たべなくちゃいけない".to_string(),
            ]
        );
        let single = conjugate_accepted(&verb, "plain_past", &exceptions()).unwrap();
        assert_eq!(single, vec!["たべた".to_string()]);
    }

    #[test]
    fn test_accepted_keeps_manual_canonical_first() {
        let mut verb = Verb::new("v", "かく", VerbClass::Godan);
        verb.manual_forms.insert(
            "plain_nakereba_ikenai".to_string(),
            "かかねばならない".to_string(),
        );
        let accepted = conjugate_accepted(&verb, "plain_nakereba_ikenai", &exceptions()).unwrap();
        assert_eq!(accepted.len(), 4);
        assert_eq!(accepted[0], "かかねばならない");
        assert!(accepted.contains(&"かかなきゃいけない".to_string()));
    }
}
