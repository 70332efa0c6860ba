//! Irregular verbs: one literal row per dictionary form.
//!
//! Core forms come straight from the table. Everything else is derived from
//! the same row through the shared stem rendering in the parent module.

use super::{ConjugationError, Form, Stems};

pub(super) struct IrregularEntry {
    pub kana: &'static str,
    pub negative: &'static str,
    pub past: &'static str,
    pub past_negative: &'static str,
    pub te: &'static str,
    pub polite: &'static str,
    pub polite_negative: &'static str,
    pub polite_past: &'static str,
    pub polite_past_negative: &'static str,
    pub polite_te: &'static str,
    /// Stem before ます, ながら, やすい
    pub continuative: &'static str,
    pub passive: &'static str,
    pub causative: &'static str,
    pub causative_passive: &'static str,
    pub conditional: &'static str,
    pub imperative: &'static str,
}

const TABLE: [IrregularEntry; 3] = [
    IrregularEntry {
        kana: "する",
        negative: "しない",
        past: "した",
        past_negative: "しなかった",
        te: "して",
        polite: "します",
        polite_negative: "しません",
        polite_past: "しました",
        polite_past_negative: "しませんでした",
        polite_te: "してください",
        continuative: "し",
        passive: "される",
        causative: "させる",
        causative_passive: "させられる",
        conditional: "すれば",
        imperative: "しろ",
    },
    IrregularEntry {
        kana: "くる",
        negative: "こない",
        past: "きた",
        past_negative: "こなかった",
        te: "きて",
        polite: "きます",
        polite_negative: "きません",
        polite_past: "きました",
        polite_past_negative: "きませんでした",
        polite_te: "きてください",
        continuative: "き",
        passive: "こられる",
        causative: "こさせる",
        causative_passive: "こさせられる",
        conditional: "くれば",
        imperative: "こい",
    },
    IrregularEntry {
        kana: "ある",
        negative: "ない",
        past: "あった",
        past_negative: "なかった",
        te: "あって",
        polite: "あります",
        polite_negative: "ありません",
        polite_past: "ありました",
        polite_past_negative: "ありませんでした",
        polite_te: "あってください",
        continuative: "あり",
        passive: "あられる",
        causative: "あらせる",
        causative_passive: "あらせられる",
        conditional: "あれば",
        imperative: "あれ",
    },
];

pub(super) fn entry(kana: &str) -> Result<&'static IrregularEntry, ConjugationError> {
    TABLE
        .iter()
        .find(|entry| entry.kana == kana)
        .ok_or_else(|| ConjugationError::MissingIrregularEntry(kana.to_string()))
}

/// Dictionary forms with a table row
pub fn known_kana() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|entry| entry.kana)
}

impl IrregularEntry {
    pub(super) fn core_form(&self, form: Form) -> Option<&'static str> {
        let literal = match form {
            Form::PlainDictionary => self.kana,
            Form::PlainNegative => self.negative,
            Form::PlainPast => self.past,
            Form::PlainPastNegative => self.past_negative,
            Form::PlainTeForm => self.te,
            Form::PoliteDictionary => self.polite,
            Form::PoliteNegative => self.polite_negative,
            Form::PolitePast => self.polite_past,
            Form::PolitePastNegative => self.polite_past_negative,
            Form::PoliteTeForm => self.polite_te,
            _ => return None,
        };
        Some(literal)
    }

    pub(super) fn stems(&self) -> Stems {
        Stems {
            dictionary: self.kana.to_string(),
            negative: self
                .negative
                .strip_suffix("ない")
                .unwrap_or(self.negative)
                .to_string(),
            continuative: self.continuative.to_string(),
            conditional: self.conditional.to_string(),
            imperative: self.imperative.to_string(),
            passive: self.passive.to_string(),
            causative: self.causative.to_string(),
            causative_passive: self.causative_passive.to_string(),
            te: self.te.to_string(),
            past: self.past.to_string(),
        }
    }
}
