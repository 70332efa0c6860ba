//! Godan (u-verb) stems: vowel-row shifts of the terminal mora plus the
//! euphonic sound changes of the te/past forms.

use super::{ConjugationError, Stems};
use crate::types::ExceptionTable;

/// Vowel row a terminal mora is shifted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    A,
    I,
    E,
}

/// Terminal morae the productive godan rules cover
pub const TERMINAL_MORAE: [char; 9] = ['う', 'く', 'ぐ', 'す', 'つ', 'ぬ', 'ぶ', 'む', 'る'];

pub fn shift(mora: char, row: Row) -> Option<char> {
    let shifted = match (mora, row) {
        ('う', Row::A) => 'わ',
        ('う', Row::I) => 'い',
        ('う', Row::E) => 'え',
        ('く', Row::A) => 'か',
        ('く', Row::I) => 'き',
        ('く', Row::E) => 'け',
        ('ぐ', Row::A) => 'が',
        ('ぐ', Row::I) => 'ぎ',
        ('ぐ', Row::E) => 'げ',
        ('す', Row::A) => 'さ',
        ('す', Row::I) => 'し',
        ('す', Row::E) => 'せ',
        ('つ', Row::A) => 'た',
        ('つ', Row::I) => 'ち',
        ('つ', Row::E) => 'て',
        ('ぬ', Row::A) => 'な',
        ('ぬ', Row::I) => 'に',
        ('ぬ', Row::E) => 'ね',
        ('ぶ', Row::A) => 'ば',
        ('ぶ', Row::I) => 'び',
        ('ぶ', Row::E) => 'べ',
        ('む', Row::A) => 'ま',
        ('む', Row::I) => 'み',
        ('む', Row::E) => 'め',
        ('る', Row::A) => 'ら',
        ('る', Row::I) => 'り',
        ('る', Row::E) => 'れ',
        _ => return None,
    };
    Some(shifted)
}

/// (te, past) endings replacing the terminal mora
fn sound_change(mora: char) -> Option<(&'static str, &'static str)> {
    match mora {
        'う' | 'つ' | 'る' => Some(("って", "った")),
        'ぶ' | 'む' | 'ぬ' => Some(("んで", "んだ")),
        'く' => Some(("いて", "いた")),
        'ぐ' => Some(("いで", "いだ")),
        'す' => Some(("して", "した")),
        _ => None,
    }
}

pub(super) fn stems(kana: &str, exceptions: &ExceptionTable) -> Result<Stems, ConjugationError> {
    let mut chars = kana.chars();
    let unsupported = |ending: Option<char>| ConjugationError::UnsupportedEnding {
        kana: kana.to_string(),
        ending: ending.map(String::from).unwrap_or_default(),
    };
    let last = chars.next_back().ok_or_else(|| unsupported(None))?;
    let base = chars.as_str();

    let row = |row: Row| -> Result<String, ConjugationError> {
        let mora = shift(last, row).ok_or_else(|| unsupported(Some(last)))?;
        Ok(format!("{base}{mora}"))
    };
    let (te_ending, past_ending) = sound_change(last).ok_or_else(|| unsupported(Some(last)))?;

    let a_row = row(Row::A)?;
    let e_row = row(Row::E)?;
    let te = exceptions
        .te_form(kana)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{base}{te_ending}"));
    let past = exceptions
        .plain_past(kana)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{base}{past_ending}"));

    Ok(Stems {
        dictionary: kana.to_string(),
        negative: a_row.clone(),
        continuative: row(Row::I)?,
        conditional: format!("{e_row}ば"),
        imperative: e_row,
        passive: format!("{a_row}れる"),
        causative: format!("{a_row}せる"),
        causative_passive: format!("{a_row}せられる"),
        te,
        past,
    })
}
