//! Template ids understood by the rule engine.

/// Every grammatical form the productive rules can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    PlainDictionary,
    PlainNegative,
    PlainPast,
    PlainPastNegative,
    PlainTeForm,
    PoliteDictionary,
    PoliteNegative,
    PolitePast,
    PolitePastNegative,
    PoliteTeForm,
    PlainPassive,
    PlainCausative,
    PlainCausativePassive,
    PlainBaConditional,
    PlainTaraConditional,
    PlainTariSequence,
    PlainImperative,
    PlainProhibitive,
    PlainTeOku,
    PlainTeShimau,
    PlainNagara,
    PlainYasui,
    PlainNikui,
    PoliteNasai,
    PlainNakerebaIkenai,
    PlainNakuteMoIi,
    PlainTeIru,
    PoliteTeImasu,
    PoliteTeImasen,
    PoliteTeImashita,
    PoliteTeImasenDeshita,
}

impl Form {
    pub const ALL: [Form; 31] = [
        Form::PlainDictionary,
        Form::PlainNegative,
        Form::PlainPast,
        Form::PlainPastNegative,
        Form::PlainTeForm,
        Form::PoliteDictionary,
        Form::PoliteNegative,
        Form::PolitePast,
        Form::PolitePastNegative,
        Form::PoliteTeForm,
        Form::PlainPassive,
        Form::PlainCausative,
        Form::PlainCausativePassive,
        Form::PlainBaConditional,
        Form::PlainTaraConditional,
        Form::PlainTariSequence,
        Form::PlainImperative,
        Form::PlainProhibitive,
        Form::PlainTeOku,
        Form::PlainTeShimau,
        Form::PlainNagara,
        Form::PlainYasui,
        Form::PlainNikui,
        Form::PoliteNasai,
        Form::PlainNakerebaIkenai,
        Form::PlainNakuteMoIi,
        Form::PlainTeIru,
        Form::PoliteTeImasu,
        Form::PoliteTeImasen,
        Form::PoliteTeImashita,
        Form::PoliteTeImasenDeshita,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainDictionary => "plain_dictionary",
            Self::PlainNegative => "plain_negative",
            Self::PlainPast => "plain_past",
            Self::PlainPastNegative => "plain_past_negative",
            Self::PlainTeForm => "plain_te_form",
            Self::PoliteDictionary => "polite_dictionary",
            Self::PoliteNegative => "polite_negative",
            Self::PolitePast => "polite_past",
            Self::PolitePastNegative => "polite_past_negative",
            Self::PoliteTeForm => "polite_te_form",
            Self::PlainPassive => "plain_passive",
            Self::PlainCausative => "plain_causative",
            Self::PlainCausativePassive => "plain_causative_passive",
            Self::PlainBaConditional => "plain_ba_conditional",
            Self::PlainTaraConditional => "plain_tara_conditional",
            Self::PlainTariSequence => "plain_tari_sequence",
            Self::PlainImperative => "plain_imperative",
            Self::PlainProhibitive => "plain_prohibitive",
            Self::PlainTeOku => "plain_te_oku",
            Self::PlainTeShimau => "plain_te_shimau",
            Self::PlainNagara => "plain_nagara",
            Self::PlainYasui => "plain_yasui",
            Self::PlainNikui => "plain_nikui",
            Self::PoliteNasai => "polite_nasai",
            Self::PlainNakerebaIkenai => "plain_nakereba_ikenai",
            Self::PlainNakuteMoIi => "plain_nakute_mo_ii",
            Self::PlainTeIru => "plain_te_iru",
            Self::PoliteTeImasu => "polite_te_imasu",
            Self::PoliteTeImasen => "polite_te_imasen",
            Self::PoliteTeImashita => "polite_te_imashita",
            Self::PoliteTeImasenDeshita => "polite_te_imasen_deshita",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|form| form.as_str() == s)
    }

    /// Suffix appended to the te-form for the progressive/state family
    pub fn progressive_suffix(&self) -> Option<&'static str> {
        match self {
            Self::PlainTeIru => Some("いる"),
            Self::PoliteTeImasu => Some("います"),
            Self::PoliteTeImasen => Some("いません"),
            Self::PoliteTeImashita => Some("いました"),
            Self::PoliteTeImasenDeshita => Some("いませんでした"),
            _ => None,
        }
    }
}
