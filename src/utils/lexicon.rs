//! Positive and negative keyword lexicons shared by every strategy.
//!
//! Every strategy filters candidates through the same compiled lexicons so
//! near-duplicate strategies cannot drift apart.

use std::sync::LazyLock;

use regex::Regex;

/// Case-insensitive positive and negative pattern lists.
///
/// `negative_alone` patterns reject text only when no positive pattern
/// matches it as well.
pub struct Lexicon {
    positive: Vec<Regex>,
    negative: Vec<Regex>,
    negative_alone: Vec<Regex>,
}

fn build(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("lexicon pattern"))
        .collect()
}

impl Lexicon {
    fn compile(positive: &[&str], negative: &[&str], negative_alone: &[&str]) -> Self {
        Self {
            positive: build(positive),
            negative: build(negative),
            negative_alone: build(negative_alone),
        }
    }

    /// Whether the text names a document this lexicon must never accept.
    pub fn is_negative(&self, text: &str) -> bool {
        self.negative.iter().any(|re| re.is_match(text))
            || (self.negative_alone.iter().any(|re| re.is_match(text)) && !self.is_positive(text))
    }

    /// Number of distinct positive patterns that match.
    pub fn positive_hits(&self, text: &str) -> usize {
        self.positive.iter().filter(|re| re.is_match(text)).count()
    }

    pub fn is_positive(&self, text: &str) -> bool {
        self.positive.iter().any(|re| re.is_match(text))
    }
}

/// Documents that are never the prospectus.
const NOT_PROSPECTUS: &[&str] = &[
    r"nabolag",
    r"neighbou?rhood",
    r"energiattest",
    r"energimerk",
    r"energy[-_ ]?cert",
    r"budskjema",
    r"budgiv",
    r"bud[-_ ]?regler",
    r"\bbid[-_ ]?form",
    r"forsikring",
    r"insurance",
    r"personvern",
    r"privacy",
    r"cookie",
    r"vilk[åa]r",
    r"kj[øo]pekontrakt",
    r"egenerkl",
    r"oppdragsavtale",
];

/// Condition-report-only terms.
const REPORT_TERMS: &[&str] = &[
    r"tilstandsrapport",
    r"boligsalgsrapport",
    r"takstrapport",
    r"verditakst",
    r"condition[-_ ]?report",
];

/// Lexicon used when hunting for the full prospectus. A report term is
/// negative only on its own: "salgsoppgave med tilstandsrapport" is the
/// bundle.
pub static PROSPECTUS_LEXICON: LazyLock<Lexicon> = LazyLock::new(|| {
    Lexicon::compile(
        &[
            r"salgsoppgave",
            r"prospekt",
            r"komplett",
            r"fullstendig",
            r"utskrift",
            r"salgsdokument",
            r"\bfull\b",
            r"disclosure",
            r"complete",
            r"printable",
        ],
        NOT_PROSPECTUS,
        REPORT_TERMS,
    )
});

/// Lexicon used by strategies that fetch the condition report directly.
pub static REPORT_LEXICON: LazyLock<Lexicon> =
    LazyLock::new(|| Lexicon::compile(REPORT_TERMS, NOT_PROSPECTUS, &[]));

/// Link text on a listing page that points at the broker's full prospectus.
pub static DISCOVERY_LINK_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(komplett|fullstendig|hele|digital)\s+salgsoppgave|(se|vis|last ned|les)\s+(salgsoppgave|prospekt)|salgsoppgave\s+hos\s+megler|mer\s+info(rmasjon)?\s+hos\s+megler|full\s+prospectus|complete\s+document|disclosure",
    )
    .expect("discovery cue pattern")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prospectus_lexicon() {
        assert!(PROSPECTUS_LEXICON.is_positive("Se komplett salgsoppgave"));
        assert!(PROSPECTUS_LEXICON.is_negative("Nabolagsprofil"));
        assert!(PROSPECTUS_LEXICON.is_negative("Tilstandsrapport.pdf"));
        assert!(PROSPECTUS_LEXICON.is_negative("Energiattest"));
        assert!(!PROSPECTUS_LEXICON.is_negative("salgsoppgave_storgata_1.pdf"));
        assert_eq!(PROSPECTUS_LEXICON.positive_hits("Komplett salgsoppgave"), 2);
    }

    #[test]
    fn test_combined_bundle_is_not_negative() {
        assert!(!PROSPECTUS_LEXICON.is_negative("Komplett salgsoppgave med tilstandsrapport"));
        assert!(!PROSPECTUS_LEXICON.is_negative("/docs/salgsoppgave-med-tilstandsrapport.pdf"));
        assert!(PROSPECTUS_LEXICON.is_negative("/docs/tilstandsrapport-storgata-1.pdf"));
        assert!(PROSPECTUS_LEXICON.is_negative("Salgsoppgave og energiattest"));
    }

    #[test]
    fn test_report_lexicon_inverts_report_terms() {
        assert!(REPORT_LEXICON.is_positive("Tilstandsrapport"));
        assert!(!REPORT_LEXICON.is_negative("tilstandsrapport.pdf"));
        assert!(REPORT_LEXICON.is_negative("budskjema.pdf"));
    }

    #[test]
    fn test_discovery_cue() {
        assert!(DISCOVERY_LINK_CUE.is_match("Se komplett salgsoppgave"));
        assert!(DISCOVERY_LINK_CUE.is_match("Mer informasjon hos megler"));
        assert!(!DISCOVERY_LINK_CUE.is_match("Kontakt megler"));
    }
}
