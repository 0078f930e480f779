//! Per-page feature flags computed from keyword and regex matches.

use std::sync::LazyLock;

use regex::Regex;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("span pattern"))
        .collect()
}

fn count_hits(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Direct condition-report vocabulary.
static CUE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"tilstandsrapport",
        r"boligsalgsrapport",
        r"takstrapport",
        r"tilstandsgrad",
        r"ns\s*3600",
        r"bygningssakkyndig",
        r"takstingeni[øo]r",
        r"befaring",
    ])
});

/// Building-part vocabulary that implies the report continues.
static FOLLOW_CUE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"v[åa]trom",
        r"baderom",
        r"\bsluk\b",
        r"membran",
        r"fuktm[åa]l",
        r"elektrisk\s+anlegg",
        r"el-?anlegg",
        r"sikringsskap",
        r"taktekking",
        r"takkonstruksjon",
        r"takrenne",
        r"drenering",
        r"grunnmur",
        r"avl[øo]psr[øo]r",
        r"vannledning",
        r"ventilasjon",
        r"yttervegg",
        r"vinduer\s+og\s+d[øo]rer",
        r"krypkjeller",
        r"radon",
        r"ildsted|skorstein|pipe\b",
        r"\btg\s*-?\s*(?:[0-3]|iu)\b",
    ])
});

/// Grading-code mentions.
static GRADE_CODE: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"\btg\s*-?\s*(?:[0-3]|iu)\b", r"tilstandsgrad\s*[0-3]"]));

/// Inspector and surveyor firms.
static SURVEYOR_FIRM: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"norsk\s+takst",
        r"anticimex",
        r"takstmann",
        r"takstforbundet",
        r"\bntf\b",
        r"byggmester\s+og\s+takst",
    ])
});

/// Legally distinct documents. Never condition-report vocabulary.
static STRONG_TERMINATOR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"egenerkl[æa]ring",
        r"energiattest",
        r"energimerke",
        r"budskjema",
        r"budgivning",
        r"kj[øo]pekontrakt",
        r"boligkj[øo]perforsikring",
        r"eierskifteforsikring",
        r"nabolagsprofil",
        r"vedtekter\s+for",
        r"grunnboksutskrift",
    ])
});

/// Section changes that do not by themselves end a report.
static SOFT_TERMINATOR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bvedlegg\b",
        r"plantegning",
        r"situasjonskart",
        r"reguleringsplan",
        r"prisantydning",
        r"omkostninger",
        r"meglers\s+vederlag",
    ])
});

/// Boilerplate the report vendors print on every template page.
static VENDOR_BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"forskrift\s+til\s+avhendingslova",
        r"tryggere\s+bolighandel",
        r"rapporten\s+er\s+utarbeidet",
        r"oppdragsnummer",
        r"befaringsdato",
        r"rapportdato",
    ])
});

/// Condition-report titles a strict title line must start with.
static TITLE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:tilstandsrapport|boligsalgsrapport|tilstandsrapport\s+for\s+bolig)\b")
        .expect("title pattern")
});

/// Early lines that mark an index page rather than the report itself.
static INDEX_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:innhold|informasjon|fakta|vedlegg|oversikt\s+over\s+vedlegg)")
        .expect("index heading pattern")
});

/// Cap on hits counted from a single page so one noisy page cannot
/// dominate a score sum.
const MAX_HITS_PER_PAGE: usize = 6;

/// Feature flags and hit counts for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFeatures {
    pub cue_hits: usize,
    pub follow_hits: usize,
    pub grade_hits: usize,
    pub firm_hits: usize,
    pub soft_terminator: bool,
    pub strong_terminator: bool,
    /// An early line that opens with a strong terminator.
    pub terminator_heading: bool,
    pub attachments_index: bool,
    pub vendor_boilerplate: bool,
    pub strict_title: bool,
}

impl PageFeatures {
    pub fn compute(text: &str, title_line_window: usize) -> Self {
        let strong_terminator = any_match(&STRONG_TERMINATOR, text);
        let soft_terminator = any_match(&SOFT_TERMINATOR, text);
        Self {
            cue_hits: count_hits(&CUE, text).min(MAX_HITS_PER_PAGE),
            follow_hits: count_hits(&FOLLOW_CUE, text).min(MAX_HITS_PER_PAGE),
            grade_hits: count_hits(&GRADE_CODE, text).min(MAX_HITS_PER_PAGE),
            firm_hits: count_hits(&SURVEYOR_FIRM, text).min(MAX_HITS_PER_PAGE),
            soft_terminator,
            strong_terminator,
            terminator_heading: has_terminator_heading(text, title_line_window),
            attachments_index: looks_like_attachments_index(text, title_line_window),
            vendor_boilerplate: any_match(&VENDOR_BOILERPLATE, text),
            strict_title: has_strict_title(text, title_line_window),
        }
    }

    pub fn cue(&self) -> bool {
        self.cue_hits > 0
    }

    pub fn follow_cue(&self) -> bool {
        self.follow_hits > 0
    }

    /// Report vocabulary that keeps a span alive. Vendor boilerplate is
    /// excluded: broker footers repeat it on every page.
    pub fn has_signal(&self) -> bool {
        self.cue() || self.follow_cue()
    }

    /// Page begins a legally distinct document or an attachments index and
    /// carries no report vocabulary of its own.
    pub fn ends_report(&self) -> bool {
        (self.strong_terminator || self.attachments_index) && !self.cue()
    }

    /// Hard stop for the aggressive layer: a legally distinct document that
    /// opens with its own heading, or a terminator page without report
    /// vocabulary. A report page merely mentioning the self-declaration is
    /// neither.
    pub fn hard_stop(&self) -> bool {
        self.terminator_heading || (self.strong_terminator && !self.cue())
    }

    /// Weighted start score for the aggressive layer.
    pub fn start_score(&self, strong_weight: i32) -> i32 {
        strong_weight * self.cue_hits as i32 + self.follow_hits as i32
    }

    /// Per-page score for the scored-block layer.
    pub fn block_score(&self) -> i32 {
        let mut score = 2 * self.cue_hits as i32
            + self.follow_hits as i32
            + 2 * self.grade_hits as i32
            + 2 * self.firm_hits as i32;
        if self.strong_terminator {
            score -= 4;
        }
        if self.soft_terminator {
            score -= 2;
        }
        if self.attachments_index {
            score -= 3;
        }
        score
    }
}

/// Compute features for every page once.
pub fn compute_all<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    title_line_window: usize,
) -> Vec<PageFeatures> {
    texts
        .into_iter()
        .map(|t| PageFeatures::compute(t, title_line_window))
        .collect()
}

fn early_lines(text: &str, window: usize) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(window)
}

/// A page whose first `window` non-empty lines contain a line starting with
/// the report title, and none of which is an index heading.
pub fn has_strict_title(text: &str, window: usize) -> bool {
    let mut title = false;
    for line in early_lines(text, window) {
        if INDEX_HEADING.is_match(line) {
            return false;
        }
        if TITLE_START.is_match(line) {
            title = true;
        }
    }
    title
}

/// An early line that starts with a legally distinct document's name.
fn has_terminator_heading(text: &str, window: usize) -> bool {
    early_lines(text, window).any(|line| {
        STRONG_TERMINATOR
            .iter()
            .any(|re| re.find(line).is_some_and(|m| m.start() == 0))
    })
}

/// Whether the page opens with an index heading (contents, attachments).
pub fn has_index_heading(text: &str, window: usize) -> bool {
    early_lines(text, window).any(|line| INDEX_HEADING.is_match(line))
}

/// An attachments list: an index heading followed by several named
/// documents.
fn looks_like_attachments_index(text: &str, window: usize) -> bool {
    let heading = early_lines(text, window).any(|line| {
        let line = line.to_lowercase();
        line.starts_with("vedlegg") || line.starts_with("oversikt over vedlegg")
    });
    if !heading {
        return false;
    }
    let listed = text
        .lines()
        .filter(|line| {
            any_match(&STRONG_TERMINATOR, line)
                || any_match(&SOFT_TERMINATOR, line)
                || any_match(&CUE, line)
        })
        .count();
    listed >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_title() {
        assert!(has_strict_title("\n\nTilstandsrapport\nEnebolig", 10));
        assert!(has_strict_title("Storgata 1\nBoligsalgsrapport for Storgata 1", 10));
        assert!(!has_strict_title("Om boligen\nSe vedlagt tilstandsrapport", 10));
        assert!(!has_strict_title("Innhold\nTilstandsrapport ..... 12", 10));
    }

    #[test]
    fn test_title_outside_window_is_ignored() {
        let text = format!("{}Tilstandsrapport", "linje\n".repeat(12));
        assert!(!has_strict_title(&text, 10));
        assert!(has_strict_title(&text, 13));
    }

    #[test]
    fn test_terminator_with_cue_does_not_end_report() {
        let both = PageFeatures::compute("Egenerklæring er gjennomgått i tilstandsrapporten", 10);
        assert!(both.strong_terminator);
        assert!(!both.ends_report());

        let only = PageFeatures::compute("Egenerklæringsskjema\nSelgers opplysninger", 10);
        assert!(only.ends_report());
    }

    #[test]
    fn test_report_page_mentioning_self_declaration_is_not_a_hard_stop() {
        let page = PageFeatures::compute(
            "Konklusjon\nTilstandsrapporten bygger på befaring. Selgers egenerklæring er gjennomgått.",
            10,
        );
        assert!(page.strong_terminator);
        assert!(!page.hard_stop());

        let form = PageFeatures::compute("Egenerklæringsskjema\nBoligen har tilstandsrapport", 10);
        assert!(form.hard_stop());
    }

    #[test]
    fn test_footer_boilerplate_is_not_signal() {
        let footer = PageFeatures::compute("Meglers vederlag\nOppdragsnummer 1-0123/24", 10);
        assert!(footer.vendor_boilerplate);
        assert!(!footer.has_signal());
    }

    #[test]
    fn test_attachments_index() {
        let text = "Vedlegg\nEgenerklæring\nEnergiattest\nPlantegning\nBudskjema";
        let features = PageFeatures::compute(text, 10);
        assert!(features.attachments_index);
        assert!(features.ends_report());
        assert!(features.block_score() < 0);
    }

    #[test]
    fn test_grade_codes_count_as_follow_cue() {
        let features = PageFeatures::compute("Bad\nTG 2 avvik på sluk", 10);
        assert!(features.follow_cue());
        assert_eq!(features.grade_hits, 1);
    }
}
