//! Broker-site strategies.
//!
//! Each broker platform differs only in which hosts it serves, which URL
//! shapes mark its document endpoints, and whether its links are rendered
//! client-side. Those differences are data; the fetch chain is shared.

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;
use url::Url;

use super::candidates::DocumentTarget;
use super::error::FetchError;
use super::pipeline::{DocumentHunt, RenderMode};
use super::{host_matches, FetchContext, Strategy};
use crate::models::{DebugMeta, FetchedDocument};

/// Static description of one broker platform.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    pub hosts: &'static [&'static str],
    /// URL patterns of the site's document endpoints.
    pub hints: &'static [&'static str],
    pub render: RenderMode,
}

/// Known broker platforms, most specific first.
pub static SITE_PROFILES: &[SiteProfile] = &[
    SiteProfile {
        name: "finn",
        hosts: &["finn.no"],
        hints: &[r"/realestate/.*/prospectus", r"salgsoppgave", r"finncdn\.no/.+\.pdf"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "dnbeiendom",
        hosts: &["dnbeiendom.no"],
        hints: &[r"/api/.*/documents?/", r"/salgsoppgave"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "krogsveen",
        hosts: &["krogsveen.no"],
        hints: &[r"/prospekt", r"/api/.*/document"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "privatmegleren",
        hosts: &["privatmegleren.no"],
        hints: &[r"/salgsoppgave", r"/dokumenter/"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "eiendomsmegler1",
        hosts: &["eiendomsmegler1.no", "sparebank1.no"],
        hints: &[r"/salgsoppgave", r"/documents?/"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "nordvikbolig",
        hosts: &["nordvikbolig.no"],
        hints: &[r"/salgsoppgave", r"/files/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "obos",
        hosts: &["obos.no", "obosmegleren.no"],
        hints: &[r"/salgsoppgave", r"/api/.*/pdf"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "heimdalbolig",
        hosts: &["heimdalbolig.no"],
        hints: &[r"/salgsoppgave", r"/dokument/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "aktiv",
        hosts: &["aktiv.no"],
        hints: &[r"/salgsoppgave", r"/download/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "proaktiv",
        hosts: &["proaktiv.no"],
        hints: &[r"/salgsoppgave", r"/documents?/"],
        render: RenderMode::Script,
    },
    SiteProfile {
        name: "garanti",
        hosts: &["garanti.no"],
        hints: &[r"/salgsoppgave", r"/files/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "notar",
        hosts: &["notar.no"],
        hints: &[r"/salgsoppgave", r"/vedlegg/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "exbo",
        hosts: &["exbo.no"],
        hints: &[r"/salgsoppgave", r"/dokumenter/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "semjohnsen",
        hosts: &["semjohnsen.no"],
        hints: &[r"/salgsoppgave", r"/files/"],
        render: RenderMode::Static,
    },
    SiteProfile {
        name: "sormegleren",
        hosts: &["sormegleren.no"],
        hints: &[r"/salgsoppgave", r"/dokument/"],
        render: RenderMode::Static,
    },
];

/// Strategy for one broker platform.
pub struct SiteStrategy {
    profile: &'static SiteProfile,
    hints: Vec<Regex>,
}

impl SiteStrategy {
    pub fn new(profile: &'static SiteProfile) -> Self {
        let hints = profile
            .hints
            .iter()
            .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Invalid URL hint for {}: {}", profile.name, e);
                    None
                }
            })
            .collect();
        Self { profile, hints }
    }

    /// One strategy per built-in profile, in priority order.
    pub fn all() -> Vec<Self> {
        SITE_PROFILES.iter().map(Self::new).collect()
    }

    pub fn profile(&self) -> &'static SiteProfile {
        self.profile
    }
}

#[async_trait]
impl Strategy for SiteStrategy {
    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn matches(&self, url: &Url) -> bool {
        self.profile.hosts.iter().any(|host| host_matches(url, host))
    }

    async fn try_fetch(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        DocumentHunt {
            strategy: self.profile.name,
            target: DocumentTarget::Prospectus,
            hints: &self.hints,
            render: self.profile.render,
        }
        .run(ctx, url, debug)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_profile_compiles_its_hints() {
        for strategy in SiteStrategy::all() {
            assert_eq!(strategy.hints.len(), strategy.profile().hints.len());
        }
    }

    #[test]
    fn test_profile_names_unique() {
        let mut names: Vec<&str> = SITE_PROFILES.iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SITE_PROFILES.len());
    }

    #[test]
    fn test_matches_by_host() {
        let strategies = SiteStrategy::all();
        let url = Url::parse("https://www.krogsveen.no/kjope/123").unwrap();
        let matching: Vec<&str> = strategies
            .iter()
            .filter(|s| s.matches(&url))
            .map(|s| s.name())
            .collect();
        assert_eq!(matching, vec!["krogsveen"]);
    }

    #[test]
    fn test_aktiv_does_not_match_proaktiv() {
        let aktiv = SiteStrategy::all()
            .into_iter()
            .find(|s| s.name() == "aktiv")
            .unwrap();
        assert!(!aktiv.matches(&Url::parse("https://proaktiv.no/bolig/1").unwrap()));
        assert!(aktiv.matches(&Url::parse("https://www.aktiv.no/bolig/1").unwrap()));
    }
}
