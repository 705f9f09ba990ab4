use crate::model::Theme;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyword fragments per theme, in classification order. Matched against lower-cased labels.
const BUILTIN_KEYWORDS: &[(Theme, &[&str])] = &[
    (
        Theme::Agriculture,
        &[
            "agri",
            "crop",
            "irrigation",
            "farm",
            "fertili",
            "kisan",
            "fisher",
            "dairy",
            "animal husbandry",
            "horticulture",
            "icar",
            "seed",
            "soil",
        ],
    ),
    (
        Theme::Defence,
        &[
            "defence",
            "defense",
            "army",
            "navy",
            "naval",
            "air force",
            "military",
            "ordnance",
            "border roads",
            "armed forces",
            "ex-servicemen",
        ],
    ),
    (
        Theme::Education,
        &[
            "educat",
            "school",
            "shiksha",
            "universit",
            "college",
            "scholarship",
            "mid-day meal",
            "literacy",
            "teacher",
        ],
    ),
    (
        Theme::Health,
        &[
            "health",
            "hospital",
            "medical",
            "ayushman",
            "aiims",
            "ayush",
            "vaccin",
            "disease",
            "pharma",
            "family welfare",
        ],
    ),
    (
        Theme::Infrastructure,
        &[
            "infra",
            "road",
            "highway",
            "rail",
            "bridge",
            "urban",
            "housing",
            "metro",
            "airport",
            "ports",
            "shipping",
            "electricity",
            "energy",
            "telecom",
            "water supply",
        ],
    ),
];

/// Enumerated sub-theme labels for datasets that use a closed vocabulary.
const BUILTIN_LABELS: &[(Theme, &[&str])] = &[
    (
        Theme::Agriculture,
        &[
            "Crop Insurance",
            "Irrigation",
            "Fertilizer Subsidy",
            "PM-KISAN",
            "Agricultural Research",
            "Animal Husbandry",
        ],
    ),
    (
        Theme::Defence,
        &[
            "Defence Revenue",
            "Defence Capital",
            "Defence Pensions",
            "Border Roads",
        ],
    ),
    (
        Theme::Education,
        &[
            "School Education",
            "Higher Education",
            "Samagra Shiksha",
            "Mid-Day Meal",
            "Scholarships",
        ],
    ),
    (
        Theme::Health,
        &[
            "National Health Mission",
            "Ayushman Bharat",
            "Health Research",
            "AIIMS",
            "Medical Education",
        ],
    ),
    (
        Theme::Infrastructure,
        &[
            "Roads and Highways",
            "Railways",
            "Urban Development",
            "Housing",
            "Ports and Shipping",
        ],
    ),
];

static BUILTIN: Lazy<Taxonomy> = Lazy::new(Taxonomy::builtin);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStrategy {
    /// Exact sets when every label is enumerated, keywords otherwise
    #[default]
    Auto,
    Keyword,
    #[value(alias = "exact-set")]
    #[serde(alias = "exact-set")]
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ThemeRule {
    theme: Theme,
    keywords: Vec<String>,
    labels: Vec<String>,
}

/// Ordered (theme, predicate) table. `Others` has no rule; it is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    rules: Vec<ThemeRule>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Taxonomy {
    pub fn builtin() -> Self {
        let rules = Theme::all()
            .filter(|theme| !theme.is_fallback())
            .map(|theme| ThemeRule {
                theme,
                keywords: lookup(BUILTIN_KEYWORDS, theme)
                    .iter()
                    .map(|k| k.to_lowercase())
                    .collect(),
                labels: lookup(BUILTIN_LABELS, theme)
                    .iter()
                    .map(|l| normalize_label(l))
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Replaces the keyword fragments of the given themes. Overrides for `Others` are ignored.
    pub fn with_keyword_overrides(mut self, overrides: &BTreeMap<Theme, Vec<String>>) -> Self {
        for (theme, keywords) in overrides {
            if theme.is_fallback() {
                tracing::warn!("ignoring keyword override for fallback theme {}", theme);
                continue;
            }
            if let Some(rule) = self.rules.iter_mut().find(|rule| rule.theme == *theme) {
                rule.keywords = keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
        }
        self
    }

    pub fn keywords(&self, theme: Theme) -> &[String] {
        self.rules
            .iter()
            .find(|rule| rule.theme == theme)
            .map(|rule| rule.keywords.as_slice())
            .unwrap_or(&[])
    }

    pub fn classify_keyword(&self, label: &str) -> Theme {
        let lowered = label.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k.as_str())))
            .map(|rule| rule.theme)
            .unwrap_or(Theme::Others)
    }

    pub fn classify_exact(&self, label: &str) -> Theme {
        let normalized = normalize_label(label);
        self.rules
            .iter()
            .find(|rule| rule.labels.iter().any(|l| *l == normalized))
            .map(|rule| rule.theme)
            .unwrap_or(Theme::Others)
    }

    pub fn is_enumerated(&self, label: &str) -> bool {
        let normalized = normalize_label(label);
        self.rules
            .iter()
            .any(|rule| rule.labels.iter().any(|l| *l == normalized))
    }

    /// Turns `Auto` into a concrete strategy for the given dataset labels.
    pub fn resolve_strategy<'a, I>(&self, requested: ClassifierStrategy, labels: I) -> ClassifierStrategy
    where
        I: IntoIterator<Item = &'a str>,
    {
        match requested {
            ClassifierStrategy::Auto => {
                let mut seen_any = false;
                let all_enumerated = labels.into_iter().all(|label| {
                    seen_any = true;
                    self.is_enumerated(label)
                });
                if seen_any && all_enumerated {
                    ClassifierStrategy::Exact
                } else {
                    ClassifierStrategy::Keyword
                }
            }
            concrete => concrete,
        }
    }
}

/// Classifier bound to a taxonomy and a concrete strategy.
#[derive(Debug, Clone)]
pub struct Classifier {
    taxonomy: Taxonomy,
    strategy: ClassifierStrategy,
}

impl Classifier {
    /// `Auto` is treated as `Keyword`; resolve it against the dataset first.
    pub fn new(taxonomy: Taxonomy, strategy: ClassifierStrategy) -> Self {
        let strategy = match strategy {
            ClassifierStrategy::Auto => ClassifierStrategy::Keyword,
            concrete => concrete,
        };
        Self { taxonomy, strategy }
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    pub fn classify(&self, label: &str) -> Theme {
        match self.strategy {
            ClassifierStrategy::Exact => self.taxonomy.classify_exact(label),
            ClassifierStrategy::Keyword | ClassifierStrategy::Auto => {
                self.taxonomy.classify_keyword(label)
            }
        }
    }
}

/// Keyword classification against the built-in taxonomy.
pub fn classify(label: &str) -> Theme {
    BUILTIN.classify_keyword(label)
}

fn lookup(table: &'static [(Theme, &'static [&'static str])], theme: Theme) -> &'static [&'static str] {
    table
        .iter()
        .find(|(t, _)| *t == theme)
        .map(|(_, entries)| *entries)
        .unwrap_or(&[])
}

fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_strategy_tolerates_free_text() {
        assert_eq!(classify("Agri & Farmers Welfare"), Theme::Agriculture);
        assert_eq!(classify("Agriculture Research (ICAR)"), Theme::Agriculture);
        assert_eq!(classify("CROP INSURANCE"), Theme::Agriculture);
        assert_eq!(classify("Defence Revenue"), Theme::Defence);
        assert_eq!(classify("Rural Roads (PMGSY)"), Theme::Infrastructure);
        assert_eq!(classify("National Health Mission"), Theme::Health);
    }

    #[test]
    fn first_theme_in_order_wins() {
        // "Border Roads" holds both a defence and an infrastructure fragment.
        assert_eq!(classify("Border Roads Organisation"), Theme::Defence);
        // "Medical Education" holds education and health fragments.
        assert_eq!(classify("Medical Education"), Theme::Education);
    }

    #[test]
    fn unmatched_labels_fall_back_to_others() {
        assert_eq!(classify(""), Theme::Others);
        assert_eq!(classify("Interest Payments"), Theme::Others);
        assert_eq!(classify("Women Empowerment"), Theme::Others);
        assert_eq!(classify("財政"), Theme::Others);
    }

    #[test]
    fn exact_strategy_matches_whole_labels_only() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.classify_exact("crop  insurance"), Theme::Agriculture);
        assert_eq!(taxonomy.classify_exact("Medical Education"), Theme::Health);
        assert_eq!(taxonomy.classify_exact("Crop Insurance Scheme"), Theme::Others);
    }

    #[test]
    fn auto_strategy_prefers_exact_sets_for_closed_vocabularies() {
        let taxonomy = Taxonomy::builtin();
        let closed = ["Crop Insurance", "Irrigation", "Defence Revenue"];
        let open = ["Crop Insurance", "Agri & Farmers Welfare"];
        assert_eq!(
            taxonomy.resolve_strategy(ClassifierStrategy::Auto, closed.iter().copied()),
            ClassifierStrategy::Exact
        );
        assert_eq!(
            taxonomy.resolve_strategy(ClassifierStrategy::Auto, open.iter().copied()),
            ClassifierStrategy::Keyword
        );
        assert_eq!(
            taxonomy.resolve_strategy(ClassifierStrategy::Auto, std::iter::empty()),
            ClassifierStrategy::Keyword
        );
        assert_eq!(
            taxonomy.resolve_strategy(ClassifierStrategy::Exact, open.iter().copied()),
            ClassifierStrategy::Exact
        );
    }

    #[test]
    fn keyword_overrides_replace_fragments() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Theme::Health, vec!["  Wellness ".to_string(), String::new()]);
        overrides.insert(Theme::Others, vec!["anything".to_string()]);
        let taxonomy = Taxonomy::builtin().with_keyword_overrides(&overrides);
        assert_eq!(taxonomy.keywords(Theme::Health), ["wellness".to_string()]);
        assert_eq!(taxonomy.classify_keyword("Wellness Centres"), Theme::Health);
        assert_eq!(taxonomy.classify_keyword("Hospital Upgrades"), Theme::Others);
        assert!(taxonomy.keywords(Theme::Others).is_empty());
    }

    #[test]
    fn classifier_applies_resolved_strategy() {
        let exact = Classifier::new(Taxonomy::builtin(), ClassifierStrategy::Exact);
        let keyword = Classifier::new(Taxonomy::builtin(), ClassifierStrategy::Auto);
        assert_eq!(keyword.strategy(), ClassifierStrategy::Keyword);
        assert_eq!(exact.classify("Medical Education"), Theme::Health);
        assert_eq!(keyword.classify("Medical Education"), Theme::Education);
    }
}
