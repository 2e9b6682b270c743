use regex::RegexBuilder;

// ---------------------------------------------------------------------------
// URL-only relevance heuristic. Lower priority = more urgent.
// ---------------------------------------------------------------------------

/// Sections with no financial-news value; rejected before admission.
pub const DEFAULT_EXCLUDE_URL_PATTERNS: &[&str] = &[
    r"/sports?/",
    r"/cricket/",
    r"/football/",
    r"/tennis/",
    r"/basketball/",
    r"/olympics?/",
    r"/entertainment/",
    r"/bollywood/",
    r"/hollywood/",
    r"/celebrity/",
    r"/movie/",
    r"/music/",
    r"/tv/",
    r"/lifestyle/",
    r"/fashion/",
    r"/beauty/",
    r"/travel/",
    r"/food/",
    r"/recipe/",
    r"/horoscope/",
    r"/astrology/",
];

pub const DEFAULT_HIGH_PRIORITY_PATTERNS: &[&str] = &[
    r"/business/",
    r"/markets?/",
    r"/economy/",
    r"/economics/",
    r"/finance/",
    r"/stocks?/",
    r"/companies?/",
    r"/industry/",
    r"/bank(s|ing)/",
    r"/commodities?/",
    r"/ipo/",
    r"/earnings?/",
    r"/results?/",
    r"/policy/",
    r"/regulator/",
    r"/rbi/",
    r"/sebi/",
    r"/government/",
];

pub const DEFAULT_LOW_PRIORITY_PATTERNS: &[&str] = &[
    r"/opinion/",
    r"/editorial/",
    r"/feature/",
    r"/analysis/",
    r"/interview/",
];

pub const HIGH_PRIORITY: i64 = -10;
pub const LOW_PRIORITY: i64 = 10;

/// Heuristic URL-based priority policy for news articles.
pub struct ArticlePriorityPolicy {
    exclude: Vec<regex::Regex>,
    high: Vec<regex::Regex>,
    low: Vec<regex::Regex>,
}

impl Default for ArticlePriorityPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXCLUDE_URL_PATTERNS,
            DEFAULT_HIGH_PRIORITY_PATTERNS,
            DEFAULT_LOW_PRIORITY_PATTERNS,
        )
        .expect("default priority patterns are valid")
    }
}

impl ArticlePriorityPolicy {
    pub fn new(
        exclude_patterns: &[&str],
        high_patterns: &[&str],
        low_patterns: &[&str],
    ) -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| -> Result<Vec<regex::Regex>, regex::Error> {
            patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect()
        };
        Ok(Self {
            exclude: compile(exclude_patterns)?,
            high: compile(high_patterns)?,
            low: compile(low_patterns)?,
        })
    }

    pub fn should_exclude_url(&self, url: &str) -> bool {
        self.exclude.iter().any(|p| p.is_match(url))
    }

    pub fn get_priority(&self, url: &str) -> i64 {
        if self.high.iter().any(|p| p.is_match(url)) {
            return HIGH_PRIORITY;
        }
        if self.low.iter().any(|p| p.is_match(url)) {
            return LOW_PRIORITY;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_urls_are_urgent() {
        let policy = ArticlePriorityPolicy::default();
        assert_eq!(
            policy.get_priority("https://example.com/business/q2-earnings-story-123"),
            HIGH_PRIORITY
        );
        assert_eq!(
            policy.get_priority("https://example.com/markets/sensex-today"),
            HIGH_PRIORITY
        );
    }

    #[test]
    fn opinion_urls_are_deferred() {
        let policy = ArticlePriorityPolicy::default();
        assert_eq!(
            policy.get_priority("https://example.com/opinion/on-rate-cuts"),
            LOW_PRIORITY
        );
    }

    #[test]
    fn unclassified_urls_are_neutral() {
        let policy = ArticlePriorityPolicy::default();
        assert_eq!(policy.get_priority("https://example.com/india/some-story-99"), 0);
    }

    #[test]
    fn sports_and_entertainment_are_excluded() {
        let policy = ArticlePriorityPolicy::default();
        assert!(policy.should_exclude_url("https://example.com/sports/ipl-final-live"));
        assert!(policy.should_exclude_url("https://example.com/Entertainment/new-release"));
        assert!(!policy.should_exclude_url("https://example.com/business/deal-news"));
    }

    #[test]
    fn high_beats_low_when_both_match() {
        let policy = ArticlePriorityPolicy::default();
        assert_eq!(
            policy.get_priority("https://example.com/business/analysis/outlook"),
            HIGH_PRIORITY
        );
    }
}
