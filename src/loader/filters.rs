// Member name filters
//
// Rules are regular expressions; a leading `!` makes a rule exclude. The last
// matching rule decides, and names no rule matches are kept.

use crate::error::Result;
use regex::Regex;

/// One include or exclude rule
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub pattern: Regex,
    pub exclude: bool,
}

impl FilterRule {
    pub fn parse(rule: &str) -> Result<Self> {
        let (exclude, pattern) = match rule.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, rule),
        };
        Ok(Self {
            pattern: Regex::new(pattern)?,
            exclude,
        })
    }

    pub fn include(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            exclude: false,
        })
    }

    pub fn exclude(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            exclude: true,
        })
    }
}

/// Ordered filter rules
#[derive(Debug, Clone, Default)]
pub struct Filters {
    rules: Vec<FilterRule>,
}

impl Filters {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Compile `!`-prefixed rule strings
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| FilterRule::parse(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether a member name survives the rules
    pub fn allows(&self, name: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.pattern.is_match(name))
            .map_or(true, |rule| !rule.exclude)
    }
}
