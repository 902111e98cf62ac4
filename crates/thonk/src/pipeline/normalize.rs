//! Response normalization.
//!
//! Reasoning models wrap their chain of thought in `<think>`/`</think>` and
//! usually lead the final answer with `Answer:`. Before delivery those markers
//! are rewritten into chat markdown. Rules are plain data: an ordered list of
//! rule sets, the first whose guard matches is applied, and every rule inside
//! it replaces at most one occurrence.

/// A single bounded substitution: the first `from` becomes `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub from: &'static str,
    pub to: &'static str,
}

impl Rule {
    pub const fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }

    fn apply(&self, text: &str) -> String {
        text.replacen(self.from, self.to, 1)
    }
}

/// When a [`RuleSet`] applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The text starts with this literal.
    StartsWith(&'static str),
    /// Always.
    Always,
}

impl Guard {
    fn matches(&self, text: &str) -> bool {
        match self {
            Guard::StartsWith(prefix) => text.starts_with(prefix),
            Guard::Always => true,
        }
    }
}

/// Rules applied in order when `guard` matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub guard: Guard,
    pub rules: Vec<Rule>,
}

/// Ordered rule sets; the first matching one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    sets: Vec<RuleSet>,
}

/// The marker pair a model emits when it skipped reasoning.
pub const EMPTY_THINK: &str = "<think>\n\n</think>";

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(vec![
            RuleSet {
                guard: Guard::StartsWith(EMPTY_THINK),
                rules: vec![Rule::new(EMPTY_THINK, ""), Rule::new("Answer:", "# [Answer]")],
            },
            RuleSet {
                guard: Guard::Always,
                rules: vec![
                    Rule::new("<think>", "**[Megathonk mode]**"),
                    Rule::new("</think>", "**[Megathonk stop]**"),
                    Rule::new("Answer:", "**[Answer]**"),
                ],
            },
        ])
    }
}

impl Normalizer {
    pub fn new(sets: Vec<RuleSet>) -> Self {
        Self { sets }
    }

    /// Rewrite `text` with the first matching rule set. Text that matches no
    /// set is returned unchanged.
    pub fn apply(&self, text: &str) -> String {
        let Some(set) = self.sets.iter().find(|s| s.guard.matches(text)) else {
            return text.to_string();
        };
        set.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_think_pair_is_stripped_once() {
        let n = Normalizer::default();
        assert_eq!(n.apply("<think>\n\n</think>Answer: hi"), "# [Answer] hi");
        assert_eq!(
            n.apply("<think>\n\n</think>Answer: a <think>\n\n</think> Answer: b"),
            "# [Answer] a <think>\n\n</think> Answer: b"
        );
    }

    #[test]
    fn reasoning_markers_become_headings() {
        let n = Normalizer::default();
        assert_eq!(
            n.apply("<think>\nhmm\n</think>\nAnswer: 42"),
            "**[Megathonk mode]**\nhmm\n**[Megathonk stop]**\n**[Answer]** 42"
        );
    }

    #[test]
    fn only_first_occurrence_of_each_marker_changes() {
        let n = Normalizer::default();
        assert_eq!(
            n.apply("<think>a</think><think>b</think>Answer: x Answer: y"),
            "**[Megathonk mode]**a**[Megathonk stop]**<think>b</think>**[Answer]** x Answer: y"
        );
    }

    #[test]
    fn plain_text_passes_through() {
        let n = Normalizer::default();
        assert_eq!(n.apply("just words"), "just words");
        assert_eq!(n.apply(""), "");
    }

    #[test]
    fn unmatched_rule_sets_leave_text_alone() {
        let n = Normalizer::new(vec![RuleSet {
            guard: Guard::StartsWith("!"),
            rules: vec![Rule::new("a", "b")],
        }]);
        assert_eq!(n.apply("aaa"), "aaa");
        assert_eq!(n.apply("!aaa"), "!baa");
    }
}
