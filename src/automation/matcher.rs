//! Trigger matching for automation rules
//!
//! The matcher is scope-agnostic: callers check the rule's scope and
//! cooldown after a match.

use regex::RegexBuilder;

use crate::db::{AutomationRule, MatchType};

/// Lowercase, trim and drop a trailing `@botname` mention
///
/// `/help@mybot` becomes `/help`. Only a bare handle glued to the previous
/// word is removed, so e-mail addresses survive.
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut text = input.trim().to_lowercase();

    if let Some(at) = text.rfind('@') {
        let handle = &text[at + 1..];
        let glued = text[..at]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace());
        if glued
            && !handle.is_empty()
            && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            text.truncate(at);
        }
    }

    text
}

/// First active rule matching `input`, in rule order
#[must_use]
pub fn match_rule<'a>(input: &str, rules: &'a [AutomationRule]) -> Option<&'a AutomationRule> {
    let text = normalize(input);
    if text.is_empty() {
        return None;
    }

    rules
        .iter()
        .filter(|rule| rule.active)
        .find(|rule| matches(&text, rule))
}

fn matches(text: &str, rule: &AutomationRule) -> bool {
    let trigger = rule.trigger.trim().to_lowercase();
    if trigger.is_empty() {
        return false;
    }

    match rule.match_type {
        MatchType::Exact if rule.strict_slash => text == trigger,
        MatchType::Exact => strip_slash(text) == strip_slash(&trigger),
        MatchType::Keyword => text.contains(&trigger),
        MatchType::Regex => match RegexBuilder::new(&rule.trigger)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re.is_match(text),
            Err(e) => {
                tracing::warn!(rule = %rule.id, error = %e, "invalid automation regex");
                false
            }
        },
    }
}

fn strip_slash(s: &str) -> &str {
    s.strip_prefix('/').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(trigger: &str, strict_slash: bool) -> AutomationRule {
        let mut rule = AutomationRule::new(trigger, trigger);
        rule.strict_slash = strict_slash;
        rule
    }

    #[test]
    fn slash_is_optional_by_default() {
        let rules = [exact("/help", false)];
        assert!(match_rule("help", &rules).is_some());
        assert!(match_rule("/help", &rules).is_some());
        assert!(match_rule("  /HELP ", &rules).is_some());
    }

    #[test]
    fn strict_slash_requires_verbatim_trigger() {
        let rules = [exact("/help", true)];
        assert!(match_rule("/help", &rules).is_some());
        assert!(match_rule("help", &rules).is_none());
    }

    #[test]
    fn bot_mention_is_stripped() {
        let rules = [exact("/help", false)];
        assert!(match_rule("/help@mybot", &rules).is_some());
        assert_eq!(normalize("/Help@My_Bot"), "/help");
        assert_eq!(normalize("mail me at a@b.com"), "mail me at a@b.com");
        assert_eq!(normalize("ping @admin"), "ping @admin");
    }

    #[test]
    fn keyword_is_substring() {
        let rules =
            [AutomationRule::new("Promo", "deal").with_match_type(MatchType::Keyword)];
        assert!(match_rule("check out our PROMO today", &rules).is_some());
        assert!(match_rule("nothing here", &rules).is_none());
    }

    #[test]
    fn regex_is_case_insensitive() {
        let rules = [AutomationRule::new(r"^(price|cost)s?$", "10 USD")
            .with_match_type(MatchType::Regex)];
        assert!(match_rule("Prices", &rules).is_some());
        assert!(match_rule("the price", &rules).is_none());
    }

    #[test]
    fn invalid_regex_never_matches() {
        let rules = [AutomationRule::new("(unclosed", "x").with_match_type(MatchType::Regex)];
        assert!(match_rule("(unclosed", &rules).is_none());
    }

    #[test]
    fn first_match_wins_and_inactive_skipped() {
        let mut disabled = AutomationRule::new("sale", "disabled").with_match_type(MatchType::Keyword);
        disabled.active = false;
        let first = AutomationRule::new("sale", "first").with_match_type(MatchType::Keyword);
        let second = AutomationRule::new("big sale", "second").with_match_type(MatchType::Keyword);
        let rules = [disabled, first, second];

        let hit = match_rule("big sale now", &rules).unwrap();
        assert_eq!(hit.response, "first");
    }

    #[test]
    fn empty_input_matches_nothing() {
        let rules = [AutomationRule::new("", "x").with_match_type(MatchType::Keyword)];
        assert!(match_rule("   ", &rules).is_none());
        assert!(match_rule("anything", &rules).is_none());
    }
}
