//! Rules applied to a client when it is first managed
//!
//! A rule names up to three substrings (class, instance, title). It matches a
//! client when every substring it names is contained in the corresponding
//! property. Each consequence is taken from the first matching rule that sets
//! it

use crate::core::{action::parse_mask, TagMask};
use serde::{de, Deserialize, Serialize};

// =============================== Rule =============================== [[[

/// A rule for a new client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Rule {
    /// Substring of the class part of `WM_CLASS`
    pub(crate) class:    Option<String>,
    /// Substring of the instance part of `WM_CLASS`
    pub(crate) instance: Option<String>,
    /// Substring of the title
    pub(crate) title:    Option<String>,
    /// Tags to put the client on; zero keeps the monitor's tags
    #[serde(deserialize_with = "deserialize_mask")]
    pub(crate) tags:     TagMask,
    /// Whether the client floats
    pub(crate) floating: Option<bool>,
    /// Number of the monitor the client goes to
    pub(crate) monitor:  Option<usize>,
}

impl Rule {
    /// Whether every property the rule names is contained in the client's
    pub(crate) fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        let contains =
            |pat: &Option<String>, s: &str| pat.as_ref().map_or(true, |p| s.contains(p.as_str()));

        contains(&self.class, class)
            && contains(&self.instance, instance)
            && contains(&self.title, title)
    }
} // ]]] === Rule ===

/// What the rules decided for a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    /// Tags; zero when no rule set any
    pub(crate) tags:     TagMask,
    /// Whether the client floats
    pub(crate) floating: bool,
    /// Monitor number the client goes to
    pub(crate) monitor:  Option<usize>,
}

/// Run every rule against a client's properties
pub(crate) fn apply(rules: &[Rule], class: &str, instance: &str, title: &str) -> Outcome {
    let mut tags = None;
    let mut floating = None;
    let mut monitor = None;

    for rule in rules.iter().filter(|r| r.matches(class, instance, title)) {
        log::trace!("rule {:?} matches '{}' ({}, {})", rule, title, instance, class);
        if tags.is_none() && rule.tags != 0 {
            tags = Some(rule.tags);
        }
        floating = floating.or(rule.floating);
        monitor = monitor.or(rule.monitor);
    }

    Outcome {
        tags: tags.unwrap_or(0),
        floating: floating.unwrap_or(false),
        monitor,
    }
}

/// A tag mask written either as a number or as a mask expression
#[derive(Deserialize)]
#[serde(untagged)]
enum MaskRepr {
    Number(TagMask),
    Expr(String),
}

/// [`Deserialize`] a tag mask accepting `256`, `"0x100"` or `"1<<8"`
#[allow(single_use_lifetimes)]
fn deserialize_mask<'de, D>(d: D) -> Result<TagMask, D::Error>
where
    D: de::Deserializer<'de>,
{
    match MaskRepr::deserialize(d)? {
        MaskRepr::Number(n) => Ok(n),
        MaskRepr::Expr(s) => parse_mask(&s).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        vec![
            Rule {
                class: Some(String::from("Gimp")),
                floating: Some(true),
                ..Rule::default()
            },
            Rule {
                class: Some(String::from("Firefox")),
                tags: 1 << 8,
                ..Rule::default()
            },
            Rule {
                instance: Some(String::from("Navigator")),
                title: Some(String::from("Private")),
                tags: 1 << 2,
                floating: Some(true),
                monitor: Some(1),
                ..Rule::default()
            },
        ]
    }

    #[test]
    fn substring_matching() {
        let rule = &rules()[2];
        assert!(rule.matches("Firefox", "Navigator", "Private Browsing"));
        assert!(!rule.matches("Firefox", "Navigator", "Mozilla Firefox"));
        assert!(Rule::default().matches("", "", ""));
    }

    #[test]
    fn first_matching_rule_sets_each_field() {
        let outcome = apply(&rules(), "Firefox", "Navigator", "Private Browsing");
        assert_eq!(outcome, Outcome {
            tags:     1 << 8,
            floating: true,
            monitor:  Some(1),
        });

        let outcome = apply(&rules(), "Gimp-2.10", "gimp", "GNU Image Manipulation Program");
        assert_eq!(outcome, Outcome {
            tags:     0,
            floating: true,
            monitor:  None,
        });

        assert_eq!(apply(&rules(), "st", "st", "zsh"), Outcome::default());
    }

    #[test]
    fn masks_in_yaml() {
        let rules: Vec<Rule> = serde_yaml::from_str(
            "- class: Firefox\n  tags: 1<<8\n- class: mpv\n  tags: 4\n  floating: true\n",
        )
        .expect("rules parse");
        assert_eq!(rules[0].tags, 256);
        assert_eq!(rules[1].tags, 4);
        assert_eq!(rules[1].floating, Some(true));
    }
}
