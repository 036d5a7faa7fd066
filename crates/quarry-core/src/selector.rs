//! Micro-parser for the scraper's selector dialect.
//!
//! A selector is a plain CSS descendant selector carrying at most one
//! attribute clause (`[name]`, `[name=value]`, `[name^=value]`) and at
//! most one pseudo clause (only `:nth-child(expr)` is meaningful). Both
//! clauses are stripped out of the base selector here so the DOM engine
//! only ever sees tag/class/id syntax.

use crate::nth::NthExpr;

/// Qualifier characters CSS allows before `=`. Only `^` is supported.
const QUALIFIERS: [char; 5] = ['~', '|', '^', '$', '*'];

/// How an attribute filter turns an element into a value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrMode {
    /// `[name]`: the raw attribute value, nothing when absent.
    Value,
    /// `[name=value]`: the element text, only when the attribute matches
    /// the value exactly.
    TextIfEquals(String),
    /// `[name^=value]`: the raw attribute value, only when it starts
    /// with the given prefix.
    ValueIfPrefix(String),
}

/// An attribute clause lifted out of a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrFilter {
    /// Attribute name, lowercased at parse time.
    pub name: String,
    pub mode: AttrMode,
}

/// A selector with its clauses separated out.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSelector {
    /// The selector with all clause syntax removed.
    pub base: String,
    pub attr: Option<AttrFilter>,
    pub nth: Option<NthExpr>,
}

/// Split a selector into its base, attribute filter, and positional
/// filter. Never fails; anything unrecognized simply yields no filter.
pub fn parse(selector: &str) -> ParsedSelector {
    let (rest, attr_clause) = split_attr_clause(selector);
    let (base, pseudo_clause) = split_pseudo_clause(&rest);
    ParsedSelector {
        base: base.trim().to_string(),
        attr: attr_clause.as_deref().and_then(parse_attr_clause),
        nth: pseudo_clause.as_deref().and_then(parse_pseudo_clause),
    }
}

/// Remove the first `[...]` pair, rejoining prefix and suffix.
fn split_attr_clause(selector: &str) -> (String, Option<String>) {
    match (selector.find('['), selector.find(']')) {
        (Some(open), Some(close)) if open < close => {
            let clause = selector[open + 1..close].to_string();
            let rest = format!("{}{}", &selector[..open], &selector[close + 1..]);
            (rest, Some(clause))
        }
        _ => (selector.to_string(), None),
    }
}

/// Remove the first pseudo clause: from `:` through the closing paren,
/// or to the end of the word when no arguments are present.
fn split_pseudo_clause(selector: &str) -> (String, Option<String>) {
    let Some(colon) = selector.find(':') else {
        return (selector.to_string(), None);
    };
    let after = &selector[colon + 1..];
    let word_end = after
        .find(char::is_whitespace)
        .unwrap_or(after.len());
    let clause_end = if after[..word_end].contains('(') {
        match after.find(')') {
            Some(close) => close + 1,
            None => after.len(),
        }
    } else {
        word_end
    };
    let clause = after[..clause_end].to_string();
    let rest = format!("{}{}", &selector[..colon], &after[clause_end..]);
    (rest, Some(clause))
}

fn parse_attr_clause(clause: &str) -> Option<AttrFilter> {
    let clause = clause.trim();
    let Some(eq) = clause.find('=') else {
        if clause.is_empty() {
            return None;
        }
        return Some(AttrFilter {
            name: clause.to_lowercase(),
            mode: AttrMode::Value,
        });
    };

    let mut name = clause[..eq].trim();
    let value = clause[eq + 1..].trim().replace(['"', '\''], "");

    let qualifier = name.chars().last().filter(|c| QUALIFIERS.contains(c));
    let mode = match qualifier {
        Some('^') => {
            name = name[..name.len() - 1].trim_end();
            AttrMode::ValueIfPrefix(value)
        }
        Some(_) => return None,
        None => AttrMode::TextIfEquals(value),
    };

    if name.is_empty() {
        return None;
    }
    Some(AttrFilter {
        name: name.to_lowercase(),
        mode,
    })
}

fn parse_pseudo_clause(clause: &str) -> Option<NthExpr> {
    let expr = clause
        .trim()
        .strip_prefix("nth-child(")?
        .strip_suffix(')')?;
    NthExpr::parse(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_selector_passes_through() {
        let parsed = parse("dd span.title");
        assert_eq!(parsed.base, "dd span.title");
        assert!(parsed.attr.is_none());
        assert!(parsed.nth.is_none());
    }

    #[test]
    fn attribute_presence() {
        let parsed = parse("a[href]");
        assert_eq!(parsed.base, "a");
        assert_eq!(
            parsed.attr,
            Some(AttrFilter {
                name: "href".to_string(),
                mode: AttrMode::Value,
            })
        );
    }

    #[test]
    fn attribute_equality_lowercases_the_name() {
        let parsed = parse("dd span[testAttr=attr3]");
        assert_eq!(parsed.base, "dd span");
        assert_eq!(
            parsed.attr,
            Some(AttrFilter {
                name: "testattr".to_string(),
                mode: AttrMode::TextIfEquals("attr3".to_string()),
            })
        );
    }

    #[test]
    fn prefix_qualifier_strips_quotes() {
        let parsed = parse("span[data-id^=\"item-\"]");
        assert_eq!(parsed.base, "span");
        assert_eq!(
            parsed.attr,
            Some(AttrFilter {
                name: "data-id".to_string(),
                mode: AttrMode::ValueIfPrefix("item-".to_string()),
            })
        );
    }

    #[test]
    fn unsupported_qualifier_yields_no_filter() {
        assert!(parse("a[href$=.pdf]").attr.is_none());
        assert!(parse("a[href*=example]").attr.is_none());
    }

    #[test]
    fn whitespace_inside_the_clause_is_trimmed() {
        let parsed = parse("span[ title = 'A Title' ]");
        assert_eq!(
            parsed.attr,
            Some(AttrFilter {
                name: "title".to_string(),
                mode: AttrMode::TextIfEquals("A Title".to_string()),
            })
        );
    }

    #[test]
    fn nth_child_in_the_middle_of_the_selector() {
        let parsed = parse(".results dl:nth-child(2) dt");
        assert_eq!(parsed.base, ".results dl dt");
        assert_eq!(parsed.nth.unwrap().keep_indices(3), vec![1]);
    }

    #[test]
    fn other_pseudo_classes_are_dropped() {
        let parsed = parse("a:hover b");
        assert_eq!(parsed.base, "a b");
        assert!(parsed.nth.is_none());
    }

    #[test]
    fn malformed_nth_expression_yields_no_filter() {
        let parsed = parse("dl:nth-child(odd) dt");
        assert_eq!(parsed.base, "dl dt");
        assert!(parsed.nth.is_none());
    }

    #[test]
    fn attribute_and_nth_together() {
        let parsed = parse(".results a[href]:nth-child(1)");
        assert_eq!(parsed.base, ".results a");
        assert!(parsed.attr.is_some());
        assert!(parsed.nth.is_some());
    }
}
