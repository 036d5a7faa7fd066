//! Shapes the extracted data can take.

use serde_json::Value;

/// Describes what to extract from each result element.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorSpec {
    /// A selector whose matches contribute their text content.
    Text(String),
    /// A selector paired with an attribute name to read.
    Attr(String, String),
    /// A keyed group of sub-specifications building an object.
    Group(Vec<GroupEntry>),
}

/// One key of a [`SelectorSpec::Group`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    /// Property name with any `[]` suffix removed.
    pub name: String,
    /// Whether the key collects every match instead of the first.
    pub is_array: bool,
    pub spec: SelectorSpec,
}

impl SelectorSpec {
    /// Build a specification from its JSON rendition: a string, a
    /// two-element `[selector, attribute]` array, or an object whose
    /// keys may end in `[]`. Anything else is rejected.
    pub fn from_json(value: &Value) -> Option<SelectorSpec> {
        match value {
            Value::String(selector) => Some(SelectorSpec::Text(selector.clone())),
            Value::Array(items) => {
                if items.len() != 2 {
                    return None;
                }
                let selector = items[0].as_str()?;
                let attribute = items[1].as_str()?;
                Some(SelectorSpec::Attr(
                    selector.to_string(),
                    attribute.to_string(),
                ))
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (name, sub) in map {
                    entries.push(GroupEntry::new(name, SelectorSpec::from_json(sub)?));
                }
                Some(SelectorSpec::Group(entries))
            }
            _ => None,
        }
    }
}

impl GroupEntry {
    /// Split the `[]` array marker off a property name.
    pub fn new(name: &str, spec: SelectorSpec) -> GroupEntry {
        match name.strip_suffix("[]") {
            Some(stripped) if !stripped.is_empty() => GroupEntry {
                name: stripped.to_string(),
                is_array: true,
                spec,
            },
            _ => GroupEntry {
                name: name.to_string(),
                is_array: false,
                spec,
            },
        }
    }
}

impl From<&str> for SelectorSpec {
    fn from(selector: &str) -> SelectorSpec {
        SelectorSpec::Text(selector.to_string())
    }
}

impl From<String> for SelectorSpec {
    fn from(selector: String) -> SelectorSpec {
        SelectorSpec::Text(selector)
    }
}

impl From<(&str, &str)> for SelectorSpec {
    fn from((selector, attribute): (&str, &str)) -> SelectorSpec {
        SelectorSpec::Attr(selector.to_string(), attribute.to_string())
    }
}
