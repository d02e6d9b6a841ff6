//! Cache key templates.
//!
//! A [`KeyPattern`] is parsed once from a template such as
//! `"user:email:{email}"` and rendered many times from a [`KeyValues`] map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Placeholder every list pattern must carry for the page size.
pub const LIMIT_PLACEHOLDER: &str = "limit";

/// Placeholder every list pattern must carry for the 1-indexed page number.
pub const PAGE_PLACEHOLDER: &str = "page";

/// Errors produced while parsing, validating or rendering key patterns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyPatternError {
    #[error("Unclosed placeholder in key pattern '{pattern}' at byte {position}")]
    Unclosed { pattern: String, position: usize },
    #[error("Unexpected '}}' in key pattern '{pattern}' at byte {position}")]
    UnexpectedClose { pattern: String, position: usize },
    #[error("Invalid placeholder name '{name}' in key pattern '{pattern}'")]
    InvalidPlaceholder { pattern: String, name: String },
    #[error("Unresolved placeholder '{placeholder}' in key pattern '{pattern}'")]
    Unresolved {
        pattern: String,
        placeholder: String,
    },
    #[error("Key pattern '{pattern}' must contain a '{{{placeholder}}}' placeholder")]
    MissingPlaceholder {
        pattern: String,
        placeholder: &'static str,
    },
    #[error("Entity key pattern '{pattern}' has no placeholders")]
    NoPlaceholders { pattern: String },
    #[error("Entity key pattern '{pattern}' cannot use reserved placeholder '{placeholder}'")]
    ReservedPlaceholder {
        pattern: String,
        placeholder: String,
    },
    #[error(
        "Placeholder '{placeholder}' in key pattern '{pattern}' is not a key field of {entity_type}"
    )]
    UnknownField {
        pattern: String,
        placeholder: String,
        entity_type: &'static str,
    },
}

/// Named values used to render keys and to look up rows in the store.
///
/// Backed by a `BTreeMap`, so iteration order (and therefore `Display`)
/// is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues(BTreeMap<String, String>);

impl KeyValues {
    /// Creates an empty set of values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value under the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a value, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for KeyValues
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed cache key template with `{name}` placeholders.
///
/// # Examples
///
/// ```
/// use cachedrepo_core::cache::{KeyPattern, KeyValues};
///
/// let pattern = KeyPattern::parse("user:email:{email}").unwrap();
/// let key = pattern
///     .render(&KeyValues::new().with("email", "ada@example.com"))
///     .unwrap();
/// assert_eq!(key, "user:email:ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    template: String,
    segments: Vec<Segment>,
}

impl KeyPattern {
    /// Parses a template. Placeholder names are non-empty runs of ASCII
    /// alphanumerics and underscores.
    pub fn parse(template: &str) -> Result<Self, KeyPatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(KeyPatternError::Unclosed {
                            pattern: template.to_string(),
                            position,
                        });
                    }
                    if !is_valid_placeholder_name(&name) {
                        return Err(KeyPatternError::InvalidPlaceholder {
                            pattern: template.to_string(),
                            name,
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(KeyPatternError::UnexpectedClose {
                        pattern: template.to_string(),
                        position,
                    });
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// Returns the original template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns placeholder names in template order (duplicates included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Returns `true` if some rendering of this pattern could start with
    /// `prefix`, judged from the literal text before the first placeholder.
    pub fn may_start_with(&self, prefix: &str) -> bool {
        let leading = match self.segments.first() {
            Some(Segment::Literal(text)) => text.as_str(),
            _ => "",
        };
        if self.segments.len() == 1 && !leading.is_empty() {
            return leading.starts_with(prefix);
        }
        leading.starts_with(prefix) || prefix.starts_with(leading)
    }

    /// Renders the key. Every placeholder must be present in `values`;
    /// values not named by the template are ignored.
    pub fn render(&self, values: &KeyValues) -> Result<String, KeyPatternError> {
        let mut key = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.get(name).ok_or_else(|| KeyPatternError::Unresolved {
                        pattern: self.template.clone(),
                        placeholder: name.clone(),
                    })?;
                    key.push_str(value);
                }
            }
        }
        Ok(key)
    }
}

impl FromStr for KeyPattern {
    type Err = KeyPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn is_valid_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The entity and list patterns of one repository, validated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPatterns {
    entity: KeyPattern,
    list: KeyPattern,
}

impl KeyPatterns {
    /// Parses and validates both patterns.
    ///
    /// - the entity pattern needs at least one placeholder, each naming one
    ///   of `key_fields`, and may not use `limit` or `page`;
    /// - the list pattern must contain both `limit` and `page`.
    pub fn new(
        entity_pattern: &str,
        list_pattern: &str,
        entity_type: &'static str,
        key_fields: &[&str],
    ) -> Result<Self, KeyPatternError> {
        let entity = KeyPattern::parse(entity_pattern)?;
        let list = KeyPattern::parse(list_pattern)?;

        if entity.placeholders().next().is_none() {
            return Err(KeyPatternError::NoPlaceholders {
                pattern: entity_pattern.to_string(),
            });
        }
        for placeholder in entity.placeholders() {
            if placeholder == LIMIT_PLACEHOLDER || placeholder == PAGE_PLACEHOLDER {
                return Err(KeyPatternError::ReservedPlaceholder {
                    pattern: entity_pattern.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
            if !key_fields.contains(&placeholder) {
                return Err(KeyPatternError::UnknownField {
                    pattern: entity_pattern.to_string(),
                    placeholder: placeholder.to_string(),
                    entity_type,
                });
            }
        }

        for required in [LIMIT_PLACEHOLDER, PAGE_PLACEHOLDER] {
            if !list.has_placeholder(required) {
                return Err(KeyPatternError::MissingPlaceholder {
                    pattern: list_pattern.to_string(),
                    placeholder: required,
                });
            }
        }

        Ok(Self { entity, list })
    }

    pub fn entity(&self) -> &KeyPattern {
        &self.entity
    }

    pub fn list(&self) -> &KeyPattern {
        &self.list
    }

    /// Renders the key of a single entity.
    pub fn entity_key(&self, values: &KeyValues) -> Result<String, KeyPatternError> {
        self.entity.render(values)
    }

    /// Renders the key of one page of a collection.
    pub fn list_key(
        &self,
        filters: &KeyValues,
        limit: u32,
        page: u32,
    ) -> Result<String, KeyPatternError> {
        let values = filters
            .clone()
            .with(LIMIT_PLACEHOLDER, limit)
            .with(PAGE_PLACEHOLDER, page);
        self.list.render(&values)
    }
}
