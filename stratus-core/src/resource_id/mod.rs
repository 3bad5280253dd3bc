//! Resource identifiers - parsing and formatting ARM resource ID strings
//!
//! An identifier type declares its path as an ordered list of [`Segment`]s.
//! The shared [`Parser`] turns an input string into a [`ParseResult`] (segment
//! name -> value) which the identifier type then converts into itself.
//!
//! Literal segments are matched case-sensitively by [`ResourceIdentifier::parse`]
//! (used for user-supplied and stored IDs) and case-insensitively by
//! [`ResourceIdentifier::parse_insensitively`] (used for IDs echoed back by the
//! API). User-specified values always keep their casing.

pub mod commonids;

use std::collections::HashMap;

use crate::resource::Value;

pub use commonids::{ManagementGroupId, ResourceGroupId, ScopeId, ScopedResourceId, SubscriptionId};

/// A single component of a resource ID format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Fixed literal, e.g. `resourceGroups`
    Static {
        name: &'static str,
        value: &'static str,
    },
    /// Fixed provider namespace, e.g. `Microsoft.Consumption`
    ResourceProvider {
        name: &'static str,
        value: &'static str,
    },
    SubscriptionId { name: &'static str },
    ResourceGroup { name: &'static str },
    UserSpecified { name: &'static str },
    /// A nested scope spanning one or more path components; only valid as the
    /// first segment of a format
    Scope { name: &'static str },
}

impl Segment {
    pub const fn literal(name: &'static str, value: &'static str) -> Self {
        Segment::Static { name, value }
    }

    pub const fn provider(name: &'static str, value: &'static str) -> Self {
        Segment::ResourceProvider { name, value }
    }

    pub const fn subscription(name: &'static str) -> Self {
        Segment::SubscriptionId { name }
    }

    pub const fn resource_group(name: &'static str) -> Self {
        Segment::ResourceGroup { name }
    }

    pub const fn user(name: &'static str) -> Self {
        Segment::UserSpecified { name }
    }

    pub const fn scope(name: &'static str) -> Self {
        Segment::Scope { name }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Segment::Static { name, .. }
            | Segment::ResourceProvider { name, .. }
            | Segment::SubscriptionId { name }
            | Segment::ResourceGroup { name }
            | Segment::UserSpecified { name }
            | Segment::Scope { name } => name,
        }
    }

    fn literal_value(&self) -> Option<&'static str> {
        match self {
            Segment::Static { value, .. } | Segment::ResourceProvider { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }

    fn is_scope(&self) -> bool {
        matches!(self, Segment::Scope { .. })
    }
}

/// Render the expected format of an ID, e.g.
/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
pub fn expected_format(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Scope { name } => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            other => {
                out.push('/');
                match other.literal_value() {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(other.name());
                        out.push('}');
                    }
                }
            }
        }
    }
    out
}

/// Errors produced while parsing a resource ID
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("parsing {id_type} ID: the input was empty, expected the format `{expected}`")]
    Empty { id_type: String, expected: String },

    #[error("parsing {id_type} ID {input:?}: the ID must begin with \"/\", expected the format `{expected}`")]
    MissingLeadingSlash {
        id_type: String,
        input: String,
        expected: String,
    },

    #[error("parsing {id_type} ID {input:?}: expected {expected_segments} segments but got {actual}, expected the format `{expected}`")]
    SegmentCount {
        id_type: String,
        input: String,
        expected_segments: String,
        actual: usize,
        expected: String,
    },

    #[error("parsing {id_type} ID {input:?}: the segment `{segment}` should be {literal:?} but got {actual:?}, expected the format `{expected}`")]
    LiteralMismatch {
        id_type: String,
        input: String,
        segment: String,
        literal: String,
        actual: String,
        expected: String,
    },

    #[error("parsing {id_type} ID {input:?}: the segment `{segment}` was empty, expected the format `{expected}`")]
    EmptySegment {
        id_type: String,
        input: String,
        segment: String,
        expected: String,
    },

    #[error("parsing {id_type} ID: the parse result did not contain the segment `{segment}`")]
    MissingSegment { id_type: String, segment: String },

    #[error("parsing {id_type} ID {input:?}: {message}")]
    Invalid {
        id_type: String,
        input: String,
        message: String,
    },

    #[error("expected {key:?} to be a string")]
    NotAString { key: String },
}

/// Segment values extracted from an ID string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub id_type: &'static str,
    pub input: String,
    /// Whether literals were matched case-insensitively
    pub insensitively: bool,
    values: HashMap<&'static str, String>,
}

impl ParseResult {
    /// Get the value of a user-specified segment
    pub fn get(&self, name: &str) -> Result<&str, IdParseError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| IdParseError::MissingSegment {
                id_type: self.id_type.to_string(),
                segment: name.to_string(),
            })
    }

    pub fn invalid(&self, message: impl Into<String>) -> IdParseError {
        IdParseError::Invalid {
            id_type: self.id_type.to_string(),
            input: self.input.clone(),
            message: message.into(),
        }
    }
}

/// Segment-driven parser shared by every identifier type
#[derive(Debug, Clone)]
pub struct Parser {
    id_type: &'static str,
    segments: Vec<Segment>,
}

impl Parser {
    pub fn new(id_type: &'static str, segments: Vec<Segment>) -> Self {
        debug_assert!(
            segments.iter().skip(1).all(|s| !s.is_scope()),
            "a scope segment is only valid as the first segment"
        );
        Self { id_type, segments }
    }

    pub fn parse(&self, input: &str, insensitively: bool) -> Result<ParseResult, IdParseError> {
        let expected = expected_format(&self.segments);
        let id_type = self.id_type.to_string();

        if input.is_empty() {
            return Err(IdParseError::Empty { id_type, expected });
        }
        let Some(path) = input.strip_prefix('/') else {
            return Err(IdParseError::MissingLeadingSlash {
                id_type,
                input: input.to_string(),
                expected,
            });
        };

        let components: Vec<&str> = path.split('/').collect();
        let mut values = HashMap::new();

        let (fixed, rest): (&[Segment], &[&str]) = match self.segments.first() {
            Some(Segment::Scope { name }) => {
                let fixed = &self.segments[1..];
                if components.len() <= fixed.len() {
                    return Err(IdParseError::SegmentCount {
                        id_type,
                        input: input.to_string(),
                        expected_segments: format!("at least {}", fixed.len() + 1),
                        actual: components.len(),
                        expected,
                    });
                }
                let scope_len = components.len() - fixed.len();
                let scope = &components[..scope_len];
                if scope.iter().any(|c| c.is_empty()) {
                    return Err(IdParseError::EmptySegment {
                        id_type,
                        input: input.to_string(),
                        segment: name.to_string(),
                        expected,
                    });
                }
                values.insert(*name, format!("/{}", scope.join("/")));
                (fixed, &components[scope_len..])
            }
            _ => {
                if components.len() != self.segments.len() {
                    return Err(IdParseError::SegmentCount {
                        id_type,
                        input: input.to_string(),
                        expected_segments: self.segments.len().to_string(),
                        actual: components.len(),
                        expected,
                    });
                }
                (&self.segments[..], &components[..])
            }
        };

        for (segment, component) in fixed.iter().zip(rest) {
            match segment.literal_value() {
                Some(literal) => {
                    let matches = if insensitively {
                        literal.eq_ignore_ascii_case(component)
                    } else {
                        literal == *component
                    };
                    if !matches {
                        return Err(IdParseError::LiteralMismatch {
                            id_type,
                            input: input.to_string(),
                            segment: segment.name().to_string(),
                            literal: literal.to_string(),
                            actual: component.to_string(),
                            expected,
                        });
                    }
                }
                None => {
                    if component.is_empty() {
                        return Err(IdParseError::EmptySegment {
                            id_type,
                            input: input.to_string(),
                            segment: segment.name().to_string(),
                            expected,
                        });
                    }
                    values.insert(segment.name(), component.to_string());
                }
            }
        }

        Ok(ParseResult {
            id_type: self.id_type,
            input: input.to_string(),
            insensitively,
            values,
        })
    }
}

/// Shared parse/format capability of every identifier type
pub trait ResourceIdentifier: Sized {
    /// Human-readable type name used in errors (e.g. "Budget")
    const TYPE_NAME: &'static str;

    /// Ordered segments describing the ID's path
    fn segments() -> Vec<Segment>;

    /// Build the identifier from parsed segment values
    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError>;

    /// Canonical ID string
    fn id(&self) -> String;

    /// Parse a user-supplied or stored ID; literal segments are case-sensitive
    fn parse(input: &str) -> Result<Self, IdParseError> {
        let parsed = Parser::new(Self::TYPE_NAME, Self::segments()).parse(input, false)?;
        Self::from_parse_result(&parsed)
    }

    /// Parse an ID returned by the API; literal segments are case-insensitive
    fn parse_insensitively(input: &str) -> Result<Self, IdParseError> {
        let parsed = Parser::new(Self::TYPE_NAME, Self::segments()).parse(input, true)?;
        Self::from_parse_result(&parsed)
    }

    /// Schema adapter: returns `(warnings, errors)` for a configuration value
    fn validate(input: &Value, key: &str) -> (Vec<String>, Vec<IdParseError>) {
        let Value::String(v) = input else {
            return (
                Vec::new(),
                vec![IdParseError::NotAString {
                    key: key.to_string(),
                }],
            );
        };
        match Self::parse(v) {
            Ok(_) => (Vec::new(), Vec::new()),
            Err(e) => (Vec::new(), vec![e]),
        }
    }

    /// The expected format, e.g. for help output
    fn expected_format() -> String {
        expected_format(&Self::segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Parser {
        Parser::new(
            "Example",
            vec![
                Segment::literal("staticSubscriptions", "subscriptions"),
                Segment::subscription("subscriptionId"),
                Segment::literal("staticProviders", "providers"),
                Segment::provider("staticMicrosoftExample", "Microsoft.Example"),
                Segment::literal("staticWidgets", "widgets"),
                Segment::user("widgetName"),
            ],
        )
    }

    fn scoped_parser() -> Parser {
        Parser::new(
            "Scoped Example",
            vec![
                Segment::scope("scope"),
                Segment::literal("staticProviders", "providers"),
                Segment::provider("staticMicrosoftExample", "Microsoft.Example"),
                Segment::literal("staticWidgets", "widgets"),
                Segment::user("widgetName"),
            ],
        )
    }

    #[test]
    fn expected_format_renders_placeholders() {
        assert_eq!(
            expected_format(&parser().segments),
            "/subscriptions/{subscriptionId}/providers/Microsoft.Example/widgets/{widgetName}"
        );
        assert_eq!(
            expected_format(&scoped_parser().segments),
            "{scope}/providers/Microsoft.Example/widgets/{widgetName}"
        );
    }

    #[test]
    fn parses_values() {
        let result = parser()
            .parse("/subscriptions/abc/providers/Microsoft.Example/widgets/w1", false)
            .unwrap();
        assert_eq!(result.get("subscriptionId").unwrap(), "abc");
        assert_eq!(result.get("widgetName").unwrap(), "w1");
        assert!(result.get("nope").is_err());
    }

    #[test]
    fn rejects_empty_and_relative_input() {
        assert!(matches!(
            parser().parse("", false),
            Err(IdParseError::Empty { .. })
        ));
        assert!(matches!(
            parser().parse("subscriptions/abc/providers/Microsoft.Example/widgets/w1", false),
            Err(IdParseError::MissingLeadingSlash { .. })
        ));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = parser()
            .parse("/subscriptions/abc/providers/Microsoft.Example", false)
            .unwrap_err();
        assert!(matches!(err, IdParseError::SegmentCount { actual: 4, .. }));
        assert!(err.to_string().contains("{widgetName}"));
    }

    #[test]
    fn rejects_trailing_separator() {
        let err = parser()
            .parse("/subscriptions/abc/providers/Microsoft.Example/widgets/", false)
            .unwrap_err();
        match err {
            IdParseError::EmptySegment { segment, .. } => assert_eq!(segment, "widgetName"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn literal_case_sensitivity() {
        let upper = "/SUBSCRIPTIONS/abc/PROVIDERS/MICROSOFT.EXAMPLE/WIDGETS/w1";
        assert!(matches!(
            parser().parse(upper, false),
            Err(IdParseError::LiteralMismatch { .. })
        ));
        let result = parser().parse(upper, true).unwrap();
        assert_eq!(result.get("widgetName").unwrap(), "w1");
    }

    #[test]
    fn scope_spans_multiple_components() {
        let result = scoped_parser()
            .parse(
                "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Example/widgets/w1",
                false,
            )
            .unwrap();
        assert_eq!(
            result.get("scope").unwrap(),
            "/subscriptions/abc/resourceGroups/rg"
        );
        assert_eq!(result.get("widgetName").unwrap(), "w1");
    }

    #[test]
    fn scope_must_not_be_empty() {
        assert!(matches!(
            scoped_parser().parse("/providers/Microsoft.Example/widgets/w1", false),
            Err(IdParseError::SegmentCount { .. })
        ));
        assert!(matches!(
            scoped_parser().parse("//x/providers/Microsoft.Example/widgets/w1", false),
            Err(IdParseError::EmptySegment { .. })
        ));
    }
}
