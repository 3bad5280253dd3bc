//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling validation of a
//! configuration before any API call is made.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::resource::Value;

/// Validation closure attached to a custom type
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Attribute type
#[derive(Clone)]
pub enum AttributeType {
    String,
    Int,
    /// Floating point (integers are accepted)
    Float,
    Bool,
    /// Enum (list of allowed values, case-sensitive)
    Enum(Vec<String>),
    /// Custom type (base type plus validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: Validator,
    },
    List(Box<AttributeType>),
    /// Unordered collection; compared without regard to order
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    /// Nested object with its own attribute schemas
    Block(HashMap<String, AttributeSchema>),
}

impl AttributeType {
    /// Nested block built from a list of attribute schemas
    pub fn block(attributes: Vec<AttributeSchema>) -> Self {
        AttributeType::Block(
            attributes
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect(),
        )
    }

    pub fn list(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn set(inner: AttributeType) -> Self {
        AttributeType::Set(Box::new(inner))
    }

    pub fn map(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|message| TypeError::ValidationFailed { message })
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(attributes), Value::Map(map)) => {
                let errors = validate_attributes(attributes, map);
                match errors.into_iter().next() {
                    None => Ok(()),
                    Some(e) => Err(e),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Whether values of this type compare without regard to order
    pub fn is_set(&self) -> bool {
        match self {
            AttributeType::Set(_) => true,
            AttributeType::Custom { base, .. } => base.is_set(),
            _ => false,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Block(attributes) => {
                let mut names: Vec<_> = attributes.keys().collect();
                names.sort();
                f.debug_tuple("Block").field(&names).finish()
            }
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedOnly { name: String },

    #[error("Attribute '{name}' expects between {min} and {max} items, got {actual}")]
    ItemCount {
        name: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// May be set by the user (false for computed-only attributes)
    pub optional: bool,
    /// Value is reported by the API
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Never printed; carried over from prior state because the API does not return it
    pub sensitive: bool,
    /// Sent on create but never returned by the API; carried over from prior state
    pub write_only: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    /// Treats two different values as the same when diffing (e.g. location casing)
    pub equivalent: Option<fn(&Value, &Value) -> bool>,
    /// Forces replacement only for some changes, given `(old, new)`
    pub force_new_if: Option<fn(&Value, &Value) -> bool>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            sensitive: false,
            write_only: false,
            default: None,
            description: None,
            min_items: None,
            max_items: None,
            equivalent: None,
            force_new_if: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Computed-only: set by the API, rejected in configuration
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self.required = false;
        self
    }

    /// Optional, filled in by the API when omitted
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self.required = false;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    pub fn with_equivalence(mut self, equivalent: fn(&Value, &Value) -> bool) -> Self {
        self.equivalent = Some(equivalent);
        self
    }

    pub fn with_force_new_if(mut self, predicate: fn(&Value, &Value) -> bool) -> Self {
        self.force_new_if = Some(predicate);
        self
    }

    /// Whether changing `old` to `new` requires replacing the resource
    pub fn requires_replacement(&self, old: Option<&Value>, new: &Value) -> bool {
        if self.force_new {
            return true;
        }
        match (self.force_new_if, old) {
            (Some(predicate), Some(old)) => predicate(old, new),
            _ => false,
        }
    }

    /// Whether `desired` and `current` describe the same value
    pub fn values_match(&self, desired: &Value, current: &Value) -> bool {
        if let Some(equivalent) = self.equivalent
            && equivalent(desired, current)
        {
            return true;
        }
        type_values_match(&self.attr_type, desired, current)
    }

    fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    fn check(&self, value: &Value) -> Vec<TypeError> {
        let mut errors = Vec::new();

        if self.is_computed_only() {
            errors.push(TypeError::ComputedOnly {
                name: self.name.clone(),
            });
            return errors;
        }

        if let (Value::List(items), true) =
            (value, self.min_items.is_some() || self.max_items.is_some())
        {
            let min = self.min_items.unwrap_or(0);
            let max = self.max_items.unwrap_or(usize::MAX);
            if items.len() < min || items.len() > max {
                errors.push(TypeError::ItemCount {
                    name: self.name.clone(),
                    min,
                    max,
                    actual: items.len(),
                });
            }
        }

        if let Err(e) = self.attr_type.validate(value) {
            errors.push(TypeError::AttributeError {
                name: self.name.clone(),
                inner: Box::new(e),
            });
        }

        errors
    }
}

/// Structural comparison driven by the attribute type
///
/// Sets ignore order, and nested blocks ignore computed keys the user left out.
fn type_values_match(attr_type: &AttributeType, desired: &Value, current: &Value) -> bool {
    match (attr_type, desired, current) {
        (AttributeType::Custom { base, .. }, _, _) => type_values_match(base, desired, current),
        (AttributeType::Block(schemas), Value::Map(d), Value::Map(c)) => {
            let desired_match = d.iter().all(|(key, dv)| match (schemas.get(key), c.get(key)) {
                (Some(schema), Some(cv)) => schema.values_match(dv, cv),
                (None, Some(cv)) => dv.semantically_equals(cv),
                (_, None) => dv.is_empty_collection(),
            });
            desired_match
                && c.iter().all(|(key, cv)| {
                    d.contains_key(key)
                        || cv.is_empty_collection()
                        || schemas.get(key).is_some_and(|s| s.computed)
                })
        }
        (AttributeType::Set(inner), Value::List(d), Value::List(c)) => {
            if d.len() != c.len() {
                return false;
            }
            let mut unmatched: Vec<&Value> = c.iter().collect();
            for item in d {
                match unmatched
                    .iter()
                    .position(|o| type_values_match(inner, item, o))
                {
                    Some(pos) => {
                        unmatched.swap_remove(pos);
                    }
                    None => return false,
                }
            }
            true
        }
        (AttributeType::List(inner), Value::List(d), Value::List(c)) => {
            d.len() == c.len() && d.iter().zip(c).all(|(x, y)| type_values_match(inner, x, y))
        }
        (AttributeType::Map(inner), Value::Map(d), Value::Map(c)) => {
            d.len() == c.len()
                && d
                    .iter()
                    .all(|(k, v)| c.get(k).is_some_and(|o| type_values_match(inner, v, o)))
        }
        _ => desired.semantically_equals(current),
    }
}

/// Fill in defaults of nested blocks, recursing through lists and sets
fn apply_nested_defaults(attr_type: &AttributeType, value: &mut Value) {
    match (attr_type, value) {
        (AttributeType::Custom { base, .. }, value) => apply_nested_defaults(base, value),
        (AttributeType::Block(schemas), Value::Map(map)) => apply_defaults_to(schemas, map),
        (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
            for item in items {
                apply_nested_defaults(inner, item);
            }
        }
        _ => {}
    }
}

fn carry_over_to(
    schemas: &HashMap<String, AttributeSchema>,
    previous: &HashMap<String, Value>,
    current: &mut HashMap<String, Value>,
) {
    for (name, schema) in schemas {
        let Some(old) = previous.get(name) else {
            continue;
        };
        if (schema.sensitive || schema.write_only) && !current.contains_key(name) {
            current.insert(name.clone(), old.clone());
            continue;
        }
        if let (AttributeType::Block(nested), Value::Map(old), Some(Value::Map(new))) =
            (&schema.attr_type, old, current.get_mut(name))
        {
            carry_over_to(nested, old, new);
        }
    }
}

fn apply_defaults_to(schemas: &HashMap<String, AttributeSchema>, attributes: &mut HashMap<String, Value>) {
    for (name, schema) in schemas {
        if let Some(default) = &schema.default
            && !attributes.contains_key(name)
        {
            attributes.insert(name.clone(), default.clone());
        }
        if let Some(value) = attributes.get_mut(name) {
            apply_nested_defaults(&schema.attr_type, value);
        }
    }
}

fn validate_attributes(
    schemas: &HashMap<String, AttributeSchema>,
    attributes: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    let mut names: Vec<&String> = schemas.keys().collect();
    names.sort();
    for name in names {
        let schema = &schemas[name];
        if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
            errors.push(TypeError::MissingRequired { name: name.clone() });
        }
    }

    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for name in keys {
        match schemas.get(name) {
            Some(schema) => errors.extend(schema.check(&attributes[name])),
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
        }
    }

    errors
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes, nested blocks included
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(&self.attributes, attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for attributes the user left out, nested blocks included
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        apply_defaults_to(&self.attributes, attributes);
    }

    /// Copy sensitive and write-only attributes the API never returns from the previous state
    ///
    /// Single nested blocks present on both sides are filled in the same way.
    pub fn carry_over_write_only(
        &self,
        previous: &HashMap<String, Value>,
        current: &mut HashMap<String, Value>,
    ) {
        carry_over_to(&self.attributes, previous, current);
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort();
        names
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;
    use crate::resource_id::{ResourceIdentifier, ScopeId};

    /// Custom type from a name, base type and validation function
    pub fn custom(
        name: impl Into<String>,
        base: AttributeType,
        validate: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> AttributeType {
        AttributeType::Custom {
            name: name.into(),
            base: Box::new(base),
            validate: Arc::new(validate),
        }
    }

    /// String restricted to a fixed set of values
    pub fn string_in_slice(values: &[&str], ignore_case: bool) -> AttributeType {
        let allowed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if !ignore_case {
            return AttributeType::Enum(allowed);
        }
        custom("CaseInsensitiveEnum", AttributeType::String, move |value| {
            validate_string_in_slice(value, &allowed, true)
        })
    }

    pub fn non_empty_string() -> AttributeType {
        custom("NonEmptyString", AttributeType::String, validate_non_empty)
    }

    pub fn int_between(min: i64, max: i64) -> AttributeType {
        custom(format!("Int({min}..={max})"), AttributeType::Int, move |v| {
            validate_int_between(v, min, max)
        })
    }

    pub fn int_at_least(min: i64) -> AttributeType {
        custom(format!("Int(>={min})"), AttributeType::Int, move |v| {
            validate_int_between(v, min, i64::MAX)
        })
    }

    pub fn int_divisible_by(divisor: i64) -> AttributeType {
        custom(format!("Int(%{divisor})"), AttributeType::Int, move |v| {
            validate_int_divisible_by(v, divisor)
        })
    }

    pub fn float_between(min: f64, max: f64) -> AttributeType {
        custom(format!("Float({min}..={max})"), AttributeType::Float, move |v| {
            validate_float_between(v, min, max)
        })
    }

    /// Float strictly greater than `min`
    pub fn float_greater_than(min: f64) -> AttributeType {
        custom(format!("Float(>{min})"), AttributeType::Float, move |v| {
            match as_f64(v) {
                Some(n) if n > min => Ok(()),
                Some(n) => Err(format!("expected value to be greater than {min}, got {n}")),
                None => Err("expected a number".to_string()),
            }
        })
    }

    pub fn rfc3339() -> AttributeType {
        custom("RFC3339Time", AttributeType::String, validate_rfc3339)
    }

    /// Resource ID validated by a typed identifier's codec
    pub fn resource_id<T: ResourceIdentifier + 'static>() -> AttributeType {
        custom(format!("{}Id", T::TYPE_NAME.replace(' ', "")), AttributeType::String, |v| {
            let (_, errors) = T::validate(v, T::TYPE_NAME);
            match errors.first() {
                None => Ok(()),
                Some(e) => Err(e.to_string()),
            }
        })
    }

    /// Subscription, resource group, management group or resource scope
    pub fn scope_id() -> AttributeType {
        custom("ScopeId", AttributeType::String, |v| match v {
            Value::String(s) => ScopeId::parse(s).map(|_| ()).map_err(|e| e.to_string()),
            _ => Err("expected a string".to_string()),
        })
    }

    /// Azure region name (e.g. "westeurope" or "West Europe")
    pub fn location() -> AttributeType {
        custom("Location", AttributeType::String, validate_non_empty)
    }

    /// Resource tags: at most 50, keys up to 512 and values up to 256 characters
    pub fn tags() -> AttributeType {
        custom("Tags", AttributeType::map(AttributeType::String), validate_tags)
    }

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn validate_string_in_slice(
        value: &Value,
        allowed: &[String],
        ignore_case: bool,
    ) -> Result<(), String> {
        let Value::String(s) = value else {
            return Err("expected a string".to_string());
        };
        let found = allowed.iter().any(|a| {
            if ignore_case {
                a.eq_ignore_ascii_case(s)
            } else {
                a == s
            }
        });
        if found {
            Ok(())
        } else {
            Err(format!(
                "expected one of [{}], got {s:?}",
                allowed.join(", ")
            ))
        }
    }

    pub fn validate_non_empty(value: &Value) -> Result<(), String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Ok(()),
            Value::String(_) => Err("value must not be empty".to_string()),
            _ => Err("expected a string".to_string()),
        }
    }

    pub fn validate_int_between(value: &Value, min: i64, max: i64) -> Result<(), String> {
        match value {
            Value::Int(n) if (min..=max).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("expected value in range [{min}, {max}], got {n}")),
            _ => Err("expected an integer".to_string()),
        }
    }

    pub fn validate_int_divisible_by(value: &Value, divisor: i64) -> Result<(), String> {
        match value {
            Value::Int(n) if n % divisor == 0 => Ok(()),
            Value::Int(n) => Err(format!("expected value to be divisible by {divisor}, got {n}")),
            _ => Err("expected an integer".to_string()),
        }
    }

    pub fn validate_float_between(value: &Value, min: f64, max: f64) -> Result<(), String> {
        match as_f64(value) {
            Some(n) if n >= min && n <= max => Ok(()),
            Some(n) => Err(format!("expected value in range [{min}, {max}], got {n}")),
            None => Err("expected a number".to_string()),
        }
    }

    pub fn validate_rfc3339(value: &Value) -> Result<(), String> {
        let Value::String(s) = value else {
            return Err("expected a string".to_string());
        };
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|_| ())
            .map_err(|e| format!("{s:?} is not a valid RFC3339 date: {e}"))
    }

    pub fn validate_tags(value: &Value) -> Result<(), String> {
        let Value::Map(tags) = value else {
            return Err("expected a map of tags".to_string());
        };
        if tags.len() > 50 {
            return Err(format!("a maximum of 50 tags can be applied, got {}", tags.len()));
        }
        for (key, value) in tags {
            if key.len() > 512 {
                return Err(format!("tag name {key:?} exceeds 512 characters"));
            }
            if let Value::String(v) = value
                && v.len() > 256
            {
                return Err(format!("value of tag {key:?} exceeds 256 characters"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::ResourceGroupId;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&s("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn float_accepts_integers() {
        assert!(AttributeType::Float.validate(&Value::Int(1000)).is_ok());
        assert!(AttributeType::Float.validate(&Value::Float(0.5)).is_ok());
        assert!(AttributeType::Float.validate(&s("1")).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = types::string_in_slice(&["Actual", "Forecasted"], false);
        assert!(t.validate(&s("Actual")).is_ok());
        assert!(t.validate(&s("actual")).is_err());

        let t = types::string_in_slice(&["Actual", "Forecasted"], true);
        assert!(t.validate(&s("actual")).is_ok());
        assert!(t.validate(&s("Budgeted")).is_err());
    }

    #[test]
    fn int_validators() {
        let t = types::int_between(7, 35);
        assert!(t.validate(&Value::Int(7)).is_ok());
        assert!(t.validate(&Value::Int(36)).is_err());

        let t = types::int_divisible_by(1024);
        assert!(t.validate(&Value::Int(5120)).is_ok());
        assert!(t.validate(&Value::Int(5000)).is_err());
    }

    #[test]
    fn float_validators() {
        assert!(types::float_between(0.0, 1.0).validate(&Value::Float(0.5)).is_ok());
        assert!(types::float_between(0.0, 1.0).validate(&Value::Int(2)).is_err());
        assert!(types::float_greater_than(0.0).validate(&Value::Int(0)).is_err());
        assert!(types::float_greater_than(0.0).validate(&Value::Float(0.1)).is_ok());
    }

    #[test]
    fn rfc3339_validator() {
        let t = types::rfc3339();
        assert!(t.validate(&s("2022-06-01T00:00:00Z")).is_ok());
        assert!(t.validate(&s("2022-06-01")).is_err());
    }

    #[test]
    fn resource_id_validator() {
        let t = types::resource_id::<ResourceGroupId>();
        assert!(t.validate(&s("/subscriptions/abc/resourceGroups/rg")).is_ok());
        let err = t.validate(&s("/subscriptions/abc")).unwrap_err();
        assert!(err.to_string().contains("resourceGroups"));
    }

    #[test]
    fn tags_validator() {
        let mut tags = HashMap::new();
        tags.insert("env".to_string(), s("prod"));
        assert!(types::tags().validate(&Value::Map(tags.clone())).is_ok());
        tags.insert("long".to_string(), s(&"x".repeat(257)));
        assert!(types::tags().validate(&Value::Map(tags)).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("resource")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("count", types::int_at_least(1)))
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), s("my-resource"));
        attrs.insert("count".to_string(), Value::Int(5));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn reports_missing_unknown_and_computed() {
        let schema = ResourceSchema::new("zone")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("etag", AttributeType::String).optional_computed());

        let mut attrs = HashMap::new();
        attrs.insert("fqdn".to_string(), s("x"));
        attrs.insert("etag".to_string(), s("y"));
        attrs.insert("bogus".to_string(), Value::Bool(true));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| matches!(e, TypeError::MissingRequired { name } if name == "name")));
        assert!(errors.iter().any(|e| matches!(e, TypeError::ComputedOnly { name } if name == "fqdn")));
        assert!(errors.iter().any(|e| matches!(e, TypeError::UnknownAttribute { name } if name == "bogus")));
    }

    #[test]
    fn nested_blocks_and_item_counts() {
        let notification = AttributeType::block(vec![
            AttributeSchema::new("threshold", types::float_between(0.0, 1000.0)).required(),
            AttributeSchema::new("enabled", AttributeType::Bool),
        ]);
        let schema = ResourceSchema::new("budget").attribute(
            AttributeSchema::new("notification", AttributeType::set(notification)).with_items(1, 2),
        );

        let item = |threshold: f64| {
            let mut m = HashMap::new();
            m.insert("threshold".to_string(), Value::Float(threshold));
            Value::Map(m)
        };

        let mut attrs = HashMap::new();
        attrs.insert("notification".to_string(), Value::List(vec![item(90.0)]));
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("notification".to_string(), Value::List(vec![item(2000.0)]));
        assert!(schema.validate(&attrs).is_err());

        attrs.insert(
            "notification".to_string(),
            Value::List(vec![item(1.0), item(2.0), item(3.0)]),
        );
        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ItemCount { actual: 3, .. }));

        attrs.insert("notification".to_string(), Value::List(vec![Value::Map(HashMap::new())]));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn defaults_and_write_only_carry_over() {
        let schema = ResourceSchema::new("server")
            .attribute(
                AttributeSchema::new("auto_grow_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
            )
            .attribute(AttributeSchema::new("password", AttributeType::String).sensitive())
            .attribute(AttributeSchema::new("create_mode", AttributeType::String).write_only())
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed());

        let mut attrs = HashMap::new();
        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("auto_grow_enabled"), Some(&Value::Bool(true)));

        let mut previous = HashMap::new();
        previous.insert("password".to_string(), s("secret"));
        previous.insert("create_mode".to_string(), s("Replica"));
        previous.insert("fqdn".to_string(), s("old.example.com"));
        let mut current = HashMap::new();
        schema.carry_over_write_only(&previous, &mut current);
        assert_eq!(current.get("password"), Some(&s("secret")));
        assert_eq!(current.get("create_mode"), Some(&s("Replica")));
        assert!(!current.contains_key("fqdn"));
    }

    #[test]
    fn write_only_carries_into_nested_blocks() {
        let schema = ResourceSchema::new("server").attribute(AttributeSchema::new(
            "policy",
            AttributeType::block(vec![
                AttributeSchema::new("enabled", AttributeType::Bool),
                AttributeSchema::new("access_key", AttributeType::String).sensitive(),
            ]),
        ));

        let mut previous = HashMap::new();
        previous.insert(
            "policy".to_string(),
            Value::Map(HashMap::from([
                ("enabled".to_string(), Value::Bool(true)),
                ("access_key".to_string(), s("key")),
            ])),
        );

        let mut current = HashMap::new();
        current.insert(
            "policy".to_string(),
            Value::Map(HashMap::from([("enabled".to_string(), Value::Bool(false))])),
        );
        schema.carry_over_write_only(&previous, &mut current);
        let Some(Value::Map(policy)) = current.get("policy") else {
            panic!("policy block missing");
        };
        assert_eq!(policy.get("access_key"), Some(&s("key")));
        assert_eq!(policy.get("enabled"), Some(&Value::Bool(false)));

        // a block the API no longer reports stays absent
        let mut current = HashMap::new();
        schema.carry_over_write_only(&previous, &mut current);
        assert!(!current.contains_key("policy"));
    }

    fn notification_schema() -> AttributeSchema {
        AttributeSchema::new(
            "notification",
            AttributeType::set(AttributeType::block(vec![
                AttributeSchema::new("threshold", AttributeType::Int).required(),
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
                AttributeSchema::new("emails", AttributeType::list(AttributeType::String)),
                AttributeSchema::new("id", AttributeType::String).computed(),
            ])),
        )
    }

    fn block(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn nested_defaults_are_applied() {
        let schema = ResourceSchema::new("budget").attribute(notification_schema());
        let mut attrs = HashMap::new();
        attrs.insert(
            "notification".to_string(),
            Value::List(vec![block(vec![("threshold", Value::Int(80))])]),
        );
        schema.apply_defaults(&mut attrs);
        assert_eq!(
            attrs["notification"],
            Value::List(vec![block(vec![
                ("threshold", Value::Int(80)),
                ("enabled", Value::Bool(true)),
            ])])
        );
    }

    #[test]
    fn blocks_ignore_computed_and_empty_keys() {
        let attr = notification_schema();
        let desired = Value::List(vec![
            block(vec![("threshold", Value::Int(90)), ("enabled", Value::Bool(true))]),
            block(vec![
                ("threshold", Value::Int(80)),
                ("enabled", Value::Bool(true)),
                ("emails", Value::List(vec![])),
            ]),
        ]);
        let current = Value::List(vec![
            block(vec![
                ("threshold", Value::Int(80)),
                ("enabled", Value::Bool(true)),
                ("id", s("n1")),
            ]),
            block(vec![
                ("threshold", Value::Float(90.0)),
                ("enabled", Value::Bool(true)),
                ("id", s("n2")),
            ]),
        ]);
        assert!(attr.values_match(&desired, &current));

        let changed = Value::List(vec![
            block(vec![("threshold", Value::Int(80)), ("enabled", Value::Bool(false))]),
            block(vec![("threshold", Value::Int(90)), ("enabled", Value::Bool(true))]),
        ]);
        assert!(!attr.values_match(&desired, &changed));
    }
}
