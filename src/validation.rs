use axum::{extract::Query, http::Uri};
use chrono::DateTime;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

use crate::contract::{ParamSchema, ParamValue, RouteContract, Schema};

/// One offending field: where it is, what the contract expected, and what arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, expected: impl Into<String>, received: Option<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            received,
        }
    }
}

/// ValidationError
///
/// Every issue found in a request (or a response), in a deterministic order: path
/// parameters, then query, then body. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.issues.iter().map(|i| i.field.as_str()).collect();
        write!(f, "{} invalid field(s): {}", self.issues.len(), fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn single(field: impl Into<String>, expected: impl Into<String>, received: Option<String>) -> Self {
        Self {
            issues: vec![ValidationIssue::new(field, expected, received)],
        }
    }
}

/// Coerced path or query parameters, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(ParamValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ParamValue::String(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ValidatedRequest
///
/// A request that conforms exactly to its contract. Handlers read parameters through the
/// typed accessors and decode the body with [`ValidatedRequest::body_as`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRequest {
    pub params: Params,
    pub query: Params,
    pub body: Option<Value>,
}

impl ValidatedRequest {
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone().unwrap_or(Value::Null))
    }
}

/// validate
///
/// Checks the matched path parameters, the query string, and the raw body against
/// `contract`. Returns a fully typed request or every issue found; never panics.
pub fn validate(
    contract: &RouteContract,
    raw_params: &[(String, String)],
    uri: &Uri,
    body: &[u8],
) -> Result<ValidatedRequest, ValidationError> {
    let mut issues = Vec::new();

    let params = coerce_path_params(&contract.path_params, raw_params, &mut issues);
    let query = coerce_query(&contract.query, uri, &mut issues);
    let body = check_body(contract.body.as_ref(), body, &mut issues);

    if issues.is_empty() {
        Ok(ValidatedRequest {
            params,
            query,
            body,
        })
    } else {
        Err(ValidationError { issues })
    }
}

/// Checks a JSON value against a schema, reporting issues under `root`.
pub fn validate_value(schema: &Schema, value: &Value, root: &str) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    check_value(schema, value, root, &mut issues);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}

fn coerce_path_params(
    declared: &[ParamSchema],
    raw: &[(String, String)],
    issues: &mut Vec<ValidationIssue>,
) -> Params {
    let mut values = BTreeMap::new();
    for param in declared {
        let field = format!("params.{}", param.name);
        match raw.iter().find(|(name, _)| name == &param.name) {
            Some((_, text)) => match param.kind.coerce(text) {
                Some(value) => {
                    values.insert(param.name.clone(), value);
                }
                None => issues.push(ValidationIssue::new(
                    field,
                    param.kind.describe(),
                    Some(text.clone()),
                )),
            },
            None => issues.push(ValidationIssue::new(field, param.kind.describe(), None)),
        }
    }
    Params(values)
}

fn coerce_query(declared: &[ParamSchema], uri: &Uri, issues: &mut Vec<ValidationIssue>) -> Params {
    let pairs = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            issues.push(ValidationIssue::new(
                "query",
                "url-encoded query string",
                Some(rejection.body_text()),
            ));
            return Params::default();
        }
    };

    let mut raw: BTreeMap<String, String> = BTreeMap::new();
    let mut repeated = Vec::new();
    for (name, value) in pairs {
        if raw.contains_key(&name) {
            repeated.push(name);
        } else {
            raw.insert(name, value);
        }
    }

    let mut values = BTreeMap::new();
    for param in declared {
        let field = format!("query.{}", param.name);
        match raw.get(&param.name) {
            Some(text) => match param.kind.coerce(text) {
                Some(value) => {
                    values.insert(param.name.clone(), value);
                }
                None => issues.push(ValidationIssue::new(
                    field,
                    param.kind.describe(),
                    Some(text.clone()),
                )),
            },
            None if param.optional => {}
            None => issues.push(ValidationIssue::new(field, param.kind.describe(), None)),
        }
    }

    repeated.sort();
    repeated.dedup();
    for name in repeated {
        issues.push(ValidationIssue::new(
            format!("query.{}", name),
            "a single value",
            Some("repeated parameter".to_string()),
        ));
    }

    for name in raw.keys() {
        if !declared.iter().any(|p| &p.name == name) {
            issues.push(ValidationIssue::new(
                format!("query.{}", name),
                "no such parameter",
                Some("unknown parameter".to_string()),
            ));
        }
    }

    Params(values)
}

fn check_body(schema: Option<&Schema>, raw: &[u8], issues: &mut Vec<ValidationIssue>) -> Option<Value> {
    let empty = raw.iter().all(u8::is_ascii_whitespace);

    let Some(schema) = schema else {
        if !empty {
            issues.push(ValidationIssue::new(
                "body",
                "no body",
                Some(format!("{} bytes", raw.len())),
            ));
        }
        return None;
    };

    if empty {
        issues.push(ValidationIssue::new(
            "body",
            format!("JSON {}", schema.describe()),
            Some("empty body".to_string()),
        ));
        return None;
    }

    match serde_json::from_slice::<Value>(raw) {
        Ok(value) => {
            let before = issues.len();
            check_value(schema, &value, "body", issues);
            (issues.len() == before).then_some(value)
        }
        Err(err) => {
            issues.push(ValidationIssue::new("body", "valid JSON", Some(err.to_string())));
            None
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(n) if n.is_u64() => "integer out of range",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_value(schema: &Schema, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    let mismatch = |issues: &mut Vec<ValidationIssue>| {
        issues.push(ValidationIssue::new(
            path,
            schema.describe(),
            Some(json_type(value).to_string()),
        ));
    };

    match (schema, value) {
        (Schema::Null, Value::Null) => {}
        (Schema::Boolean, Value::Bool(_)) => {}
        (Schema::Integer, Value::Number(n)) if n.is_i64() => {}
        (Schema::Number, Value::Number(_)) => {}
        (Schema::String, Value::String(_)) => {}
        (Schema::DateTime, Value::String(text)) => {
            if DateTime::parse_from_rfc3339(text).is_err() {
                issues.push(ValidationIssue::new(path, schema.describe(), Some(text.clone())));
            }
        }
        (Schema::Nullable(_), Value::Null) => {}
        (Schema::Nullable(inner), _) => check_value(inner, value, path, issues),
        (Schema::Array(item), Value::Array(elements)) => {
            for (index, element) in elements.iter().enumerate() {
                check_value(item, element, &format!("{}[{}]", path, index), issues);
            }
        }
        (Schema::Object(object), Value::Object(map)) => {
            for field in &object.fields {
                let field_path = format!("{}.{}", path, field.name);
                match map.get(&field.name) {
                    Some(inner) => check_value(&field.schema, inner, &field_path, issues),
                    None if field.optional => {}
                    None => issues.push(ValidationIssue::new(
                        field_path,
                        format!("required {}", field.schema.describe()),
                        None,
                    )),
                }
            }
            let mut unknown: Vec<&String> =
                map.keys().filter(|key| object.get(key).is_none()).collect();
            unknown.sort();
            for key in unknown {
                issues.push(ValidationIssue::new(
                    format!("{}.{}", path, key),
                    "no such field",
                    Some("unknown field".to_string()),
                ));
            }
        }
        _ => mismatch(issues),
    }
}
