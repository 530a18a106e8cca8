use axum::http::Method;
use std::collections::{BTreeSet, HashSet};

use super::route::RouteContract;

/// Errors detected while composing the registry. These are programming mistakes in the
/// route declarations and stop the process at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("route '{name}': invalid path template '{path}': {reason}")]
    InvalidTemplate {
        name: &'static str,
        path: &'static str,
        reason: String,
    },
    #[error("route '{name}' duplicates {method} {path} already declared by '{existing}'")]
    DuplicateRoute {
        name: &'static str,
        existing: &'static str,
        method: Method,
        path: &'static str,
    },
    #[error("operation name '{0}' is declared more than once")]
    DuplicateName(&'static str),
    #[error("route '{name}': template parameters {template:?} do not match declared path parameters {declared:?}")]
    ParamMismatch {
        name: &'static str,
        template: Vec<String>,
        declared: Vec<String>,
    },
}

/// No template matched the incoming method and path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no route matches {method} {path}")]
pub struct RouteNotFound {
    pub method: Method,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// A parsed `/a/:b/c` path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, String> {
        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| "must start with '/'".to_string())?;
        if rest.is_empty() {
            return Ok(Self { segments: vec![] });
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err("empty path segment".to_string());
            }
            match raw.strip_prefix(':') {
                Some("") => return Err("parameter without a name".to_string()),
                Some(name) => {
                    if !seen.insert(name.to_string()) {
                        return Err(format!("parameter '{}' appears twice", name));
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Static(raw.to_string())),
            }
        }
        Ok(Self { segments })
    }

    pub fn param_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.clone()),
                Segment::Static(_) => None,
            })
            .collect()
    }

    /// Matches request path segments, returning the bound parameters in template order.
    fn matches(&self, path: &[&str]) -> Option<Vec<(String, String)>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Static(expected) if expected == actual => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => params.push((name.clone(), actual.to_string())),
            }
        }
        Some(params)
    }

    /// Static segments outrank parameters, compared left to right.
    fn specificity(&self) -> Vec<bool> {
        self.segments
            .iter()
            .map(|s| matches!(s, Segment::Static(_)))
            .collect()
    }

    /// Two templates with the same shape would always match the same paths.
    fn shape(&self) -> Vec<Option<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Static(value) => Some(value.as_str()),
                Segment::Param(_) => None,
            })
            .collect()
    }
}

#[derive(Debug)]
struct Entry {
    contract: RouteContract,
    template: PathTemplate,
}

/// A contract selected for an incoming request, with its raw path parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub contract: &'a RouteContract,
    pub params: Vec<(String, String)>,
}

/// ContractRegistry
///
/// The immutable table of every route contract. Built once at startup; after that it is
/// only read, so it can be shared across request tasks without locks.
#[derive(Debug)]
pub struct ContractRegistry {
    entries: Vec<Entry>,
}

impl ContractRegistry {
    pub fn new(contracts: impl IntoIterator<Item = RouteContract>) -> Result<Self, RegistryError> {
        let mut entries: Vec<Entry> = Vec::new();
        let mut names = HashSet::new();

        for contract in contracts {
            if !names.insert(contract.name) {
                return Err(RegistryError::DuplicateName(contract.name));
            }

            let template =
                PathTemplate::parse(contract.path).map_err(|reason| RegistryError::InvalidTemplate {
                    name: contract.name,
                    path: contract.path,
                    reason,
                })?;

            let template_params: BTreeSet<String> = template.param_names().into_iter().collect();
            let declared: BTreeSet<String> =
                contract.path_params.iter().map(|p| p.name.clone()).collect();
            if template_params != declared || declared.len() != contract.path_params.len() {
                return Err(RegistryError::ParamMismatch {
                    name: contract.name,
                    template: template_params.into_iter().collect(),
                    declared: contract.path_params.iter().map(|p| p.name.clone()).collect(),
                });
            }

            if let Some(existing) = entries.iter().find(|e| {
                e.contract.method == contract.method && e.template.shape() == template.shape()
            }) {
                return Err(RegistryError::DuplicateRoute {
                    name: contract.name,
                    existing: existing.contract.name,
                    method: contract.method.clone(),
                    path: contract.path,
                });
            }

            entries.push(Entry { contract, template });
        }

        tracing::debug!(routes = entries.len(), "contract registry built");
        Ok(Self { entries })
    }

    /// lookup
    ///
    /// Resolves an incoming method and path to its contract. A single trailing slash is
    /// ignored; segments are compared verbatim.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteNotFound> {
        let trimmed = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };
        let segments: Vec<&str> = match trimmed.strip_prefix('/') {
            Some("") => vec![],
            Some(rest) => rest.split('/').collect(),
            None => {
                return Err(RouteNotFound {
                    method: method.clone(),
                    path: path.to_string(),
                });
            }
        };

        self.entries
            .iter()
            .filter(|e| &e.contract.method == method)
            .filter_map(|e| e.template.matches(&segments).map(|params| (e, params)))
            .max_by(|(a, _), (b, _)| a.template.specificity().cmp(&b.template.specificity()))
            .map(|(entry, params)| RouteMatch {
                contract: &entry.contract,
                params,
            })
            .ok_or_else(|| RouteNotFound {
                method: method.clone(),
                path: path.to_string(),
            })
    }

    pub fn contracts(&self) -> impl Iterator<Item = &RouteContract> {
        self.entries.iter().map(|e| &e.contract)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
