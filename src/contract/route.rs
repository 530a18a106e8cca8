use axum::http::{Method, StatusCode};
use std::collections::BTreeMap;

use super::schema::{ParamKind, ParamSchema, Schema};
use crate::policy::AccessRequirement;

/// RouteContract
///
/// The single declaration of one endpoint: how it is addressed, what it accepts, what it
/// may answer with (per status code), and who may call it. Built with the fluent methods
/// below and handed to the registry at startup; never mutated afterwards.
///
/// ```ignore
/// RouteContract::new("deleteAnnouncement", Method::DELETE, "/announcement/:announcementId")
///     .path_param("announcementId", ParamKind::Integer)
///     .response(StatusCode::OK, schemas::announcement())
///     .access(AccessRequirement::roles([Role::Admin]));
/// ```
#[derive(Debug, Clone)]
pub struct RouteContract {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub path_params: Vec<ParamSchema>,
    pub query: Vec<ParamSchema>,
    pub body: Option<Schema>,
    pub responses: BTreeMap<u16, Schema>,
    pub access: AccessRequirement,
}

impl RouteContract {
    /// Starts a contract with no inputs, no responses, and the default access requirement.
    pub fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            path_params: Vec::new(),
            query: Vec::new(),
            body: None,
            responses: BTreeMap::new(),
            access: AccessRequirement::default(),
        }
    }

    pub fn path_param(mut self, name: &str, kind: ParamKind) -> Self {
        self.path_params.push(ParamSchema {
            name: name.to_string(),
            kind,
            optional: false,
        });
        self
    }

    pub fn query_param(mut self, name: &str, kind: ParamKind) -> Self {
        self.query.push(ParamSchema {
            name: name.to_string(),
            kind,
            optional: false,
        });
        self
    }

    pub fn optional_query_param(mut self, name: &str, kind: ParamKind) -> Self {
        self.query.push(ParamSchema {
            name: name.to_string(),
            kind,
            optional: true,
        });
        self
    }

    pub fn body(mut self, schema: impl Into<Schema>) -> Self {
        self.body = Some(schema.into());
        self
    }

    pub fn response(mut self, status: StatusCode, schema: impl Into<Schema>) -> Self {
        self.responses.insert(status.as_u16(), schema.into());
        self
    }

    pub fn access(mut self, requirement: AccessRequirement) -> Self {
        self.access = requirement;
        self
    }

    pub fn response_schema(&self, status: StatusCode) -> Option<&Schema> {
        self.responses.get(&status.as_u16())
    }
}
