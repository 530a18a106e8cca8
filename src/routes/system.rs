use axum::http::{Method, StatusCode};

use crate::{
    contract::{RouteContract, Schema},
    dispatch::RouteBinding,
    handlers,
    policy::AccessRequirement,
};

pub fn routes() -> Vec<RouteBinding> {
    vec![
        RouteBinding::new(
            RouteContract::new("time", Method::GET, "/time")
                .response(StatusCode::OK, Schema::DateTime)
                .access(AccessRequirement::public()),
            handlers::time,
        ),
        RouteBinding::new(
            RouteContract::new("ping", Method::GET, "/ping")
                .response(StatusCode::OK, Schema::String)
                .access(AccessRequirement::authenticated()),
            handlers::ping,
        ),
    ]
}
