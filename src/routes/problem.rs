use axum::http::{Method, StatusCode};

use crate::{
    contract::{ParamKind, RouteContract, Schema},
    dispatch::RouteBinding,
    handlers,
    models::schemas,
    policy::AccessRequirement,
};

pub fn routes() -> Vec<RouteBinding> {
    vec![
        RouteBinding::new(
            RouteContract::new("getProblems", Method::GET, "/problem")
                .optional_query_param("search", ParamKind::String)
                .response(StatusCode::OK, Schema::array_of(schemas::problem()))
                .access(AccessRequirement::authenticated()),
            handlers::get_problems,
        ),
        RouteBinding::new(
            RouteContract::new("getProblem", Method::GET, "/problem/:probId")
                .path_param("probId", ParamKind::Integer)
                .response(StatusCode::OK, schemas::problem())
                .response(StatusCode::NOT_FOUND, schemas::message())
                .access(AccessRequirement::authenticated()),
            handlers::get_problem,
        ),
        RouteBinding::new(
            RouteContract::new("getProblemDocument", Method::GET, "/problem/doc/:probId")
                .path_param("probId", ParamKind::Integer)
                .response(StatusCode::OK, schemas::document_link())
                .response(StatusCode::NOT_FOUND, schemas::message())
                .access(AccessRequirement::authenticated()),
            handlers::get_problem_document,
        ),
    ]
}
