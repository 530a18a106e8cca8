use axum::http::{Method, StatusCode};

use crate::{
    contract::{ParamKind, RouteContract, Schema},
    dispatch::RouteBinding,
    handlers,
    identity::Role,
    models::schemas,
    policy::AccessRequirement,
};

pub fn routes() -> Vec<RouteBinding> {
    vec![
        RouteBinding::new(
            RouteContract::new("getUsers", Method::GET, "/user")
                .response(StatusCode::OK, Schema::array_of(schemas::user()))
                .access(AccessRequirement::roles([Role::Admin])),
            handlers::get_users,
        ),
        // Static `/user/online` outranks `/user/:userId` shapes during lookup.
        RouteBinding::new(
            RouteContract::new("getOnlineUsers", Method::GET, "/user/online")
                .response(StatusCode::OK, Schema::array_of(schemas::user()))
                .access(AccessRequirement::authenticated()),
            handlers::get_online_users,
        ),
        RouteBinding::new(
            RouteContract::new("getUserProfile", Method::GET, "/user/:userId/profile")
                .path_param("userId", ParamKind::Integer)
                .response(StatusCode::OK, schemas::user_profile())
                .response(StatusCode::NOT_FOUND, schemas::message())
                .access(AccessRequirement::authenticated()),
            handlers::get_user_profile,
        ),
        RouteBinding::new(
            RouteContract::new("updateUser", Method::PUT, "/user/:userId")
                .path_param("userId", ParamKind::Integer)
                .body(
                    Schema::object()
                        .optional("username", Schema::String)
                        .optional("showName", Schema::String)
                        .optional("role", Schema::String)
                        .optional("rating", Schema::Integer),
                )
                .response(StatusCode::OK, schemas::user())
                .response(StatusCode::BAD_REQUEST, schemas::message())
                .response(StatusCode::NOT_FOUND, schemas::message())
                .access(AccessRequirement::roles([Role::Admin])),
            handlers::update_user,
        ),
        RouteBinding::new(
            RouteContract::new("updateShowName", Method::PATCH, "/user/:userId/name")
                .path_param("userId", ParamKind::Integer)
                .body(Schema::object().field("showName", Schema::String))
                .response(StatusCode::OK, schemas::show_name())
                .response(StatusCode::BAD_REQUEST, schemas::message())
                .response(StatusCode::FORBIDDEN, schemas::message())
                .response(StatusCode::NOT_FOUND, schemas::message())
                .access(AccessRequirement::roles([Role::Admin, Role::User])),
            handlers::update_show_name,
        ),
    ]
}
