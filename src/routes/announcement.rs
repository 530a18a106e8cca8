use axum::http::{Method, StatusCode};

use crate::{
    contract::{ParamKind, RouteContract, Schema},
    dispatch::RouteBinding,
    handlers,
    identity::Role,
    models::schemas,
    policy::AccessRequirement,
};

fn create_body() -> Schema {
    Schema::object().optional("value", Schema::String).into()
}

fn admin() -> AccessRequirement {
    AccessRequirement::roles([Role::Admin])
}

/// Announcement routes. Listing is open to any signed-in user (hidden entries are
/// filtered by the handler); every write is admin-only.
pub fn routes() -> Vec<RouteBinding> {
    vec![
        RouteBinding::new(
            RouteContract::new("getAnnouncements", Method::GET, "/announcement")
                .response(StatusCode::OK, Schema::array_of(schemas::announcement()))
                .access(AccessRequirement::authenticated()),
            handlers::get_announcements,
        ),
        RouteBinding::new(
            RouteContract::new("createAnnouncement", Method::POST, "/announcement")
                .body(create_body())
                .response(StatusCode::CREATED, schemas::announcement())
                .response(StatusCode::BAD_REQUEST, schemas::message())
                .access(admin()),
            handlers::create_announcement,
        ),
        RouteBinding::new(
            RouteContract::new(
                "getContestAnnouncements",
                Method::GET,
                "/announcement/contest/:contestId",
            )
            .path_param("contestId", ParamKind::Integer)
            .response(StatusCode::OK, Schema::array_of(schemas::announcement()))
            .access(AccessRequirement::authenticated()),
            handlers::get_contest_announcements,
        ),
        RouteBinding::new(
            RouteContract::new(
                "createContestAnnouncement",
                Method::POST,
                "/announcement/contest/:contestId",
            )
            .path_param("contestId", ParamKind::Integer)
            .body(create_body())
            .response(StatusCode::CREATED, schemas::announcement())
            .response(StatusCode::BAD_REQUEST, schemas::message())
            .access(admin()),
            handlers::create_contest_announcement,
        ),
        RouteBinding::new(
            RouteContract::new(
                "deleteAnnouncement",
                Method::DELETE,
                "/announcement/:announcementId",
            )
            .path_param("announcementId", ParamKind::Integer)
            .response(StatusCode::OK, schemas::announcement())
            .response(StatusCode::NOT_FOUND, schemas::message())
            .access(admin()),
            handlers::delete_announcement,
        ),
        RouteBinding::new(
            RouteContract::new(
                "showAnnouncement",
                Method::PATCH,
                "/announcement/:announcementId",
            )
            .path_param("announcementId", ParamKind::Integer)
            .body(Schema::object().field("show", Schema::Boolean))
            .response(StatusCode::OK, schemas::announcement())
            .response(StatusCode::NOT_FOUND, schemas::message())
            .access(admin()),
            handlers::show_announcement,
        ),
        RouteBinding::new(
            RouteContract::new(
                "updateAnnouncement",
                Method::PUT,
                "/announcement/:announcementId",
            )
            .path_param("announcementId", ParamKind::Integer)
            .body(
                Schema::object()
                    .optional("value", Schema::String)
                    .optional("show", Schema::Boolean),
            )
            .response(StatusCode::OK, schemas::announcement())
            .response(StatusCode::NOT_FOUND, schemas::message())
            .access(admin()),
            handlers::update_announcement,
        ),
    ]
}
