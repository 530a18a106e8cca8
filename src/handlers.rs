use axum::http::StatusCode;
use chrono::Utc;

use crate::{
    AppState,
    dispatch::{HandlerError, HandlerResult, Reply},
    identity::{Identity, Role},
    models::{
        Announcement, CreateAnnouncementRequest, DocumentLink, MessageResponse, Problem,
        ShowAnnouncementRequest, ShowNameResponse, UpdateAnnouncementRequest,
        UpdateShowNameRequest, UpdateUserRequest, User, UserProfile,
    },
    repository::AnnouncementScope,
    storage::{DOCUMENT_LINK_TTL, document_key},
    validation::ValidatedRequest,
};

// Every handler below runs only after the dispatcher has validated the request against
// its contract and the access policy has allowed the caller. What remains here is
// business logic and the application-level refusals each contract declares.

fn path_id(request: &ValidatedRequest, name: &'static str) -> Result<i64, HandlerError> {
    request
        .params
        .integer(name)
        .ok_or(HandlerError::MissingInput(name))
}

fn not_found(what: &str) -> HandlerResult {
    Reply::message(StatusCode::NOT_FOUND, &format!("{} not found", what))
}

// --- System ---

/// time
///
/// [Public Route] Current server time. Stays reachable while the system is offline.
#[utoipa::path(
    get,
    path = "/time",
    responses((status = 200, description = "Server time (RFC 3339)", body = String))
)]
pub async fn time(_state: AppState, _request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    Reply::ok(&Utc::now())
}

#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Alive", body = String))
)]
pub async fn ping(_state: AppState, _request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    Reply::ok(&"pong")
}

// --- Announcements ---

/// get_announcements
///
/// [Authenticated Route] Global announcements, newest first. Admins also see hidden ones.
#[utoipa::path(
    get,
    path = "/announcement",
    responses((status = 200, description = "Announcements", body = [Announcement]))
)]
pub async fn get_announcements(
    state: AppState,
    _request: ValidatedRequest,
    identity: Identity,
) -> HandlerResult {
    let scope = AnnouncementScope {
        contest_id: None,
        shown_only: !identity.is_admin(),
    };
    Reply::ok(&state.repo.list_announcements(scope).await?)
}

#[utoipa::path(
    get,
    path = "/announcement/contest/{contestId}",
    params(("contestId" = i64, Path, description = "Contest ID")),
    responses((status = 200, description = "Contest announcements", body = [Announcement]))
)]
pub async fn get_contest_announcements(
    state: AppState,
    request: ValidatedRequest,
    identity: Identity,
) -> HandlerResult {
    let scope = AnnouncementScope {
        contest_id: Some(path_id(&request, "contestId")?),
        shown_only: !identity.is_admin(),
    };
    Reply::ok(&state.repo.list_announcements(scope).await?)
}

/// create_announcement
///
/// [Admin Route] Publishes a global announcement. A missing or blank `value` is refused
/// with 400 rather than stored.
#[utoipa::path(
    post,
    path = "/announcement",
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Created", body = Announcement),
        (status = 400, description = "No value", body = MessageResponse)
    )
)]
pub async fn create_announcement(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    publish_announcement(&state, &request, None).await
}

#[utoipa::path(
    post,
    path = "/announcement/contest/{contestId}",
    params(("contestId" = i64, Path, description = "Contest ID")),
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Created", body = Announcement),
        (status = 400, description = "No value", body = MessageResponse)
    )
)]
pub async fn create_contest_announcement(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let contest_id = path_id(&request, "contestId")?;
    publish_announcement(&state, &request, Some(contest_id)).await
}

async fn publish_announcement(
    state: &AppState,
    request: &ValidatedRequest,
    contest_id: Option<i64>,
) -> HandlerResult {
    let payload: CreateAnnouncementRequest = request.body_as()?;
    let Some(value) = payload.value.filter(|v| !v.trim().is_empty()) else {
        return Reply::message(StatusCode::BAD_REQUEST, "No value is sent");
    };

    let announcement = state.repo.create_announcement(value, contest_id).await?;
    tracing::info!(announcement_id = announcement.id, ?contest_id, "announcement created");
    Reply::created(&announcement)
}

#[utoipa::path(
    delete,
    path = "/announcement/{announcementId}",
    params(("announcementId" = i64, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Deleted", body = Announcement),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn delete_announcement(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "announcementId")?;
    match state.repo.delete_announcement(id).await? {
        Some(announcement) => Reply::ok(&announcement),
        None => not_found("Announcement"),
    }
}

#[utoipa::path(
    patch,
    path = "/announcement/{announcementId}",
    params(("announcementId" = i64, Path, description = "Announcement ID")),
    request_body = ShowAnnouncementRequest,
    responses(
        (status = 200, description = "Visibility changed", body = Announcement),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn show_announcement(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "announcementId")?;
    let payload: ShowAnnouncementRequest = request.body_as()?;
    match state.repo.set_announcement_visibility(id, payload.show).await? {
        Some(announcement) => Reply::ok(&announcement),
        None => not_found("Announcement"),
    }
}

#[utoipa::path(
    put,
    path = "/announcement/{announcementId}",
    params(("announcementId" = i64, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementRequest,
    responses(
        (status = 200, description = "Updated", body = Announcement),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn update_announcement(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "announcementId")?;
    let payload: UpdateAnnouncementRequest = request.body_as()?;
    match state.repo.update_announcement(id, payload).await? {
        Some(announcement) => Reply::ok(&announcement),
        None => not_found("Announcement"),
    }
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn get_users(state: AppState, _request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    Reply::ok(&state.repo.list_users().await?)
}

#[utoipa::path(
    get,
    path = "/user/online",
    responses((status = 200, description = "Users seen recently", body = [User]))
)]
pub async fn get_online_users(
    state: AppState,
    _request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    Reply::ok(&state.repo.online_users().await?)
}

#[utoipa::path(
    get,
    path = "/user/{userId}/profile",
    params(("userId" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn get_user_profile(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "userId")?;
    match state.repo.user_profile(id).await? {
        Some(profile) => Reply::ok(&profile),
        None => not_found("User"),
    }
}

/// update_user
///
/// [Admin Route] Partial update of a user record. A role outside the known set is
/// refused; a known role is stored in its canonical spelling.
#[utoipa::path(
    put,
    path = "/user/{userId}",
    params(("userId" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Unknown role", body = MessageResponse),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn update_user(state: AppState, request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    let id = path_id(&request, "userId")?;
    let mut payload: UpdateUserRequest = request.body_as()?;

    if let Some(role) = payload.role.as_deref() {
        match role.parse::<Role>() {
            Ok(role) => payload.role = Some(role.as_str().to_string()),
            Err(e) => return Reply::message(StatusCode::BAD_REQUEST, &e.to_string()),
        }
    }

    match state.repo.update_user(id, payload).await? {
        Some(user) => {
            tracing::info!(user_id = user.id, role = %user.role, "user updated");
            Reply::ok(&user)
        }
        None => not_found("User"),
    }
}

/// update_show_name
///
/// [Admin, User Route] Changes a display name. Admins may rename anyone; everyone else
/// only themself.
#[utoipa::path(
    patch,
    path = "/user/{userId}/name",
    params(("userId" = i64, Path, description = "User ID")),
    request_body = UpdateShowNameRequest,
    responses(
        (status = 200, description = "Renamed", body = ShowNameResponse),
        (status = 400, description = "Empty name", body = MessageResponse),
        (status = 403, description = "Not your account", body = MessageResponse),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn update_show_name(
    state: AppState,
    request: ValidatedRequest,
    identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "userId")?;

    if !identity.is_admin() && identity.id() != Some(id) {
        tracing::info!(caller = ?identity.id(), target = id, "show name change refused");
        return Reply::message(StatusCode::FORBIDDEN, "Forbidden");
    }

    let payload: UpdateShowNameRequest = request.body_as()?;
    let show_name = payload.show_name.trim().to_string();
    if show_name.is_empty() {
        return Reply::message(StatusCode::BAD_REQUEST, "showName must not be empty");
    }

    match state.repo.update_show_name(id, show_name).await? {
        Some(show_name) => Reply::ok(&ShowNameResponse { show_name }),
        None => not_found("User"),
    }
}

// --- Problems ---

#[utoipa::path(
    get,
    path = "/problem",
    params(("search" = Option<String>, Query, description = "Case-insensitive name filter")),
    responses((status = 200, description = "Problems", body = [Problem]))
)]
pub async fn get_problems(state: AppState, request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    let search = request.query.string("search").map(str::to_string);
    Reply::ok(&state.repo.list_problems(search).await?)
}

#[utoipa::path(
    get,
    path = "/problem/{probId}",
    params(("probId" = i64, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Problem", body = Problem),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn get_problem(state: AppState, request: ValidatedRequest, _identity: Identity) -> HandlerResult {
    let id = path_id(&request, "probId")?;
    match state.repo.find_problem(id).await? {
        Some(problem) => Reply::ok(&problem),
        None => not_found("Problem"),
    }
}

/// get_problem_document
///
/// [Authenticated Route] Hands out a presigned link to the problem statement PDF. The
/// document itself never passes through this service.
#[utoipa::path(
    get,
    path = "/problem/doc/{probId}",
    params(("probId" = i64, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Download link", body = DocumentLink),
        (status = 404, description = "Not found", body = MessageResponse)
    )
)]
pub async fn get_problem_document(
    state: AppState,
    request: ValidatedRequest,
    _identity: Identity,
) -> HandlerResult {
    let id = path_id(&request, "probId")?;
    let Some(problem) = state.repo.find_problem(id).await? else {
        return not_found("Problem");
    };

    let url = state
        .storage
        .presigned_download_url(&document_key(&problem.sname), DOCUMENT_LINK_TTL)
        .await?;

    Reply::ok(&DocumentLink {
        url,
        expires_in: DOCUMENT_LINK_TTL.as_secs(),
    })
}
