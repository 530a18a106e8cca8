use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::contract::Schema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table. `role` is kept as stored text; the authentication layer
/// parses it into a [`crate::identity::Role`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub show_name: String,
    pub role: String,
    pub rating: i64,
}

/// UserProfile
///
/// The publicly viewable part of a user (GET /user/{userId}/profile).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub show_name: String,
    pub rating: i64,
}

/// Announcement
///
/// A row of the `announcements` table. Announcements without `contest_id` are global.
/// Hidden ones (`show = false`) are only listed to admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Announcement {
    pub id: i64,
    pub value: String,
    pub show: bool,
    pub contest_id: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Problem
///
/// A row of the `problems` table. `sname` is the short name used to locate the
/// statement document in storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Problem {
    pub id: i64,
    pub name: String,
    pub sname: String,
    pub score: i32,
    pub time_limit: i32,
    pub memory_limit: i32,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateAnnouncementRequest
///
/// `value` is optional at the contract level; the handler answers 400 when it is absent
/// or empty, matching the message clients already expect.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAnnouncementRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ShowAnnouncementRequest {
    pub show: bool,
}

/// UpdateAnnouncementRequest
///
/// Partial update: only provided fields are changed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAnnouncementRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<bool>,
}

/// UpdateUserRequest
///
/// Administrative partial update of a user record (PUT /user/{userId}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateShowNameRequest {
    pub show_name: String,
}

/// --- Response Payloads (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShowNameResponse {
    pub show_name: String,
}

/// MessageResponse
///
/// Body of application-level refusals produced by handlers (400/403/404).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// DocumentLink
///
/// A short-lived download link for a problem statement (GET /problem/doc/{probId}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentLink {
    pub url: String,
    /// Seconds until `url` stops working.
    pub expires_in: u64,
}

/// Contract schemas mirroring the wire shape of the models above. Each must track the
/// serde attributes of its struct; the dispatcher rejects replies that drift from them.
pub mod schemas {
    use super::Schema;

    pub fn user() -> Schema {
        Schema::object()
            .field("id", Schema::Integer)
            .field("username", Schema::String)
            .field("showName", Schema::String)
            .field("role", Schema::String)
            .field("rating", Schema::Integer)
            .into()
    }

    pub fn user_profile() -> Schema {
        Schema::object()
            .field("id", Schema::Integer)
            .field("username", Schema::String)
            .field("showName", Schema::String)
            .field("rating", Schema::Integer)
            .into()
    }

    pub fn announcement() -> Schema {
        Schema::object()
            .field("id", Schema::Integer)
            .field("value", Schema::String)
            .field("show", Schema::Boolean)
            .field("contestId", Schema::nullable(Schema::Integer))
            .field("createdAt", Schema::DateTime)
            .field("updatedAt", Schema::DateTime)
            .into()
    }

    pub fn problem() -> Schema {
        Schema::object()
            .field("id", Schema::Integer)
            .field("name", Schema::String)
            .field("sname", Schema::String)
            .field("score", Schema::Integer)
            .field("timeLimit", Schema::Integer)
            .field("memoryLimit", Schema::Integer)
            .into()
    }

    pub fn show_name() -> Schema {
        Schema::object().field("showName", Schema::String).into()
    }

    pub fn message() -> Schema {
        Schema::object().field("message", Schema::String).into()
    }

    pub fn document_link() -> Schema {
        Schema::object()
            .field("url", Schema::String)
            .field("expiresIn", Schema::Integer)
            .into()
    }
}
