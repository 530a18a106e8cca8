#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Bytes, http::{Method, Uri}};
use chrono::{TimeZone, Utc};
use contest_portal::{
    AppState, Dispatcher,
    auth::{Principal, RequestContext},
    config::AppConfig,
    dispatch::RawRequest,
    identity::Role,
    models::{Announcement, Problem, UpdateAnnouncementRequest, UpdateUserRequest, User, UserProfile},
    policy::SystemMode,
    repository::{AnnouncementScope, Repository, RepositoryError, RepositoryResult},
    routes,
    storage::MockDocumentStorage,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// --- In-Memory Repository ---

/// MockRepository
///
/// Holds users, announcements, and problems in memory so handlers can be exercised
/// end-to-end without Postgres. `fail` turns every call into a repository error.
#[derive(Default)]
pub struct MockRepository {
    pub users: Mutex<Vec<User>>,
    pub online: Mutex<Vec<i64>>,
    pub announcements: Mutex<Vec<Announcement>>,
    pub problems: Mutex<Vec<Problem>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockRepository {
    /// Fixture: user 1 is an admin, users 5 and 6 are regular users, user 5 is online.
    pub fn seeded() -> Self {
        let repo = Self::default();
        *repo.users.lock().unwrap() = vec![
            user(1, "root", "Root", "admin"),
            user(5, "alice", "Alice", "user"),
            user(6, "bob", "Bob", "user"),
        ];
        *repo.online.lock().unwrap() = vec![5];
        *repo.announcements.lock().unwrap() = vec![
            announcement(1, "Welcome", true, None),
            announcement(2, "Draft", false, None),
            announcement(3, "Contest starts soon", true, Some(10)),
            announcement(4, "Hidden contest note", false, Some(10)),
        ];
        *repo.problems.lock().unwrap() = vec![
            problem(1, "A plus B", "aplusb"),
            problem(2, "Shortest Path", "sssp"),
        ];
        repo
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::seeded()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> RepositoryResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RepositoryError::Unavailable("mock failure".to_string()));
        }
        Ok(())
    }
}

pub fn user(id: i64, username: &str, show_name: &str, role: &str) -> User {
    User {
        id,
        username: username.to_string(),
        show_name: show_name.to_string(),
        role: role.to_string(),
        rating: 1500,
    }
}

pub fn announcement(id: i64, value: &str, show: bool, contest_id: Option<i64>) -> Announcement {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(id);
    Announcement {
        id,
        value: value.to_string(),
        show,
        contest_id,
        created_at: at,
        updated_at: at,
    }
}

pub fn problem(id: i64, name: &str, sname: &str) -> Problem {
    Problem {
        id,
        name: name.to_string(),
        sname: sname.to_string(),
        score: 100,
        time_limit: 1000,
        memory_limit: 256,
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn find_user(&self, id: i64) -> RepositoryResult<Option<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn online_users(&self) -> RepositoryResult<Vec<User>> {
        self.check()?;
        let online = self.online.lock().unwrap().clone();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| online.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn user_profile(&self, id: i64) -> RepositoryResult<Option<UserProfile>> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .map(|u| UserProfile {
                id: u.id,
                username: u.username.clone(),
                show_name: u.show_name.clone(),
                rating: u.rating,
            }))
    }

    async fn update_user(&self, id: i64, req: UpdateUserRequest) -> RepositoryResult<Option<User>> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(username) = req.username {
            user.username = username;
        }
        if let Some(show_name) = req.show_name {
            user.show_name = show_name;
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        if let Some(rating) = req.rating {
            user.rating = rating;
        }
        Ok(Some(user.clone()))
    }

    async fn update_show_name(&self, id: i64, show_name: String) -> RepositoryResult<Option<String>> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.show_name = show_name;
            u.show_name.clone()
        }))
    }

    async fn list_announcements(&self, scope: AnnouncementScope) -> RepositoryResult<Vec<Announcement>> {
        self.check()?;
        let mut listed: Vec<Announcement> = self
            .announcements
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.contest_id == scope.contest_id)
            .filter(|a| !scope.shown_only || a.show)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn create_announcement(&self, value: String, contest_id: Option<i64>) -> RepositoryResult<Announcement> {
        self.check()?;
        let mut announcements = self.announcements.lock().unwrap();
        let id = announcements.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let created = announcement(id, &value, true, contest_id);
        announcements.push(created.clone());
        Ok(created)
    }

    async fn delete_announcement(&self, id: i64) -> RepositoryResult<Option<Announcement>> {
        self.check()?;
        let mut announcements = self.announcements.lock().unwrap();
        let position = announcements.iter().position(|a| a.id == id);
        Ok(position.map(|index| announcements.remove(index)))
    }

    async fn set_announcement_visibility(&self, id: i64, show: bool) -> RepositoryResult<Option<Announcement>> {
        self.check()?;
        let mut announcements = self.announcements.lock().unwrap();
        Ok(announcements.iter_mut().find(|a| a.id == id).map(|a| {
            a.show = show;
            a.clone()
        }))
    }

    async fn update_announcement(
        &self,
        id: i64,
        req: UpdateAnnouncementRequest,
    ) -> RepositoryResult<Option<Announcement>> {
        self.check()?;
        let mut announcements = self.announcements.lock().unwrap();
        Ok(announcements.iter_mut().find(|a| a.id == id).map(|a| {
            if let Some(value) = req.value {
                a.value = value;
            }
            if let Some(show) = req.show {
                a.show = show;
            }
            a.clone()
        }))
    }

    async fn list_problems(&self, search: Option<String>) -> RepositoryResult<Vec<Problem>> {
        self.check()?;
        let problems = self.problems.lock().unwrap().clone();
        Ok(match search {
            Some(s) => {
                let needle = s.to_lowercase();
                problems
                    .into_iter()
                    .filter(|p| {
                        p.name.to_lowercase().contains(&needle)
                            || p.sname.to_lowercase().contains(&needle)
                    })
                    .collect()
            }
            None => problems,
        })
    }

    async fn find_problem(&self, id: i64) -> RepositoryResult<Option<Problem>> {
        self.check()?;
        Ok(self.problems.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }
}

// --- State and Dispatcher Helpers ---

pub fn test_state(repo: Arc<MockRepository>) -> AppState {
    AppState::new(repo, Arc::new(MockDocumentStorage::new()), AppConfig::default())
}

pub fn test_dispatcher(repo: Arc<MockRepository>) -> Dispatcher {
    Dispatcher::new(routes::bindings(), test_state(repo)).expect("route table is consistent")
}

pub fn offline(dispatcher: &Dispatcher) {
    dispatcher.state().mode.set(SystemMode::Offline);
}

pub fn anonymous() -> RequestContext {
    RequestContext::default()
}

pub fn as_admin() -> RequestContext {
    RequestContext {
        principal: Some(Principal { id: 1, role: Role::Admin }),
    }
}

pub fn as_user(id: i64) -> RequestContext {
    RequestContext {
        principal: Some(Principal { id, role: Role::User }),
    }
}

pub fn request(method: Method, uri: &str, body: &str, context: RequestContext) -> RawRequest {
    RawRequest::new(
        method,
        uri.parse::<Uri>().expect("valid test uri"),
        Bytes::copy_from_slice(body.as_bytes()),
        context,
    )
}
