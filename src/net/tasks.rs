//! Task and admin endpoints.
//!
//! Stateless wrappers: every call reads the session's credential and role at
//! the time it is made. Admin endpoints are only reachable through
//! [`TaskClient::admin`], which refuses non-admin sessions up front instead
//! of round-tripping a 403.

use std::sync::Arc;

use reqwest::Method;

use super::transport::Transport;
use super::types::{Id, SortOrder, Task, TaskDraft, TaskFilter, TaskStatus, UserSummary};
use crate::error::AuthError;
use crate::state::session::SessionManager;

#[derive(Clone)]
pub struct TaskClient {
    transport: Arc<Transport>,
    session: Arc<SessionManager>,
}

impl TaskClient {
    #[must_use]
    pub fn new(transport: Arc<Transport>, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let bearer = self.session.bearer();
        self.transport.request(method, path, bearer.as_deref())
    }

    /// `GET /tasks`, optionally embedding the owning user.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn list(&self, expand_user: bool) -> Result<Vec<Task>, AuthError> {
        let mut request = self.request(Method::GET, "/tasks");
        if expand_user {
            request = request.query(&[("expand", "user")]);
        }
        self.transport.send_json(request).await
    }

    /// `GET /tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn get(&self, id: &Id) -> Result<Task, AuthError> {
        let request = self.request(Method::GET, &format!("/tasks/{id}"));
        self.transport.send_json(request).await
    }

    /// `POST /tasks`; the backend assigns `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, AuthError> {
        let request = self.request(Method::POST, "/tasks").json(draft);
        let task: Task = self.transport.send_json(request).await?;
        tracing::info!(task = %task.id, "task created");
        Ok(task)
    }

    /// `PUT /tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn update(&self, id: &Id, draft: &TaskDraft) -> Result<Task, AuthError> {
        let request = self.request(Method::PUT, &format!("/tasks/{id}")).json(draft);
        self.transport.send_json(request).await
    }

    /// `PUT /tasks/{id}/status`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn set_status(&self, id: &Id, status: TaskStatus) -> Result<Task, AuthError> {
        let request = self
            .request(Method::PUT, &format!("/tasks/{id}/status"))
            .json(&serde_json::json!({ "status": status }));
        self.transport.send_json(request).await
    }

    /// Flip `PENDING` and `COMPLETED`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn toggle_status(&self, task: &Task) -> Result<Task, AuthError> {
        self.set_status(&task.id, task.status.toggled()).await
    }

    /// `DELETE /tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn delete(&self, id: &Id) -> Result<(), AuthError> {
        let request = self.request(Method::DELETE, &format!("/tasks/{id}"));
        self.transport.send_empty(request).await?;
        tracing::info!(task = %id, "task deleted");
        Ok(())
    }

    /// `GET /tasks/filter`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn filter(&self, filter: &TaskFilter) -> Result<Vec<Task>, AuthError> {
        let request = self.request(Method::GET, "/tasks/filter").query(filter);
        self.transport.send_json(request).await
    }

    /// `GET /tasks/sort` by due date.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn sorted(&self, order: SortOrder) -> Result<Vec<Task>, AuthError> {
        let request = self.request(Method::GET, "/tasks/sort").query(&[("order", order)]);
        self.transport.send_json(request).await
    }

    /// Admin view of the API.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] unless the current session is admin.
    pub fn admin(&self) -> Result<AdminClient, AuthError> {
        if !self.session.is_admin() {
            return Err(AuthError::Forbidden { message: "Administrator access required".to_owned() });
        }
        Ok(AdminClient { inner: self.clone() })
    }
}

/// Admin-only endpoints. Obtain through [`TaskClient::admin`].
#[derive(Clone)]
pub struct AdminClient {
    inner: TaskClient,
}

impl AdminClient {
    /// `GET /admin/tasks` across all users.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn tasks(&self) -> Result<Vec<Task>, AuthError> {
        let request = self.inner.request(Method::GET, "/admin/tasks");
        self.inner.transport.send_json(request).await
    }

    /// `DELETE /admin/tasks/{id}`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn delete_task(&self, id: &Id) -> Result<(), AuthError> {
        let request = self.inner.request(Method::DELETE, &format!("/admin/tasks/{id}"));
        self.inner.transport.send_empty(request).await
    }

    /// `PUT /admin/tasks/{id}/reassign`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn reassign_task(&self, id: &Id, user_id: &Id) -> Result<Task, AuthError> {
        let request = self
            .inner
            .request(Method::PUT, &format!("/admin/tasks/{id}/reassign"))
            .json(&serde_json::json!({ "userId": user_id }));
        self.inner.transport.send_json(request).await
    }

    /// `GET /admin/users`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn users(&self) -> Result<Vec<UserSummary>, AuthError> {
        let request = self.inner.request(Method::GET, "/admin/users");
        self.inner.transport.send_json(request).await
    }

    /// `DELETE /admin/users/{id}`
    ///
    /// # Errors
    ///
    /// Returns the normalized backend or transport error.
    pub async fn delete_user(&self, id: &Id) -> Result<(), AuthError> {
        let request = self.inner.request(Method::DELETE, &format!("/admin/users/{id}"));
        self.inner.transport.send_empty(request).await?;
        tracing::info!(user = %id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tasks_test.rs"]
mod tests;
