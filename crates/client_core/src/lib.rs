use std::sync::{Arc, Weak};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{Location, LocationId, User, UserId},
    protocol::{
        allowed_user_resource, open_access_resource, CreateLocationRequest, CreateUserRequest,
        HttpMethod, LocationsResponse, UsersResponse, LOCATIONS_COLLECTION, USERS_COLLECTION,
    },
    util::{find_only, remove_from_array},
    validation::{is_canonical_path, normalize_email},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod access;
pub mod callback_chain;
pub mod http_executor;

pub use callback_chain::{build_callbacks_chain, CallbackChain, ChainOutcome, Proceed, Step};
pub use http_executor::HttpRequestExecutor;

/// Issues a single request against the admin API.
///
/// `resource` is either a collection path relative to the admin root or an
/// entity's self-link. `params` carries the JSON body of creation requests.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, method: HttpMethod, resource: &str, params: Option<Value>)
        -> Result<Value>;
}

pub struct MissingRequestExecutor;

#[async_trait]
impl RequestExecutor for MissingRequestExecutor {
    async fn execute(
        &self,
        method: HttpMethod,
        resource: &str,
        _params: Option<Value>,
    ) -> Result<Value> {
        Err(anyhow!("no request executor configured for {method} {resource}"))
    }
}

/// Told after every successful change of the cached model.
pub trait RefreshNotifier: Send + Sync {
    fn refresh(&self);
}

pub struct NoopRefresh;

impl RefreshNotifier for NoopRefresh {
    fn refresh(&self) {}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("{kind} {id} has no self link")]
    MissingSelfLink { kind: &'static str, id: String },
    #[error("location {0} is not cached")]
    UnknownLocation(LocationId),
    #[error("invalid email format: {0}")]
    InvalidEmail(String),
    #[error("path should be absolute and normalized, without fragment, query or parameters: {0}")]
    InvalidPath(String),
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub locations: Vec<Location>,
    pub users: Vec<User>,
}

#[derive(Default)]
struct ControllerState {
    locations: Vec<Location>,
    users: Vec<User>,
}

/// Client-side cache of locations and users kept in step with the admin API.
///
/// Local state changes only after the server confirmed the matching request,
/// and every change is followed by a [`RefreshNotifier::refresh`] call.
pub struct Controller {
    executor: Arc<dyn RequestExecutor>,
    refresh: Arc<dyn RefreshNotifier>,
    inner: Mutex<ControllerState>,
}

fn location_self_link(location: &Location) -> Result<String, ControllerError> {
    location
        .self_link
        .clone()
        .ok_or_else(|| ControllerError::MissingSelfLink {
            kind: "location",
            id: location.id.to_string(),
        })
}

fn user_self_link(user: &User) -> Result<String, ControllerError> {
    user.self_link
        .clone()
        .ok_or_else(|| ControllerError::MissingSelfLink {
            kind: "user",
            id: user.id.to_string(),
        })
}

fn remove_allowed(location: &mut Location, user_id: &UserId) -> bool {
    let granted = find_only(&location.allowed_users, |allowed| &allowed.id == user_id).cloned();
    remove_from_array(granted.as_ref(), &mut location.allowed_users)
}

impl Controller {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Arc<Self> {
        let refresh: Arc<dyn RefreshNotifier> = Arc::new(NoopRefresh);
        Self::new_with_ui(executor, move |_| refresh)
    }

    /// Builds the controller and its UI in one go. `ui` gets a weak handle to
    /// the controller under construction and returns the refresh target.
    pub fn new_with_ui<F>(executor: Arc<dyn RequestExecutor>, ui: F) -> Arc<Self>
    where
        F: FnOnce(Weak<Controller>) -> Arc<dyn RefreshNotifier>,
    {
        Arc::new_cyclic(|controller| Self {
            executor,
            refresh: ui(controller.clone()),
            inner: Mutex::new(ControllerState::default()),
        })
    }

    pub async fn locations(&self) -> Vec<Location> {
        self.inner.lock().await.locations.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.inner.lock().await.users.clone()
    }

    /// Non-blocking view of the cache for renderers running inside
    /// [`RefreshNotifier::refresh`]. `None` while an operation holds the cache.
    pub fn try_snapshot(&self) -> Option<ControllerSnapshot> {
        let guard = self.inner.try_lock().ok()?;
        Some(ControllerSnapshot {
            locations: guard.locations.clone(),
            users: guard.users.clone(),
        })
    }

    pub async fn find_user_with_email(&self, email: &str) -> Option<User> {
        let guard = self.inner.lock().await;
        find_only(&guard.users, |user| user.email == email).cloned()
    }

    /// Cached user whose email equals the normalized `email` ignoring case.
    async fn cached_user_for_email(&self, email: &str) -> Option<User> {
        let guard = self.inner.lock().await;
        find_only(&guard.users, |user| user.email.trim().eq_ignore_ascii_case(email)).cloned()
    }

    pub async fn find_location_with_id(&self, id: &LocationId) -> Option<Location> {
        let guard = self.inner.lock().await;
        find_only(&guard.locations, |location| &location.id == id).cloned()
    }

    pub async fn find_location_with_path(&self, path: &str) -> Option<Location> {
        let guard = self.inner.lock().await;
        find_only(&guard.locations, |location| location.path == path).cloned()
    }

    pub fn can_access(&self, user: &User, location: &Location) -> bool {
        access::can_access(user, location)
    }

    pub async fn accessible_locations(&self, user: &User) -> Vec<Location> {
        let guard = self.inner.lock().await;
        access::accessible_locations(user, &guard.locations)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn can_access_path(&self, user: &User, path: &str) -> bool {
        let guard = self.inner.lock().await;
        access::can_access_path(user, &guard.locations, path)
    }

    async fn cached_location(&self, id: &LocationId) -> Result<Location, ControllerError> {
        self.find_location_with_id(id)
            .await
            .ok_or_else(|| ControllerError::UnknownLocation(id.clone()))
    }

    /// Loads locations, then users, and refreshes once both are cached.
    pub async fn activate(&self) -> Result<()> {
        let outcome = CallbackChain::new()
            .then(|(), proceed: Proceed<()>| async move {
                self.get_locations().await?;
                proceed.proceed(());
                Ok::<(), anyhow::Error>(())
            })
            .then(|(), _proceed: Proceed<()>| async move {
                self.get_users().await?;
                Ok::<(), anyhow::Error>(())
            })
            .run(())
            .await?;
        if outcome == ChainOutcome::Completed {
            self.refresh.refresh();
        }
        Ok(())
    }

    pub async fn get_locations(&self) -> Result<()> {
        let result = self
            .executor
            .execute(HttpMethod::Get, LOCATIONS_COLLECTION, None)
            .await?;
        let response: LocationsResponse =
            serde_json::from_value(result).context("malformed locations collection")?;
        info!(count = response.locations.len(), "controller: locations loaded");
        self.inner.lock().await.locations = response.locations;
        Ok(())
    }

    /// Creates a location unless one with the same path is already cached.
    pub async fn add_location(&self, path: &str) -> Result<()> {
        let path = path.trim();
        if !is_canonical_path(path) {
            return Err(ControllerError::InvalidPath(path.to_string()).into());
        }
        if self.find_location_with_path(path).await.is_some() {
            debug!(path, "controller: location already cached, skipping creation");
            return Ok(());
        }

        let params = serde_json::to_value(CreateLocationRequest {
            path: path.to_string(),
        })?;
        let result = self
            .executor
            .execute(HttpMethod::Post, LOCATIONS_COLLECTION, Some(params))
            .await?;
        let location: Location =
            serde_json::from_value(result).context("malformed created location")?;
        info!(path, location_id = %location.id, "controller: location added");

        self.inner.lock().await.locations.push(location);
        self.refresh.refresh();
        Ok(())
    }

    pub async fn remove_location(&self, location: &Location) -> Result<()> {
        let self_link = location_self_link(location)?;
        self.executor
            .execute(HttpMethod::Delete, &self_link, None)
            .await?;

        {
            let mut guard = self.inner.lock().await;
            let cached = find_only(&guard.locations, |c| c.id == location.id).cloned();
            remove_from_array(cached.as_ref(), &mut guard.locations);
        }
        info!(location_id = %location.id, path = %location.path, "controller: location removed");
        self.refresh.refresh();
        Ok(())
    }

    pub async fn get_users(&self) -> Result<()> {
        let result = self
            .executor
            .execute(HttpMethod::Get, USERS_COLLECTION, None)
            .await?;
        let response: UsersResponse =
            serde_json::from_value(result).context("malformed users collection")?;
        info!(count = response.users.len(), "controller: users loaded");
        self.inner.lock().await.users = response.users;
        Ok(())
    }

    /// Creates a user and returns it as confirmed by the server.
    pub async fn add_user(&self, email: &str) -> Result<User> {
        let email =
            normalize_email(email).ok_or_else(|| ControllerError::InvalidEmail(email.to_string()))?;
        self.create_user(&email).await
    }

    async fn create_user(&self, email: &str) -> Result<User> {
        let params = serde_json::to_value(CreateUserRequest {
            email: email.to_string(),
        })?;
        let result = self
            .executor
            .execute(HttpMethod::Post, USERS_COLLECTION, Some(params))
            .await?;
        let user: User = serde_json::from_value(result).context("malformed created user")?;
        info!(email, user_id = %user.id, "controller: user added");

        self.inner.lock().await.users.push(user.clone());
        self.refresh.refresh();
        Ok(user)
    }

    /// Deletes the user and drops every access grant it held.
    pub async fn remove_user(&self, user: &User) -> Result<()> {
        let self_link = user_self_link(user)?;
        self.executor
            .execute(HttpMethod::Delete, &self_link, None)
            .await?;

        {
            let mut guard = self.inner.lock().await;
            let cached = find_only(&guard.users, |c| c.id == user.id).cloned();
            remove_from_array(cached.as_ref(), &mut guard.users);
            for location in guard.locations.iter_mut() {
                remove_allowed(location, &user.id);
            }
        }
        info!(email = %user.email, user_id = %user.id, "controller: user removed");
        self.refresh.refresh();
        Ok(())
    }

    /// Grants `email` access to `location`, creating the user first when no
    /// cached user has that email. Does nothing but refresh when access is
    /// already granted.
    pub async fn allow_access_by_user(&self, email: &str, location: &Location) -> Result<()> {
        let email =
            normalize_email(email).ok_or_else(|| ControllerError::InvalidEmail(email.to_string()))?;
        let location = self.cached_location(&location.id).await?;
        let existing = self.cached_user_for_email(&email).await;

        if let Some(user) = &existing {
            if access::can_access(user, &location) {
                debug!(email = %email, path = %location.path, "controller: access already granted");
                self.refresh.refresh();
                return Ok(());
            }
        }

        let self_link = location_self_link(&location)?;
        let location_id = location.id.clone();

        let outcome = CallbackChain::new()
            .then(
                |existing: Option<User>, proceed: Proceed<Option<User>>| async move {
                    let user = match existing {
                        Some(user) => user,
                        None => self.create_user(&email).await?,
                    };
                    proceed.proceed(Some(user));
                    Ok::<(), anyhow::Error>(())
                },
            )
            .then(
                |user: Option<User>, _proceed: Proceed<Option<User>>| async move {
                    let Some(user) = user else {
                        return Ok(());
                    };
                    self.executor
                        .execute(
                            HttpMethod::Put,
                            &allowed_user_resource(&self_link, &user),
                            None,
                        )
                        .await?;
                    self.record_grant(&location_id, user).await;
                    Ok::<(), anyhow::Error>(())
                },
            )
            .run(existing)
            .await?;

        if let ChainOutcome::Halted { step } = outcome {
            warn!(step, "controller: access grant did not complete");
        }
        Ok(())
    }

    async fn record_grant(&self, location_id: &LocationId, user: User) {
        {
            let mut guard = self.inner.lock().await;
            let Some(location) = guard
                .locations
                .iter_mut()
                .find(|location| &location.id == location_id)
            else {
                warn!(location_id = %location_id, "controller: granted location no longer cached");
                return;
            };
            if access::can_access(&user, location) {
                return;
            }
            info!(email = %user.email, path = %location.path, "controller: access granted");
            location.allowed_users.push(user);
        }
        self.refresh.refresh();
    }

    pub async fn revoke_access_by_user(&self, user: &User, location: &Location) -> Result<()> {
        let location = self.cached_location(&location.id).await?;
        let self_link = location_self_link(&location)?;
        self.executor
            .execute(
                HttpMethod::Delete,
                &allowed_user_resource(&self_link, user),
                None,
            )
            .await?;
        info!(email = %user.email, path = %location.path, "controller: access revoked");
        self.forget_grant(&location.id, &user.id).await;
        Ok(())
    }

    async fn forget_grant(&self, location_id: &LocationId, user_id: &UserId) {
        {
            let mut guard = self.inner.lock().await;
            let Some(location) = guard
                .locations
                .iter_mut()
                .find(|location| &location.id == location_id)
            else {
                warn!(location_id = %location_id, "controller: revoked location no longer cached");
                return;
            };
            remove_allowed(location, user_id);
        }
        self.refresh.refresh();
    }

    /// Drops `user` from the cached allow-list without contacting the server.
    pub async fn remove_allowed_user(&self, user: &User, location: &Location) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            let cached = guard
                .locations
                .iter_mut()
                .find(|cached| cached.id == location.id)
                .ok_or_else(|| ControllerError::UnknownLocation(location.id.clone()))?;
            remove_allowed(cached, &user.id);
        }
        self.refresh.refresh();
        Ok(())
    }

    pub async fn grant_open_access(&self, location: &Location) -> Result<()> {
        self.set_open_access(location, true).await
    }

    pub async fn revoke_open_access(&self, location: &Location) -> Result<()> {
        self.set_open_access(location, false).await
    }

    async fn set_open_access(&self, location: &Location, open: bool) -> Result<()> {
        let location = self.cached_location(&location.id).await?;
        if location.open_access == open {
            debug!(path = %location.path, open, "controller: open access unchanged");
            return Ok(());
        }

        let self_link = location_self_link(&location)?;
        let method = if open {
            HttpMethod::Put
        } else {
            HttpMethod::Delete
        };
        self.executor
            .execute(method, &open_access_resource(&self_link), None)
            .await?;

        {
            let mut guard = self.inner.lock().await;
            if let Some(cached) = guard
                .locations
                .iter_mut()
                .find(|cached| cached.id == location.id)
            {
                cached.open_access = open;
            }
        }
        info!(path = %location.path, open, "controller: open access updated");
        self.refresh.refresh();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
