use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Location, User};

pub const LOCATIONS_COLLECTION: &str = "api/locations/";
pub const USERS_COLLECTION: &str = "api/users/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLocationRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationsResponse {
    #[serde(default)]
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}

/// Resource granting or revoking a user's access to a location.
pub fn allowed_user_resource(location_self: &str, user: &User) -> String {
    format!("{location_self}allowed-users/{}/", user.id.uuid())
}

/// Resource toggling unauthenticated access to a location.
pub fn open_access_resource(location_self: &str) -> String {
    format!("{location_self}open-access/")
}
