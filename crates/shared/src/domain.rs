use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::urn_to_uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Bare UUID of the identifier, with any `urn:uuid:` prefix removed.
            pub fn uuid(&self) -> &str {
                urn_to_uuid(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(LocationId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            email: email.into(),
            self_link: None,
        }
    }

    pub fn with_self_link(mut self, self_link: impl Into<String>) -> Self {
        self.self_link = Some(self_link.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    pub path: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default)]
    pub open_access: bool,
    #[serde(default)]
    pub allowed_users: Vec<User>,
}

impl Location {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: LocationId(id.into()),
            path: path.into(),
            self_link: None,
            open_access: false,
            allowed_users: Vec::new(),
        }
    }

    pub fn with_self_link(mut self, self_link: impl Into<String>) -> Self {
        self.self_link = Some(self_link.into());
        self
    }

    pub fn with_allowed_users(mut self, allowed_users: Vec<User>) -> Self {
        self.allowed_users = allowed_users;
        self
    }
}
