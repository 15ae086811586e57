//! Small collection helpers shared by the controller and its callers.

use crate::domain::{Location, UserId};

const URN_UUID_PREFIX: &str = "urn:uuid:";

pub fn each<T>(items: &[T], f: impl FnMut(&T)) {
    items.iter().for_each(f);
}

/// Returns the first item matching `predicate`. Later matches are ignored.
pub fn find_only<T>(items: &[T], mut predicate: impl FnMut(&T) -> bool) -> Option<&T> {
    items.iter().find(|item| predicate(item))
}

pub fn in_array<T: PartialEq>(value: &T, items: &[T]) -> bool {
    items.iter().any(|item| item == value)
}

/// Removes the first item equal to `value`. `None` means "nothing to remove".
pub fn remove_from_array<T: PartialEq>(value: Option<&T>, items: &mut Vec<T>) -> bool {
    let Some(value) = value else {
        return false;
    };
    match items.iter().position(|item| item == value) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

pub fn urn_to_uuid(urn: &str) -> &str {
    urn.strip_prefix(URN_UUID_PREFIX).unwrap_or(urn)
}

pub fn extract_locations_paths(locations: &[Location]) -> Vec<&str> {
    locations
        .iter()
        .map(|location| location.path.as_str())
        .collect()
}

pub fn allowed_users_ids(location: &Location) -> Vec<&UserId> {
    location.allowed_users.iter().map(|user| &user.id).collect()
}
