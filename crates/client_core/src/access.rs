//! Pure access-control predicates over cached locations and users.

use shared::{
    domain::{Location, User},
    util::in_array,
};

/// True when `user` is on the location's allow-list, matched by email.
pub fn can_access(user: &User, location: &Location) -> bool {
    let emails: Vec<&str> = location
        .allowed_users
        .iter()
        .map(|allowed| allowed.email.as_str())
        .collect();
    in_array(&user.email.as_str(), &emails)
}

pub fn accessible_locations<'a>(user: &User, locations: &'a [Location]) -> Vec<&'a Location> {
    locations
        .iter()
        .filter(|location| can_access(user, location))
        .collect()
}

/// Finds the most specific location governing `path`.
///
/// A location matches when its path is a prefix of `path` that ends on a
/// segment boundary, so `/pub` governs `/pub` and `/pub/beer` but not
/// `/public`.
pub fn find_parent<'a>(locations: &'a [Location], path: &str) -> Option<&'a Location> {
    let mut best: Option<&Location> = None;
    for location in locations {
        let candidate = location.path.as_str();
        if !path.starts_with(candidate) {
            continue;
        }
        let boundary = if candidate.ends_with('/') {
            candidate.len() - 1
        } else {
            candidate.len()
        };
        let on_boundary =
            candidate.len() == path.len() || path.as_bytes().get(boundary) == Some(&b'/');
        if on_boundary && best.map_or(true, |current| candidate.len() > current.path.len()) {
            best = Some(location);
        }
    }
    best
}

/// Open locations admit everyone; otherwise the allow-list decides.
pub fn can_access_path(user: &User, locations: &[Location], path: &str) -> bool {
    match find_parent(locations, path) {
        Some(location) => location.open_access || can_access(user, location),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new("urn:uuid:a", "alice@example.com")
    }

    fn bob() -> User {
        User::new("urn:uuid:b", "bob@example.com")
    }

    #[test]
    fn can_access_matches_allowed_emails() {
        let location = Location::new("1", "/foo").with_allowed_users(vec![alice()]);
        assert!(can_access(&alice(), &location));
        assert!(!can_access(&bob(), &location));
        assert!(!can_access(&alice(), &Location::new("2", "/bar")));
    }

    #[test]
    fn can_access_ignores_ids_of_same_email() {
        let location = Location::new("1", "/foo").with_allowed_users(vec![alice()]);
        let stale = User::new("urn:uuid:other", "alice@example.com");
        assert!(can_access(&stale, &location));
    }

    #[test]
    fn accessible_locations_preserves_order() {
        let locations = vec![
            Location::new("1", "/a").with_allowed_users(vec![alice(), bob()]),
            Location::new("2", "/b").with_allowed_users(vec![bob()]),
            Location::new("3", "/c").with_allowed_users(vec![alice()]),
        ];
        let ids: Vec<&str> = accessible_locations(&alice(), &locations)
            .into_iter()
            .map(|location| location.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(accessible_locations(&User::new("x", "x@example.com"), &locations).is_empty());
    }

    #[test]
    fn find_parent_picks_most_specific_location() {
        let locations = vec![
            Location::new("root", "/"),
            Location::new("pub", "/pub"),
            Location::new("beer", "/pub/beer/"),
        ];

        let parent = |path: &str| find_parent(&locations, path).map(|l| l.id.as_str());
        assert_eq!(parent("/pub"), Some("pub"));
        assert_eq!(parent("/pub/wine"), Some("pub"));
        assert_eq!(parent("/pub/beer"), Some("pub"));
        assert_eq!(parent("/pub/beer/"), Some("beer"));
        assert_eq!(parent("/pub/beer/stout"), Some("beer"));
        assert_eq!(parent("/public"), Some("root"));
    }

    #[test]
    fn find_parent_without_match() {
        let locations = vec![Location::new("pub", "/pub")];
        assert!(find_parent(&locations, "/public").is_none());
        assert!(find_parent(&[], "/pub").is_none());
    }

    #[test]
    fn can_access_path_honors_open_access() {
        let mut open = Location::new("open", "/open");
        open.open_access = true;
        let locations = vec![
            open,
            Location::new("team", "/team").with_allowed_users(vec![alice()]),
        ];

        assert!(can_access_path(&bob(), &locations, "/open/index.html"));
        assert!(can_access_path(&alice(), &locations, "/team/doc"));
        assert!(!can_access_path(&bob(), &locations, "/team/doc"));
        assert!(!can_access_path(&alice(), &locations, "/elsewhere"));
    }
}
