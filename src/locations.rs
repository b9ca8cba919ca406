//! Location normalization
//!
//! Reference locations in WSDL/XSD documents are relative to the file that
//! declares them. This module resolves a referenced location against the
//! referencing file's directory and removes `.`/`..` segments, so that the
//! same file reached through different reference chains gets one canonical
//! name inside the closure.

use url::Url;

/// Check whether a location is absolute (a URL with a scheme)
pub fn is_absolute(location: &str) -> bool {
    match Url::parse(location) {
        Ok(url) => url.scheme().len() > 1, // single letters are Windows drives
        Err(_) => location.starts_with('/'),
    }
}

/// Directory part of a location, without trailing separator
///
/// `"a/b/c.wsdl"` yields `"a/b"`; a bare file name yields `""`.
pub fn directory_of(location: &str) -> &str {
    match location.rfind('/') {
        Some(idx) => &location[..idx],
        None => "",
    }
}

/// Short file name of a location, used in provenance breadcrumbs
pub fn short_name(location: &str) -> &str {
    match location.rfind('/') {
        Some(idx) => &location[idx + 1..],
        None => location,
    }
}

/// Remove `.` and `..` segments from a path
pub fn squash_dots(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.last().map_or(true, |s| *s == "..") {
                    // nothing left to pop; keep the leading ..
                    segments.push("..");
                } else {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Resolve a referenced location against the referencing file's name
pub fn normalize(referencing_file: &str, reference: &str) -> String {
    if is_absolute(reference) {
        // URL parsing already removes dot segments from the path
        if let Ok(url) = Url::parse(reference) {
            return url.to_string();
        }
        return squash_dots(reference);
    }
    // A URL base needs URL joining; string joining would collapse the
    // empty segment after the scheme.
    if is_absolute(referencing_file) {
        if let Ok(base) = Url::parse(referencing_file) {
            if let Ok(joined) = base.join(reference) {
                return joined.to_string();
            }
        }
    }
    let dir = directory_of(referencing_file);
    if dir.is_empty() {
        squash_dots(reference)
    } else {
        squash_dots(&format!("{}/{}", dir, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_directory_of() {
        assert_eq!(directory_of("a/b/c.wsdl"), "a/b");
        assert_eq!(directory_of("c.wsdl"), "");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("a/b/c.wsdl"), "c.wsdl");
        assert_eq!(short_name("c.wsdl"), "c.wsdl");
    }

    #[test]
    fn test_squash_dots() {
        assert_eq!(squash_dots("a/./b/../c.xsd"), "a/c.xsd");
        assert_eq!(squash_dots("./x.xsd"), "x.xsd");
        assert_eq!(squash_dots("../x.xsd"), "../x.xsd");
        assert_eq!(squash_dots("/a/../b.xsd"), "/b.xsd");
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize("dir/svc.wsdl", "types.xsd"), "dir/types.xsd");
        assert_eq!(normalize("dir/svc.wsdl", "../common/t.xsd"), "common/t.xsd");
        assert_eq!(normalize("svc.wsdl", "t.xsd"), "t.xsd");
    }

    #[test]
    fn test_normalize_against_url_base() {
        assert_eq!(
            normalize("http://example.com/a/svc.wsdl", "types.xsd"),
            "http://example.com/a/types.xsd"
        );
        assert_eq!(
            normalize("http://example.com/a/svc.wsdl", "../common/t.xsd"),
            "http://example.com/common/t.xsd"
        );
    }

    #[test]
    fn test_normalize_absolute() {
        assert_eq!(
            normalize("dir/svc.wsdl", "http://example.com/a/../t.xsd"),
            "http://example.com/t.xsd"
        );
    }

    proptest! {
        #[test]
        fn squash_dots_is_idempotent(segs in proptest::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 0..8)) {
            let path = segs.join("/");
            let once = squash_dots(&path);
            prop_assert_eq!(squash_dots(&once), once.clone());
        }
    }
}
