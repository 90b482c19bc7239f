//! Base URL normalization used when joining a base URL with a path.

/// Remove at most one trailing `/` from `url`.
///
/// Single pass: `"http://x//"` becomes `"http://x/"`, not `"http://x"`.
pub fn normalize(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Join a base URL and a path that starts with `/`.
pub fn join(base: &str, path: &str) -> String {
    format!("{}{}", normalize(base), path)
}

/// A literal URL construction case.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub base: &'static str,
    pub path: &'static str,
    pub expected: &'static str,
}

/// Outcome of checking one [`Fixture`].
#[derive(Debug, Clone)]
pub struct FixtureResult {
    pub fixture: Fixture,
    pub actual: String,
}

impl FixtureResult {
    pub fn passed(&self) -> bool {
        self.actual == self.fixture.expected
    }
}

/// Frontend API base URLs as they appear in deployment settings.
pub const FIXTURES: &[Fixture] = &[
    Fixture {
        base: "http://localhost:5000",
        path: "/api/email/test",
        expected: "http://localhost:5000/api/email/test",
    },
    Fixture {
        base: "http://localhost:5000/",
        path: "/api/email/test",
        expected: "http://localhost:5000/api/email/test",
    },
    Fixture {
        base: "https://x.com/",
        path: "/api/health",
        expected: "https://x.com/api/health",
    },
    Fixture {
        base: "https://recruit-api.onrender.com/",
        path: "/api/email/send-candidate-session",
        expected: "https://recruit-api.onrender.com/api/email/send-candidate-session",
    },
    Fixture {
        base: "https://recruit-api.onrender.com",
        path: "/api/email/send-candidate-session",
        expected: "https://recruit-api.onrender.com/api/email/send-candidate-session",
    },
];

/// Run every entry of [`FIXTURES`].
pub fn check_fixtures() -> Vec<FixtureResult> {
    FIXTURES
        .iter()
        .map(|fixture| FixtureResult {
            fixture: *fixture,
            actual: join(fixture.base, fixture.path),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_single_trailing_slash() {
        assert_eq!(normalize("https://x.com/"), "https://x.com");
        assert_eq!(
            format!("{}{}", normalize("https://x.com/"), "/api/health"),
            "https://x.com/api/health"
        );
    }

    #[test]
    fn test_normalize_leaves_clean_url_untouched() {
        assert_eq!(normalize("http://localhost:5000"), "http://localhost:5000");
    }

    #[test]
    fn test_normalize_is_single_pass() {
        assert_eq!(normalize("http://x.com//"), "http://x.com/");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_all_fixtures_pass() {
        let results = check_fixtures();
        assert_eq!(results.len(), FIXTURES.len());
        for r in &results {
            assert!(r.passed(), "{} + {} gave {}", r.fixture.base, r.fixture.path, r.actual);
        }
    }

    proptest! {
        #[test]
        fn prop_one_trailing_slash_removed(host in "[a-z]{1,12}\\.[a-z]{2,4}") {
            let base = format!("https://{host}");
            let with_slash = format!("{base}/");
            prop_assert_eq!(normalize(&with_slash), base.as_str());
            prop_assert_eq!(join(&with_slash, "/api/health"), format!("{base}/api/health"));
        }

        #[test]
        fn prop_no_trailing_slash_is_identity(s in ".*[^/]") {
            prop_assert_eq!(normalize(&s), s.as_str());
        }

        #[test]
        fn prop_never_removes_more_than_one_char(s in ".*") {
            let out = normalize(&s);
            prop_assert!(s.len() - out.len() <= 1);
            prop_assert!(s.starts_with(out));
        }
    }
}
