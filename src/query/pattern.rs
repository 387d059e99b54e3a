//! Glob-lite name patterns.

/// Case-insensitive pattern where `*` matches any run of characters.
///
/// The pattern is split on `*` and every non-empty segment must occur in the
/// candidate, in order and without overlapping. Matching is not anchored, so
/// `Test*` also matches `MyTestCase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    segments: Vec<String>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            segments: pattern
                .split('*')
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }

    /// True for patterns that match every name (`""`, `*`, `**`).
    pub fn is_wildcard(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        let mut rest = candidate.as_str();
        for segment in &self.segments {
            match rest.find(segment.as_str()) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
        true
    }
}

impl From<&str> for NamePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_pattern() {
        let pattern = NamePattern::new("Test*");
        assert!(pattern.matches("TestClass"));
        assert!(pattern.matches("testservice"));
        assert!(!pattern.matches("Other"));
    }

    #[test]
    fn test_segments_in_order() {
        let pattern = NamePattern::new("Get*Async");
        assert!(pattern.matches("GetUserAsync"));
        assert!(pattern.matches("GETASYNC"));
        assert!(!pattern.matches("AsyncGet"));
        assert!(!NamePattern::new("abab").matches("ab"));
    }

    #[test]
    fn test_wildcard_and_plain() {
        assert!(NamePattern::new("*").is_wildcard());
        assert!(NamePattern::new("").matches("anything"));
        assert!(NamePattern::new("Service").matches("OrderServiceImpl"));
        assert!(!NamePattern::new("Service").is_wildcard());
    }
}
