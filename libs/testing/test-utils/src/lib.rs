//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestOpenSearch`: OpenSearch container with the k-NN plugin (feature: "opensearch")
//! - `TestQdrant`: Qdrant container (feature: "qdrant")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `opensearch`: Enables OpenSearch test infrastructure
//! - `qdrant`: Enables Qdrant test infrastructure
//! - `all`: Enables every backend
//!
//! # Usage
//!
//! Add the backend features to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["opensearch"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestOpenSearch};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_opensearch_test() {
//!     let opensearch = TestOpenSearch::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_opensearch_test");
//!
//!     let index = builder.index_name("main");
//!     let url = opensearch.url();
//! }
//! ```

#[cfg(feature = "opensearch")]
mod opensearch;

#[cfg(feature = "qdrant")]
mod qdrant;

#[cfg(feature = "opensearch")]
pub use opensearch::TestOpenSearch;

#[cfg(feature = "qdrant")]
pub use qdrant::TestQdrant;

const WORDS: &[&str] = &[
    "river", "lantern", "harbor", "meadow", "copper", "falcon", "orchard", "glacier", "violet",
    "compass", "thunder", "velvet", "canyon", "ember", "willow", "quartz", "saddle", "marble",
    "tundra", "beacon", "cobalt", "juniper", "pepper", "sonnet",
];

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by deriving every value from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_ingest_batches");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Index name that is unique per test and valid for OpenSearch (lowercase)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.index_name("main");
    /// assert!(name.starts_with("test-"));
    /// assert_eq!(name, name.to_lowercase());
    /// ```
    pub fn index_name(&self, suffix: &str) -> String {
        format!("test-{}-{}", self.seed, suffix.to_lowercase())
    }

    /// Document id unique within the test
    pub fn document_id(&self, n: usize) -> String {
        format!("doc-{}-{}", self.seed % 100_000, n)
    }

    /// Sentence `n` of the test corpus; distinct `n` give distinct word sets
    pub fn text(&self, n: usize) -> String {
        let offset = (self.seed % WORDS.len() as u64) as usize;
        let pick = |i: usize| WORDS[(offset + i) % WORDS.len()];
        format!(
            "{} {} {} number {}",
            pick(n),
            pick(n * 7 + 3),
            pick(n * 13 + 5),
            n
        )
    }

    /// `count` `(id, text)` pairs
    pub fn corpus(&self, count: usize) -> Vec<(String, String)> {
        (0..count)
            .map(|n| (self.document_id(n), self.text(n)))
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that two scores are equal within `epsilon`
    pub fn assert_close(actual: f32, expected: f32, epsilon: f32, context: &str) {
        assert!(
            (actual - expected).abs() <= epsilon,
            "{}: expected {} ± {}, got {}",
            context,
            expected,
            epsilon,
            actual
        );
    }

    /// Assert that scores never increase along the slice
    pub fn assert_descending(scores: &[f32], context: &str) {
        for pair in scores.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: scores not descending: {:?}",
                context,
                scores
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}
