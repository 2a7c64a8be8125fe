//! The fixed corpus ingested on every run
//!
//! Ids are stable so repeated runs replace records instead of adding new ones.

use domain_vector_search::Document;

pub fn documents() -> Vec<Document> {
    vec![
        Document::with_id("hello-world", "Hello World!")
            .with_metadata("sentiment", "positive")
            .with_metadata("source", "abc.txt"),
        Document::with_id(
            "einstein-goal",
            "If you want to live a happy life, tie it to a goal, not to people or things.",
        )
        .with_metadata("author", "A. Einstein"),
        Document::with_id("seneca-life", "Not how long, but how well you have lived is the main thing.")
            .with_metadata("author", "Seneca"),
    ]
}
