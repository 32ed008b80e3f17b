use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One ranked chunk handed to the generator as grounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSource {
    pub document_id: String,
    pub chunk_id: String,
    pub score: f32,
    pub title: String,
    pub snippet: String,
}

impl MessageSource {
    pub fn new(
        document_id: impl Into<String>,
        chunk_id: impl Into<String>,
        score: f32,
        title: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            chunk_id: chunk_id.into(),
            score: clamp_score(score),
            title: title.into(),
            snippet: snippet.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.document_id.trim().is_empty() {
            return Err("Source document_id cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(format!("Source score {} is outside [0, 1]", self.score));
        }
        Ok(())
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// Highest score first, ties broken by ascending document_id, then chunk_id.
pub fn rank_sources(mut sources: Vec<MessageSource>) -> Vec<MessageSource> {
    for source in sources.iter_mut() {
        source.score = clamp_score(source.score);
    }

    sources.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    sources
}
