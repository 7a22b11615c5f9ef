//! Common types for LLM interactions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Intent tag for turns that request no side effect
pub const GENERAL_QUERY: &str = "general_query";

/// Sampling options for a generation request
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl GenerationOptions {
    /// Low-temperature settings for classification and extraction
    pub fn precise() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: Some(1000),
        }
    }
}

/// Classifier output for one turn.
///
/// `subtasks` is non-empty only for composite turns that the analysis broke
/// into an ordered sequence of independent sub-requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
}

/// One sub-request of a composite turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub intent: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Classification {
    /// The no-op classification every failure path degrades to
    pub fn general_query() -> Self {
        Self {
            intent: GENERAL_QUERY.to_string(),
            parameters: Map::new(),
            subtasks: Vec::new(),
        }
    }

    #[allow(dead_code)] // Utility method
    pub fn is_composite(&self) -> bool {
        self.subtasks.len() > 1
    }
}
