//! Assistant bridge: dashboard context plus a question in, prose out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use supernova_core::{Metric, User, UserRole};
use tracing::instrument;

use crate::gemini::{Prompt, TextGenerator};

/// Answer returned whenever the generator fails.
pub const FALLBACK_ANSWER: &str =
    "I'm sorry, I couldn't process that request right now. Please check system logs.";

const SYSTEM_INSTRUCTION: &str = "You are an expert systems administrator and data analyst. Provide concise, professional, and actionable insights based on the provided dashboard context. Do not use markdown headers; use bullet points or plain text.";

const TEMPERATURE: f32 = 0.7;

/// How many records are included as samples.
pub const SAMPLE_SIZE: usize = 5;

/// Opening line of a new conversation.
#[must_use]
pub fn greeting(user_count: usize) -> String {
    format!(
        "Hello! I have access to your live database of {user_count} users. How can I assist you today?"
    )
}

/// Context snapshot sent with every question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub system_stats: Vec<Metric>,
    pub total_records: usize,
    pub sample_data: Vec<UserSample>,
}

/// A trimmed-down user record.
#[derive(Debug, Clone, Serialize)]
pub struct UserSample {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    pub created: DateTime<Utc>,
}

impl AssistantContext {
    /// Build the context from the dashboard metrics and the collection.
    #[must_use]
    pub fn new(metrics: &[Metric], users: &[User]) -> Self {
        Self {
            system_stats: metrics.to_vec(),
            total_records: users.len(),
            sample_data: users
                .iter()
                .take(SAMPLE_SIZE)
                .map(|user| UserSample {
                    name: user.name.clone(),
                    role: user.role,
                    created: user.created_at,
                })
                .collect(),
        }
    }
}

/// Forwards operator questions to a [`TextGenerator`].
pub struct AssistantBridge<G> {
    generator: G,
}

impl<G: TextGenerator> AssistantBridge<G> {
    pub const fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Ask a question about the dashboard.
    ///
    /// Never fails: any generator error is logged and answered with
    /// [`FALLBACK_ANSWER`].
    #[instrument(skip(self, question, context), fields(question_len = question.len(), total_records = context.total_records))]
    pub async fn ask(&self, question: &str, context: &AssistantContext) -> String {
        let context_json = match serde_json::to_string(context) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode assistant context");
                return FALLBACK_ANSWER.to_string();
            }
        };

        let prompt = Prompt {
            text: format!(
                "You are a SuperAdmin Intelligence Assistant. Context: {context_json}. Question: {question}"
            ),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            temperature: TEMPERATURE,
        };

        match self.generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Assistant request failed");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}
