use std::sync::{Arc, LazyLock};

use regex::Regex;
use runbook_config::AgentConfig;
use runbook_core::{ConversationHistory, Result, TaskDef};
use runbook_llm::{LlmProvider, LlmRequest};
use runbook_store::{TaskListing, TaskStore};
use tracing::{debug, info, warn};

static INTENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<intent>(.*?)</intent>").unwrap());

/// Marker the model uses when no stored task matches.
const NO_MATCH: &str = "NA";

/// Picks which stored task, if any, the latest user message is about.
pub struct IntentClassifier {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            provider,
            model: config.classifier_model().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Classify `text` in the context of `history`. The history is not
    /// modified. Returns `None` when the model answers `NA` or gives no tag.
    pub async fn classify(
        &self,
        text: &str,
        history: &ConversationHistory,
        store: &dyn TaskStore,
    ) -> Result<Option<String>> {
        let listing = store.list().await?;
        let options = intent_options(&listing);
        debug!(options = options.len(), "classifying intent");

        let mut messages = history.clone();
        messages.push_user_text(text);
        let request = LlmRequest::new(&self.model, messages.into_messages())
            .with_system(intent_prompt(&options))
            .with_limits(self.max_tokens, self.temperature);

        let response = self.provider.complete(&request).await?;
        let reply = response.message.text_content();
        let intent = parse_intent(&reply);
        info!(intent = intent.as_deref().unwrap_or(NO_MATCH), "classification result");
        Ok(intent)
    }
}

/// Tasks offered to the classifier, skipping unparseable documents.
fn intent_options(listing: &TaskListing) -> Vec<(String, TaskDef)> {
    let TaskListing::Tasks(entries) = listing else {
        return vec![];
    };
    entries
        .iter()
        .filter_map(|entry| match &entry.parsed {
            Ok(task) => Some((entry.name.clone(), task.clone())),
            Err(e) => {
                warn!(task = %entry.name, error = %e, "skipping unparseable task in classification");
                None
            }
        })
        .collect()
}

/// System prompt asking for the latest intent among `options`.
pub fn intent_prompt(options: &[(String, TaskDef)]) -> String {
    let mut intents = String::new();
    for (name, task) in options {
        intents.push_str(&format!("{name}: {}", task.goal));
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            intents.push_str(&format!(" ({description})"));
        }
        intents.push('\n');
    }
    format!(
        "
You are a devops assistant, given a convesation with a user, predict the latest intent of the user among the following options:
{intents}\n
Look at the last message in the context of the entire conversation to predict most recent intent.
First think step by step and output the intent between <intent> and </intent> tags.if no match output <intent>NA</intent>
"
    )
}

/// The first `<intent>...</intent>` value, or `None` for `NA`, an empty tag
/// or no tag at all.
pub fn parse_intent(reply: &str) -> Option<String> {
    let intent = INTENT_TAG.captures(reply)?.get(1)?.as_str().trim();
    if intent.is_empty() || intent == NO_MATCH {
        None
    } else {
        Some(intent.to_string())
    }
}
