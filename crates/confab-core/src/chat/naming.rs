//! Chat title generation.

use std::time::Duration;

use crate::error::{ConfabError, ConfabResult};
use crate::traits::{GenerationOptions, Llm};
use crate::types::Message;

/// Prompt asking for a short title of the first exchange.
pub fn title_prompt(user_text: &str, reply: &str) -> String {
    format!(
        "Summarize the following conversation with a short, descriptive title of 5 words or less.\n\
         Respond only with the title, without any introductory text, explanation, or quotes.\n\
         \n\
         Conversation:\n\
         - User: \"{}\"\n\
         - Bot: \"{}\"",
        user_text, reply
    )
}

/// Strip whitespace and surrounding quotes; `None` when nothing is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let title = raw.trim().trim_matches('"').trim_matches('\'').trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Ask the LLM for a title, bounded by `timeout_secs`.
pub async fn generate_title(
    llm: &dyn Llm,
    user_text: &str,
    reply: &str,
    timeout_secs: u64,
) -> ConfabResult<Option<String>> {
    let messages = [Message::user(title_prompt(user_text, reply))];
    let options = GenerationOptions {
        max_tokens: Some(32),
        ..Default::default()
    };

    let response = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        llm.generate(&messages, Some(options)),
    )
    .await
    .map_err(|_| ConfabError::timeout("chat title generation", timeout_secs))??;

    Ok(clean_title(&response.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  \"Rust Lifetimes\"\n").as_deref(), Some("Rust Lifetimes"));
        assert_eq!(clean_title("'Trip to Rome'").as_deref(), Some("Trip to Rome"));
        assert_eq!(clean_title(" \"\" "), None);
        assert_eq!(clean_title(""), None);
    }

    #[test]
    fn test_prompt_mentions_both_sides() {
        let prompt = title_prompt("how do I sort?", "use sort_by");
        assert!(prompt.contains("- User: \"how do I sort?\""));
        assert!(prompt.contains("- Bot: \"use sort_by\""));
        assert!(prompt.contains("5 words or less"));
    }
}
