//! Attach assistant replies to their turn and keep session bookkeeping.

use std::sync::Arc;

use crate::chat::episodic::EpisodicStore;
use crate::chat::locks::UserLocks;
use crate::chat::naming::generate_title;
use crate::chat::sessions::SessionStore;
use crate::chat::ChatContext;
use crate::config::ChatSettings;
use crate::error::ConfabResult;
use crate::traits::Llm;
use crate::types::now_ts;

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// New title, when the chat was auto-named.
    pub renamed: Option<String>,
    /// Id of the episodic record that received the reply.
    pub completed_turn: Option<String>,
    /// Whether `last_update` was written.
    pub touched: bool,
}

#[derive(Clone)]
pub struct TurnReconciler {
    sessions: SessionStore,
    episodic: EpisodicStore,
    llm: Arc<dyn Llm>,
    locks: Arc<UserLocks>,
    settings: Arc<ChatSettings>,
}

impl TurnReconciler {
    pub fn new(
        sessions: SessionStore,
        episodic: EpisodicStore,
        llm: Arc<dyn Llm>,
        locks: Arc<UserLocks>,
        settings: Arc<ChatSettings>,
    ) -> Self {
        Self {
            sessions,
            episodic,
            llm,
            locks,
            settings,
        }
    }

    /// Run after the assistant produced `reply` for the context's turn.
    ///
    /// Never fails: every step is logged and skipped on error.
    pub async fn reconcile(&self, ctx: &ChatContext, reply: &str) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let Some(chat_id) = ctx.chat_id.as_deref() else {
            tracing::warn!(user_id = %ctx.user_id, "Reply has no chat to attach to");
            return outcome;
        };

        match self.auto_name(ctx, chat_id, reply).await {
            Ok(renamed) => outcome.renamed = renamed,
            Err(e) => tracing::error!(chat_id, error = %e, "Error during chat auto-naming"),
        }

        match self.complete_turn(ctx, chat_id, reply).await {
            Ok(completed) => outcome.completed_turn = completed,
            Err(e) => tracing::error!(chat_id, error = %e, "Failed to attach reply to episodic record"),
        }

        match self.touch(&ctx.user_id, chat_id).await {
            Ok(touched) => outcome.touched = touched,
            Err(e) => tracing::error!(chat_id, error = %e, "Failed to update chat last_update"),
        }

        outcome
    }

    async fn auto_name(
        &self,
        ctx: &ChatContext,
        chat_id: &str,
        reply: &str,
    ) -> ConfabResult<Option<String>> {
        let default_name = self.settings.default_chat_name.as_str();
        let still_default = matches!(
            self.sessions.get(chat_id).await?,
            Some(session) if session.name() == default_name
        );
        if !still_default {
            return Ok(None);
        }

        // The LLM call runs outside the user's lock.
        let Some(title) = generate_title(
            self.llm.as_ref(),
            &ctx.user_text,
            reply,
            self.settings.title_timeout_secs,
        )
        .await?
        else {
            tracing::debug!(chat_id, "LLM returned an empty title");
            return Ok(None);
        };

        let _guard = self.locks.acquire(&ctx.user_id).await;
        let Some(mut session) = self.sessions.get(chat_id).await? else {
            return Ok(None);
        };
        if session.name() != default_name {
            return Ok(None);
        }
        session.set_name(title.clone());
        self.sessions.overwrite(&session).await?;
        tracing::info!(chat_id, title = %title, "Chat auto-named");
        Ok(Some(title))
    }

    async fn complete_turn(
        &self,
        ctx: &ChatContext,
        chat_id: &str,
        reply: &str,
    ) -> ConfabResult<Option<String>> {
        let Some(mut record) = self
            .episodic
            .find_turn(&ctx.user_id, chat_id, &ctx.user_text)
            .await?
        else {
            tracing::warn!(chat_id, "No episodic record matches the turn, dropping reply");
            return Ok(None);
        };
        self.episodic.complete(&mut record, reply).await?;
        Ok(Some(record.id))
    }

    async fn touch(&self, user_id: &str, chat_id: &str) -> ConfabResult<bool> {
        let _guard = self.locks.acquire(user_id).await;
        let Some(mut session) = self.sessions.get(chat_id).await? else {
            tracing::warn!(chat_id, "Chat vanished before last_update could be written");
            return Ok(false);
        };
        session.set_last_update(now_ts());
        self.sessions.overwrite(&session).await?;
        Ok(true)
    }
}
