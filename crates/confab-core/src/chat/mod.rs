//! Multi-chat sessions over vector memory.
//!
//! A user keeps several persisted chat threads. Every turn is bound to a
//! chat id ([`resolver`]), recorded in the episodic collection
//! ([`episodic`]) and completed with the assistant reply ([`reconciler`]).
//! [`history`] rebuilds a thread from the store and [`manager`] exposes the
//! explicit create/rename/delete/list/export operations.

mod context;
pub mod episodic;
pub mod history;
pub mod locks;
pub mod manager;
pub mod naming;
pub mod reconciler;
pub mod resolver;
pub mod sessions;

pub use context::ChatContext;
pub use episodic::EpisodicStore;
pub use history::HistoryReconstructor;
pub use locks::UserLocks;
pub use manager::{CreateChatRequest, SessionManager};
pub use reconciler::{ReconcileOutcome, TurnReconciler};
pub use resolver::SessionResolver;
pub use sessions::SessionStore;

use std::sync::Arc;

use crate::config::ChatSettings;
use crate::error::ConfabResult;
use crate::traits::{Embedder, Llm, VectorStore};
use crate::types::{ChatExport, ChatSession, EpisodicRecord, MemoryPoint, Message, PointList};

/// Result of a full conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub chat_id: Option<String>,
    pub outcome: ReconcileOutcome,
}

/// Entry point wiring the chat components to their collaborators.
pub struct MultiChat {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn Llm>,
    sessions: SessionStore,
    episodic: EpisodicStore,
    resolver: SessionResolver,
    reconciler: TurnReconciler,
    manager: SessionManager,
}

impl MultiChat {
    /// Build the chat layer. Fails on invalid settings.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
        settings: ChatSettings,
    ) -> ConfabResult<Self> {
        settings.validate()?;
        let settings = Arc::new(settings);
        let locks = Arc::new(UserLocks::new(settings.serialize_session_mutations));

        let sessions = SessionStore::new(store.clone(), embedder.clone(), settings.clone());
        let episodic = EpisodicStore::new(store.clone(), embedder, settings.clone());
        let history = HistoryReconstructor::new(store.clone(), settings.clone());

        Ok(Self {
            resolver: SessionResolver::new(sessions.clone(), locks.clone(), settings.clone()),
            reconciler: TurnReconciler::new(
                sessions.clone(),
                episodic.clone(),
                llm.clone(),
                locks.clone(),
                settings.clone(),
            ),
            manager: SessionManager::new(
                store.clone(),
                sessions.clone(),
                episodic.clone(),
                history,
                locks,
                settings,
            ),
            store,
            llm,
            sessions,
            episodic,
        })
    }

    /// Create the sessions and episodic collections if missing.
    pub async fn bootstrap(&self) -> ConfabResult<()> {
        self.sessions.ensure_collection().await?;
        self.episodic.ensure_collection().await
    }

    /// Whether both collections exist in the store.
    pub async fn collections_ready(&self) -> ConfabResult<bool> {
        Ok(self.store.collection_exists(self.sessions.collection()).await?
            && self.store.collection_exists(self.episodic.collection()).await?)
    }

    /// Bind the context to a chat when it carries none.
    pub async fn resolve(&self, ctx: &mut ChatContext) -> Option<String> {
        self.resolver.resolve(ctx).await
    }

    /// Store the context's user message as an open episodic turn.
    pub async fn record_user_turn(&self, ctx: &ChatContext) -> ConfabResult<EpisodicRecord> {
        self.episodic.record_user_turn(ctx).await
    }

    /// Attach `reply` to the context's turn and update the chat.
    pub async fn reconcile(&self, ctx: &ChatContext, reply: &str) -> ReconcileOutcome {
        self.reconciler.reconcile(ctx, reply).await
    }

    /// Run a whole turn: resolve, record, ask the LLM, reconcile.
    ///
    /// The working history gains the user message and the reply.
    pub async fn respond(&self, ctx: &mut ChatContext) -> ConfabResult<TurnReply> {
        self.resolve(ctx).await;
        if ctx.chat_id.is_some() {
            if let Err(e) = self.record_user_turn(ctx).await {
                tracing::error!(user_id = %ctx.user_id, error = %e, "Failed to record user turn");
            }
        }

        let mut prompt: Vec<Message> = ctx.history.clone();
        prompt.push(Message::user(ctx.user_text.clone()).with_name(ctx.user_id.clone()));
        let response = self.llm.generate(&prompt, None).await?;
        let text = response.content;

        let user_text = ctx.user_text.clone();
        ctx.push_user(user_text);
        ctx.push_assistant(text.clone());

        let outcome = self.reconcile(ctx, &text).await;
        Ok(TurnReply {
            text,
            chat_id: ctx.chat_id.clone(),
            outcome,
        })
    }

    /// Create a chat, enforcing the per-user cap.
    pub async fn create_chat(
        &self,
        user_id: &str,
        request: CreateChatRequest,
    ) -> ConfabResult<MemoryPoint> {
        self.manager.create(user_id, request).await
    }

    /// Rename a chat; `false` when missing, deleted or not owned.
    pub async fn rename_chat(&self, user_id: &str, chat_id: &str, name: &str) -> bool {
        self.manager.rename(user_id, chat_id, name).await
    }

    /// Rename with typed errors.
    pub async fn try_rename_chat(
        &self,
        user_id: &str,
        chat_id: &str,
        name: &str,
    ) -> ConfabResult<ChatSession> {
        self.manager.try_rename(user_id, chat_id, name).await
    }

    /// Delete a chat; `false` on any failure.
    pub async fn delete_chat(&self, user_id: &str, chat_id: &str) -> bool {
        self.manager.delete(user_id, chat_id).await
    }

    /// Chats of `user_id` in `collection` flagged `deleted: false`.
    pub async fn list_chats(&self, user_id: &str, collection: &str) -> ConfabResult<PointList> {
        self.manager.list_by_metadata(user_id, collection).await
    }

    /// Messages of a chat in `collection`; replaces the context history.
    pub async fn chat_messages(
        &self,
        ctx: &mut ChatContext,
        collection: &str,
        chat_id: Option<&str>,
    ) -> ConfabResult<PointList> {
        self.manager.messages_by_metadata(ctx, collection, chat_id).await
    }

    /// Messages and name of a chat; replaces the context history.
    pub async fn export_chat(&self, ctx: &mut ChatContext, chat_id: &str) -> ConfabResult<ChatExport> {
        self.manager.export(ctx, chat_id).await
    }

    /// Fetch a session by id.
    pub async fn get_chat(&self, chat_id: &str) -> ConfabResult<Option<ChatSession>> {
        self.sessions.get(chat_id).await
    }
}
