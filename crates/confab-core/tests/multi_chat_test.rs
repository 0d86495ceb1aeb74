//! Integration tests for the multi-chat session layer.
//!
//! Drives `MultiChat` over the in-memory store with a fake embedder and a
//! scripted LLM whose title answers come from a mockall double.

use async_trait::async_trait;
use mockall::automock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use confab_core::traits::{GenerationOptions, VectorRecord};
use confab_core::types::point_payload;
use confab_core::{
    ChatContext, ChatSettings, ConfabError, ConfabResult, CreateChatRequest, Embedder,
    InMemoryVectorStore, Llm, LlmResponse, Message, MessageRole, MultiChat, ReconcileOutcome,
    VectorStore,
};

const TITLE_PROMPT_PREFIX: &str = "Summarize the following conversation";

#[automock]
trait TitleSource {
    fn next_title(&self) -> ConfabResult<String>;
}

/// Replies with an echo; title prompts are answered by `titles`.
struct ScriptedLlm {
    titles: MockTitleSource,
    replies: AtomicUsize,
}

impl ScriptedLlm {
    fn new(titles: MockTitleSource) -> Self {
        Self {
            titles,
            replies: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(
        &self,
        messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> ConfabResult<LlmResponse> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last.trim_start().starts_with(TITLE_PROMPT_PREFIX) {
            return self.titles.next_title().map(LlmResponse::text);
        }
        self.replies.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse::text(format!("reply to: {}", last)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Deterministic 3-dimensional embeddings; reports an unknown dimension so
/// collection bootstrap has to probe it.
struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> ConfabResult<Vec<f32>> {
        let len = text.len() as f32;
        Ok(vec![1.0, len, len / 2.0])
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

fn no_titles() -> MockTitleSource {
    let mut titles = MockTitleSource::new();
    titles.expect_next_title().never();
    titles
}

fn any_titles(title: &'static str) -> MockTitleSource {
    let mut titles = MockTitleSource::new();
    titles
        .expect_next_title()
        .returning(move || Ok(title.to_string()));
    titles
}

fn build(
    settings: ChatSettings,
    titles: MockTitleSource,
) -> (MultiChat, Arc<InMemoryVectorStore>, Arc<ScriptedLlm>) {
    let store = Arc::new(InMemoryVectorStore::new());
    let llm = Arc::new(ScriptedLlm::new(titles));
    let chats = MultiChat::new(store.clone(), Arc::new(FakeEmbedder), llm.clone(), settings).unwrap();
    (chats, store, llm)
}

fn settings_with_cap(max_chats: i64) -> ChatSettings {
    ChatSettings {
        max_chats,
        ..Default::default()
    }
}

fn named(name: &str) -> CreateChatRequest {
    let mut metadata = Map::new();
    metadata.insert("name".to_string(), json!(name));
    CreateChatRequest {
        content: None,
        metadata,
    }
}

/// Test the cap rejects the chat after `max_chats` with the exact message.
#[tokio::test]
async fn test_create_respects_cap() {
    let (chats, _, _) = build(settings_with_cap(4), no_titles());

    for i in 0..4 {
        chats
            .create_chat("alice", named(&format!("chat {}", i)))
            .await
            .unwrap();
    }

    let err = chats.create_chat("alice", CreateChatRequest::default()).await.unwrap_err();
    assert!(matches!(err, ConfabError::CapacityExceeded { max_chats: 4 }));
    assert_eq!(
        err.to_string(),
        "Too many chats created, you can have a maximum of 4"
    );

    // The cap is per owner.
    assert!(chats.create_chat("bob", CreateChatRequest::default()).await.is_ok());
}

/// Test that -1 disables the cap.
#[tokio::test]
async fn test_unlimited_chats() {
    let (chats, _, _) = build(settings_with_cap(-1), no_titles());
    let max = ChatSettings::default().max_chats;

    for _ in 0..(max + 5) {
        chats
            .create_chat("alice", CreateChatRequest::default())
            .await
            .unwrap();
    }
    let listed = chats.list_chats("alice", "chat").await.unwrap();
    assert_eq!(listed.count as i64, max + 5);
}

/// Test the created record carries defaults and frontend metadata.
#[tokio::test]
async fn test_create_returns_point() {
    let (chats, _, _) = build(ChatSettings::default(), no_titles());

    let mut metadata = Map::new();
    metadata.insert("color".to_string(), json!("blue"));
    let point = chats
        .create_chat(
            "alice",
            CreateChatRequest {
                content: Some("Weekend plans".to_string()),
                metadata,
            },
        )
        .await
        .unwrap();

    assert!(!point.id.is_empty());
    assert_eq!(point.content, "Weekend plans");
    assert_eq!(point.vector.len(), 3);
    assert_eq!(point.metadata["source"], json!("alice"));
    assert_eq!(point.metadata["name"], json!("New Unnamed Chat"));
    assert_eq!(point.metadata["deleted"], json!(false));
    assert_eq!(point.metadata["color"], json!("blue"));

    let fallback = chats.create_chat("alice", CreateChatRequest::default()).await.unwrap();
    assert_eq!(fallback.content, "New Unnamed Chat");
    assert_eq!(fallback.metadata["content"], json!("New Unnamed Chat"));
}

/// Test soft-deleted chats free a slot and disappear from listings.
#[tokio::test]
async fn test_soft_delete() {
    let settings = ChatSettings {
        max_chats: 2,
        soft_delete: true,
        ..Default::default()
    };
    let (chats, _, _) = build(settings, no_titles());

    let first = chats.create_chat("alice", named("first")).await.unwrap();
    chats.create_chat("alice", named("second")).await.unwrap();
    assert!(chats.create_chat("alice", named("third")).await.is_err());

    assert!(chats.delete_chat("alice", &first.id).await);
    let session = chats.get_chat(&first.id).await.unwrap().unwrap();
    assert!(session.is_deleted());

    let listed = chats.list_chats("alice", "chat").await.unwrap();
    assert_eq!(listed.count, 1);
    assert!(listed.points.iter().all(|p| p.id != first.id));

    assert!(chats.create_chat("alice", named("third")).await.is_ok());
    assert!(!chats.rename_chat("alice", &first.id, "revived").await);
    assert!(!chats.delete_chat("alice", &first.id).await);
}

/// Test rename succeeds only for the owner and touches only the name.
#[tokio::test]
async fn test_rename_ownership() {
    let (chats, _, _) = build(ChatSettings::default(), no_titles());

    let mut metadata = Map::new();
    metadata.insert("pinned".to_string(), json!(true));
    let point = chats
        .create_chat(
            "alice",
            CreateChatRequest {
                content: Some("original content".to_string()),
                metadata,
            },
        )
        .await
        .unwrap();

    assert!(!chats.rename_chat("bob", &point.id, "hijacked").await);
    let err = chats.try_rename_chat("bob", &point.id, "hijacked").await.unwrap_err();
    assert!(matches!(err, ConfabError::Forbidden { .. }));
    let unchanged = chats.get_chat(&point.id).await.unwrap().unwrap();
    assert_eq!(unchanged.name(), "New Unnamed Chat");

    assert!(chats.rename_chat("alice", &point.id, "Groceries").await);
    let renamed = chats.get_chat(&point.id).await.unwrap().unwrap();
    assert_eq!(renamed.name(), "Groceries");
    assert_eq!(renamed.page_content, "original content");
    assert_eq!(renamed.content(), "original content");
    assert_eq!(renamed.metadata["pinned"], json!(true));
    assert_eq!(renamed.when(), point.metadata["when"].as_f64().unwrap());

    assert!(!chats.rename_chat("alice", "no-such-chat", "x").await);
    assert!(matches!(
        chats.try_rename_chat("alice", "no-such-chat", "x").await,
        Err(ConfabError::NotFound { .. })
    ));
}

/// Test delete of an unknown id and cascade to episodic records.
#[tokio::test]
async fn test_delete_cascades() {
    let (chats, store, _) = build(ChatSettings::default(), any_titles("Small talk"));

    assert!(!chats.delete_chat("alice", "does-not-exist").await);

    let mut ctx = ChatContext::new("alice", "hello there");
    let reply = chats.respond(&mut ctx).await.unwrap();
    let chat_id = reply.chat_id.unwrap();

    let mut ctx = ChatContext::new("alice", "second message").with_chat_id(chat_id.clone());
    chats.respond(&mut ctx).await.unwrap();
    assert_eq!(store.count("episodic").await.unwrap(), 2);

    assert!(chats.delete_chat("alice", &chat_id).await);
    assert!(chats.get_chat(&chat_id).await.unwrap().is_none());
    assert_eq!(store.count("episodic").await.unwrap(), 0);

    let mut ctx = ChatContext::new("alice", "");
    let messages = chats
        .chat_messages(&mut ctx, "episodic", Some(&chat_id))
        .await
        .unwrap();
    assert_eq!(messages.count, 0);
    assert!(messages.message.is_some());
}

/// Test unordered records come back sorted with alternating roles.
#[tokio::test]
async fn test_history_ordering() {
    let (chats, store, _) = build(ChatSettings::default(), no_titles());
    chats.bootstrap().await.unwrap();

    let records = [(3.0, "third"), (1.0, "first"), (2.0, "second")]
        .iter()
        .enumerate()
        .map(|(i, (when, text))| {
            let mut metadata = Map::new();
            metadata.insert("user_id".into(), json!("alice"));
            metadata.insert("chat_id".into(), json!("c1"));
            metadata.insert("when".into(), json!(when));
            metadata.insert("text".into(), json!(text));
            metadata.insert("bot".into(), json!(format!("re: {}", text)));
            VectorRecord::new(format!("r{}", i), vec![1.0, 2.0, 3.0], point_payload(text, &metadata))
        })
        .collect();
    store.insert("episodic", records).await.unwrap();

    // Another chat and another user must not leak in.
    let mut stray = Map::new();
    stray.insert("user_id".into(), json!("bob"));
    stray.insert("chat_id".into(), json!("c1"));
    stray.insert("when".into(), json!(0.5));
    stray.insert("text".into(), json!("bob's"));
    stray.insert("bot".into(), json!("nope"));
    store
        .insert(
            "episodic",
            vec![VectorRecord::new("stray", vec![1.0, 2.0, 3.0], point_payload("", &stray))],
        )
        .await
        .unwrap();

    let mut ctx = ChatContext::new("alice", "");
    let listed = chats.chat_messages(&mut ctx, "episodic", Some("c1")).await.unwrap();
    assert_eq!(listed.count, 3);
    let whens: Vec<f64> = listed
        .points
        .iter()
        .map(|p| p.metadata["when"].as_f64().unwrap())
        .collect();
    assert_eq!(whens, vec![1.0, 2.0, 3.0]);

    let contents: Vec<&str> = ctx.history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["first", "re: first", "second", "re: second", "third", "re: third"]
    );
    let roles: Vec<MessageRole> = ctx.history.iter().map(|m| m.role).collect();
    assert_eq!(roles[0], MessageRole::User);
    assert_eq!(roles[1], MessageRole::Assistant);

    let err = chats
        .chat_messages(&mut ctx, "missing", Some("c1"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Collection does not exist.");
}

/// Test a default-named chat is auto-named exactly once.
#[tokio::test]
async fn test_auto_naming_once() {
    let mut titles = MockTitleSource::new();
    titles
        .expect_next_title()
        .times(1)
        .returning(|| Ok("  \"Rust Lifetimes\"  ".to_string()));
    let (chats, _, llm) = build(ChatSettings::default(), titles);

    let mut ctx = ChatContext::new("alice", "what is a lifetime?");
    let first = chats.respond(&mut ctx).await.unwrap();
    assert_eq!(first.outcome.renamed.as_deref(), Some("Rust Lifetimes"));
    let chat_id = first.chat_id.unwrap();

    let mut ctx = ChatContext::new("alice", "and elision?")
        .with_chat_id(chat_id.clone())
        .with_history(ctx.history);
    let second = chats.respond(&mut ctx).await.unwrap();
    assert!(second.outcome.renamed.is_none());
    assert_eq!(ctx.history.len(), 4);

    let session = chats.get_chat(&chat_id).await.unwrap().unwrap();
    assert_eq!(session.name(), "Rust Lifetimes");
    assert!(session.last_update().is_some());
    assert_eq!(llm.replies.load(Ordering::SeqCst), 2);
}

/// Test an LLM failure during naming leaves the name but still completes the turn.
#[tokio::test]
async fn test_auto_naming_failure_is_isolated() {
    let mut titles = MockTitleSource::new();
    titles
        .expect_next_title()
        .returning(|| Err(ConfabError::llm("model unavailable")));
    let (chats, _, _) = build(ChatSettings::default(), titles);

    let mut ctx = ChatContext::new("alice", "hi");
    let reply = chats.respond(&mut ctx).await.unwrap();
    assert_eq!(reply.text, "reply to: hi");
    assert!(reply.outcome.renamed.is_none());
    assert!(reply.outcome.completed_turn.is_some());
    assert!(reply.outcome.touched);

    let chat_id = reply.chat_id.unwrap();
    let session = chats.get_chat(&chat_id).await.unwrap().unwrap();
    assert_eq!(session.name(), "New Unnamed Chat");
    assert!(session.last_update().is_some());

    let mut ctx = ChatContext::new("alice", "");
    chats.chat_messages(&mut ctx, "episodic", Some(&chat_id)).await.unwrap();
    let contents: Vec<&str> = ctx.history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "reply to: hi"]);
}

/// Test an empty title leaves the default name.
#[tokio::test]
async fn test_blank_title_is_ignored() {
    let mut titles = MockTitleSource::new();
    titles
        .expect_next_title()
        .returning(|| Ok(" '' ".to_string()));
    let (chats, _, _) = build(ChatSettings::default(), titles);

    let mut ctx = ChatContext::new("alice", "hi");
    let reply = chats.respond(&mut ctx).await.unwrap();
    let session = chats.get_chat(reply.chat_id.as_deref().unwrap()).await.unwrap().unwrap();
    assert_eq!(session.name(), "New Unnamed Chat");
}

/// Test the reply is attached to the most recent matching turn.
#[tokio::test]
async fn test_reconcile_completes_latest_turn() {
    let (chats, store, _) = build(ChatSettings::default(), any_titles("Repeated"));

    let mut ctx = ChatContext::new("alice", "same words");
    chats.resolve(&mut ctx).await.unwrap();
    let older = chats.record_user_turn(&ctx).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = chats.record_user_turn(&ctx).await.unwrap();

    let outcome = chats.reconcile(&ctx, "the answer").await;
    assert_eq!(outcome.completed_turn.as_deref(), Some(newer.id.as_str()));

    let fetched = store
        .retrieve("episodic", &[older.id.clone(), newer.id.clone()], false)
        .await
        .unwrap();
    let by_id: HashMap<String, Value> = fetched
        .into_iter()
        .map(|r| (r.id.clone(), r.payload["metadata"]["bot"].clone()))
        .collect();
    assert_eq!(by_id[&older.id], json!(""));
    assert_eq!(by_id[&newer.id], json!("the answer"));
}

/// Test a reply without a recorded turn is dropped quietly.
#[tokio::test]
async fn test_reconcile_without_turn() {
    let (chats, _, _) = build(ChatSettings::default(), any_titles("Quiet"));

    let mut ctx = ChatContext::new("alice", "never recorded");
    chats.resolve(&mut ctx).await.unwrap();
    chats.bootstrap().await.unwrap();

    let outcome = chats.reconcile(&ctx, "reply").await;
    assert!(outcome.completed_turn.is_none());
    assert!(outcome.touched);

    let no_chat = ChatContext::new("alice", "orphan");
    assert_eq!(
        chats.reconcile(&no_chat, "reply").await,
        ReconcileOutcome::default()
    );
}

/// Test the resolver reuses the default chat and leaves explicit ids alone.
#[tokio::test]
async fn test_resolver_reuses_default_chat() {
    let (chats, _, _) = build(ChatSettings::default(), no_titles());

    let mut first = ChatContext::new("alice", "a");
    let id = chats.resolve(&mut first).await.unwrap();
    let mut second = ChatContext::new("alice", "b");
    assert_eq!(chats.resolve(&mut second).await.as_deref(), Some(id.as_str()));

    let mut explicit = ChatContext::new("alice", "c").with_chat_id("given");
    assert_eq!(chats.resolve(&mut explicit).await.as_deref(), Some("given"));

    assert!(chats.rename_chat("alice", &id, "Named now").await);
    let mut third = ChatContext::new("alice", "d");
    let fresh = chats.resolve(&mut third).await.unwrap();
    assert_ne!(fresh, id);
}

/// Test concurrent resolution for a fresh user yields a single default chat.
#[tokio::test]
async fn test_concurrent_resolve() {
    let (chats, _, _) = build(ChatSettings::default(), no_titles());
    let chats = Arc::new(chats);

    let tasks = (0..8).map(|i| {
        let chats = chats.clone();
        tokio::spawn(async move {
            let mut ctx = ChatContext::new("fresh-user", format!("msg {}", i));
            chats.resolve(&mut ctx).await
        })
    });
    let ids: Vec<Option<String>> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(ids.iter().all(Option::is_some));
    let listed = chats.list_chats("fresh-user", "chat").await.unwrap();
    assert_eq!(listed.count, 1);
    assert!(ids.iter().all(|id| id.as_deref() == Some(listed.points[0].id.as_str())));
}

/// Test listing unknown collections and empty results.
#[tokio::test]
async fn test_listing_unknown_collection_and_empty_results() {
    let (chats, _, _) = build(ChatSettings::default(), no_titles());

    let err = chats.list_chats("alice", "nope").await.unwrap_err();
    assert!(matches!(err, ConfabError::CollectionNotFound { .. }));

    let empty = chats.list_chats("alice", "chat").await.unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(
        empty.message.as_deref(),
        Some("No points found matching metadata criteria")
    );
}

/// Test export returns the name and ordered messages.
#[tokio::test]
async fn test_export_chat() {
    let (chats, _, _) = build(ChatSettings::default(), any_titles("Greetings"));

    let mut ctx = ChatContext::new("alice", "hello");
    let chat_id = chats.respond(&mut ctx).await.unwrap().chat_id.unwrap();

    let mut fresh = ChatContext::new("alice", "");
    let export = chats.export_chat(&mut fresh, &chat_id).await.unwrap();
    assert_eq!(export.name.as_deref(), Some("Greetings"));
    assert_eq!(export.messages.count, 1);
    assert!(export.messages.message.is_none());
    assert_eq!(fresh.history.len(), 2);

    let value = serde_json::to_value(&export).unwrap();
    assert!(value.get("Messages").is_some());
    assert_eq!(value["Name"], json!("Greetings"));

    let err = chats.export_chat(&mut fresh, "missing").await.unwrap_err();
    assert!(matches!(err, ConfabError::NotFound { .. }));
}

/// Answers turns immediately but takes `title_delay` to produce a title.
struct SlowTitleLlm {
    title_delay: std::time::Duration,
}

#[async_trait]
impl Llm for SlowTitleLlm {
    async fn generate(
        &self,
        messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> ConfabResult<LlmResponse> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last.trim_start().starts_with(TITLE_PROMPT_PREFIX) {
            tokio::time::sleep(self.title_delay).await;
            return Ok(LlmResponse::text("Too Late"));
        }
        Ok(LlmResponse::text(format!("reply to: {}", last)))
    }

    fn model_name(&self) -> &str {
        "slow-titles"
    }
}

/// Test a title call that outlives its timeout leaves the name but completes the turn.
#[tokio::test]
async fn test_auto_naming_timeout_is_isolated() {
    let settings = ChatSettings {
        title_timeout_secs: 1,
        ..Default::default()
    };
    let llm = Arc::new(SlowTitleLlm {
        title_delay: std::time::Duration::from_secs(3),
    });
    let chats = MultiChat::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(FakeEmbedder),
        llm,
        settings,
    )
    .unwrap();

    let mut ctx = ChatContext::new("alice", "hi");
    let reply = chats.respond(&mut ctx).await.unwrap();
    assert_eq!(reply.text, "reply to: hi");
    assert!(reply.outcome.renamed.is_none());
    assert!(reply.outcome.completed_turn.is_some());
    assert!(reply.outcome.touched);

    let chat_id = reply.chat_id.unwrap();
    let session = chats.get_chat(&chat_id).await.unwrap().unwrap();
    assert_eq!(session.name(), "New Unnamed Chat");
    assert!(session.last_update().is_some());
}

/// Test listings only return points explicitly flagged `deleted: false`.
#[tokio::test]
async fn test_listing_requires_deleted_flag() {
    let (chats, store, _) = build(ChatSettings::default(), any_titles("Greetings"));

    let mut ctx = ChatContext::new("alice", "hello");
    let chat_id = chats.respond(&mut ctx).await.unwrap().chat_id.unwrap();

    // Episodic records carry `source` but no `deleted` flag.
    let episodic = chats.list_chats("alice", "episodic").await.unwrap();
    assert_eq!(episodic.count, 0);
    assert!(episodic.message.is_some());

    let mut metadata = Map::new();
    metadata.insert("source".into(), json!("alice"));
    metadata.insert("name".into(), json!("Imported"));
    store
        .insert(
            "chat",
            vec![VectorRecord::new("legacy", vec![1.0, 2.0, 3.0], point_payload("Imported", &metadata))],
        )
        .await
        .unwrap();

    let listed = chats.list_chats("alice", "chat").await.unwrap();
    assert_eq!(listed.count, 1);
    assert_eq!(listed.points[0].id, chat_id);
}
