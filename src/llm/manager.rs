// Provider manager: registry, active selection, and fallback orchestration
//
// Design Decision: explicitly constructed manager, no global singleton
//
// Rationale: the manager is created once and passed by Arc to agents and
// workflows. Tests construct their own managers with stub adapters, so
// independent configurations never collide on shared mutable state.
//
// The fallback policy lives here and nowhere else: exactly one alternate
// attempt (the provider that was active before a switch), no backoff, no
// retry loop. Collaborators that need retries (the search client) carry
// their own.

use super::types::*;
use super::{create_adapter, ProviderAdapter, ProviderSettings};
use crate::agent::ToolDefinition;
use crate::error::{PolybotError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Which call path a tooled request actually took
///
/// Callers asked for tools, but the resolved adapter may not support them.
/// The degrade is deliberate and observable rather than a hidden branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolUseMode {
    /// Tool schema was sent; the response may contain tool calls
    Native,
    /// Adapter does not support tools; plain chat semantics were used
    PlainChat,
}

/// Result of a tooled chat request through the manager
#[derive(Debug)]
pub struct ToolChatOutcome {
    pub mode: ToolUseMode,
    pub response: ChatResponse,
}

/// Owns the adapter registry and the active selection
///
/// Invariants: at most one adapter per provider identity; the active
/// selection, when set, always names a live registry entry (validated on
/// every access, never left stale).
pub struct ProviderManager {
    registry: RwLock<HashMap<ProviderKind, Arc<dyn ProviderAdapter>>>,
    active: RwLock<Option<ProviderKind>>,
    forced: AtomicBool,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            forced: AtomicBool::new(false),
        }
    }

    /// Initialize every provider with a discoverable credential, concurrently
    ///
    /// All initializations run at once and every outcome is awaited before
    /// the active selection is computed (partial-failure-tolerant join, not
    /// a race). Failures are logged and dropped from the registry, not
    /// retried. No-op when the manager was placed into forced mode.
    pub async fn initialize_all(
        &self,
        settings: &HashMap<ProviderKind, ProviderSettings>,
    ) -> Result<()> {
        if self.forced.load(Ordering::SeqCst) {
            debug!("Manager is in forced single-provider mode; initialize_all is a no-op");
            return Ok(());
        }

        let mut candidates = Vec::new();
        for kind in ProviderKind::PRIORITY {
            let adapter = create_adapter(kind, settings.get(&kind).cloned().unwrap_or_default());
            if adapter.is_configured() {
                candidates.push(adapter);
            } else {
                debug!("Provider '{}' has no credential, skipping", kind);
            }
        }

        self.initialize_all_with(candidates).await
    }

    /// Concurrent-init seam taking pre-built adapters
    ///
    /// Used by `initialize_all` and by tests that supply stub adapters.
    pub async fn initialize_all_with(
        &self,
        adapters: Vec<Box<dyn ProviderAdapter>>,
    ) -> Result<()> {
        if self.forced.load(Ordering::SeqCst) {
            return Ok(());
        }

        let attempts = adapters.into_iter().map(|mut adapter| async move {
            let kind = adapter.kind();
            match adapter.initialize().await {
                Ok(()) => {
                    info!("Provider '{}' initialized", kind);
                    Some((kind, Arc::from(adapter) as Arc<dyn ProviderAdapter>))
                }
                Err(e) => {
                    warn!("Provider '{}' failed to initialize: {}", kind, e);
                    None
                }
            }
        });

        let results = futures::future::join_all(attempts).await;

        let mut registry = self.registry.write().await;
        registry.clear();
        for (kind, adapter) in results.into_iter().flatten() {
            registry.insert(kind, adapter);
        }

        let selected = ProviderKind::PRIORITY
            .into_iter()
            .find(|kind| registry.contains_key(kind))
            .or_else(|| registry.keys().next().copied());
        drop(registry);

        let mut active = self.active.write().await;
        *active = selected;

        match selected {
            Some(kind) => info!("Active provider: {}", kind),
            None => warn!("No provider survived initialization; manager is degraded"),
        }

        Ok(())
    }

    /// Force exactly one provider, bypassing auto-detection
    ///
    /// Clears the registry first. On success the registry holds exactly
    /// this provider and subsequent `initialize_all` calls are no-ops. On
    /// failure the registry is left empty and the error propagates.
    pub async fn initialize_single_provider(
        &self,
        kind: ProviderKind,
        settings: ProviderSettings,
    ) -> Result<()> {
        self.initialize_single_with(create_adapter(kind, settings)).await
    }

    /// Forced-mode seam taking a pre-built adapter
    pub async fn initialize_single_with(
        &self,
        mut adapter: Box<dyn ProviderAdapter>,
    ) -> Result<()> {
        let kind = adapter.kind();

        {
            let mut registry = self.registry.write().await;
            registry.clear();
        }
        {
            let mut active = self.active.write().await;
            *active = None;
        }

        adapter.initialize().await?;

        let mut registry = self.registry.write().await;
        registry.insert(kind, Arc::from(adapter));
        drop(registry);

        let mut active = self.active.write().await;
        *active = Some(kind);
        self.forced.store(true, Ordering::SeqCst);

        info!("Forced single-provider mode: {}", kind);
        Ok(())
    }

    /// Forced single-provider initialization by provider name
    ///
    /// Fails with `UnsupportedProvider` (registry untouched) when the name
    /// is outside the supported set.
    pub async fn initialize_single_provider_by_name(
        &self,
        name: &str,
        settings: ProviderSettings,
    ) -> Result<()> {
        let kind: ProviderKind = name.parse()?;
        self.initialize_single_provider(kind, settings).await
    }

    /// Resolve the active adapter, validating the selection against the
    /// registry on every access.
    async fn active_adapter(&self) -> Result<Arc<dyn ProviderAdapter>> {
        let selected = { *self.active.read().await };
        let kind = selected.ok_or(PolybotError::NoActiveProvider)?;

        let registry = self.registry.read().await;
        registry
            .get(&kind)
            .cloned()
            .ok_or(PolybotError::NoActiveProvider)
    }

    /// Identity of the currently active provider, if any
    pub async fn active_provider(&self) -> Option<ProviderKind> {
        *self.active.read().await
    }

    /// Registered provider identities, in priority order
    pub async fn available_providers(&self) -> Vec<ProviderKind> {
        let registry = self.registry.read().await;
        ProviderKind::PRIORITY
            .into_iter()
            .filter(|kind| registry.contains_key(kind))
            .collect()
    }

    /// True when the manager is pinned to a single provider
    pub fn is_forced(&self) -> bool {
        self.forced.load(Ordering::SeqCst)
    }

    /// True when no provider is active
    pub async fn is_degraded(&self) -> bool {
        self.active.read().await.is_none()
    }

    /// Select a registered provider. Pure state mutation, no I/O.
    pub async fn set_active_provider(&self, kind: ProviderKind) -> Result<()> {
        let registry = self.registry.read().await;
        if !registry.contains_key(&kind) {
            return Err(PolybotError::ProviderNotAvailable(kind.to_string()));
        }
        drop(registry);

        let mut active = self.active.write().await;
        *active = Some(kind);
        Ok(())
    }

    /// Chat completion through the active provider
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let adapter = self.active_adapter().await?;
        adapter.chat_completion(messages, options).await
    }

    /// Tooled chat completion through the active provider
    ///
    /// Degrades to plain chat when the adapter reports no tool support;
    /// the outcome records which path was taken.
    pub async fn chat_completion_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        options: &ChatOptions,
    ) -> Result<ToolChatOutcome> {
        let adapter = self.active_adapter().await?;
        call_adapter(adapter.as_ref(), messages, Some(tools), options).await
    }

    /// Generate an image through an image-capable provider
    ///
    /// Prefers the active provider when it can generate images, otherwise
    /// the highest-priority registered provider that can. The active
    /// selection is not changed by this call.
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: &ChatOptions,
    ) -> Result<ImageResult> {
        let active = *self.active.read().await;
        let registry = self.registry.read().await;

        let adapter = active
            .and_then(|kind| registry.get(&kind))
            .filter(|a| a.supports_image_generation())
            .cloned()
            .or_else(|| {
                ProviderKind::PRIORITY
                    .into_iter()
                    .filter_map(|kind| registry.get(&kind))
                    .find(|a| a.supports_image_generation())
                    .cloned()
            })
            .ok_or(PolybotError::NoAvailableProvider)?;
        drop(registry);

        debug!("Generating image through '{}'", adapter.kind());
        adapter.generate_image(prompt, options).await
    }

    /// Try a preferred provider; fall back once to the prior selection
    ///
    /// On any failure of the preferred attempt (including the provider not
    /// being registered), the active selection is restored to its previous
    /// value and the same call is retried through it. One alternate
    /// attempt, no backoff. `NoAvailableProvider` when both paths fail or
    /// no prior selection exists.
    pub async fn switch_provider_with_fallback(
        &self,
        preferred: ProviderKind,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        options: &ChatOptions,
    ) -> Result<ToolChatOutcome> {
        let prior = self.active_provider().await;

        let attempt = match self.set_active_provider(preferred).await {
            Ok(()) => match self.active_adapter().await {
                Ok(adapter) => call_adapter(adapter.as_ref(), messages, tools, options).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match attempt {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Provider '{}' failed, falling back: {}", preferred, e);

                // Restore the prior selection before retrying through it
                {
                    let mut active = self.active.write().await;
                    *active = prior;
                }

                let fallback_kind = match prior {
                    Some(kind) if kind != preferred => kind,
                    _ => return Err(PolybotError::NoAvailableProvider),
                };

                let registry = self.registry.read().await;
                let adapter = registry
                    .get(&fallback_kind)
                    .cloned()
                    .ok_or(PolybotError::NoAvailableProvider)?;
                drop(registry);

                info!("Retrying through prior provider '{}'", fallback_kind);
                call_adapter(adapter.as_ref(), messages, tools, options)
                    .await
                    .map_err(|retry_err| {
                        warn!("Fallback provider '{}' also failed: {}", fallback_kind, retry_err);
                        PolybotError::NoAvailableProvider
                    })
            }
        }
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared call path for tooled/untooled requests with the explicit
/// degrade decision.
async fn call_adapter(
    adapter: &dyn ProviderAdapter,
    messages: &[ChatMessage],
    tools: Option<&[ToolDefinition]>,
    options: &ChatOptions,
) -> Result<ToolChatOutcome> {
    match tools {
        Some(tools) if !tools.is_empty() && adapter.supports_tools() => {
            let response = adapter.chat_completion_with_tools(messages, tools, options).await?;
            Ok(ToolChatOutcome { mode: ToolUseMode::Native, response })
        }
        Some(tools) if !tools.is_empty() => {
            debug!(
                "Provider '{}' does not support tools; degrading to plain chat",
                adapter.kind()
            );
            let response = adapter.chat_completion(messages, options).await?;
            Ok(ToolChatOutcome { mode: ToolUseMode::PlainChat, response })
        }
        _ => {
            let response = adapter.chat_completion(messages, options).await?;
            Ok(ToolChatOutcome { mode: ToolUseMode::PlainChat, response })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Scriptable in-memory adapter for manager behavior tests
    struct StubAdapter {
        kind: ProviderKind,
        fail_init: bool,
        fail_chat: bool,
        supports_tools: bool,
        supports_images: bool,
        chat_calls: Arc<AtomicUsize>,
        tooled_calls: Arc<AtomicUsize>,
    }

    impl StubAdapter {
        fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                fail_init: false,
                fail_chat: false,
                supports_tools: true,
                supports_images: false,
                chat_calls: Arc::new(AtomicUsize::new(0)),
                tooled_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing_init(kind: ProviderKind) -> Self {
            Self { fail_init: true, ..Self::new(kind) }
        }

        fn failing_chat(kind: ProviderKind) -> Self {
            Self { fail_chat: true, ..Self::new(kind) }
        }

        fn without_tools(kind: ProviderKind) -> Self {
            Self { supports_tools: false, ..Self::new(kind) }
        }

        fn with_images(kind: ProviderKind) -> Self {
            Self { supports_images: true, ..Self::new(kind) }
        }

        fn response(&self) -> ChatResponse {
            ChatResponse {
                provider: self.kind,
                content: format!("reply from {}", self.kind),
                usage: TokenUsage::default(),
                model: "stub".to_string(),
                finish_reason: Some("stop".to_string()),
                tool_calls: None,
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for StubAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn initialize(&mut self) -> Result<()> {
            if self.fail_init {
                Err(PolybotError::ProviderInit {
                    provider: self.kind.to_string(),
                    message: "stubbed failure".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn chat_completion(
            &self,
            _messages: &[ChatMessage],
            _options: &ChatOptions,
        ) -> Result<ChatResponse> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_chat {
                return Err(PolybotError::ProviderRequest {
                    provider: self.kind.to_string(),
                    cause: "stubbed failure".to_string(),
                });
            }
            Ok(self.response())
        }

        async fn chat_completion_with_tools(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
            _options: &ChatOptions,
        ) -> Result<ChatResponse> {
            self.tooled_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_chat {
                return Err(PolybotError::ProviderRequest {
                    provider: self.kind.to_string(),
                    cause: "stubbed failure".to_string(),
                });
            }
            Ok(self.response())
        }

        fn supports_tools(&self) -> bool {
            self.supports_tools
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _options: &ChatOptions,
        ) -> Result<ImageResult> {
            if !self.supports_images {
                return Err(PolybotError::ProviderRequest {
                    provider: self.kind.to_string(),
                    cause: "image generation not supported by this provider".to_string(),
                });
            }
            Ok(ImageResult {
                provider: self.kind,
                b64_png: "aGVsbG8=".to_string(),
                model: "stub".to_string(),
            })
        }

        fn supports_image_generation(&self) -> bool {
            self.supports_images
        }

        fn available_models(&self) -> Vec<&'static str> {
            vec!["stub"]
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::user("hello")]
    }

    fn a_tool() -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: crate::agent::FunctionDefinition {
                name: "t".to_string(),
                description: "d".to_string(),
                parameters: crate::agent::FunctionParameters {
                    param_type: "object".to_string(),
                    properties: serde_json::json!({ "x": { "type": "string" } }),
                    required: vec!["x".to_string()],
                    additional_properties: false,
                },
            },
        }
    }

    #[tokio::test]
    async fn test_initialize_all_drops_failures_and_picks_priority() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::failing_init(ProviderKind::OpenAi)),
                Box::new(StubAdapter::new(ProviderKind::Gemini)),
                Box::new(StubAdapter::new(ProviderKind::Claude)),
            ])
            .await
            .unwrap();

        assert_eq!(
            manager.available_providers().await,
            vec![ProviderKind::Gemini, ProviderKind::Claude]
        );
        // Highest-priority survivor becomes active
        assert_eq!(manager.active_provider().await, Some(ProviderKind::Gemini));
    }

    #[tokio::test]
    async fn test_initialize_all_degraded_when_nothing_survives() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::failing_init(ProviderKind::OpenAi)),
                Box::new(StubAdapter::failing_init(ProviderKind::Claude)),
            ])
            .await
            .unwrap();

        assert!(manager.is_degraded().await);
        assert!(matches!(
            manager.chat_completion(&messages(), &ChatOptions::default()).await,
            Err(PolybotError::NoActiveProvider)
        ));
    }

    #[tokio::test]
    async fn test_single_provider_sets_active_and_registry() {
        let manager = ProviderManager::new();
        manager
            .initialize_single_with(Box::new(StubAdapter::new(ProviderKind::Claude)))
            .await
            .unwrap();

        assert_eq!(manager.active_provider().await, Some(ProviderKind::Claude));
        assert_eq!(manager.available_providers().await, vec![ProviderKind::Claude]);
        assert!(manager.is_forced());
    }

    #[tokio::test]
    async fn test_single_provider_failure_leaves_registry_empty() {
        let manager = ProviderManager::new();
        let result = manager
            .initialize_single_with(Box::new(StubAdapter::failing_init(ProviderKind::OpenAi)))
            .await;

        assert!(result.is_err());
        assert!(manager.available_providers().await.is_empty());
        assert_eq!(manager.active_provider().await, None);
        assert!(!manager.is_forced());
    }

    #[tokio::test]
    async fn test_unknown_provider_name_rejected() {
        let manager = ProviderManager::new();
        let result = manager
            .initialize_single_provider_by_name("llamastack", ProviderSettings::default())
            .await;

        match result {
            Err(PolybotError::UnsupportedProvider(name)) => assert_eq!(name, "llamastack"),
            other => panic!("expected UnsupportedProvider, got {:?}", other.map(|_| ())),
        }
        assert!(manager.available_providers().await.is_empty());
    }

    #[tokio::test]
    async fn test_forced_mode_makes_initialize_all_noop() {
        let manager = ProviderManager::new();
        manager
            .initialize_single_with(Box::new(StubAdapter::new(ProviderKind::Gemini)))
            .await
            .unwrap();

        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::new(ProviderKind::OpenAi)),
                Box::new(StubAdapter::new(ProviderKind::Claude)),
            ])
            .await
            .unwrap();

        assert_eq!(manager.available_providers().await, vec![ProviderKind::Gemini]);
        assert_eq!(manager.active_provider().await, Some(ProviderKind::Gemini));
    }

    #[tokio::test]
    async fn test_set_active_provider_rejects_unregistered() {
        let manager = ProviderManager::new();
        manager
            .initialize_single_with(Box::new(StubAdapter::new(ProviderKind::OpenAi)))
            .await
            .unwrap();

        let result = manager.set_active_provider(ProviderKind::Claude).await;
        assert!(matches!(result, Err(PolybotError::ProviderNotAvailable(_))));
        assert_eq!(manager.active_provider().await, Some(ProviderKind::OpenAi));
    }

    #[tokio::test]
    async fn test_tooled_call_degrades_when_unsupported() {
        let manager = ProviderManager::new();
        let stub = StubAdapter::without_tools(ProviderKind::Claude);
        let chat_calls = Arc::clone(&stub.chat_calls);
        let tooled_calls = Arc::clone(&stub.tooled_calls);
        manager.initialize_single_with(Box::new(stub)).await.unwrap();

        for _ in 0..2 {
            let outcome = manager
                .chat_completion_with_tools(&messages(), &[a_tool()], &ChatOptions::default())
                .await
                .unwrap();
            assert_eq!(outcome.mode, ToolUseMode::PlainChat);
            assert!(outcome.response.tool_calls.is_none());
        }

        // No tool schema was ever sent; both calls took the plain path
        assert_eq!(tooled_calls.load(Ordering::SeqCst), 0);
        assert_eq!(chat_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tooled_call_native_when_supported() {
        let manager = ProviderManager::new();
        manager
            .initialize_single_with(Box::new(StubAdapter::new(ProviderKind::OpenAi)))
            .await
            .unwrap();

        let outcome = manager
            .chat_completion_with_tools(&messages(), &[a_tool()], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.mode, ToolUseMode::Native);
    }

    #[tokio::test]
    async fn test_generate_image_picks_capable_provider() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::with_images(ProviderKind::OpenAi)),
                Box::new(StubAdapter::new(ProviderKind::Gemini)),
            ])
            .await
            .unwrap();

        // Make a non-image provider active; the image call routes around it
        manager.set_active_provider(ProviderKind::Gemini).await.unwrap();

        let image = manager
            .generate_image("a teapot", &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(image.provider, ProviderKind::OpenAi);
        assert_eq!(manager.active_provider().await, Some(ProviderKind::Gemini));
    }

    #[tokio::test]
    async fn test_generate_image_without_capable_provider() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![Box::new(StubAdapter::new(ProviderKind::Claude))])
            .await
            .unwrap();

        let result = manager.generate_image("a teapot", &ChatOptions::default()).await;
        assert!(matches!(result, Err(PolybotError::NoAvailableProvider)));
    }

    #[tokio::test]
    async fn test_switch_fallback_restores_prior_on_failure() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::new(ProviderKind::OpenAi)),
                Box::new(StubAdapter::failing_chat(ProviderKind::Gemini)),
            ])
            .await
            .unwrap();
        assert_eq!(manager.active_provider().await, Some(ProviderKind::OpenAi));

        let outcome = manager
            .switch_provider_with_fallback(
                ProviderKind::Gemini,
                &messages(),
                None,
                &ChatOptions::default(),
            )
            .await
            .unwrap();

        // Result came from the prior provider and the selection is restored
        assert_eq!(outcome.response.provider, ProviderKind::OpenAi);
        assert_eq!(manager.active_provider().await, Some(ProviderKind::OpenAi));
    }

    #[tokio::test]
    async fn test_switch_fallback_keeps_preferred_on_success() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![
                Box::new(StubAdapter::new(ProviderKind::OpenAi)),
                Box::new(StubAdapter::new(ProviderKind::Claude)),
            ])
            .await
            .unwrap();

        let outcome = manager
            .switch_provider_with_fallback(
                ProviderKind::Claude,
                &messages(),
                None,
                &ChatOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.response.provider, ProviderKind::Claude);
        assert_eq!(manager.active_provider().await, Some(ProviderKind::Claude));
    }

    #[tokio::test]
    async fn test_switch_fallback_exhausted_without_prior() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![Box::new(StubAdapter::failing_chat(ProviderKind::OpenAi))])
            .await
            .unwrap();

        // Active and preferred are the same failing provider: no alternate
        let result = manager
            .switch_provider_with_fallback(
                ProviderKind::OpenAi,
                &messages(),
                None,
                &ChatOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(PolybotError::NoAvailableProvider)));
    }

    #[tokio::test]
    async fn test_switch_fallback_unregistered_preferred_falls_back() {
        let manager = ProviderManager::new();
        manager
            .initialize_all_with(vec![Box::new(StubAdapter::new(ProviderKind::OpenAi))])
            .await
            .unwrap();

        let outcome = manager
            .switch_provider_with_fallback(
                ProviderKind::Gemini,
                &messages(),
                None,
                &ChatOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.response.provider, ProviderKind::OpenAi);
        assert_eq!(manager.active_provider().await, Some(ProviderKind::OpenAi));
    }
}
