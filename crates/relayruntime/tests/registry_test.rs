use futures::StreamExt;
use relaycore::{
    action_fn, stream, trigger_fn, ActionContext, ActionError, ConfigError, ConfigRequirement,
    EventStream, MemoryConfigStore, NotFoundError, OAuthClient, RelayError, Requirement, ValidationError,
};
use relayruntime::{Environment, OAuthEndpoint, Registry, RuntimeConfig};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Initialize tracing for tests
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

fn upper() -> impl relaycore::Action<Input = String, Output = String> {
    action_fn(|s: String, _ctx: ActionContext| async move { Ok::<_, ActionError>(s.to_uppercase()) })
}

fn ticks() -> impl relaycore::Trigger<Input = u64, Event = u64> {
    trigger_fn(|every_ms: u64, ctx: ActionContext| async move {
        Ok::<EventStream<u64>, ActionError>(stream::spawn(&ctx, ctx.event_buffer, move |tx| async move {
            let mut n = 0;
            while !tx.is_closed() {
                tx.send(n).await?;
                n += 1;
                tokio::time::sleep(Duration::from_millis(every_ms)).await;
            }
            Ok::<(), ActionError>(())
        }))
    })
}

fn sample_registry() -> Registry {
    let mut registry = Registry::new();
    let text = registry.add_provider("text", "Text utilities", Vec::new()).unwrap();
    text.add_group("case", "Change case", Vec::new())
        .unwrap()
        .add_action("upper", "Upper-case a string", Vec::new(), upper())
        .unwrap()
        .add_action("lower", "Lower-case a string", Vec::new(),
            action_fn(|s: String, _ctx: ActionContext| async move { Ok::<_, ActionError>(s.to_lowercase()) }))
        .unwrap();
    text.add_group("clock", "Timers", Vec::new())
        .unwrap()
        .add_trigger("onTick", "Counts up", Vec::new(), ticks())
        .unwrap();

    registry
        .add_provider("chat", "Chat service", Vec::new())
        .unwrap()
        .add_group("messages", "", Vec::new())
        .unwrap()
        .add_action("echo", "", Vec::new(), upper())
        .unwrap();
    registry
}

#[tokio::test]
async fn resolves_and_runs_actions() {
    init_tracing();
    let registry = Arc::new(sample_registry());

    let binding = registry.get_action("text", "case", "upper").unwrap();
    let output = binding.run(json!("relay"), ActionContext::new()).await.unwrap();
    assert_eq!(output, json!("RELAY"));
}

#[test]
fn get_action_names_the_missing_level() {
    let registry = sample_registry();

    assert_eq!(
        registry.get_action("x", "case", "upper").unwrap_err(),
        NotFoundError::Provider { provider: "x".into() }
    );
    assert_eq!(
        registry.get_action("text", "x", "upper").unwrap_err(),
        NotFoundError::Group {
            provider: "text".into(),
            group: "x".into()
        }
    );
    assert_eq!(
        registry.get_action("text", "case", "x").unwrap_err(),
        NotFoundError::Action {
            provider: "text".into(),
            group: "case".into(),
            action: "x".into()
        }
    );
    assert!(registry.provider("x").is_none());
}

#[test]
fn listings_match_registrations() {
    let registry = sample_registry();

    let providers: HashSet<_> = registry.providers().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(providers, HashSet::from(["text".to_string(), "chat".to_string()]));

    let text = registry.provider("text").unwrap();
    let groups: HashSet<_> = text.groups().iter().map(|g| g.name().to_string()).collect();
    assert_eq!(groups, HashSet::from(["case".to_string(), "clock".to_string()]));

    let actions: HashSet<_> = text
        .group("case")
        .unwrap()
        .actions()
        .iter()
        .map(|b| b.name().to_string())
        .collect();
    assert_eq!(actions, HashSet::from(["upper".to_string(), "lower".to_string()]));

    let listing: HashSet<_> = registry
        .action_groups()
        .into_iter()
        .map(|g| (g.provider, g.name, g.actions.len()))
        .collect();
    assert_eq!(
        listing,
        HashSet::from([
            ("text".to_string(), "case".to_string(), 2),
            ("text".to_string(), "clock".to_string(), 1),
            ("chat".to_string(), "messages".to_string(), 1),
        ])
    );
}

#[tokio::test]
async fn duplicate_action_name_keeps_last_registration() {
    let mut registry = Registry::new();
    registry
        .add_provider("text", "", Vec::new())
        .unwrap()
        .add_group("case", "", Vec::new())
        .unwrap()
        .add_action("convert", "first", Vec::new(), upper())
        .unwrap()
        .add_action("convert", "second", Vec::new(),
            action_fn(|s: String, _ctx: ActionContext| async move { Ok::<_, ActionError>(s.len()) }))
        .unwrap();

    let group = registry.provider("text").unwrap().group("case").unwrap();
    assert_eq!(group.len(), 1);

    let binding = registry.get_action("text", "case", "convert").unwrap();
    assert_eq!(binding.info().descriptor.description, "second");
    assert_eq!(binding.run(json!("abc"), ActionContext::new()).await.unwrap(), json!(3));
}

#[test]
fn duplicate_provider_name_replaces_provider() {
    let mut registry = sample_registry();
    registry.add_provider("text", "Rebuilt", Vec::new()).unwrap();

    let text = registry.provider("text").unwrap();
    assert_eq!(text.descriptor().description, "Rebuilt");
    assert!(text.groups().is_empty());
    assert_eq!(registry.providers().len(), 2);
}

#[test]
fn invalid_registrations_fail_before_use() {
    let mut registry = Registry::new();
    assert!(matches!(
        registry.add_provider("", "", Vec::new()),
        Err(RelayError::Validation(ValidationError::EmptyName { .. }))
    ));

    let group = registry
        .add_provider("text", "", Vec::new())
        .unwrap()
        .add_group("clock", "", Vec::new())
        .unwrap();
    let err = group.add_trigger("tick", "", Vec::new(), ticks()).unwrap_err();
    assert!(matches!(
        err,
        RelayError::Validation(ValidationError::MissingTriggerPrefix { .. })
    ));
    assert!(group.action("tick").is_none());

    let provider = registry.provider_mut("text").unwrap();
    for name in ["", "../escape", "nested/oauth"] {
        let err = provider
            .add_requirement(Arc::new(ConfigRequirement::<OAuthClient>::new(name)))
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)), "accepted {:?}", name);
    }
    assert!(provider.requirements().is_empty());
}

#[tokio::test]
async fn cancelled_trigger_stops_delivering() {
    init_tracing();
    let registry = sample_registry();
    let env = Environment::with_store(RuntimeConfig::default(), Arc::new(MemoryConfigStore::new()));

    let binding = registry.get_action("text", "clock", "onTick").unwrap();
    assert!(binding.is_trigger());
    assert!(registry.type_registry().is_registered(binding.info().input_type.name));

    let ctx = env.context();
    let mut events = binding.start(json!(5), ctx.clone()).await.unwrap();
    assert_eq!(events.next().await, Some(Ok(json!(0))));
    assert_eq!(events.next().await, Some(Ok(json!(1))));

    env.shutdown();
    assert!(ctx.is_cancelled());
    let next = tokio::time::timeout(Duration::from_millis(500), events.next())
        .await
        .expect("stream must end within the grace period");
    assert_eq!(next, None);
}

#[tokio::test]
async fn malformed_requirement_blocks_provider() {
    let mut registry = Registry::new();

    let chat_oauth = Arc::new(ConfigRequirement::<OAuthClient>::new("oauth"));
    registry
        .add_provider("chat", "", Vec::new())
        .unwrap()
        .add_requirement(Arc::clone(&chat_oauth))
        .unwrap()
        .set_oauth_endpoint(OAuthEndpoint {
            auth_url: "https://chat.example/oauth/authorize".into(),
            token_url: "https://chat.example/oauth/token".into(),
        });

    let calendar_oauth = Arc::new(ConfigRequirement::<OAuthClient>::new("oauth"));
    registry
        .add_provider("calendar", "", Vec::new())
        .unwrap()
        .add_requirement(Arc::clone(&calendar_oauth))
        .unwrap();

    assert_eq!(chat_oauth.provider_name(), Some("chat"));

    let store = MemoryConfigStore::new()
        .with("chat", "oauth", json!({ "client_id": "a", "client_secret": "b" }))
        .with("calendar", "oauth", json!({ "client_id": ["not", "a", "string"] }));

    let err = registry.load_provider_configs(&store).await.unwrap_err();
    assert!(matches!(err, ConfigError::Malformed { ref provider, .. } if provider == "calendar"));
    assert!(!registry.provider("calendar").unwrap().is_available());
    assert!(!calendar_oauth.is_loaded());

    let summaries = registry.provider_summaries();
    let calendar = summaries.iter().find(|p| p.name == "calendar").unwrap();
    assert!(!calendar.available);
}

#[tokio::test]
async fn all_requirements_loaded_makes_providers_available() {
    let mut registry = Registry::new();
    let oauth = Arc::new(ConfigRequirement::<OAuthClient>::new("oauth"));
    let limits = Arc::new(ConfigRequirement::with_default("limits", 100u32));
    registry
        .add_provider("chat", "", Vec::new())
        .unwrap()
        .add_requirement(Arc::clone(&oauth))
        .unwrap()
        .add_requirement(Arc::clone(&limits))
        .unwrap();
    assert!(!registry.provider("chat").unwrap().is_available());

    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("chat")).unwrap();
    std::fs::write(
        dir.path().join("chat").join("oauth.json"),
        br#"{ "client_id": "id", "client_secret": "secret", "scopes": ["chat:write"] }"#,
    )
    .unwrap();

    let config = RuntimeConfig {
        config_dir: Some(dir.path().to_path_buf()),
        ..RuntimeConfig::default()
    };
    let env = Environment::new(config);

    registry.load_provider_configs(env.config_store().as_ref()).await.unwrap();
    assert!(registry.provider("chat").unwrap().is_available());
    assert_eq!(oauth.get().unwrap().scopes, vec!["chat:write".to_string()]);
    assert_eq!(limits.get(), Ok(&100));
}

#[tokio::test]
async fn config_loading_stops_at_first_failing_provider() {
    for _ in 0..10 {
        let mut registry = Registry::new();
        let broken = Arc::new(ConfigRequirement::<OAuthClient>::new("oauth"));
        let healthy = Arc::new(ConfigRequirement::<OAuthClient>::new("oauth"));
        registry
            .add_provider("alpha", "", Vec::new())
            .unwrap()
            .add_requirement(Arc::clone(&broken))
            .unwrap();
        registry
            .add_provider("beta", "", Vec::new())
            .unwrap()
            .add_requirement(Arc::clone(&healthy))
            .unwrap();

        let store = MemoryConfigStore::new()
            .with("alpha", "oauth", json!({ "client_id": 1 }))
            .with("beta", "oauth", json!({ "client_id": "id", "client_secret": "s" }));

        let err = registry.load_provider_configs(&store).await.unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref provider, .. } if provider == "alpha"));
        assert!(!registry.provider("alpha").unwrap().is_available());
        assert!(!registry.provider("beta").unwrap().is_available());
    }
}
