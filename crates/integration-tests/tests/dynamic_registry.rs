//! Registry and expansion against a real SQLite store

use dynaq_core::application::{
    DynamicQueueRegistry, SelectorConfig, WeightedQueueSelector,
};
use dynaq_core::domain::DomainError;
use dynaq_core::error::AppError;
use dynaq_core::port::{DynamicQueueStore, HostIdentity, StaticHostIdentity};
use dynaq_infra_sqlite::{create_pool, run_migrations, SqliteDynamicQueueStore};
use dynaq_infra_system::SystemHostIdentity;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Setup {
    store: Arc<SqliteDynamicQueueStore>,
    registry: Arc<DynamicQueueRegistry>,
    selector: WeightedQueueSelector,
}

async fn setup(hostname: &str) -> Setup {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteDynamicQueueStore::new(pool));
    let registry = Arc::new(DynamicQueueRegistry::new(store.clone()));
    let host: Arc<dyn HostIdentity> = Arc::new(StaticHostIdentity::new(hostname));
    let selector = WeightedQueueSelector::new(registry.clone(), host, SelectorConfig::default());
    Setup {
        store,
        registry,
        selector,
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_fallback_chain_over_sqlite() {
    let s = setup("worker-1").await;

    assert_eq!(s.registry.get("worker-1").await.unwrap(), list(&["*"]));

    s.registry.set("default", &list(&["mail"])).await.unwrap();
    assert_eq!(s.registry.get("worker-1").await.unwrap(), list(&["mail"]));

    s.registry
        .set("worker-1", &list(&["reports", "mail"]))
        .await
        .unwrap();
    assert_eq!(
        s.registry.get("worker-1").await.unwrap(),
        list(&["reports", "mail"])
    );
}

#[tokio::test]
async fn test_replace_all_round_trip() {
    let s = setup("worker-1").await;
    s.registry.set("stale", &list(&["old"])).await.unwrap();

    let mut mapping = BTreeMap::new();
    mapping.insert("worker-1".to_string(), list(&["mail*", "!mail_bulk"]));
    mapping.insert("worker-2".to_string(), list(&["@worker-1", "reports"]));
    mapping.insert("empty".to_string(), vec![]);
    s.registry.replace_all(&mapping).await.unwrap();

    let all = s.registry.get_all().await.unwrap();
    assert_eq!(all.get("worker-1"), Some(&list(&["mail*", "!mail_bulk"])));
    assert_eq!(all.get("worker-2"), Some(&list(&["@worker-1", "reports"])));
    assert_eq!(all.get("default"), Some(&list(&["*"])));
    assert!(!all.contains_key("stale"));
    assert!(!all.contains_key("empty"));
}

#[tokio::test]
async fn test_malformed_entry_reads_as_empty() {
    let s = setup("worker-1").await;
    s.store.put("worker-1", "{not json").await.unwrap();
    s.registry.set("default", &list(&["mail"])).await.unwrap();

    assert_eq!(s.registry.get("worker-1").await.unwrap(), list(&["mail"]));
    assert_eq!(s.registry.get_all().await.unwrap()["worker-1"], Vec::<String>::new());
}

#[tokio::test]
async fn test_host_reference_expands_stored_entry() {
    let s = setup("worker-1").await;
    s.registry
        .set("worker-1", &list(&["mail*", "!mail_bulk"]))
        .await
        .unwrap();

    let real = list(&["mail", "mail_bulk", "mail_urgent", "reports"]);
    let weights = s.selector.expand(&list(&["@", "reports"]), &real).await.unwrap();

    // @ contributes two names, reports one: LCM 2 gives reports twice the share
    assert_eq!(weights.weight("mail"), Some(1));
    assert_eq!(weights.weight("mail_urgent"), Some(1));
    assert_eq!(weights.weight("reports"), Some(2));
    assert!(!weights.contains("mail_bulk"));
}

#[tokio::test]
async fn test_negated_reference_removes_its_queues() {
    let s = setup("worker-1").await;
    s.registry.set("batch", &list(&["reports", "exports"])).await.unwrap();

    let real = list(&["exports", "mail", "reports"]);
    let weights = s.selector.expand(&list(&["*", "!@batch"]), &real).await.unwrap();

    assert_eq!(weights.names().collect::<Vec<_>>(), vec!["mail"]);
}

#[tokio::test]
async fn test_cycle_in_stored_registry_is_reported() {
    let s = setup("worker-1").await;
    s.registry.set("a", &list(&["@b"])).await.unwrap();
    s.registry.set("b", &list(&["@a"])).await.unwrap();

    let err = s
        .selector
        .next_poll_order(&list(&["@a"]), &list(&["mail"]), false)
        .await
        .unwrap_err();

    assert!(err.is_configuration_error());
    match err {
        AppError::Domain(DomainError::ReferenceCycle { chain }) => {
            assert_eq!(chain, list(&["a", "b", "a"]));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_system_hostname_keys_the_registry() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let registry = Arc::new(DynamicQueueRegistry::new(Arc::new(
        SqliteDynamicQueueStore::new(pool),
    )));

    let host = Arc::new(SystemHostIdentity::new());
    registry.set(&host.hostname(), &list(&["mail"])).await.unwrap();

    let selector = WeightedQueueSelector::new(registry, host, SelectorConfig::default());
    let order = selector
        .next_poll_order(&list(&["@"]), &list(&["mail", "reports"]), true)
        .await
        .unwrap();
    assert_eq!(order.queue_keys(), &["queue:mail"]);
}
