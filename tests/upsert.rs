//! Upsert protocol tests against a mocked artifact store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use registry_synth::config::{ConfigHasher, ConfigResolver, SpecParser};
use registry_synth::error::{PersistError, Result, SynthError};
use registry_synth::persist::{
    Artifact, ArtifactMeta, ArtifactStore, CONTENT_CHECKSUM_ANNOTATION, ConfigPersister, LocalArtifactStore,
    MemoryArtifactStore, OwnerReference, RetryPolicy, UpsertOutcome,
};

mock! {
    pub Store {}

    #[async_trait]
    impl ArtifactStore for Store {
        async fn get(&self, namespace: &str, name: &str) -> Result<Option<Artifact>>;
        async fn create(&self, artifact: &Artifact) -> Result<Artifact>;
        async fn update(&self, artifact: &Artifact) -> Result<Artifact>;
        async fn delete(&self, namespace: &str, name: &str) -> Result<bool>;
        fn backend_type(&self) -> &'static str;
    }
}

const NAMESPACE: &str = "tools";
const NAME: &str = "reg-registry-server-config";

fn owner() -> OwnerReference {
    OwnerReference {
        api_version: String::from("registry.dev/v1alpha1"),
        kind: String::from("Registry"),
        name: String::from("reg"),
        uid: String::from("7f1c2a9e-0000-4000-8000-000000000001"),
        controller: true,
        block_owner_deletion: true,
    }
}

fn artifact(content: &str) -> Artifact {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        String::from(CONTENT_CHECKSUM_ANNOTATION),
        ConfigHasher::new().checksum(content.as_bytes()),
    );
    let mut data = BTreeMap::new();
    data.insert(String::from("config.yaml"), content.to_string());

    Artifact {
        metadata: ArtifactMeta {
            name: String::from(NAME),
            namespace: String::from(NAMESPACE),
            annotations,
            ..ArtifactMeta::default()
        },
        data,
    }
}

fn stored(content: &str, version: &str) -> Artifact {
    let mut artifact = artifact(content);
    artifact.metadata.uid = String::from("stored-uid");
    artifact.metadata.resource_version = version.to_string();
    artifact.metadata.owner_references = vec![owner()];
    artifact
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        factor: 2,
        max_backoff: Duration::from_millis(2),
    }
}

fn mock_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_backend_type().return_const("mock");
    store
}

#[tokio::test]
async fn absent_artifact_is_created_once_with_owner() {
    let mut store = mock_store();
    store
        .expect_get()
        .withf(|ns, name| ns == NAMESPACE && name == NAME)
        .times(1)
        .returning(|_, _| Ok(None));
    store
        .expect_create()
        .withf(|a| a.metadata.owner_references == vec![owner()] && a.checksum().is_some())
        .times(1)
        .returning(|a| {
            let mut out = a.clone();
            out.metadata.resource_version = String::from("1");
            Ok(out)
        });
    store.expect_update().never();

    let persister = ConfigPersister::new(store).with_policy(fast_policy(3));
    let outcome = persister.upsert(&artifact("a: 1"), &owner()).await.expect("upsert");

    assert!(matches!(outcome, UpsertOutcome::Created(_)));
}

#[tokio::test]
async fn identical_checksum_issues_no_write() {
    let mut store = mock_store();
    store
        .expect_get()
        .times(1)
        .returning(|_, _| Ok(Some(stored("a: 1", "7"))));
    store.expect_create().never();
    store.expect_update().never();

    let persister = ConfigPersister::new(store);
    let outcome = persister.upsert(&artifact("a: 1"), &owner()).await.expect("upsert");

    assert!(matches!(outcome, UpsertOutcome::Unchanged(_)));
    assert_eq!(outcome.artifact().metadata.resource_version, "7");
}

#[tokio::test]
async fn changed_checksum_updates_with_prior_version_and_identity() {
    let mut store = mock_store();
    store
        .expect_get()
        .times(1)
        .returning(|_, _| Ok(Some(stored("a: 1", "7"))));
    store.expect_create().never();
    store
        .expect_update()
        .withf(|a| {
            a.metadata.resource_version == "7"
                && a.metadata.uid == "stored-uid"
                && a.metadata.owner_references == vec![owner()]
                && a.data["config.yaml"] == "a: 2"
        })
        .times(1)
        .returning(|a| {
            let mut out = a.clone();
            out.metadata.resource_version = String::from("8");
            Ok(out)
        });

    let persister = ConfigPersister::new(store);
    let outcome = persister.upsert(&artifact("a: 2"), &owner()).await.expect("upsert");

    assert!(matches!(outcome, UpsertOutcome::Updated(_)));
    assert_eq!(outcome.artifact().metadata.resource_version, "8");
}

#[tokio::test]
async fn create_race_retries_the_whole_cycle() {
    let gets = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&gets);

    let mut store = mock_store();
    store.expect_get().times(2).returning(move |_, _| {
        // First read sees nothing, second read sees the concurrent writer's artifact
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(None)
        } else {
            Ok(Some(stored("a: 1", "1")))
        }
    });
    store.expect_create().times(1).returning(|a| {
        Err(SynthError::from(PersistError::AlreadyExists { key: a.key() }))
    });
    store.expect_update().never();

    let persister = ConfigPersister::new(store).with_policy(fast_policy(3));
    let outcome = persister.upsert(&artifact("a: 1"), &owner()).await.expect("upsert");

    assert!(matches!(outcome, UpsertOutcome::Unchanged(_)));
    assert_eq!(gets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stale_update_is_retried_after_a_fresh_read() {
    let updates = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&updates);

    let mut store = mock_store();
    store
        .expect_get()
        .times(2)
        .returning(|_, _| Ok(Some(stored("a: 1", "7"))));
    store.expect_update().times(2).returning(move |a| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(SynthError::from(PersistError::conflict(a.key(), "stale version")))
        } else {
            Ok(a.clone())
        }
    });

    let persister = ConfigPersister::new(store).with_policy(fast_policy(5));
    let outcome = persister.upsert(&artifact("a: 2"), &owner()).await.expect("upsert");

    assert!(matches!(outcome, UpsertOutcome::Updated(_)));
    assert_eq!(updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_conflicts_exhaust_the_policy() {
    let mut store = mock_store();
    store
        .expect_get()
        .times(3)
        .returning(|_, _| Ok(Some(stored("a: 1", "7"))));
    store
        .expect_update()
        .times(3)
        .returning(|a| Err(SynthError::from(PersistError::conflict(a.key(), "stale version"))));

    let persister = ConfigPersister::new(store).with_policy(fast_policy(3));
    let err = persister.upsert(&artifact("a: 2"), &owner()).await.expect_err("should give up");

    assert!(matches!(
        err,
        SynthError::Persist(PersistError::RetriesExhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn backend_failure_is_surfaced_without_retry() {
    let mut store = mock_store();
    store
        .expect_get()
        .times(1)
        .returning(|_, _| Ok(Some(stored("a: 1", "7"))));
    store.expect_update().times(1).returning(|a| {
        Err(SynthError::from(PersistError::backend("update", a.key(), "access denied")))
    });

    let persister = ConfigPersister::new(store).with_policy(fast_policy(5));
    let err = persister.upsert(&artifact("a: 2"), &owner()).await.expect_err("should fail");

    assert!(err.to_string().contains("access denied"));
    assert!(!err.is_conflict());
}

const MANIFEST: &str = r"
apiVersion: registry.dev/v1alpha1
kind: Registry
metadata:
  name: reg
  namespace: tools
  uid: 7f1c2a9e-0000-4000-8000-000000000001
spec:
  registries:
    - name: primary
      configMapRef:
        name: primary-registry
        key: registry.json
      syncPolicy:
        interval: 5m
    - name: secondary
      configMapRef:
        name: secondary-registry
        key: registry.json
      syncPolicy:
        interval: 10m
";

#[tokio::test]
async fn resolved_config_round_trips_through_memory_store() {
    let manifest = SpecParser::new().parse_yaml(MANIFEST, None).expect("parse");
    let config = ConfigResolver::new().resolve(&manifest).expect("resolve");
    let persister = ConfigPersister::new(MemoryArtifactStore::new());

    let first = persister
        .persist_config(&config, manifest.namespace(), &manifest.owner_reference())
        .await
        .expect("first apply");
    assert!(matches!(first, UpsertOutcome::Created(_)));
    assert_eq!(first.artifact().metadata.name, NAME);
    assert_eq!(first.artifact().checksum(), Some(config.to_checksum().expect("checksum").as_str()));

    let second = persister
        .persist_config(&config, manifest.namespace(), &manifest.owner_reference())
        .await
        .expect("second apply");
    assert!(!second.is_write());

    let mut changed = config.clone();
    if let Some(policy) = changed.registries[1].sync_policy.as_mut() {
        policy.interval = String::from("15m");
    }
    let third = persister
        .persist_config(&changed, manifest.namespace(), &manifest.owner_reference())
        .await
        .expect("third apply");
    assert!(matches!(third, UpsertOutcome::Updated(_)));
    assert_eq!(third.artifact().metadata.uid, first.artifact().metadata.uid);
    assert!(third.artifact().data["config.yaml"].contains("15m"));
}

#[tokio::test]
async fn resolved_config_round_trips_through_local_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manifest = SpecParser::new().parse_yaml(MANIFEST, None).expect("parse");
    let config = ConfigResolver::new().resolve(&manifest).expect("resolve");

    let persister = ConfigPersister::new(LocalArtifactStore::with_base_dir(dir.path()));
    let first = persister
        .persist_config(&config, manifest.namespace(), &manifest.owner_reference())
        .await
        .expect("first apply");
    assert!(first.is_write());

    // A fresh store over the same directory sees the artifact
    let reopened = ConfigPersister::new(LocalArtifactStore::with_base_dir(dir.path()));
    let second = reopened
        .persist_config(&config, manifest.namespace(), &manifest.owner_reference())
        .await
        .expect("second apply");
    assert!(matches!(second, UpsertOutcome::Unchanged(_)));

    assert!(reopened.delete(NAMESPACE, NAME).await.expect("delete"));
    assert!(reopened.get(NAMESPACE, NAME).await.expect("get").is_none());
}
