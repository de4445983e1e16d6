
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::*;
use hearth::{memory::MemoryBackend, Applied, BackendError, ChangeEvent, ConnectionState, LocalWrite, MutationError, UpdateCause};

#[tokio::test(start_paused = true)]
async fn test_add_then_echo_yields_single_entry() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    let (items, check) = open_items(&backend, items_config()).await?;
    assert_eq!(check(), vec![UpdateCause::Connection(ConnectionState::Connected), UpdateCause::Initialized]);

    // the echo reaches the feed before the write's response
    backend.set_mutation_delay(Duration::from_millis(100));
    let milk = item("a", "ann", "milk", 0);
    let (result, ()) = tokio::join!(items.insert(milk.clone()), async {
        settle().await;
        assert_eq!(items.snapshot(), vec![milk.clone()]);
        assert!(!items.is_pending(&"a".to_string()));
    });

    assert_eq!(result?, milk);
    assert_eq!(items.snapshot(), vec![milk]);
    assert_eq!(check(), vec![UpdateCause::Local(LocalWrite::Insert("a".to_string()))]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_remote_insert_is_ordered() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("x", "ann", "bread", 1)]);
    let (items, check) = open_items(&backend, items_config()).await?;
    check();

    backend.insert_remote(ITEMS, item("y", "bob", "eggs", 0));
    settle().await;

    assert_eq!(ids(&items.snapshot()), vec!["y", "x"]);
    assert_eq!(check(), vec![UpdateCause::Remote(Applied::Inserted("y".to_string()))]);

    // a remote rank change moves the record
    backend.update_remote(ITEMS, item("x", "ann", "bread", -1));
    settle().await;
    assert_eq!(ids(&items.snapshot()), vec!["x", "y"]);
    assert_eq!(check(), vec![UpdateCause::Remote(Applied::Updated("x".to_string()))]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_update_rolls_back() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "old", 0)]);
    let (items, check) = open_items(&backend, items_config()).await?;
    check();

    backend.fail_next_mutation(BackendError::Rejected("row level security".into()));
    let result = items.update(item("a", "ann", "new", 0)).await;

    assert!(matches!(result, Err(MutationError::Rejected(BackendError::Rejected(_)))), "{:?}", result);
    assert_eq!(items.snapshot(), vec![item("a", "ann", "old", 0)]);
    assert!(!items.is_pending(&"a".to_string()));
    assert_eq!(
        check(),
        vec![UpdateCause::Local(LocalWrite::Update("a".to_string())), UpdateCause::RolledBack("a".to_string())]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_insert_and_remove_roll_back() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "kept", 0)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    backend.fail_next_mutation(BackendError::ConnectionClosed);
    assert!(items.insert(item("b", "ann", "lost", 1)).await.is_err());
    assert_eq!(ids(&items.snapshot()), vec!["a"]);

    backend.fail_next_mutation(BackendError::ConnectionClosed);
    assert!(items.remove("a".to_string()).await.is_err());
    assert_eq!(items.snapshot(), vec![item("a", "ann", "kept", 0)]);

    // a rejected insert never reached the tables
    settle().await;
    assert_eq!(ids(&backend.rows(ITEMS)), vec!["a"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_event_does_not_clobber_pending_update() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "old", 0)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    // an event carrying the pre-write value is already queued when the user edits, and both events are processed
    // before the write's response comes back
    backend.set_mutation_delay(Duration::from_millis(50));
    backend.emit(ITEMS, ChangeEvent::Updated(item("a", "ann", "old", 0)));
    items.update(item("a", "ann", "new", 0)).await?;
    settle().await;

    assert_eq!(texts(&items.snapshot()), vec!["new"]);
    assert!(!items.is_pending(&"a".to_string()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_never_show_an_older_value() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "v0", 0)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _guard = items.listen({
        let seen = seen.clone();
        move |update| seen.lock().unwrap().extend(texts(&update.snapshot).into_iter().map(str::to_owned))
    });

    // both echoes arrive before either response
    backend.set_mutation_delay(Duration::from_millis(100));
    let (first, second) = tokio::join!(items.update(item("a", "ann", "v1", 0)), items.update(item("a", "ann", "v2", 0)));
    first?;
    second?;
    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec!["v1", "v2"]);
    assert_eq!(texts(&items.snapshot()), vec!["v2"]);
    assert!(!items.is_pending(&"a".to_string()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_earlier_edit_keeps_later_one() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "v0", 0)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    backend.set_mutation_delay(Duration::from_millis(100));
    backend.fail_next_mutation(BackendError::ConnectionClosed);
    let (first, second) = tokio::join!(items.update(item("a", "ann", "v1", 0)), items.update(item("a", "ann", "v2", 0)));
    assert!(first.is_err());
    second?;
    settle().await;

    assert_eq!(texts(&items.snapshot()), vec!["v2"]);
    assert_eq!(backend.get(ITEMS, &"a".to_string()).map(|i| i.text), Some("v2".to_string()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_events_are_idempotent() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    let (items, check) = open_items(&backend, items_config()).await?;
    check();

    backend.insert_remote(ITEMS, item("b", "bob", "tea", 0));
    backend.emit(ITEMS, ChangeEvent::Created(item("b", "bob", "tea", 0)));
    settle().await;
    assert_eq!(items.snapshot(), vec![item("b", "bob", "tea", 0)]);

    backend.delete_remote(ITEMS, "b".to_string());
    backend.emit(ITEMS, ChangeEvent::Deleted("b".to_string()));
    settle().await;
    assert!(items.snapshot().is_empty());

    assert_eq!(
        check(),
        vec![UpdateCause::Remote(Applied::Inserted("b".to_string())), UpdateCause::Remote(Applied::Removed("b".to_string()))]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_assigned_id_replaces_placeholder() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.set_canonicalizer(|_, mut record: Item| {
        if let Some(suffix) = record.id.strip_prefix("tmp-").map(str::to_owned) {
            record.id = format!("srv-{}", suffix);
        }
        Ok(record)
    });
    let (items, _check) = open_items(&backend, items_config()).await?;

    let canonical = items.insert(item("tmp-1", "ann", "soap", 0)).await?;
    assert_eq!(canonical.id, "srv-1");
    settle().await;

    assert_eq!(ids(&items.snapshot()), vec!["srv-1"]);
    assert!(!items.is_pending(&"tmp-1".to_string()));
    assert_eq!(ids(&backend.rows(ITEMS)), vec!["srv-1"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_assigned_id_never_shows_twice() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.set_canonicalizer(|_, mut record: Item| {
        if let Some(suffix) = record.id.strip_prefix("tmp-").map(str::to_owned) {
            record.id = format!("srv-{}", suffix);
        }
        Ok(record)
    });
    let (items, check) = open_items(&backend, items_config()).await?;
    check();

    // the echo under the server's id arrives while the response is still in flight
    backend.set_mutation_delay(Duration::from_millis(100));
    let (canonical, ()) = tokio::join!(items.insert(item("tmp-1", "ann", "soap", 0)), async {
        settle().await;
        assert_eq!(ids(&items.snapshot()), vec!["tmp-1"]);

        // another client's insert waits for the placeholder to settle
        backend.insert_remote(ITEMS, item("b", "bob", "eggs", 1));
        settle().await;
        assert_eq!(ids(&items.snapshot()), vec!["tmp-1"]);
    });

    assert_eq!(canonical?.id, "srv-1");
    assert_eq!(ids(&items.snapshot()), vec!["srv-1", "b"]);
    assert_eq!(
        check(),
        vec![UpdateCause::Local(LocalWrite::Insert("tmp-1".to_string())), UpdateCause::Confirmed("tmp-1".to_string())]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_local_insert_is_a_conflict() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "", 0)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    let result = items.insert(item("a", "ann", "again", 0)).await;
    assert!(matches!(result, Err(MutationError::Conflict(_))), "{:?}", result);
    assert_eq!(backend.mutation_count(), 0);
    Ok(())
}
