
use common::*;
use hearth::{by_key, descending, memory::MemoryBackend, BackendError, MutationError, UpdateCause};

#[tokio::test(start_paused = true)]
async fn test_remove_where_deletes_matching() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "done", 0), item("b", "ann", "todo", 1), item("c", "ann", "done", 2)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    assert_eq!(items.remove_where(|i| i.text == "done").await?, 2);
    settle().await;

    assert_eq!(ids(&items.snapshot()), vec!["b"]);
    assert_eq!(ids(&backend.rows(ITEMS)), vec!["b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_remove_where_rolls_back_only_failed_deletes() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "done", 0), item("b", "ann", "todo", 1), item("c", "ann", "done", 2)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    // the first delete dispatched is refused
    backend.fail_next_mutation(BackendError::Rejected("locked".into()));
    let result = items.remove_where(|i| i.text == "done").await;
    assert!(matches!(result, Err(MutationError::Rejected(_))), "{:?}", result);
    settle().await;

    assert_eq!(ids(&items.snapshot()), vec!["a", "b"]);
    assert_eq!(ids(&backend.rows(ITEMS)), vec!["a", "b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_update_many_reorders() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "", 0), item("b", "ann", "", 1), item("c", "ann", "", 2)]);
    let (items, _check) = open_items(&backend, items_config()).await?;

    let saved = items.update_many(vec![item("c", "ann", "", -1), item("a", "ann", "", 5)]).await?;
    assert_eq!(saved.len(), 2);
    settle().await;

    assert_eq!(ids(&items.snapshot()), vec!["c", "b", "a"]);
    assert_eq!(backend.get(ITEMS, &"a".to_string()).map(|i| i.rank), Some(5));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_set_ordering_resorts() -> anyhow::Result<()> {
    let backend = MemoryBackend::<Item>::new();
    backend.seed(ITEMS, vec![item("a", "ann", "x", 0), item("b", "ann", "y", 1), item("c", "ann", "z", 2)]);
    let (items, check) = open_items(&backend, items_config()).await?;
    check();

    items.set_ordering(descending(by_key(|i: &Item| i.rank)));
    assert_eq!(ids(&items.snapshot()), vec!["c", "b", "a"]);
    assert_eq!(check(), vec![UpdateCause::Reordered]);

    // later remote inserts follow the new order
    backend.insert_remote(ITEMS, item("d", "bob", "", 1));
    settle().await;
    assert_eq!(ids(&items.snapshot()), vec!["c", "b", "d", "a"]);
    Ok(())
}
