
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use common::{settle, update_watcher};
use hearth::{
    memory::MemoryBackend,
    model::{
        self, reorder_categories, CalendarEvent, Collection, EventKind, FamilyMember, FavoriteMeal, Film, PackingItem, Role,
        ShoppingItem, Trip, TripKind,
    },
};
use uuid::Uuid;

fn shopping(user: Uuid, name: &str, minutes_ago: i64) -> ShoppingItem {
    let mut item = ShoppingItem::new(user, name, None);
    item.created_at = Utc::now() - Duration::minutes(minutes_ago);
    item
}

fn names(items: &[ShoppingItem]) -> Vec<&str> { items.iter().map(|i| i.name.as_str()).collect() }

#[tokio::test(start_paused = true)]
async fn test_shopping_list_is_scoped_and_newest_first() -> anyhow::Result<()> {
    let (me, someone_else) = (Uuid::new_v4(), Uuid::new_v4());
    let backend = MemoryBackend::<ShoppingItem>::new();
    backend.seed(
        ShoppingItem::collection(),
        vec![shopping(me, "bread", 10), shopping(someone_else, "wine", 5), shopping(me, "milk", 1)],
    );

    let (watcher, _check) = update_watcher::<ShoppingItem>();
    let list = model::open::<ShoppingItem>(Arc::new(backend.clone()), me, watcher);
    list.wait_ready().await?;
    assert_eq!(names(&list.snapshot()), vec!["milk", "bread"]);

    // other users' rows never reach this collection
    backend.insert_remote(ShoppingItem::collection(), shopping(someone_else, "cheese", 0));
    backend.insert_remote(ShoppingItem::collection(), shopping(me, "eggs", 0));
    settle().await;
    assert_eq!(names(&list.snapshot()), vec!["eggs", "milk", "bread"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_delete_all_checked_items() -> anyhow::Result<()> {
    let me = Uuid::new_v4();
    let backend = MemoryBackend::<ShoppingItem>::new();
    backend.seed(ShoppingItem::collection(), vec![shopping(me, "bread", 3), shopping(me, "milk", 2), shopping(me, "soap", 1)]);

    let (watcher, _check) = update_watcher::<ShoppingItem>();
    let list = model::open::<ShoppingItem>(Arc::new(backend.clone()), me, watcher);
    list.wait_ready().await?;

    let to_check: Vec<ShoppingItem> = list.snapshot().iter().filter(|i| i.name != "milk").map(ShoppingItem::toggled).collect();
    list.update_many(to_check).await?;
    assert_eq!(list.remove_where(|i| i.checked).await?, 2);
    settle().await;

    assert_eq!(names(&list.snapshot()), vec!["milk"]);
    assert_eq!(names(&backend.rows(ShoppingItem::collection())), vec!["milk"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_packing_categories_reorder() -> anyhow::Result<()> {
    let me = Uuid::new_v4();
    let backend = MemoryBackend::<PackingItem>::new();
    let mut socks = PackingItem::new(me, "socks", Some("clothes".into()), 0);
    let mut shirt = PackingItem::new(me, "shirt", Some("clothes".into()), 0);
    let brush = PackingItem::new(me, "toothbrush", Some("bathroom".into()), 1);
    socks.created_at = brush.created_at - Duration::seconds(2);
    shirt.created_at = brush.created_at - Duration::seconds(1);
    backend.seed(PackingItem::collection(), vec![socks, shirt, brush]);

    let (watcher, _check) = update_watcher::<PackingItem>();
    let packing = model::open::<PackingItem>(Arc::new(backend.clone()), me, watcher);
    packing.wait_ready().await?;
    let order = |items: &[PackingItem]| items.iter().map(|i| i.item.clone()).collect::<Vec<_>>();
    assert_eq!(order(&packing.snapshot()), vec!["socks", "shirt", "toothbrush"]);

    let moved = reorder_categories(&packing.snapshot(), &["bathroom", "clothes"]);
    assert_eq!(moved.len(), 3);
    packing.update_many(moved).await?;

    assert_eq!(order(&packing.snapshot()), vec!["toothbrush", "socks", "shirt"]);
    settle().await;
    assert_eq!(order(&packing.snapshot()), vec!["toothbrush", "socks", "shirt"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_calendar_sorted_by_date() -> anyhow::Result<()> {
    let me = Uuid::new_v4();
    let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date");
    let backend = MemoryBackend::<CalendarEvent>::new();
    backend.seed(
        CalendarEvent::collection(),
        vec![
            CalendarEvent::new(me, "dentist", day(12), EventKind::Appointment),
            CalendarEvent::new(me, "grandma", day(3), EventKind::Birthday),
        ],
    );

    let (watcher, _check) = update_watcher::<CalendarEvent>();
    let calendar = model::open::<CalendarEvent>(Arc::new(backend.clone()), me, watcher);
    calendar.wait_ready().await?;

    calendar.insert(CalendarEvent::new(me, "school trip", day(7), EventKind::Other)).await?;
    let titles: Vec<String> = calendar.snapshot().iter().map(|e| e.title.clone()).collect();
    assert_eq!(titles, vec!["grandma", "school trip", "dentist"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_family_members_parents_first() -> anyhow::Result<()> {
    let me = Uuid::new_v4();
    let backend = MemoryBackend::<FamilyMember>::new();
    backend.seed(
        FamilyMember::collection(),
        vec![FamilyMember::new(me, "Lou", "Martin", Role::Enfant), FamilyMember::new(me, "Claire", "Martin", Role::Maman)],
    );

    let (watcher, _check) = update_watcher::<FamilyMember>();
    let family = model::open::<FamilyMember>(Arc::new(backend.clone()), me, watcher);
    family.wait_ready().await?;

    family.insert(FamilyMember::new(me, "Marc", "Martin", Role::Papa)).await?;
    let names: Vec<String> = family.snapshot().iter().map(|m| m.first_name.clone()).collect();
    assert_eq!(names, vec!["Marc", "Claire", "Lou"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_trips_favorites_and_films_orderings() -> anyhow::Result<()> {
    let me = Uuid::new_v4();
    let day = |d| NaiveDate::from_ymd_opt(2026, 8, d).expect("valid date");

    let trips = MemoryBackend::<Trip>::new();
    trips.seed(
        Trip::collection(),
        vec![Trip::new(me, "Lisbonne", day(20), TripKind::Voyage), Trip::new(me, "Annecy", day(2), TripKind::Weekend)],
    );
    let (watcher, _check) = update_watcher::<Trip>();
    let trip_list = model::open::<Trip>(Arc::new(trips.clone()), me, watcher);
    trip_list.wait_ready().await?;
    let destinations: Vec<String> = trip_list.snapshot().iter().map(|t| t.destination.clone()).collect();
    assert_eq!(destinations, vec!["Annecy", "Lisbonne"]);

    let favorites = MemoryBackend::<FavoriteMeal>::new();
    favorites.seed(
        FavoriteMeal::collection(),
        vec![FavoriteMeal::new(me, "tartiflette", None), FavoriteMeal::new(me, "Couscous", Some("plat".into()))],
    );
    let (watcher, _check) = update_watcher::<FavoriteMeal>();
    let favorite_list = model::open::<FavoriteMeal>(Arc::new(favorites.clone()), me, watcher);
    favorite_list.wait_ready().await?;
    favorite_list.insert(FavoriteMeal::new(me, "lasagnes", None)).await?;
    let meals: Vec<String> = favorite_list.snapshot().iter().map(|m| m.name.clone()).collect();
    assert_eq!(meals, vec!["Couscous", "lasagnes", "tartiflette"]);

    let films = MemoryBackend::<Film>::new();
    let mut older = Film::new(me, "Le Grand Bleu");
    older.created_at = Utc::now() - Duration::days(3);
    films.seed(Film::collection(), vec![older]);
    let (watcher, _check) = update_watcher::<Film>();
    let film_list = model::open::<Film>(Arc::new(films.clone()), me, watcher);
    film_list.wait_ready().await?;
    film_list.insert(Film::new(me, "Amélie")).await?;
    let titles: Vec<String> = film_list.snapshot().iter().map(|f| f.title.clone()).collect();
    assert_eq!(titles, vec!["Amélie", "Le Grand Bleu"]);
    Ok(())
}
