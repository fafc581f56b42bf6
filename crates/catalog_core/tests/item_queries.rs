use catalog_core::db::open_db_in_memory;
use catalog_core::{Item, ItemId, ItemQuery, ItemRepository, NewItem, SqliteItemRepository};
use rusqlite::Connection;
use std::collections::BTreeSet;

fn seed(conn: &Connection) {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    let rows = [
        ("Abbey Road", "Beatles", 1969, "Rock", 5),
        ("Revolver", "Beatles", 1966, "Rock", 5),
        ("Kind of Blue", "Miles Davis", 1959, "Jazz", 5),
        ("Bitches Brew", "Miles Davis", 1970, "Jazz", 4),
        ("Blue Train", "John Coltrane", 1957, "Jazz", 4),
        ("Nevermind", "Nirvana", 1991, "Rock", 4),
        ("Homogenic", "Bjork", 1997, "Electronic", 3),
    ];
    for (name, artist, year, category, rating) in rows {
        repo.add_item(NewItem::new(name, artist, year, category, rating))
            .unwrap();
    }
}

fn ids(items: &[Item]) -> BTreeSet<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

fn owned(values: &[&str]) -> Vec<ItemId> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn by_category_returns_exactly_matching_items() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let jazz = repo.get_items_by_category("Jazz").unwrap();
    assert_eq!(
        ids(&jazz),
        BTreeSet::from([
            "John Coltrane-Blue Train".to_string(),
            "Miles Davis-Bitches Brew".to_string(),
            "Miles Davis-Kind of Blue".to_string(),
        ])
    );
    assert!(jazz.iter().all(|item| item.catalog_category == "Jazz"));

    let all = repo.find_items(&ItemQuery::all()).unwrap();
    let expected: BTreeSet<String> = all
        .iter()
        .filter(|item| item.catalog_category == "Jazz")
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(ids(&jazz), expected);
}

#[test]
fn category_match_is_exact() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    assert!(repo.get_items_by_category("rock").unwrap().is_empty());
    assert!(repo.get_items_by_category("Roc").unwrap().is_empty());
    assert!(repo.get_items_by_category("Polka").unwrap().is_empty());
}

#[test]
fn by_artist_returns_artist_items_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let beatles = repo.get_items_by_artist("Beatles").unwrap();
    let names: Vec<&str> = beatles.iter().map(|item| item.item_name.as_str()).collect();
    assert_eq!(names, vec!["Abbey Road", "Revolver"]);
}

#[test]
fn inclusion_and_exclusion_partition_the_collection() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let everything = ids(&repo.find_items(&ItemQuery::all()).unwrap());

    let id_sets = [
        owned(&[]),
        owned(&["Beatles-Abbey Road"]),
        owned(&["Beatles-Abbey Road", "Bjork-Homogenic", "Unknown-Missing"]),
        owned(&["Beatles-Revolver", "Beatles-Revolver"]),
        everything.iter().cloned().collect(),
    ];

    for id_set in id_sets {
        let included = ids(&repo.get_items(&id_set).unwrap());
        let excluded = ids(&repo.get_items_not_in_array(&id_set).unwrap());

        assert!(included.is_disjoint(&excluded), "overlap for {id_set:?}");
        let union: BTreeSet<String> = included.union(&excluded).cloned().collect();
        assert_eq!(union, everything, "not a partition for {id_set:?}");
    }
}

#[test]
fn empty_id_set_selects_nothing_and_excludes_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    assert!(repo.get_items(&[]).unwrap().is_empty());
    assert_eq!(repo.get_items_not_in_array(&[]).unwrap().len(), 7);
}

#[test]
fn not_owned_by_category_is_exclusion_intersected_with_category() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let owned_ids = owned(&[
        "Miles Davis-Kind of Blue",
        "Beatles-Abbey Road",
        "Bjork-Homogenic",
    ]);

    for category in ["Jazz", "Rock", "Electronic", "Polka"] {
        let not_owned = ids(
            &repo
                .get_items_not_owned_by_category(&owned_ids, category)
                .unwrap(),
        );
        let not_in = ids(&repo.get_items_not_in_array(&owned_ids).unwrap());
        let in_category = ids(&repo.get_items_by_category(category).unwrap());
        let expected: BTreeSet<String> = not_in.intersection(&in_category).cloned().collect();

        assert_eq!(not_owned, expected, "category {category}");
    }

    let jazz_not_owned = repo
        .get_items_not_owned_by_category(&owned_ids, "Jazz")
        .unwrap();
    assert_eq!(
        ids(&jazz_not_owned),
        BTreeSet::from([
            "John Coltrane-Blue Train".to_string(),
            "Miles Davis-Bitches Brew".to_string(),
        ])
    );
}

#[test]
fn combined_query_filters_by_artist_and_category() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let query = ItemQuery::all()
        .by_artist("Miles Davis")
        .in_category("Jazz")
        .without_ids(["Miles Davis-Bitches Brew"]);
    let items = repo.find_items(&query).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "Miles Davis-Kind of Blue");
}

#[test]
fn deleted_items_disappear_from_filtered_reads() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    repo.delete_item("Nirvana-Nevermind").unwrap();

    let rock = ids(&repo.get_items_by_category("Rock").unwrap());
    assert!(!rock.contains("Nirvana-Nevermind"));
    assert!(repo
        .get_items(&owned(&["Nirvana-Nevermind"]))
        .unwrap()
        .is_empty());
}

#[test]
fn id_sets_beyond_sqlite_variable_limit_still_partition() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let everything = ids(&repo.find_items(&ItemQuery::all()).unwrap());

    let mut id_set: Vec<ItemId> = (0..40_000)
        .map(|n| format!("Unknown-Album {n}"))
        .collect();
    id_set.push("Beatles-Abbey Road".to_string());
    id_set.push("Miles Davis-Kind of Blue".to_string());

    let included = ids(&repo.get_items(&id_set).unwrap());
    let excluded = ids(&repo.get_items_not_in_array(&id_set).unwrap());

    assert_eq!(
        included,
        BTreeSet::from([
            "Beatles-Abbey Road".to_string(),
            "Miles Davis-Kind of Blue".to_string(),
        ])
    );
    assert!(included.is_disjoint(&excluded));
    let union: BTreeSet<String> = included.union(&excluded).cloned().collect();
    assert_eq!(union, everything);

    let jazz_not_owned = ids(
        &repo
            .get_items_not_owned_by_category(&id_set, "Jazz")
            .unwrap(),
    );
    assert_eq!(
        jazz_not_owned,
        BTreeSet::from([
            "John Coltrane-Blue Train".to_string(),
            "Miles Davis-Bitches Brew".to_string(),
        ])
    );
}
