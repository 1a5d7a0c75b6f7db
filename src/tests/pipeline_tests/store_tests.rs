// src/tests/pipeline_tests/store_tests.rs

use std::thread;

use crate::domain::{notes, ErrorRow, ListingRecord};
use crate::store::{CsvStore, Sink};

fn record(url: &str, address: &str, price: &str) -> ListingRecord {
    ListingRecord {
        url_scrapped: url.into(),
        website_address: address.into(),
        price: price.into(),
        note: notes::DATA_PROCESSED.into(),
        ..Default::default()
    }
}

#[test]
fn empty_batch_is_rejected_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());

    assert!(!store.save(&[], Sink::Success));
    assert!(!store.path(Sink::Success).exists());
}

#[test]
fn saving_the_same_batch_twice_keeps_one_row_per_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("results"));
    let batch = vec![
        record("https://a.test/rooms", "Queen", "$100"),
        record("https://a.test/rooms", "King", "$150"),
    ];

    assert!(store.save(&batch, Sink::Success));
    let first = store.load(Sink::Success).unwrap();
    assert!(store.save(&batch, Sink::Success));
    let second = store.load(Sink::Success).unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(before.key(), after.key());
        assert_eq!(before.price, after.price);
        assert_eq!(after.note, "Data processed successfully (updated)");
    }
}

#[test]
fn update_overwrites_only_present_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());

    let mut geocoded = record("u", "Queen", "$100");
    geocoded.city = "Asheville".into();
    assert!(store.save(&[geocoded], Sink::Success));
    assert!(store.save(&[record("u", "Queen", "$120")], Sink::Success));

    let rows = store.load(Sink::Success).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].price, "$120");
    assert_eq!(rows[0].city, "Asheville");
}

#[test]
fn repeated_failures_for_a_site_share_one_error_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());

    assert!(store.save_error(ErrorRow::new("https://a.test", notes::INITIAL_PAGE_SCRAPING_FAILED)));
    assert!(store.save_error(ErrorRow::new("https://a.test", notes::NO_UNIQUE_URLS_FOUND)));
    assert!(store.save_error(ErrorRow::new("https://b.test", notes::NO_UNIQUE_URLS_FOUND)));

    let rows = store.load(Sink::Error).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].note, "No unique URLs found (updated)");
    assert!(!store.path(Sink::Success).exists());
}

#[test]
fn concurrent_disjoint_saves_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());
    let writers = 16;

    thread::scope(|scope| {
        for i in 0..writers {
            let store = &store;
            scope.spawn(move || {
                let row = record(&format!("https://site{i}.test/rooms"), "Suite", "$1");
                assert!(store.save(&[row], Sink::Success));
            });
        }
    });

    let rows = store.load(Sink::Success).unwrap();
    assert_eq!(rows.len(), writers);
    let mut urls: Vec<_> = rows.iter().map(|r| r.url_scrapped.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), writers);
}

#[test]
fn update_all_rewrites_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());
    assert!(store.save(
        &[record("u", "a", "$1"), record("u", "b", "$2")],
        Sink::Success
    ));

    let removed = store
        .update_all(Sink::Success, |rows| {
            let before = rows.len();
            rows.retain(|r| r.website_address == "b");
            before - rows.len()
        })
        .unwrap();

    assert_eq!(removed, 1);
    let after = store.load(Sink::Success).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].website_address, "b");
}
