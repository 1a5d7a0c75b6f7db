// src/tests/pipeline_tests/runner_tests.rs

use std::sync::Arc;
use std::time::Duration;

use crate::domain::notes;
use crate::geos::Geocoder;
use crate::pipeline::runner::SiteOutcome;
use crate::pipeline::{SitePipeline, Stage};
use crate::store::Sink;
use crate::tests::utils::{
    as_extractor, home_page, listing, test_context, FakeExtractor, FakeFetcher, FakeGeocoder,
    FixedSelector,
};

const BASE: &str = "https://hotel.test/";
const ROOMS: &str = "https://hotel.test/rooms";

fn rooms_page() -> &'static str {
    r#"<html><head><script>track()</script></head><body>
         <h1>Our Rooms</h1>
         <div class="room"><h2>Queen Room</h2><p>From $129 per night</p></div>
         <div class="room"><h2>Twin Suite</h2><p>12 Main St, $159</p></div>
       </body></html>"#
}

fn two_rooms() -> Arc<FakeExtractor> {
    FakeExtractor::on_marker(
        "Queen Room",
        vec![
            listing("Queen Room", None, "$129"),
            listing("Twin Suite", Some("12 Main St"), "$159"),
        ],
    )
}

#[test]
fn finds_rooms_page_and_saves_listings() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/about", "/rooms", "/contact"]))
        .page(ROOMS, rooms_page())
        .shared();
    let extractor = two_rooms();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&extractor));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert_eq!(
        outcome,
        SiteOutcome::Saved {
            room_url: ROOMS.to_string(),
            records: 2
        }
    );
    assert_eq!(
        fetcher.calls(),
        vec![
            (BASE.to_string(), Duration::ZERO),
            (ROOMS.to_string(), Duration::ZERO)
        ]
    );

    // Scripts never reach the extractor.
    let chunks = extractor.chunks();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].starts_with("Our Rooms Queen Room From $129"));
    assert!(!chunks[0].contains("track()"));

    let rows = ctx.store.load(Sink::Success).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.url_scrapped == ROOMS));
    assert!(rows.iter().all(|r| r.note == notes::DATA_PROCESSED));
    assert!(rows.iter().all(|r| r.timestamp.is_some()));
    assert_eq!(rows[0].website_address, "Queen Room");
    assert_eq!(rows[1].website_address, "12 Main St");
    assert_eq!(rows[1].price, "$159");

    assert!(!ctx.store.path(Sink::Error).exists());
}

#[test]
fn rerunning_a_site_updates_rows_in_place() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, rooms_page())
        .shared();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    assert!(SitePipeline::new(&ctx).run(BASE).is_success());
    assert!(SitePipeline::new(&ctx).run(BASE).is_success());

    let rows = ctx.store.load(Sink::Success).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|r| r.note == "Data processed successfully (updated)"));
}

#[test]
fn initial_fetch_failure_stops_the_run() {
    let fetcher = FakeFetcher::new().failing(BASE).shared();
    let extractor = two_rooms();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&extractor));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert_eq!(
        outcome,
        SiteOutcome::Failed {
            stage: Stage::InitialFetch,
            url: BASE.to_string(),
            note: notes::INITIAL_PAGE_SCRAPING_FAILED.to_string(),
        }
    );
    assert_eq!(fetcher.fetched_urls(), vec![BASE.to_string()]);
    assert!(extractor.chunks().is_empty());

    let errors = ctx.store.load(Sink::Error).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url_scrapped, BASE);
    assert_eq!(errors[0].note, notes::INITIAL_PAGE_SCRAPING_FAILED);
    assert!(errors[0].website_address.is_empty());
    assert!(!ctx.store.path(Sink::Success).exists());
}

#[test]
fn page_without_same_origin_links_has_no_unique_urls() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &[]))
        .shared();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(
        outcome,
        SiteOutcome::Failed { stage: Stage::CollectLinks, ref note, .. }
            if note == notes::NO_UNIQUE_URLS_FOUND
    ));
}

#[test]
fn selection_outside_the_candidates_is_rejected() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page("https://elsewhere.test/rooms", rooms_page())
        .shared();
    let (mut ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));
    ctx.link_selector = Arc::new(FixedSelector(Some("https://elsewhere.test/rooms".into())));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(
        outcome,
        SiteOutcome::Failed { stage: Stage::SelectLink, ref url, .. } if url == BASE
    ));
    assert_eq!(fetcher.fetched_urls(), vec![BASE.to_string()]);

    let errors = ctx.store.load(Sink::Error).unwrap();
    assert_eq!(errors[0].note, notes::ROOM_LINK_RETRIEVAL_FAILED);
}

#[test]
fn relative_selection_is_resolved_against_the_base() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms", "/spa"]))
        .page(ROOMS, rooms_page())
        .shared();
    let (mut ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));
    ctx.link_selector = Arc::new(FixedSelector(Some("/rooms".into())));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(outcome, SiteOutcome::Saved { ref room_url, .. } if room_url == ROOMS));
}

#[test]
fn no_suitable_link_stops_before_room_fetch() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/about", "/contact"]))
        .shared();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(outcome, SiteOutcome::Failed { stage: Stage::SelectLink, .. }));
    assert_eq!(fetcher.fetched_urls().len(), 1);
}

#[test]
fn room_page_failure_is_filed_under_the_base_url() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .failing(ROOMS)
        .shared();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert_eq!(
        outcome,
        SiteOutcome::Failed {
            stage: Stage::RoomFetch,
            url: BASE.to_string(),
            note: notes::ROOM_PAGE_SCRAPING_FAILED.to_string(),
        }
    );
}

#[test]
fn empty_extraction_is_filed_under_the_room_url() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, "<p>Nothing to book right now</p>")
        .shared();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert_eq!(
        outcome,
        SiteOutcome::Failed {
            stage: Stage::ExtractListings,
            url: ROOMS.to_string(),
            note: notes::ROOM_DETAILS_RETRIEVAL_FAILED.to_string(),
        }
    );
    let errors = ctx.store.load(Sink::Error).unwrap();
    assert_eq!(errors[0].url_scrapped, ROOMS);
}

#[test]
fn listings_without_name_or_address_fail_processing() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, rooms_page())
        .shared();
    let extractor = FakeExtractor::new(|_| {
        Ok(vec![crate::domain::RawListing {
            price: Some("$99".into()),
            ..Default::default()
        }])
    });
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&extractor));

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(
        outcome,
        SiteOutcome::Failed { stage: Stage::BuildRecords, ref note, .. }
            if note == notes::DATA_PROCESSING_FAILED
    ));
}

#[test]
fn missing_extractor_fails_details_stage() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, rooms_page())
        .shared();
    let (ctx, _dir) = test_context(&fetcher, None);

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert!(matches!(outcome, SiteOutcome::Failed { stage: Stage::ExtractListings, .. }));
}

#[test]
fn long_pages_are_extracted_chunk_by_chunk() {
    let filler = "lorem ".repeat(120);
    let html = format!("<p>{filler}</p><p>Queen Room $129</p>");
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, &html)
        .shared();
    let extractor = two_rooms();
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&extractor));

    assert!(SitePipeline::new(&ctx).run(BASE).is_success());

    // 123 words at 50 per chunk.
    let chunks = extractor.chunks();
    assert_eq!(chunks.len(), 3);
    assert!(chunks[2].ends_with("Queen Room $129"));
}

#[test]
fn inline_geocoding_fills_location_from_raw_address() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, rooms_page())
        .shared();
    let geocoder = Arc::new(FakeGeocoder::default().with("12 Main St", 35.6, -82.5, "Asheville"));
    let (mut ctx, _dir) = test_context(&fetcher, as_extractor(&two_rooms()));
    let shared: Arc<dyn Geocoder> = geocoder.clone();
    ctx.geocoder = Some(shared);
    ctx.options.inline_geocoding = true;

    assert!(SitePipeline::new(&ctx).run(BASE).is_success());

    // Only entries with an address are looked up.
    assert_eq!(geocoder.calls(), vec!["12 Main St".to_string()]);

    let rows = ctx.store.load(Sink::Success).unwrap();
    let suite = rows.iter().find(|r| r.website_address == "12 Main St").unwrap();
    assert_eq!(suite.city, "Asheville");
    assert_eq!(suite.latitude, Some(35.6));
    let queen = rows.iter().find(|r| r.website_address == "Queen Room").unwrap();
    assert!(!queen.has_coordinates());
}

#[test]
fn failing_success_write_files_a_save_error() {
    let fetcher = FakeFetcher::new()
        .page(BASE, &home_page("https://hotel.test", &["/rooms"]))
        .page(ROOMS, rooms_page())
        .shared();
    let (mut ctx, dir) = test_context(&fetcher, as_extractor(&two_rooms()));

    // A plain file where the results directory should be.
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();
    ctx.store = crate::store::CsvStore::new(&blocked);

    let outcome = SitePipeline::new(&ctx).run(BASE);

    assert_eq!(
        outcome,
        SiteOutcome::Failed {
            stage: Stage::Persist,
            url: ROOMS.to_string(),
            note: notes::PROCESSED_DATA_SAVING_FAILED.to_string(),
        }
    );
}
