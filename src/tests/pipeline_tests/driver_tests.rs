// src/tests/pipeline_tests/driver_tests.rs

use crate::domain::notes;
use crate::pipeline::driver::{build_pool, RunSummary};
use crate::pipeline::process_websites;
use crate::store::Sink;
use crate::tests::utils::{
    as_extractor, home_page, listing, test_context, FakeExtractor, FakeFetcher,
};

#[test]
fn one_bad_site_does_not_stop_the_others() {
    let fetcher = FakeFetcher::new()
        .page("https://good.test/", &home_page("https://good.test", &["/rooms"]))
        .page("https://good.test/rooms", "<p>Loft $95</p>")
        .failing("https://down.test/")
        .panicking("https://p.test/", "index out of bounds")
        .shared();
    let extractor = FakeExtractor::on_marker("Loft", vec![listing("Loft", None, "$95")]);
    let (ctx, _dir) = test_context(&fetcher, as_extractor(&extractor));
    let sites = vec![
        "https://good.test/".to_string(),
        "https://down.test/".to_string(),
        "https://p.test/".to_string(),
    ];

    let summary = process_websites(&ctx, &sites, 3).unwrap();

    assert_eq!(
        summary,
        RunSummary {
            total: 3,
            succeeded: 1,
            failed: 2,
        }
    );

    let saved = ctx.store.load(Sink::Success).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].url_scrapped, "https://good.test/rooms");

    let errors = ctx.store.load(Sink::Error).unwrap();
    let note_for = |url: &str| {
        errors
            .iter()
            .find(|r| r.url_scrapped == url)
            .map(|r| r.note.clone())
    };
    assert_eq!(
        note_for("https://down.test/").as_deref(),
        Some(notes::INITIAL_PAGE_SCRAPING_FAILED)
    );
    assert_eq!(
        note_for("https://p.test/").as_deref(),
        Some("Pipeline for https://p.test/ generated an exception: index out of bounds")
    );
    assert_eq!(errors.len(), 2);
}

#[test]
fn every_site_is_fetched_once_with_a_single_worker() {
    let fetcher = FakeFetcher::new().shared();
    let (ctx, _dir) = test_context(&fetcher, None);
    let sites: Vec<String> = (0..5).map(|i| format!("https://s{i}.test/")).collect();

    let summary = process_websites(&ctx, &sites, 1).unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.failed, 5);
    let mut fetched = fetcher.fetched_urls();
    fetched.sort();
    assert_eq!(fetched, sites);
    assert_eq!(ctx.store.load(Sink::Error).unwrap().len(), 5);
}

#[test]
fn empty_site_list_is_a_zero_summary() {
    let fetcher = FakeFetcher::new().shared();
    let (ctx, _dir) = test_context(&fetcher, None);

    let summary = process_websites(&ctx, &[], 4).unwrap();
    assert_eq!(summary, RunSummary::default());
    assert!(!ctx.store.path(Sink::Error).exists());
}

#[test]
fn pool_threads_are_named_and_at_least_one() {
    let pool = build_pool(0).unwrap();
    assert_eq!(pool.current_num_threads(), 1);

    let name = pool.install(|| std::thread::current().name().map(str::to_string));
    assert_eq!(name.as_deref(), Some("site-worker-0"));
}
