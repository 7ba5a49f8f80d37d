use crate::support::{category, detail, entry, listing, test_config};
use shelf_harvest::crawler::{ListingParse, RecordParser, ShelfPageParser};
use shelf_harvest::output::{read_artifact, StopReason};
use shelf_harvest::record::DetailFields;
use shelf_harvest::{Field, Harvester};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, list: &str, page: u32, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/shelf/show/{}", list)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, slug: &str, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/book/show/{}", slug)))
        .respond_with(ResponseTemplate::new(status).set_body_string(detail(&format!("About {}", slug))))
        .expect(expected)
        .mount(server)
        .await;
}

fn final_path(dir: &Path) -> std::path::PathBuf {
    dir.join("books.json")
}

#[tokio::test]
async fn test_quota_dedup_and_early_stop() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    // Page 1: four entries, one repeated on the page
    mount_listing(
        &server,
        "history",
        1,
        listing(&[
            entry("SPQR", "Mary Beard", "spqr"),
            entry("The Guns of August", "Barbara W. Tuchman", "guns"),
            entry("SPQR", "Mary Beard", "spqr"),
            entry("Team of Rivals", "Doris Kearns Goodwin", "rivals"),
        ]),
        1,
    )
    .await;
    // Page 2: short page; only two of its entries fit the quota
    mount_listing(
        &server,
        "history",
        2,
        listing(&[
            entry("The Silk Roads", "Peter Frankopan", "silk"),
            entry("Postwar", "Tony Judt", "postwar"),
            entry("Salt", "Mark Kurlansky", "salt"),
        ]),
        1,
    )
    .await;
    mount_listing(&server, "history", 3, listing(&[]), 0).await;

    for slug in ["spqr", "guns", "rivals", "silk", "postwar"] {
        mount_detail(&server, slug, 200, 1).await;
    }
    mount_detail(&server, "salt", 200, 0).await;

    let config = test_config(&server.uri(), dir.path(), 4, vec![category("history", 5)]);
    let mut harvester = Harvester::new(config).unwrap();
    let summary = harvester.run().await.unwrap();

    assert_eq!(summary.total_records, 5);
    let report = &summary.categories[0];
    assert_eq!(report.committed, 5);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.page_duplicates, 1);
    assert_eq!(report.stop_reason, StopReason::QuotaReached);

    let records = read_artifact(&final_path(dir.path())).await.unwrap();
    let titles: Vec<&str> = records.iter().map(|r| r.record.stub.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["SPQR", "The Guns of August", "Team of Rivals", "The Silk Roads", "Postwar"]
    );
    assert!(records.iter().enumerate().all(|(i, r)| r.index == i as u64));
    assert!(records.iter().all(|r| r.record.synopsis.is_set()));
    assert_eq!(records[0].unique_id, "spqr_mary beard_history");

    assert_eq!(harvester.context().available_permits(), 4);
}

#[tokio::test]
async fn test_failed_enrichment_keeps_stub() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_listing(
        &server,
        "poetry",
        1,
        listing(&[
            entry("Ariel", "Sylvia Plath", "ariel"),
            entry("Leaves of Grass", "Walt Whitman", "leaves"),
            entry("The Waste Land", "T.S. Eliot", ""),
        ]),
        1,
    )
    .await;
    mount_detail(&server, "ariel", 200, 1).await;
    // Two attempts, then the record is committed without details
    mount_detail(&server, "leaves", 500, 2).await;

    let config = test_config(&server.uri(), dir.path(), 50, vec![category("poetry", 10)]);
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    let report = &summary.categories[0];
    assert_eq!(report.committed, 3);
    assert_eq!(report.enrichment_failures, 1);
    assert_eq!(report.stop_reason, StopReason::ShortPage);

    let records = read_artifact(&final_path(dir.path())).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].record.synopsis.as_deref(), Some("About ariel"));
    assert_eq!(records[1].record.synopsis, Field::Unset);
    assert_eq!(records[1].record.stub.author.as_deref(), Some("Walt Whitman"));
    assert_eq!(records[2].record.stub.url, Field::Unset);
    assert_eq!(records[2].record.synopsis, Field::Unset);

    // Unset fields are written with the sentinel
    let raw = std::fs::read_to_string(final_path(dir.path())).unwrap();
    assert!(raw.contains("\"synopsis\": \"N/A\""));
}

#[tokio::test]
async fn test_same_book_in_two_categories() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    for list in ["romance", "classics"] {
        mount_listing(
            &server,
            list,
            1,
            listing(&[entry("Emma", "Jane Austen", "emma")]),
            1,
        )
        .await;
    }
    // Each category has its own cache, so the shared detail page is fetched twice
    mount_detail(&server, "emma", 200, 2).await;

    let config = test_config(
        &server.uri(),
        dir.path(),
        50,
        vec![category("romance", 5), category("classics", 5)],
    );
    let summary = Harvester::new(config).unwrap().run().await.unwrap();
    assert_eq!(summary.total_records, 2);

    let records = read_artifact(&final_path(dir.path())).await.unwrap();
    assert_eq!(records[0].identity.category, "romance");
    assert_eq!(records[1].identity.category, "classics");
    assert_ne!(records[0].unique_id, records[1].unique_id);
    assert_eq!(records[1].index, 1);
}

#[tokio::test]
async fn test_failed_category_does_not_stop_run() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    // "broken" has no listing mock; the server answers 404
    mount_listing(
        &server,
        "science",
        1,
        listing(&[entry("Cosmos", "Carl Sagan", "cosmos")]),
        1,
    )
    .await;
    mount_detail(&server, "cosmos", 200, 1).await;

    let config = test_config(
        &server.uri(),
        dir.path(),
        50,
        vec![category("broken", 5), category("science", 5)],
    );
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.categories[0].stop_reason, StopReason::FetchFailed);
    assert_eq!(summary.categories[0].committed, 0);
    assert_eq!(summary.categories[1].committed, 1);
    assert_eq!(summary.total_records, 1);
}

#[tokio::test]
async fn test_page_ceiling_and_empty_page() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    // "art": full pages forever, capped by the page ceiling
    mount_listing(&server, "art", 1, listing(&[entry("Ways of Seeing", "John Berger", "")]), 1).await;
    mount_listing(&server, "art", 2, listing(&[entry("The Story of Art", "E.H. Gombrich", "")]), 1).await;
    mount_listing(&server, "art", 3, listing(&[entry("On Photography", "Susan Sontag", "")]), 0).await;

    // "music": a full page followed by an empty one
    mount_listing(&server, "music", 1, listing(&[entry("Just Kids", "Patti Smith", "")]), 1).await;
    mount_listing(&server, "music", 2, listing(&[]), 1).await;

    let mut config = test_config(
        &server.uri(),
        dir.path(),
        1,
        vec![category("art", 10), category("music", 10)],
    );
    config.source.max_pages_per_category = 2;
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.categories[0].stop_reason, StopReason::PageCeiling);
    assert_eq!(summary.categories[0].committed, 2);
    assert_eq!(summary.categories[1].stop_reason, StopReason::EmptyPage);
    assert_eq!(summary.categories[1].committed, 1);
}

#[tokio::test]
async fn test_unrecognized_markup_stops_walk() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let changed = "<html><body>\
        <div class=\"elementList\"><span class=\"renamedTitle\">Dune</span></div>\
        <div class=\"elementList\"><span class=\"renamedTitle\">Hyperion</span></div>\
        </body></html>";
    mount_listing(&server, "sci-fi", 1, changed.to_string(), 1).await;
    mount_listing(&server, "sci-fi", 2, listing(&[]), 0).await;

    let config = test_config(&server.uri(), dir.path(), 2, vec![category("sci-fi", 10)]);
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.categories[0].stop_reason, StopReason::UnrecognizedMarkup);
    assert_eq!(summary.total_records, 0);
}

#[tokio::test]
async fn test_repeated_entries_across_pages() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_listing(
        &server,
        "fantasy",
        1,
        listing(&[
            entry("The Hobbit", "J.R.R. Tolkien", "hobbit"),
            entry("Mistborn", "Brandon Sanderson", "mistborn"),
        ]),
        1,
    )
    .await;
    // The listing shifted; one entry from page 1 shows up again
    mount_listing(
        &server,
        "fantasy",
        2,
        listing(&[
            entry("Mistborn", "Brandon Sanderson", "mistborn"),
            entry("Earthsea", "Ursula K. Le Guin", "earthsea"),
        ]),
        1,
    )
    .await;
    mount_listing(&server, "fantasy", 3, listing(&[]), 1).await;

    for slug in ["hobbit", "mistborn", "earthsea"] {
        mount_detail(&server, slug, 200, 1).await;
    }

    let config = test_config(&server.uri(), dir.path(), 2, vec![category("fantasy", 10)]);
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    let report = &summary.categories[0];
    assert_eq!(report.committed, 3);
    assert_eq!(report.repeat_duplicates, 1);
    assert_eq!(report.stop_reason, StopReason::EmptyPage);
}

#[tokio::test]
async fn test_checkpoint_matches_final_artifact() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    let entries: Vec<String> = (0..6)
        .map(|i| entry(&format!("Volume {}", i), "Anon", ""))
        .collect();
    mount_listing(&server, "essays", 1, listing(&entries), 1).await;

    let mut config = test_config(&server.uri(), dir.path(), 50, vec![category("essays", 6)]);
    config.output.checkpoint_interval = 4;
    let checkpoint_path = config.output.checkpoint_path.clone();

    let mut harvester = Harvester::new(config).unwrap();
    harvester.run().await.unwrap();
    assert!(harvester.ledger().checkpointer().saves_started() >= 2);

    let checkpoint = read_artifact(Path::new(&checkpoint_path)).await.unwrap();
    let final_records = read_artifact(&final_path(dir.path())).await.unwrap();
    assert_eq!(checkpoint.len(), 6);
    assert_eq!(checkpoint, final_records);
}

/// Default parser that blows up on one category's listing pages
struct FailsOnCategory {
    category: &'static str,
    inner: ShelfPageParser,
}

impl RecordParser for FailsOnCategory {
    fn parse_listing(&self, html: &str, category: &str, page_url: &Url) -> ListingParse {
        if category == self.category {
            panic!("listing parser failed on {}", page_url);
        }
        self.inner.parse_listing(html, category, page_url)
    }

    fn parse_detail(&self, html: &str) -> DetailFields {
        self.inner.parse_detail(html)
    }
}

#[tokio::test]
async fn test_parser_panic_aborts_only_its_category() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_listing(
        &server,
        "broken",
        1,
        listing(&[entry("Cosmos", "Carl Sagan", "")]),
        1,
    )
    .await;
    mount_listing(
        &server,
        "science",
        1,
        listing(&[entry("Cosmos", "Carl Sagan", "cosmos")]),
        1,
    )
    .await;
    mount_detail(&server, "cosmos", 200, 1).await;

    let config = test_config(
        &server.uri(),
        dir.path(),
        50,
        vec![category("broken", 5), category("science", 5)],
    );
    let parser = Arc::new(FailsOnCategory {
        category: "broken",
        inner: ShelfPageParser::new(),
    });
    let summary = Harvester::with_parser(config, parser)
        .unwrap()
        .run()
        .await
        .unwrap();

    match &summary.categories[0].stop_reason {
        StopReason::Aborted(error) => assert!(error.contains("listing parser failed")),
        other => panic!("expected an aborted category, got {:?}", other),
    }
    assert_eq!(summary.categories[0].committed, 0);
    assert_eq!(summary.categories[1].committed, 1);

    let records = read_artifact(&final_path(dir.path())).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity.category, "science");
}

#[tokio::test]
async fn test_detail_timeout_commits_stub() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();

    mount_listing(
        &server,
        "travel",
        1,
        listing(&[
            entry("Into Thin Air", "Jon Krakauer", "thin-air"),
            entry("The Old Patagonian Express", "Paul Theroux", "patagonian"),
        ]),
        1,
    )
    .await;
    mount_detail(&server, "thin-air", 200, 1).await;
    // Slower than the client timeout on both attempts
    Mock::given(method("GET"))
        .and(path("/book/show/patagonian"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail("never read"))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri(), dir.path(), 50, vec![category("travel", 5)]);
    config.harvester.request_timeout_secs = 1;
    let summary = Harvester::new(config).unwrap().run().await.unwrap();

    let report = &summary.categories[0];
    assert_eq!(report.committed, 2);
    assert_eq!(report.enrichment_failures, 1);

    let records = read_artifact(&final_path(dir.path())).await.unwrap();
    assert_eq!(records[0].record.synopsis.as_deref(), Some("About thin-air"));
    assert_eq!(records[1].record.stub.title, "The Old Patagonian Express");
    assert_eq!(records[1].record.synopsis, Field::Unset);
    assert_eq!(records[1].record.image, Field::Unset);
}
