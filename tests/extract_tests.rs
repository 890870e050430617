//! Detail extraction retry protocol against a scripted site

mod common;

use common::{fast_extract_options, listing_page, FakeSite};
use listing_crawler::scrapers::{DetailExtractor, ExtractOptions, LinkOutcome};
use listing_crawler::storage::ListingWriter;
use std::path::Path;
use tempfile::tempdir;

const LISTING: &str = "https://site.test/imovel/apto-1/";

fn data_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

fn extractor(dir: &Path, options: ExtractOptions) -> DetailExtractor {
    let writer = ListingWriter::open(dir.join("dados").join("out.csv")).unwrap();
    DetailExtractor::new(options, writer, dir.join("debug"))
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() {
    let site = FakeSite::new();
    let address = "Rua Augusta, 123 - Consolação, São Paulo - SP";
    site.page(LISTING, listing_page("R$ 450.000", address))
        .fail_navigation(LISTING, 2);

    let dir = tempdir().unwrap();
    let mut extractor = extractor(dir.path(), fast_extract_options());
    let mut session = site.session();

    let outcome = extractor.scrape_link(&mut session, LISTING).await.unwrap();

    assert!(matches!(outcome, LinkOutcome::Saved { attempts: 3 }));
    let rows = data_rows(extractor.data_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][2], "R$ 450.000");
    assert_eq!(&rows[0][6], "Consolação");
    assert_eq!(&rows[0][9], "80 m²");
    assert_eq!(&rows[0][10], "3 quartos");
    assert_eq!(&rows[0][23], LISTING);

    let debug_dir = dir.path().join("debug");
    assert!(debug_dir.join("site.test_imovel_apto-1__attempt1.png").exists());
    assert!(debug_dir.join("site.test_imovel_apto-1__attempt2.html").exists());
    assert!(!debug_dir.join("site.test_imovel_apto-1__attempt3.png").exists());
}

#[tokio::test]
async fn test_gives_up_after_all_retries() {
    let site = FakeSite::new();
    site.page(LISTING, listing_page("R$ 1", "Centro, Campinas - SP"))
        .fail_navigation(LISTING, 10);

    let dir = tempdir().unwrap();
    let mut extractor = extractor(dir.path(), fast_extract_options());
    let mut session = site.session();

    let outcome = extractor.scrape_link(&mut session, LISTING).await.unwrap();

    match outcome {
        LinkOutcome::Failed { last } => {
            assert_eq!(last.index, 3);
            assert!(last.last_failure.contains("ERR_TIMED_OUT"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(site.visit_count(LISTING), 3);
    assert!(data_rows(extractor.data_path()).is_empty());
}

#[tokio::test]
async fn test_empty_record_is_retried_then_skipped() {
    let site = FakeSite::new();
    site.page(LISTING, "<html><body><main><h1>Anúncio removido</h1></main></body></html>");

    let dir = tempdir().unwrap();
    let options = ExtractOptions {
        retries: 1,
        save_debug: false,
        ..fast_extract_options()
    };
    let mut extractor = extractor(dir.path(), options);
    let mut session = site.session();

    let outcome = extractor.scrape_link(&mut session, LISTING).await.unwrap();

    assert!(!outcome.is_saved());
    assert_eq!(site.visit_count(LISTING), 2);
    assert!(!dir.path().join("debug").exists());
}

#[tokio::test]
async fn test_batch_skips_bad_listing() {
    let good_a = "https://site.test/imovel/a/";
    let bad = "https://site.test/imovel/removido/";
    let good_b = "https://site.test/imovel/b/";

    let site = FakeSite::new();
    site.page(good_a, listing_page("R$ 300.000", "Moema - São Paulo - SP"))
        .page(good_b, listing_page("R$ 700.000", "Rua Sete, 7 - Centro, Curitiba - PR"));

    let dir = tempdir().unwrap();
    let mut extractor = extractor(dir.path(), fast_extract_options());
    let mut session = site.session();

    let links = vec![good_a.to_string(), bad.to_string(), good_b.to_string()];
    let summary = extractor.run_batch(&mut session, &links).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total, 3);

    let rows = data_rows(extractor.data_path());
    let saved: Vec<&str> = rows.iter().map(|r| &r[23]).collect();
    assert_eq!(saved, vec![good_a, good_b]);
}
