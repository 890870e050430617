//! Full runs over a scripted site

mod common;

use common::{fast_extract_options, listing_page, results_page, FakeLauncher, FakeSite};
use listing_crawler::config::{Config, CustomTarget};
use listing_crawler::pipeline::{Pipeline, RunMode};
use listing_crawler::scrapers::{build_page_url, SortStrategy};
use listing_crawler::storage::write_link_table;
use std::path::Path;
use tempfile::tempdir;

const BASE: &str = "https://site.test/venda/sp/";

fn test_config(output_dir: &Path, pages: u32) -> Config {
    Config {
        output_dir: output_dir.to_path_buf(),
        pages,
        targets: Vec::new(),
        custom_targets: vec![CustomTarget {
            id: "sp".to_string(),
            url: BASE.to_string(),
        }],
        sort: vec![SortStrategy::Relevance],
        extract: fast_extract_options(),
        ..Config::default()
    }
}

fn count_rows(path: &Path) -> usize {
    csv::Reader::from_path(path).unwrap().records().count()
}

#[tokio::test]
async fn test_full_run_harvests_and_extracts() {
    let site = FakeSite::new();
    site.page(
        &build_page_url(BASE, 1, None).unwrap(),
        results_page(&["/imovel/1/", "/imovel/2/", "/imovel/3/"]),
    )
    .page(
        &build_page_url(BASE, 2, None).unwrap(),
        results_page(&["/imovel/3/", "/imovel/4/"]),
    );
    for id in 1..=4 {
        site.page(
            &format!("https://site.test/imovel/{id}/"),
            listing_page(&format!("R$ {id}00.000"), "Centro, Campinas - SP"),
        );
    }

    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path(), 2);
    config.links_limit = Some(3);
    let pipeline = Pipeline::new(
        config,
        FakeLauncher {
            site: site.clone(),
            fail: false,
        },
    );

    let output = pipeline.run(RunMode::Full).await.unwrap().expect("run should produce output");

    assert_eq!(output.link_tables.len(), 1);
    assert!(output.link_tables[0].starts_with(dir.path().join("links")));
    let summary = output.summary.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);

    let data_table = output.data_table.unwrap();
    assert!(data_table.starts_with(dir.path().join("dados")));
    assert_eq!(count_rows(&data_table), 3);
    assert_eq!(site.visit_count("https://site.test/imovel/4/"), 0);

    assert_eq!(site.opened(), 1);
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_failed_harvest_yields_no_output_and_releases_session() {
    let site = FakeSite::new();

    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        test_config(dir.path(), 2),
        FakeLauncher {
            site: site.clone(),
            fail: false,
        },
    );

    let output = pipeline.run(RunMode::Full).await.unwrap();

    assert!(output.is_none());
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_browser_start_failure_is_an_error() {
    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        test_config(dir.path(), 1),
        FakeLauncher {
            site: FakeSite::new(),
            fail: true,
        },
    );

    assert!(pipeline.run(RunMode::LinksOnly).await.is_err());
}

#[tokio::test]
async fn test_from_tables_consolidates_before_limit() {
    let site = FakeSite::new();
    for id in 1..=5 {
        site.page(
            &format!("https://site.test/imovel/{id}/"),
            listing_page("R$ 1.000", "Centro, Campinas - SP"),
        );
    }

    let dir = tempdir().unwrap();
    let links_dir = dir.path().join("links");
    let link = |id: u32| format!("https://site.test/imovel/{id}/");
    let first = write_link_table(&links_dir, "a", &[link(1), link(2), link(1)]).unwrap();
    let second = write_link_table(&links_dir, "b", &[link(2), link(3), link(4), link(5)]).unwrap();

    let mut config = test_config(dir.path(), 1);
    config.links_limit = Some(3);
    let pipeline = Pipeline::new(
        config,
        FakeLauncher {
            site: site.clone(),
            fail: false,
        },
    );

    let output = pipeline
        .run(RunMode::FromTables(vec![first, second]))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(output.summary.unwrap().processed, 3);
    for id in 1..=3 {
        assert_eq!(site.visit_count(&link(id)), 1);
    }
    assert_eq!(site.visit_count(&link(4)), 0);
    assert_eq!(site.closed(), 1);
}

#[tokio::test]
async fn test_single_link_mode() {
    let listing = "https://site.test/imovel/unico/";
    let site = FakeSite::new();
    site.page(listing, listing_page("R$ 999.000", "Rua A, 1 - Centro, Curitiba - PR"));

    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(
        test_config(dir.path(), 1),
        FakeLauncher {
            site: site.clone(),
            fail: false,
        },
    );

    let output = pipeline
        .run(RunMode::Single(listing.to_string()))
        .await
        .unwrap()
        .unwrap();

    let data_table = output.data_table.unwrap();
    let name = data_table.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with("_vivareal_single.csv"));
    assert_eq!(count_rows(&data_table), 1);
    assert_eq!(output.summary.unwrap().processed, 1);
}
