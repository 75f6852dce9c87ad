//! Load-more pagination against the in-memory renderer.

mod common;

use catalog_crawler::render::Renderer;
use catalog_crawler::site::Paginator;
use common::{site, FakePage, FakeRenderer};
use std::time::Duration;

const LISTING: &str = "https://shop.test/dogs";

async fn collect(page: FakePage, max_rounds: Option<u32>) -> (Vec<String>, usize) {
    let renderer = FakeRenderer::new().page(LISTING, page);
    let config = site("shop.test", "https://shop.test/");

    let mut session = renderer.open(LISTING).await.unwrap();
    let links = Paginator::new(&config)
        .wait_budget(Duration::from_millis(10))
        .max_rounds(max_rounds)
        .collect(session.as_mut())
        .await
        .unwrap();

    (links, renderer.clicks())
}

#[tokio::test]
async fn test_collects_every_page_until_control_disappears() {
    let page = FakePage::new().listing(&[&["/p/1", "/p/2"], &["/p/3"], &["/p/4", "/p/5"]]).load_more();

    let (links, clicks) = collect(page, None).await;

    assert_eq!(links, vec!["/p/1", "/p/2", "/p/3", "/p/4", "/p/5"]);
    assert_eq!(clicks, 2);
}

#[tokio::test]
async fn test_single_page_without_control() {
    let page = FakePage::new().listing(&[&["/p/1", "/p/2"]]);

    let (links, clicks) = collect(page, None).await;

    assert_eq!(links, vec!["/p/1", "/p/2"]);
    assert_eq!(clicks, 0);
}

#[tokio::test]
async fn test_stops_when_click_reveals_nothing() {
    // The control stays clickable after the last batch. The click that
    // reveals nothing is followed by one more look, which detects the stall.
    let page = FakePage::new().listing(&[&["/p/1"], &["/p/2"]]).sticky_load_more();

    let (links, clicks) = collect(page, None).await;

    assert_eq!(links, vec!["/p/1", "/p/2"]);
    assert_eq!(clicks, 2);
}

#[tokio::test]
async fn test_empty_listing_with_control_stalls_immediately() {
    let page = FakePage::new().sticky_load_more();

    let (links, clicks) = collect(page, None).await;

    assert!(links.is_empty());
    assert_eq!(clicks, 0);
}

#[tokio::test]
async fn test_rediscovered_links_reported_once() {
    let page = FakePage::new().listing(&[&["/p/1", "/p/2"], &["/p/2", "/p/1", "/p/3"]]).load_more();

    let (links, _) = collect(page, None).await;

    assert_eq!(links, vec!["/p/1", "/p/2", "/p/3"]);
}

#[tokio::test]
async fn test_click_cap() {
    let page = FakePage::new().listing(&[&["/p/1"], &["/p/2"], &["/p/3"], &["/p/4"]]).load_more();

    let (links, clicks) = collect(page, Some(1)).await;

    assert_eq!(links, vec!["/p/1", "/p/2"]);
    assert_eq!(clicks, 1);
}

#[tokio::test]
async fn test_site_without_load_more_selector() {
    let renderer = FakeRenderer::new()
        .page(LISTING, FakePage::new().listing(&[&["/p/1"], &["/p/2"]]).load_more());
    let mut config = site("shop.test", "https://shop.test/");
    config.load_more = None;

    let mut session = renderer.open(LISTING).await.unwrap();
    let links = Paginator::new(&config).collect(session.as_mut()).await.unwrap();

    assert_eq!(links, vec!["/p/1"]);
    assert_eq!(renderer.clicks(), 0);
}
