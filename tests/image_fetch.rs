use std::fs;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use fifa_insights::image_fetch::{FetchProgress, ImageSource, fetch_all};

#[derive(Default)]
struct FakeSource {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl FakeSource {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ImageSource for FakeSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if url.contains("missing") {
            return Err(anyhow!("http 404 Not Found"));
        }
        Ok(url.as_bytes().to_vec())
    }
}

fn url(n: u32) -> String {
    format!("https://cdn.sofifa.net/players/158/{n:03}/22_120.png")
}

#[test]
fn cached_file_is_skipped_without_network_call() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("158_001_22_120.png"), b"old").unwrap();
    let source = FakeSource::default();

    let urls = vec![url(1), url(2), url(3)];
    let summary = fetch_all(&urls, dir.path(), 4, &source, |_| {}).unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert!(source.call_count() <= 2);
    assert_eq!(fs::read(dir.path().join("158_001_22_120.png")).unwrap(), b"old");
    assert_eq!(
        fs::read(dir.path().join("158_002_22_120.png")).unwrap(),
        url(2).as_bytes()
    );
}

#[test]
fn failures_are_counted_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let urls = vec![
        url(1),
        "https://cdn.sofifa.net/players/missing/000/22_120.png".to_string(),
    ];
    let summary = fetch_all(&urls, dir.path(), 2, &source, |_| {}).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(!dir.path().join("missing_000_22_120.png").exists());
    assert!(!dir.path().join("missing_000_22_120.png.part").exists());
}

#[test]
fn duplicate_and_invalid_urls_are_not_fetched() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let urls = vec![url(1), url(1), "not a url".to_string(), "https://x.png".to_string()];
    let summary = fetch_all(&urls, dir.path(), 3, &source, |_| {}).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.invalid, 2);
    assert_eq!(source.call_count(), 1);
}

#[test]
fn urls_sharing_a_cache_file_are_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let urls = vec![
        "https://cdn.sofifa.net/players/158/023/22_120.png".to_string(),
        "http://cdn.sofifa.net/players/158/023/22_120.png".to_string(),
        "https://mirror.example/players/158/023/22_120.png".to_string(),
    ];
    let summary = fetch_all(&urls, dir.path(), 1, &source, |_| {}).unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.available(), 1);
    assert_eq!(source.call_count(), 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(
        fs::read(dir.path().join("158_023_22_120.png")).unwrap(),
        urls[0].as_bytes()
    );
}

#[test]
fn in_flight_requests_respect_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::with_delay(Duration::from_millis(20));
    let urls: Vec<String> = (0..24).map(url).collect();
    let summary = fetch_all(&urls, dir.path(), 3, &source, |_| {}).unwrap();
    assert_eq!(summary.succeeded, 24);
    assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[test]
fn progress_is_reported_once_per_url() {
    let dir = tempfile::tempdir().unwrap();
    let source = FakeSource::default();
    let urls: Vec<String> = (0..10).map(url).collect();
    let seen = Mutex::new(Vec::<FetchProgress>::new());
    fetch_all(&urls, dir.path(), 4, &source, |p| seen.lock().unwrap().push(*p)).unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 10);
    let mut completed: Vec<usize> = seen.iter().map(|p| p.completed()).collect();
    completed.sort_unstable();
    assert_eq!(completed, (1..=10).collect::<Vec<_>>());
    assert!(seen.iter().all(|p| p.total == 10));
}

#[test]
fn creates_missing_cache_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("faces").join("2022");
    let source = FakeSource::default();
    let summary = fetch_all([url(5)], &nested, 1, &source, |_| {}).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(nested.join("158_005_22_120.png").exists());
}
