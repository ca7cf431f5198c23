use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Serialize;

use crate::http_client::http_client;

const BAR_WIDTH: usize = 40;

/// Where image bytes come from. The HTTP implementation is the real one;
/// anything else is a stand-in for tests or offline mirrors.
pub trait ImageSource: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpImageSource {
    client: &'static Client,
}

impl HttpImageSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().context("request failed")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("http {status}"));
        }
        let body = resp.bytes().context("failed reading body")?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Succeeded,
    Failed,
    Skipped,
    Invalid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub invalid: usize,
}

impl Tally {
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Succeeded => self.succeeded += 1,
            FetchOutcome::Failed => self.failed += 1,
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Invalid => self.invalid += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.invalid
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchProgress {
    pub tally: Tally,
    pub total: usize,
    pub elapsed: Duration,
}

impl FetchProgress {
    pub fn completed(&self) -> usize {
        self.tally.completed()
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed() as f64 / self.total as f64 * 100.0
    }

    /// Items per second since the batch started.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.completed() as f64 / secs
    }

    pub fn eta(&self) -> Duration {
        let rate = self.rate();
        if rate <= 0.0 {
            return Duration::ZERO;
        }
        let remaining = self.total.saturating_sub(self.completed());
        Duration::from_secs_f64(remaining as f64 / rate)
    }

    pub fn render(&self) -> String {
        let filled = if self.total == 0 {
            0
        } else {
            (BAR_WIDTH * self.completed() / self.total).min(BAR_WIDTH)
        };
        let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
        let eta = self.eta().as_secs();
        format!(
            "[{bar}] {:.1}% | {}/{} | ✓ {} ✗ {} ⊘ {} | {:.1} img/s | ETA: {}m {}s",
            self.percent(),
            self.completed(),
            self.total,
            self.tally.succeeded,
            self.tally.failed,
            self.tally.skipped,
            self.rate(),
            eta / 60,
            eta % 60
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub elapsed: Duration,
}

impl FetchSummary {
    fn from_tally(tally: Tally, total: usize, elapsed: Duration) -> Self {
        Self {
            total,
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            invalid: tally.invalid,
            elapsed,
        }
    }

    /// Files present in the cache directory after the run.
    pub fn available(&self) -> usize {
        self.succeeded + self.skipped
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.succeeded + self.failed + self.skipped) as f64 / secs
    }
}

/// `.../players/158/023/22_120.png` caches as `158_023_22_120.png`.
pub fn cache_file_name(url: &str) -> Option<String> {
    let url = url.trim();
    if !url.starts_with("http") {
        return None;
    }
    let tail: Vec<&str> = url.rsplit('/').take(3).collect();
    if tail.len() < 3 || tail.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(format!("{}_{}_{}", tail[2], tail[1], tail[0]))
}

/// Downloads every distinct cache file at most once into `cache_dir`, with at most
/// `concurrency_limit` requests in flight. Per-URL failures only show up in
/// the summary; the error path is reserved for setup problems.
pub fn fetch_all<I, U, S, P>(
    urls: I,
    cache_dir: &Path,
    concurrency_limit: usize,
    source: &S,
    on_progress: P,
) -> Result<FetchSummary>
where
    I: IntoIterator<Item = U>,
    U: AsRef<str>,
    S: ImageSource,
    P: Fn(&FetchProgress) + Sync,
{
    fs::create_dir_all(cache_dir)
        .with_context(|| format!("create cache dir {}", cache_dir.display()))?;

    let jobs = plan_jobs(urls);
    let total = jobs.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency_limit.max(1))
        .build()
        .context("build fetch pool")?;
    log::info!(
        "fetching {} images into {} with {} workers",
        total,
        cache_dir.display(),
        pool.current_num_threads()
    );

    let start = Instant::now();
    let tally = Mutex::new(Tally::default());
    pool.install(|| {
        jobs.par_iter().for_each(|job| {
            let outcome = fetch_one(source, job, cache_dir);
            let mut guard = tally.lock().unwrap_or_else(PoisonError::into_inner);
            guard.record(outcome);
            on_progress(&FetchProgress {
                tally: *guard,
                total,
                elapsed: start.elapsed(),
            });
        });
    });

    let tally = tally.into_inner().unwrap_or_else(PoisonError::into_inner);
    let summary = FetchSummary::from_tally(tally, total, start.elapsed());
    log::info!(
        "fetch finished: {} ok, {} failed, {} skipped, {} invalid in {:.1}s",
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.invalid,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

/// One unit of fetch work. Valid URLs are keyed by their cache file name.
struct FetchJob {
    url: String,
    file_name: Option<String>,
}

/// Keeps the first URL per cache file, and the first copy of each invalid URL.
fn plan_jobs<I, U>(urls: I) -> Vec<FetchJob>
where
    I: IntoIterator<Item = U>,
    U: AsRef<str>,
{
    let mut names = HashSet::new();
    let mut invalid = HashSet::new();
    let mut jobs = Vec::new();
    for url in urls {
        let url = url.as_ref().trim().to_string();
        let file_name = cache_file_name(&url);
        let fresh = match &file_name {
            Some(name) => names.insert(name.clone()),
            None => invalid.insert(url.clone()),
        };
        if fresh {
            jobs.push(FetchJob { url, file_name });
        } else {
            log::debug!("dropping duplicate image url {url:?}");
        }
    }
    jobs
}

fn fetch_one<S: ImageSource>(source: &S, job: &FetchJob, cache_dir: &Path) -> FetchOutcome {
    let url = job.url.as_str();
    let Some(name) = job.file_name.as_deref() else {
        log::debug!("skipping invalid image url {url:?}");
        return FetchOutcome::Invalid;
    };
    let path = cache_dir.join(name);
    if path.exists() {
        return FetchOutcome::Skipped;
    }
    match source.fetch(url) {
        Ok(bytes) => match write_atomic(&path, &bytes) {
            Ok(()) => FetchOutcome::Succeeded,
            Err(err) => {
                log::warn!("{url}: {err:#}");
                FetchOutcome::Failed
            }
        },
        Err(err) => {
            log::debug!("{url}: {err:#}");
            FetchOutcome::Failed
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = partial_path(path);
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
