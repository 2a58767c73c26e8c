//! One scraping run: listing → new links → fetch → clean → insert → frontier.

use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, info_span, warn, Instrument, Span};
use url::Url;

use crate::cleaner::Cleaner;
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::frontier::Frontier;
use crate::page;
use crate::store::Inserter;

/// State that belongs to a single run rather than the process.
pub struct RunContext {
    span: Span,
    failures: Vec<(String, Error)>,
}

impl RunContext {
    pub fn new() -> Self {
        let run_id = Utc::now().format("%Y%m%dT%H%M%S%.3f").to_string();
        let span = info_span!("run", id = %run_id);
        RunContext {
            span,
            failures: Vec::new(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn fail(&mut self, link: &str, err: Error) {
        warn!("Scraping {} failed: {}", link, err);
        self.failures.push((link.to_string(), err));
    }

    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    pub attempted: usize,
    pub ingested: usize,
    pub records: usize,
}

pub struct Pipeline<F: Fetch> {
    fetcher: F,
    inserter: Inserter,
    cleaner: Cleaner,
    frontier: Frontier,
    base_url: Url,
    delay: Duration,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(
        fetcher: F,
        inserter: Inserter,
        cleaner: Cleaner,
        frontier: Frontier,
        base_url: &str,
        delay: Duration,
    ) -> Result<Self> {
        Ok(Pipeline {
            fetcher,
            inserter,
            cleaner,
            frontier,
            base_url: Url::parse(base_url)?,
            delay,
        })
    }

    /// Every link is attempted even if earlier ones fail. The frontier is
    /// flushed before `RunFailed` is returned.
    pub async fn run(&mut self) -> Result<RunReport> {
        let mut ctx = RunContext::new();
        let span = ctx.span().clone();
        let outcome = self.run_links(&mut ctx).instrument(span.clone()).await;

        let _enter = span.enter();
        let failures = ctx.failures();
        if !failures.is_empty() {
            warn!("Scrapes failed: {}", failures.len());
            for (link, err) in failures {
                warn!("  {} due to {}", link, err);
            }
        }
        let report = outcome?;
        if !failures.is_empty() {
            return Err(Error::RunFailed {
                failed: failures.len(),
                attempted: report.attempted,
            });
        }
        info!(
            ingested = report.ingested,
            records = report.records,
            "Run complete"
        );
        Ok(report)
    }

    async fn run_links(&mut self, ctx: &mut RunContext) -> Result<RunReport> {
        if let Err(e) = self.fetcher.login().await {
            warn!("Login failed, continuing without session: {}", e);
        }

        info!("Getting links to blotters from {}", self.base_url);
        let listing = self.fetcher.fetch(self.base_url.as_str()).await?;
        let links = page::discover_links(&listing, &self.base_url);
        let mut report = RunReport {
            discovered: links.len(),
            ..Default::default()
        };

        let new_links = self.frontier.filter(links);
        if new_links.is_empty() {
            info!("No new links available");
            return Ok(report);
        }
        info!("{} new links, scraping", new_links.len());

        let pb = ProgressBar::new(new_links.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        for link in &new_links {
            tokio::time::sleep(self.delay).await;
            pb.set_message(link.clone());
            report.attempted += 1;

            match self.process_link(link).await {
                Ok(n) => {
                    report.ingested += 1;
                    report.records += n;
                    self.frontier.record(link);
                    if let Err(e) = self.frontier.persist() {
                        warn!("Could not save frontier after {}: {}", link, e);
                    }
                    info!(records = n, "Finished {}", link);
                }
                Err(e) => ctx.fail(link, e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        self.frontier.persist()?;
        Ok(report)
    }

    async fn process_link(&mut self, link: &str) -> Result<usize> {
        let html = self.fetcher.fetch(link).await?;
        let raw = page::parse_blotter(&html);
        let batch = self.cleaner.clean(&raw.fragments);
        if batch.is_empty() {
            warn!("No records found on {}", link);
        }
        self.inserter
            .insert_scoped(
                &batch,
                raw.posted_date.as_deref(),
                raw.source_city.as_deref(),
            )
            .await
    }
}

// ── Tests ──
