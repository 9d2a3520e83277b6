//! The crawl worker pool: each thread repeatedly pops a URL from the
//! frontier, fetches it, saves it, extracts its links, and reports back
//! so the frontier can detect when every worker has run dry.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use frontier::{Frontier, Pop};
use log::{debug, info, warn};

use crate::docfile::{self, Docfile};
use crate::parse::{extract_links, PageUrl};
use crate::stats::Stats;
use crate::{http, CrawlerError};

pub struct CrawlContext {
    pub frontier: Arc<Frontier>,
    pub stats: Arc<Stats>,
    pub save_dir: PathBuf,
    pub docfile: Arc<Docfile>,
}

pub fn spawn_workers(num_threads: usize, ctx: Arc<CrawlContext>) -> Vec<JoinHandle<()>> {
    (0..num_threads)
        .map(|id| {
            let ctx = Arc::clone(&ctx);
            thread::Builder::new()
                .name(format!("crawl-worker-{}", id))
                .spawn(move || worker_loop(&ctx))
                .expect("failed to spawn crawl worker thread")
        })
        .collect()
}

fn worker_loop(ctx: &CrawlContext) {
    loop {
        match ctx.frontier.pop() {
            Pop::Stop => {
                debug!("{:?} stopping: frontier drained", thread::current().id());
                return;
            }
            Pop::Url(url) => process_one(ctx, &url),
        }
    }
}

fn process_one(ctx: &CrawlContext, raw_url: &str) {
    match fetch_and_save(ctx, raw_url) {
        Ok(links) => ctx.frontier.finish(links),
        Err(why) => {
            warn!("failed to crawl {}: {}", raw_url, why);
            ctx.frontier.fail();
        }
    }
}

fn fetch_and_save(ctx: &CrawlContext, raw_url: &str) -> Result<Vec<String>, CrawlerError> {
    let url = PageUrl::parse(raw_url)?;
    let body = http::get(&url)?;

    ctx.stats.record_page(body.len());
    docfile::save_page(&ctx.save_dir, &url, &body, &ctx.docfile)?;
    info!("saved {} ({} bytes)", url.to_string(), body.len());

    let text = String::from_utf8_lossy(&body);
    Ok(extract_links(&text, &url))
}
