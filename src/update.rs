use std::path::Path;

use anyhow::Context as _;

use crate::config::UpdateConfig;
use crate::document::{self, Origin, Upsert};
use crate::link_log;
use crate::links;
use crate::metadata::{PageFetcher, TrackFetcher};
use crate::telegram::{BotApiSource, MessageSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub new: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub async fn run(config: UpdateConfig) -> anyhow::Result<RunSummary> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("build telegram http client")?;
    let source = BotApiSource::new(client, &config.api_base, &config.credentials)
        .context("configure telegram source")?;
    let fetcher = PageFetcher::new(config.timeout)?;

    run_with(&config, &source, &fetcher).await
}

/// One update pass: diff channel links against the log, fetch metadata for
/// the new ones, upsert them into the page and persist page and log.
///
/// A link whose metadata cannot be fetched is logged and left out of both the
/// page and the log, so the next run tries it again.
pub async fn run_with<S, F>(
    config: &UpdateConfig,
    source: &S,
    fetcher: &F,
) -> anyhow::Result<RunSummary>
where
    S: MessageSource + ?Sized,
    F: TrackFetcher + ?Sized,
{
    let paths = &config.paths;
    let mut logged = link_log::load(&paths.log).await?;
    let mut page = match document::load(&paths.html, &paths.catalogue, &config.title)
        .await
        .context("load page")?
    {
        Some((page, Origin::ImportedPage)) => {
            let before = logged.len();
            logged.extend(page.tracks().iter().map(|track| track.link.clone()));
            tracing::info!(
                added = logged.len() - before,
                "logged links of imported page"
            );
            Some(page)
        }
        Some((page, Origin::Catalogue)) => Some(page),
        None => None,
    };

    let texts = source
        .recent_texts(config.limit)
        .await
        .context("fetch channel messages")?;
    let candidates = links::extract_links(&texts, &config.marker);
    let fresh = links::new_links(&candidates, &logged);

    let mut summary = RunSummary {
        candidates: candidates.len(),
        new: fresh.len(),
        ..RunSummary::default()
    };
    tracing::info!(
        logged = logged.len(),
        candidates = summary.candidates,
        new = summary.new,
        "collected links"
    );

    for link in fresh {
        let track = match fetcher.fetch_track(&link).await {
            Ok(track) => track,
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(%link, %error, "skipping link: metadata unavailable");
                summary.failed += 1;
                continue;
            }
        };

        let title = track.title.clone();
        match document::upsert(&mut page, &config.title, track, config.on_duplicate) {
            Upsert::Inserted => {
                summary.inserted += 1;
                tracing::info!(%link, %title, "track added");
            }
            Upsert::Replaced => {
                summary.replaced += 1;
                tracing::info!(%link, %title, "track refreshed");
            }
            Upsert::Skipped => {
                summary.skipped += 1;
                tracing::info!(%link, "track already present");
            }
        }
        logged.insert(link);
    }

    if config.dry_run {
        tracing::info!(?summary, "dry run: nothing written");
        return Ok(summary);
    }

    let changed = summary.inserted + summary.replaced > 0;
    match &page {
        Some(page) => {
            let catalogue_missing = !file_exists(&paths.catalogue).await?;
            let html_missing = !file_exists(&paths.html).await?;
            if changed || catalogue_missing || html_missing {
                document::save(page, &paths.html, &paths.catalogue)
                    .await
                    .context("save page")?;
            }
        }
        None => {
            if !file_exists(&paths.html).await? {
                document::write_skeleton(&paths.html, &config.title)
                    .await
                    .context("save empty page")?;
            }
        }
    }
    link_log::save(&paths.log, &logged).await?;

    tracing::info!(?summary, "update finished");
    Ok(summary)
}

async fn file_exists(path: &Path) -> anyhow::Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("check existence: {}", path.display()))
}
