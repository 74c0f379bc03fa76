use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};

use crate::formats::Track;

/// The music site answers plain clients with a captcha page, so requests
/// present themselves as a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const OG_TITLE: &str = "og:title";
pub const OG_DESCRIPTION: &str = "og:description";
pub const OG_IMAGE: &str = "og:image";

#[async_trait]
pub trait TrackFetcher: Send + Sync {
    async fn fetch_track(&self, link: &str) -> anyhow::Result<Track>;
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build page http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TrackFetcher for PageFetcher {
    async fn fetch_track(&self, link: &str) -> anyhow::Result<Track> {
        let response = self
            .client
            .get(link)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .with_context(|| format!("GET {link}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {link}: unexpected status {status}");
        }

        let html = response
            .text()
            .await
            .with_context(|| format!("read page body: {link}"))?;
        parse_track(&html, link).with_context(|| format!("parse track page: {link}"))
    }
}

/// Pulls the Open Graph title, description and image out of a track page.
pub fn parse_track(html: &str, link: &str) -> anyhow::Result<Track> {
    let document = Html::parse_document(html);
    Ok(Track {
        title: og_property(&document, OG_TITLE)?,
        description: og_property(&document, OG_DESCRIPTION)?,
        cover: og_property(&document, OG_IMAGE)?,
        link: link.to_owned(),
    })
}

fn og_property(document: &Html, property: &str) -> anyhow::Result<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#))
        .map_err(|err| anyhow::anyhow!("build selector for {property}: {err}"))?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .find(|content| !content.trim().is_empty())
        .map(str::to_owned)
        .ok_or_else(|| anyhow::anyhow!("missing {property} meta tag"))
}
