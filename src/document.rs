//! The track page.
//!
//! The page is kept as an ordered list of [`Track`]s and rendered to HTML in
//! full on every save. The list is persisted in a catalogue (`tracks.json`)
//! next to the page; a page without a catalogue is imported once by parsing
//! its track blocks.

use std::path::Path;

use anyhow::Context as _;
use scraper::{Html, Selector};

use crate::cli::{DuplicatePolicy, RenderArgs};
use crate::config::catalogue_path_for;
use crate::formats::Track;
use crate::persist;

pub const BLOCK_CLASS: &str = "track-block";
const LISTEN_LABEL: &str = "Слушать на Яндекс Музыке";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    title: String,
    tracks: Vec<Track>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tracks: Vec::new(),
        }
    }

    /// Builds a document from stored tracks. Later entries for a link that
    /// already appeared are dropped.
    pub fn from_tracks(title: impl Into<String>, tracks: Vec<Track>) -> Self {
        let mut document = Self::new(title);
        for track in tracks {
            document.upsert(track, DuplicatePolicy::Skip);
        }
        document
    }

    /// Recovers tracks from a previously rendered page.
    pub fn from_html(title: impl Into<String>, html: &str) -> anyhow::Result<Self> {
        let page = Html::parse_document(html);
        let block = selector(&format!("div.{BLOCK_CLASS}"))?;
        let image = selector("img[src]")?;
        let heading = selector("strong")?;
        let paragraph = selector("p")?;
        let anchor = selector("a[href]")?;

        let mut tracks = Vec::new();
        for element in page.select(&block) {
            let Some(link) = element
                .select(&anchor)
                .find_map(|a| a.value().attr("href"))
            else {
                tracing::debug!("track block without a link; ignoring");
                continue;
            };
            let cover = element
                .select(&image)
                .find_map(|img| img.value().attr("src"))
                .unwrap_or_default();
            let track_title = element
                .select(&heading)
                .next()
                .map(|strong| strong.text().collect::<String>())
                .unwrap_or_default();
            let description = element
                .select(&paragraph)
                .find(|p| p.select(&heading).next().is_none())
                .map(|p| p.text().collect::<String>())
                .unwrap_or_default();

            tracks.push(Track {
                title: track_title,
                description,
                cover: cover.to_owned(),
                link: link.to_owned(),
            });
        }

        Ok(Self::from_tracks(title, tracks))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn position(&self, link: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.link == link)
    }

    /// Inserts `track`, or resolves a clash with an existing block for the
    /// same link according to `policy`. Either way the document ends with
    /// exactly one block for the link; other blocks keep their order.
    pub fn upsert(&mut self, track: Track, policy: DuplicatePolicy) -> Upsert {
        match (self.position(&track.link), policy) {
            (None, _) => {
                self.tracks.push(track);
                Upsert::Inserted
            }
            (Some(_), DuplicatePolicy::Skip) => Upsert::Skipped,
            (Some(idx), DuplicatePolicy::Replace) => {
                self.tracks[idx] = track;
                Upsert::Replaced
            }
        }
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        html.push_str(&render_head(&self.title));
        for track in &self.tracks {
            html.push_str(&render_block(track));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Upserts into a document that may not exist yet; an absent document starts
/// as an empty page titled `title`.
pub fn upsert(
    document: &mut Option<Document>,
    title: &str,
    track: Track,
    policy: DuplicatePolicy,
) -> Upsert {
    document
        .get_or_insert_with(|| Document::new(title))
        .upsert(track, policy)
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("build selector {css:?}: {err}"))
}

fn render_head(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }}
    h1 {{ color: #2c3e50; }}
    .{BLOCK_CLASS} {{ display: flex; gap: 16px; margin: 16px 0; }}
    .cover {{ width: 120px; height: 120px; object-fit: cover; }}
    a {{ color: #3498db; text-decoration: none; }}
    a:hover {{ text-decoration: underline; }}
  </style>
</head>
<body>
<h1>🎧 {title}</h1>
"#
    )
}

// Field values go in verbatim.
fn render_block(track: &Track) -> String {
    format!(
        r#"<div class="{BLOCK_CLASS}">
  <img src="{cover}" alt="{title}" class="cover">
  <div class="track-info">
    <p><strong>{title}</strong></p>
    <p>{description}</p>
    <a href="{link}" target="_blank">{LISTEN_LABEL}</a>
  </div>
</div>
"#,
        cover = track.cover,
        title = track.title,
        description = track.description,
        link = track.link,
    )
}

/// Where a loaded document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Catalogue,
    /// Parsed out of a page that had no catalogue next to it.
    ImportedPage,
}

/// Loads the page model: the catalogue if present, otherwise the tracks of an
/// existing page, otherwise `None`.
pub async fn load(
    html_path: &Path,
    catalogue: &Path,
    title: &str,
) -> anyhow::Result<Option<(Document, Origin)>> {
    let tracks: Option<Vec<Track>> = persist::read_json(catalogue)
        .await
        .with_context(|| format!("read track catalogue: {}", catalogue.display()))?;
    if let Some(tracks) = tracks {
        return Ok(Some((Document::from_tracks(title, tracks), Origin::Catalogue)));
    }

    let html = persist::read_text(html_path)
        .await
        .with_context(|| format!("read page: {}", html_path.display()))?;
    let Some(html) = html else {
        return Ok(None);
    };

    let document = Document::from_html(title, &html)
        .with_context(|| format!("import page: {}", html_path.display()))?;
    tracing::info!(
        path = %html_path.display(),
        tracks = document.tracks().len(),
        "imported tracks from existing page"
    );
    Ok(Some((document, Origin::ImportedPage)))
}

/// Writes the catalogue, then the page rendered from it.
pub async fn save(
    document: &Document,
    html_path: &Path,
    catalogue: &Path,
) -> anyhow::Result<()> {
    persist::write_json_atomic(catalogue, document.tracks())
        .await
        .with_context(|| format!("write track catalogue: {}", catalogue.display()))?;
    write_page(html_path, document).await?;
    tracing::info!(
        path = %html_path.display(),
        tracks = document.tracks().len(),
        "page saved"
    );
    Ok(())
}

/// Writes an empty page so the static site always has something to serve.
pub async fn write_skeleton(html_path: &Path, title: &str) -> anyhow::Result<()> {
    write_page(html_path, &Document::new(title)).await?;
    tracing::info!(path = %html_path.display(), "empty page created");
    Ok(())
}

async fn write_page(html_path: &Path, document: &Document) -> anyhow::Result<()> {
    persist::write_atomic(html_path, document.render().as_bytes())
        .await
        .with_context(|| format!("write page: {}", html_path.display()))
}

pub async fn render(args: RenderArgs) -> anyhow::Result<()> {
    let html_path = Path::new(&args.html);
    let catalogue = catalogue_path_for(html_path);

    match load(html_path, &catalogue, &args.title).await? {
        Some((document, _)) => save(&document, html_path, &catalogue).await,
        None => write_skeleton(html_path, &args.title).await,
    }
}
