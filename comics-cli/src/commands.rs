use std::sync::Arc;

use anyhow::{Context, Result};
#[cfg(feature = "colored-output")]
use colored::*;
use comics_source::api::SITE_DOMAIN;
use comics_source::{BilibiliComics, Chapter, ChapterRef, ComicRef, LocaleConfig, Page};
use reqwest::Url;
use reqwest::cookie::Jar;
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;

/// Build the source, seeding the cookie jar with the session cookie if any.
pub fn build_source(config: AppConfig) -> Result<BilibiliComics> {
    let jar = Arc::new(Jar::default());
    if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
        let base = Url::parse(&config.source.base_url)
            .with_context(|| format!("Invalid base URL: {}", config.source.base_url))?;
        jar.add_cookie_str(&session_cookie(cookie), &base);
        info!("Using session cookie");
    }
    BilibiliComics::new(config.source, jar).context("Failed to create the source")
}

/// `Set-Cookie` line for the session cookie. Raw JSON is percent-encoded.
fn session_cookie(value: &str) -> String {
    let value = value.trim();
    let value = if value.starts_with('{') {
        urlencoding::encode(value).into_owned()
    } else {
        value.to_string()
    };
    format!("access_token={value}; Domain={SITE_DOMAIN}; Path=/")
}

pub async fn chapters(source: &BilibiliComics, comic: &str, json: bool) -> Result<()> {
    let comic = ComicRef::parse(comic)?;
    let chapters = source
        .chapter_list(&comic)
        .await
        .with_context(|| format!("Failed to fetch chapters of {}", comic.path()))?;

    if json {
        return print_json(&chapters);
    }
    if chapters.is_empty() {
        println!("No readable chapters.");
    }
    for chapter in &chapters {
        println!("{}", format_chapter(chapter));
    }
    Ok(())
}

pub async fn pages(
    source: &BilibiliComics,
    chapter: &str,
    resolve: bool,
    json: bool,
) -> Result<()> {
    let chapter = ChapterRef::parse(chapter)?;
    let mut pages = source
        .page_list(&chapter)
        .await
        .with_context(|| format!("Failed to fetch pages of {}", chapter.path()))?;
    if resolve {
        source
            .resolve_image_urls(&mut pages)
            .await
            .context("Failed to resolve image URLs")?;
    }

    if json {
        return print_json(&pages);
    }
    for page in &pages {
        println!("{}", format_page(page));
    }
    Ok(())
}

pub fn locale(config: &LocaleConfig, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }
    println!("{}: {} (api: {})", heading("Language"), config.lang, config.api_lang);
    println!("{}: {}", heading("Sort"), config.sort_options.join(", "));
    println!("{}: {}", heading("Status"), config.statuses.join(", "));
    println!("{}: {}", heading("Price"), config.prices.join(", "));
    println!("{}:", heading("Genres"));
    for genre in config.genres {
        println!("  {:>4}  {}", genre.id, genre.name);
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_chapter(chapter: &Chapter) -> String {
    format!("{:<20} {}", chapter.url, chapter.name)
}

fn format_page(page: &Page) -> String {
    match &page.image_url {
        Some(url) => format!("{:>3}  {}", page.index + 1, url),
        None => format!("{:>3}  {}", page.index + 1, page.path),
    }
}

#[cfg(feature = "colored-output")]
fn heading(text: &str) -> String {
    text.green().bold().to_string()
}

#[cfg(not(feature = "colored-output"))]
fn heading(text: &str) -> String {
    text.to_string()
}
