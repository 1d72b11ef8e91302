//! CLI command implementations.
//!
//! Each `run_*` function backs one `bylines` subcommand: it builds the
//! gateways it needs from [`Config`], does the work, and prints to stdout.
//! Diagnostics go to stderr through `tracing`.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use bylines_core::audio::AudioSession;
use bylines_core::markup::strip_markup;
use bylines_core::models::Article;
use bylines_core::navigation::{MemoryHistory, Navigator};
use bylines_core::theme::initial_theme;

use crate::assist::{AssistGateway, CHAT_ERROR_REPLY, CHAT_GREETING};
use crate::browse;
use crate::cms::{ContentGateway, ContentSource};
use crate::config::Config;
use crate::site::{diagnose, format_fields, load_site, render_diagnosis};
use crate::speech::WavBackend;
use crate::storage::FileStore;

fn gateways(config: &Config) -> Result<(ContentGateway, AssistGateway)> {
    Ok((
        ContentGateway::from_config(&config.cms)?,
        AssistGateway::from_config(&config.ai, &config.site.owner_name)?,
    ))
}

async fn find_article(content: &ContentGateway, id: &str) -> Result<Article> {
    let articles = content.fetch_articles().await?;
    articles
        .into_iter()
        .find(|a| a.id == id)
        .with_context(|| format!("article not found: {}", id))
}

/// `bylines articles`
pub async fn run_articles(config: &Config, json: bool) -> Result<()> {
    let content = ContentGateway::from_config(&config.cms)?;
    let articles = content.fetch_articles().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles.");
        return Ok(());
    }
    for a in &articles {
        let date = if a.date.is_empty() { "-" } else { a.date.as_str() };
        println!("{}  {}  {}  ({})", a.id, date, a.title, a.author);
    }
    println!("\n{} article(s)", articles.len());
    Ok(())
}

/// `bylines article <id>`
pub async fn run_article(config: &Config, id: &str, json: bool) -> Result<()> {
    let content = ContentGateway::from_config(&config.cms)?;
    let article = find_article(&content, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&article)?);
        return Ok(());
    }

    println!("# {}", article.title);
    let mut byline = format!("By {}", article.author);
    if !article.date.is_empty() {
        byline.push_str(&format!(" · {}", article.date));
    }
    println!("{} · {} min read", byline, article.reading_minutes());
    if !article.tags.is_empty() {
        println!("Tags: {}", article.tags.join(", "));
    }
    println!();
    println!("{}", strip_markup(&article.content).trim());

    let links = article.share_links(&config.site.url);
    println!();
    println!("Link:     {}", links.canonical);
    println!("Twitter:  {}", links.twitter);
    println!("LinkedIn: {}", links.linkedin);
    Ok(())
}

/// `bylines bio`
pub async fn run_bio(config: &Config) -> Result<()> {
    let content = ContentGateway::from_config(&config.cms)?;
    let (description, image_url) = tokio::join!(
        content.fetch_bio_description(),
        content.fetch_asset_url(&config.site.bio_image_asset_id),
    );
    let description = description?;

    println!("## {}", config.site.owner_name);
    println!("[photo] {}", image_url);
    println!();
    println!("{}", strip_markup(&description).trim());
    Ok(())
}

/// `bylines inspect [content-type]`
pub async fn run_inspect(config: &Config, content_type: Option<&str>) -> Result<()> {
    let content = ContentGateway::from_config(&config.cms)?;
    let Some(id) = content_type.or(content.article_content_type()) else {
        bail!("no content type given and CONTENTFUL_CONTENT_TYPE_ID is not set");
    };

    let fields = content.fetch_content_type(id).await?;
    println!("Content type: {}", id);
    if fields.is_empty() {
        println!("  (no fields)");
    } else {
        print!("{}", format_fields(&fields));
    }
    Ok(())
}

/// `bylines summarize <id>`
pub async fn run_summarize(config: &Config, id: &str) -> Result<()> {
    let (content, assist) = gateways(config)?;
    let article = find_article(&content, id).await?;
    println!("{}", assist.summarize(&article.content).await);
    Ok(())
}

/// `bylines speak <id> --out <file.wav>`
pub async fn run_speak(config: &Config, id: &str, out: &Path) -> Result<()> {
    let (content, assist) = gateways(config)?;
    let article = find_article(&content, id).await?;

    let mut session = AudioSession::new(WavBackend::new(out));
    session.start()?;
    eprintln!("{}", session.control().label);

    let audio = assist.synthesize_speech(&article.content).await;
    if let Err(err) = session.finish_generation(audio) {
        eprintln!("{}", session.control().label);
        bail!("could not generate audio for '{}': {}", article.title, err);
    }

    let seconds = session.backend().last_duration().unwrap_or_default();
    session.on_complete();
    println!("Wrote {} ({:.1}s)", out.display(), seconds);
    Ok(())
}

/// Chat loop over arbitrary reader/writer, one reply per input line.
pub async fn chat_loop<R: BufRead, W: Write>(assist: &AssistGateway, input: R, out: &mut W) -> Result<()> {
    let mut session = None;
    writeln!(out, "AI: {}", CHAT_GREETING)?;

    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "quit" | "exit") {
            break;
        }

        match assist.chat(&mut session, message).await {
            Ok(reply) => writeln!(out, "AI: {}", reply)?,
            Err(err) => {
                tracing::error!(error = %err, "chat turn failed");
                writeln!(out, "AI: {}", CHAT_ERROR_REPLY)?;
            }
        }
    }
    Ok(())
}

/// `bylines chat`
pub async fn run_chat(config: &Config) -> Result<()> {
    let assist = AssistGateway::from_config(&config.ai, &config.site.owner_name)?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    chat_loop(&assist, stdin.lock(), &mut stdout).await
}

/// `bylines browse [--location <url>]`
pub async fn run_browse(config: &Config, location: &str) -> Result<()> {
    let (content, assist) = gateways(config)?;

    let site = match load_site(&content, &config.site).await {
        Ok(site) => site,
        Err(err) => {
            let diagnosis = diagnose(&content, &err).await;
            eprint!("{}", render_diagnosis(&diagnosis));
            bail!("failed to load site content");
        }
    };

    let mut store = FileStore::open(&config.storage.path);
    let theme = initial_theme(&store, config.site.prefers_dark);
    let mut nav = Navigator::new(site, MemoryHistory::new(location), theme);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    browse::run(
        &mut nav,
        &mut store,
        &assist,
        &config.site.url,
        stdin.lock(),
        &mut stdout,
    )
    .await
}
