//! Terminal front end for the navigation controller.
//!
//! `bylines browse` loads the site once and then reads one command per
//! line, applying it to a [`Navigator`] over an in-memory history stack.
//! After every transition the pushed URL and the current view are printed,
//! which makes it easy to check deep links and back/forward behaviour
//! without a browser.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `home`, `articles`, `about` | header navigation |
//! | `open <n or id>` | open an article |
//! | `list` | back to the articles page (the detail view's back button) |
//! | `back`, `forward` | browser history buttons |
//! | `comment <author>: <text>` | comment on the open article |
//! | `summary` | AI summary of the open article |
//! | `share` | share links for the open article |
//! | `theme` | toggle light/dark |
//! | `url`, `help`, `quit` | |

use anyhow::Result;
use std::io::{BufRead, Write};

use bylines_core::markup::strip_markup;
use bylines_core::models::Article;
use bylines_core::navigation::{History, MemoryHistory, Navigator, Page, Transition, View};
use bylines_core::theme::LocalStore;

use crate::assist::AssistGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(Page),
    Open(String),
    BackToArticles,
    Back,
    Forward,
    Comment { author: String, content: String },
    Summary,
    Share,
    Theme,
    Url,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((line, ""));

        let cmd = match word {
            "home" => Self::Navigate(Page::Home),
            "articles" => Self::Navigate(Page::Articles),
            "about" => Self::Navigate(Page::About),
            "open" if !rest.is_empty() => Self::Open(rest.to_string()),
            "open" => return Err("usage: open <number or id>".into()),
            "list" => Self::BackToArticles,
            "back" => Self::Back,
            "forward" => Self::Forward,
            "comment" => {
                let (author, content) = rest
                    .split_once(':')
                    .ok_or_else(|| "usage: comment <author>: <text>".to_string())?;
                Self::Comment {
                    author: author.trim().to_string(),
                    content: content.trim().to_string(),
                }
            }
            "summary" => Self::Summary,
            "share" => Self::Share,
            "theme" => Self::Theme,
            "url" => Self::Url,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(cmd)
    }
}

const HELP: &str = "\
commands:
  home | articles | about       navigate
  open <n or id>                open an article
  list                          back to all articles
  back | forward                history
  comment <author>: <text>      comment on the open article
  summary | share               assists for the open article
  theme | url | help | quit
";

/// Resolve `open` arguments: a 1-based position in the listing, or an id.
fn resolve_article<'a>(articles: &'a [Article], arg: &str) -> Option<&'a Article> {
    if let Some(article) = articles.iter().find(|a| a.id == arg) {
        return Some(article);
    }
    let n = arg.parse::<usize>().ok()?;
    n.checked_sub(1).and_then(|i| articles.get(i))
}

fn article_listing(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "  No articles yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, a) in articles.iter().enumerate() {
        out.push_str(&format!("  {:>2}. {}  ({})\n", i + 1, a.title, a.author));
        if !a.date.is_empty() {
            out.push_str(&format!("      {}\n", a.date));
        }
        if !a.excerpt.is_empty() {
            out.push_str(&format!("      {}\n", a.excerpt));
        }
    }
    out
}

/// Plain-text rendering of the current view.
pub fn render_view<H: History>(nav: &Navigator<H>) -> String {
    match nav.view() {
        View::Article(a) => {
            let mut out = format!("# {}\n", a.title);
            let mut byline = format!("By {}", a.author);
            if !a.date.is_empty() {
                byline.push_str(&format!(" · {}", a.date));
            }
            byline.push_str(&format!(" · {} min read", a.reading_minutes()));
            out.push_str(&byline);
            out.push('\n');
            if !a.tags.is_empty() {
                out.push_str(&format!("Tags: {}\n", a.tags.join(", ")));
            }
            out.push('\n');
            out.push_str(strip_markup(&a.content).trim());
            out.push_str(&format!("\n\nComments ({})\n", a.comments.len()));
            if a.comments.is_empty() {
                out.push_str("  Be the first to comment.\n");
            }
            for c in &a.comments {
                out.push_str(&format!("  {} ({}): {}\n", c.author, c.date, c.content));
            }
            out
        }
        View::Home => format!(
            "[banner] {}\n\n## Latest Articles\n{}\n## {}\n{}\n",
            nav.banner_url(),
            article_listing(nav.articles()),
            nav.bio().name,
            strip_markup(&nav.bio().description).trim()
        ),
        View::Articles => format!("## All Articles\n{}", article_listing(nav.articles())),
        View::About => format!(
            "## About {}\n[photo] {}\n\n{}\n",
            nav.bio().name,
            nav.bio().image_url,
            strip_markup(&nav.bio().description).trim()
        ),
    }
}

fn describe(t: &Transition) -> String {
    let mut out = String::new();
    if let Some(url) = &t.pushed {
        out.push_str(&format!("→ {}\n", url));
    }
    if t.scroll_to_top {
        out.push_str("(scrolled to top)\n");
    }
    out
}

/// Run the interactive loop until `quit` or end of input.
pub async fn run<R: BufRead, W: Write>(
    nav: &mut Navigator<MemoryHistory>,
    store: &mut dyn LocalStore,
    assist: &AssistGateway,
    site_url: &str,
    input: R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "[{}] {}", nav.theme(), nav.current_url())?;
    write!(out, "{}", render_view(nav))?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match Command::parse(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                writeln!(out, "{}", msg)?;
                continue;
            }
        };
        tracing::debug!(?cmd, "browse command");

        let transition = match cmd {
            Command::Quit => break,
            Command::Help => {
                write!(out, "{}", HELP)?;
                continue;
            }
            Command::Url => {
                writeln!(out, "{}", nav.history().location())?;
                continue;
            }
            Command::Theme => {
                match nav.toggle_theme(&mut *store) {
                    Ok(theme) => writeln!(out, "theme: {}", theme)?,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to save theme preference");
                        writeln!(out, "theme unchanged: {:#}", e)?;
                    }
                }
                continue;
            }
            Command::Share => {
                match nav.selected_article() {
                    Some(a) => {
                        let links = a.share_links(site_url);
                        writeln!(out, "link:     {}", links.canonical)?;
                        writeln!(out, "twitter:  {}", links.twitter)?;
                        writeln!(out, "linkedin: {}", links.linkedin)?;
                    }
                    None => writeln!(out, "Open an article first.")?,
                }
                continue;
            }
            Command::Summary => {
                match nav.selected_article() {
                    Some(a) => {
                        let summary = assist.summarize(&a.content).await;
                        writeln!(out, "Summary: {}", summary)?;
                    }
                    None => writeln!(out, "Open an article first.")?,
                }
                continue;
            }
            Command::Comment { author, content } => {
                let Some(id) = nav.state().selected_article.clone() else {
                    writeln!(out, "Open an article first.")?;
                    continue;
                };
                if nav.add_comment(&id, &author, &content).is_none() {
                    writeln!(out, "Name and comment are both required.")?;
                    continue;
                }
                // Same state, re-render with the new comment.
                Transition::none()
            }
            Command::Navigate(page) => {
                let t = nav.navigate(page);
                if t.pushed.is_none() {
                    writeln!(out, "(already on {})", page.as_str())?;
                    continue;
                }
                t
            }
            Command::Open(arg) => {
                let Some(id) = resolve_article(nav.articles(), &arg).map(|a| a.id.clone()) else {
                    writeln!(out, "no article '{}'", arg)?;
                    continue;
                };
                nav.select_article(&id)?
            }
            Command::BackToArticles => nav.go_back(),
            Command::Back => match nav.back() {
                Some(t) => t,
                None => {
                    writeln!(out, "(no earlier page)")?;
                    continue;
                }
            },
            Command::Forward => match nav.forward() {
                Some(t) => t,
                None => {
                    writeln!(out, "(no later page)")?;
                    continue;
                }
            },
        };

        write!(out, "{}", describe(&transition))?;
        write!(out, "{}", render_view(nav))?;
    }

    Ok(())
}
