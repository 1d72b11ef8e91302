//! Page/view state machine synchronised with the URL and history stack.
//!
//! # URL contract
//!
//! | Query | State |
//! |-------|-------|
//! | `?articleId=<id>` (loaded article) | article selected |
//! | `?page=articles` | articles page |
//! | `?page=about` | about page |
//! | anything else | home |
//!
//! `articleId` wins over `page`. External links and bookmarks rely on
//! these exact names.
//!
//! # Source of truth
//!
//! The URL is authoritative. [`url_to_state`] is the only way state is
//! derived from a location, and it is used identically for the initial
//! load ([`Navigator::new`]) and every back/forward event
//! ([`Navigator::pop_state`]). Forward transitions ([`Navigator::navigate`],
//! [`Navigator::select_article`]) update state and push the matching URL.
//!
//! # Effects
//!
//! Transitions return a [`Transition`] describing their side effects (the
//! pushed URL, whether the view should scroll to top) rather than
//! performing them, so a front end can apply them and tests can assert
//! them.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::NavigationError;
use crate::models::{display_date, Article, Bio, Comment, SiteContent};
use crate::theme::{persist_theme, LocalStore, Theme};

/// Top-level pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Home,
    Articles,
    About,
}

impl Page {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Articles => "articles",
            Self::About => "about",
        }
    }

    /// Parse a `page` query value. Only non-home pages have a URL form.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "articles" => Some(Self::Articles),
            "about" => Some(Self::About),
            _ => None,
        }
    }
}

/// Navigation state. A selected article takes rendering precedence over `page`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub page: Page,
    pub selected_article: Option<String>,
}

/// The routing-relevant query parameters of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub article_id: Option<String>,
    pub page: Option<String>,
}

impl QueryParams {
    /// Parse a location (`/path?query#fragment`, `?query`, or a bare path).
    ///
    /// The first occurrence of each parameter wins; empty values count as absent.
    pub fn parse(location: &str) -> Self {
        let query = location
            .split_once('?')
            .map(|(_, q)| q.split('#').next().unwrap_or(""))
            .unwrap_or("");

        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "articleId" if params.article_id.is_none() => {
                    params.article_id = Some(value.into_owned())
                }
                "page" if params.page.is_none() => params.page = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// Derive navigation state from URL parameters and the loaded articles.
///
/// An `articleId` that matches no loaded article is ignored and resolution
/// falls through to `page`.
pub fn url_to_state(query: &QueryParams, articles: &[Article]) -> NavigationState {
    if let Some(id) = &query.article_id {
        if articles.iter().any(|a| &a.id == id) {
            return NavigationState {
                page: Page::Home,
                selected_article: Some(id.clone()),
            };
        }
    }

    NavigationState {
        page: query
            .page
            .as_deref()
            .and_then(Page::from_param)
            .unwrap_or_default(),
        selected_article: None,
    }
}

/// The URL representing `state` under `path`.
pub fn state_url(path: &str, state: &NavigationState) -> String {
    if let Some(id) = &state.selected_article {
        let id: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
        return format!("{}?articleId={}", path, id);
    }
    match state.page {
        Page::Home => path.to_string(),
        page => format!("{}?page={}", path, page.as_str()),
    }
}

fn location_path(location: &str) -> &str {
    match location.split(['?', '#']).next() {
        Some(path) if !path.is_empty() => path,
        _ => "/",
    }
}

/// Browser history: the current location plus a way to push new entries.
pub trait History {
    fn location(&self) -> &str;
    fn push(&mut self, url: String);
}

/// In-memory history stack with back/forward, mirroring browser semantics:
/// pushing discards any forward entries.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: vec![initial.into()],
            index: 0,
        }
    }

    /// Move back one entry. Returns `false` at the start of the stack.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Move forward one entry. Returns `false` at the end of the stack.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl History for MemoryHistory {
    fn location(&self) -> &str {
        &self.entries[self.index]
    }

    fn push(&mut self, url: String) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }
}

/// Side effects of a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// URL pushed onto history, if any.
    pub pushed: Option<String>,
    /// The view should reset its scroll position.
    pub scroll_to_top: bool,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }
}

/// What should be rendered for the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View<'a> {
    Article(&'a Article),
    Home,
    Articles,
    About,
}

/// Monotonic comment ids derived from the wall clock.
#[derive(Debug, Clone, Default)]
struct CommentClock {
    last: i64,
}

impl CommentClock {
    fn next_id(&mut self, now_ms: i64) -> i64 {
        let id = now_ms.max(self.last + 1);
        self.last = id;
        id
    }
}

/// Application state owner: loaded content, navigation state, theme, and
/// the history handle. All mutation goes through the named transitions.
#[derive(Debug)]
pub struct Navigator<H: History> {
    content: SiteContent,
    state: NavigationState,
    theme: Theme,
    history: H,
    path: String,
    clock: CommentClock,
}

impl<H: History> Navigator<H> {
    /// Build the controller, deriving the initial state from the current location.
    pub fn new(content: SiteContent, history: H, theme: Theme) -> Self {
        let location = history.location();
        let state = url_to_state(&QueryParams::parse(location), &content.articles);
        let path = location_path(location).to_string();

        Self {
            content,
            state,
            theme,
            history,
            path,
            clock: CommentClock::default(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn view(&self) -> View<'_> {
        if let Some(article) = self.selected_article() {
            return View::Article(article);
        }
        match self.state.page {
            Page::Home => View::Home,
            Page::Articles => View::Articles,
            Page::About => View::About,
        }
    }

    pub fn selected_article(&self) -> Option<&Article> {
        let id = self.state.selected_article.as_deref()?;
        self.article(id)
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.content.articles.iter().find(|a| a.id == id)
    }

    pub fn articles(&self) -> &[Article] {
        &self.content.articles
    }

    pub fn bio(&self) -> &Bio {
        &self.content.bio
    }

    pub fn banner_url(&self) -> &str {
        &self.content.banner_url
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    /// Show a top-level page, clearing any selected article.
    ///
    /// A no-op (nothing pushed) when the page is already showing.
    pub fn navigate(&mut self, page: Page) -> Transition {
        if self.state.page == page && self.state.selected_article.is_none() {
            return Transition::none();
        }
        let previous = std::mem::replace(
            &mut self.state,
            NavigationState {
                page,
                selected_article: None,
            },
        );
        let url = self.push_current();
        self.settle(&previous, Some(url))
    }

    /// Open an article's detail view.
    pub fn select_article(&mut self, id: &str) -> Result<Transition, NavigationError> {
        if self.article(id).is_none() {
            return Err(NavigationError::UnknownArticle(id.to_string()));
        }
        let previous = self.state.clone();
        self.state.selected_article = Some(id.to_string());
        let url = self.push_current();
        Ok(self.settle(&previous, Some(url)))
    }

    /// "Back to Articles" from the detail view.
    pub fn go_back(&mut self) -> Transition {
        self.navigate(Page::Articles)
    }

    /// Re-derive state after the history location changed (back/forward).
    pub fn pop_state(&mut self) -> Transition {
        let next = url_to_state(
            &QueryParams::parse(self.history.location()),
            &self.content.articles,
        );
        let previous = std::mem::replace(&mut self.state, next);
        self.settle(&previous, None)
    }

    /// Append a session-local comment to an article.
    ///
    /// Returns `None` when the article is unknown or author/content is blank.
    pub fn add_comment(&mut self, article_id: &str, author: &str, content: &str) -> Option<Comment> {
        self.add_comment_at(article_id, author, content, Local::now())
    }

    /// [`add_comment`](Self::add_comment) with an explicit creation time.
    pub fn add_comment_at(
        &mut self,
        article_id: &str,
        author: &str,
        content: &str,
        now: DateTime<Local>,
    ) -> Option<Comment> {
        if author.trim().is_empty() || content.trim().is_empty() {
            return None;
        }
        let article = self
            .content
            .articles
            .iter_mut()
            .find(|a| a.id == article_id)?;

        let comment = Comment {
            id: self.clock.next_id(now.timestamp_millis()),
            author: author.to_string(),
            content: content.to_string(),
            date: display_date(now.date_naive()),
        };
        article.comments.push(comment.clone());
        Some(comment)
    }

    /// Flip the theme and persist the new preference.
    pub fn toggle_theme(&mut self, store: &mut dyn LocalStore) -> anyhow::Result<Theme> {
        let next = self.theme.toggled();
        persist_theme(store, next)?;
        self.theme = next;
        Ok(next)
    }

    /// The URL for the current state under this site's path.
    pub fn current_url(&self) -> String {
        state_url(&self.path, &self.state)
    }

    fn push_current(&mut self) -> String {
        let url = self.current_url();
        self.history.push(url.clone());
        url
    }

    fn settle(&self, previous: &NavigationState, pushed: Option<String>) -> Transition {
        let changed = *previous != self.state;
        Transition {
            pushed,
            scroll_to_top: changed
                && (self.state.selected_article.is_some() || self.state.page != Page::Home),
        }
    }
}

impl Navigator<MemoryHistory> {
    /// Browser back button: move history back, then re-derive from the URL.
    pub fn back(&mut self) -> Option<Transition> {
        self.history.back().then(|| self.pop_state())
    }

    /// Browser forward button.
    pub fn forward(&mut self) -> Option<Transition> {
        self.history.forward().then(|| self.pop_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{MemoryStore, THEME_KEY};
    use chrono::TimeZone;

    fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Article {}", id),
            author: "Anonymous".to_string(),
            date: String::new(),
            excerpt: String::new(),
            content: "<p>text</p>".to_string(),
            tags: vec![],
            comments: vec![],
        }
    }

    fn content() -> SiteContent {
        SiteContent {
            articles: vec![article("x1"), article("x2")],
            bio: Bio {
                name: "Owner".to_string(),
                description: "<p>bio</p>".to_string(),
                image_url: "https://img.example/bio.png".to_string(),
            },
            banner_url: "https://img.example/banner.png".to_string(),
        }
    }

    fn navigator(location: &str) -> Navigator<MemoryHistory> {
        Navigator::new(content(), MemoryHistory::new(location), Theme::Dark)
    }

    #[test]
    fn test_url_to_state_rules() {
        let articles = content().articles;
        let state = |loc: &str| url_to_state(&QueryParams::parse(loc), &articles);

        assert_eq!(state("/"), NavigationState::default());
        assert_eq!(state("/?page=articles").page, Page::Articles);
        assert_eq!(state("/?page=about").page, Page::About);
        assert_eq!(state("/?page=nonsense").page, Page::Home);
        assert_eq!(
            state("/?page=about&articleId=x2"),
            NavigationState {
                page: Page::Home,
                selected_article: Some("x2".to_string())
            }
        );
        assert_eq!(state("/?articleId=unknown&page=about").page, Page::About);
        assert_eq!(state("/?articleId=&page=articles").page, Page::Articles);
        assert_eq!(state("/?page=about#top").page, Page::About);
    }

    #[test]
    fn test_initial_state_from_location() {
        let nav = navigator("/blog?articleId=x1");
        assert_eq!(nav.selected_article().map(|a| a.id.as_str()), Some("x1"));
        assert!(matches!(nav.view(), View::Article(a) if a.id == "x1"));
        assert_eq!(navigator("/?page=about").view(), View::About);
        assert_eq!(navigator("").view(), View::Home);
    }

    #[test]
    fn test_select_round_trip() {
        let mut nav = navigator("/");
        let t = nav.select_article("x2").unwrap();
        assert_eq!(t.pushed.as_deref(), Some("/?articleId=x2"));
        assert!(t.scroll_to_top);

        // Simulate a reload at the pushed URL.
        let reloaded = Navigator::new(
            content(),
            MemoryHistory::new(nav.history().location()),
            Theme::Dark,
        );
        assert_eq!(reloaded.state().selected_article.as_deref(), Some("x2"));
    }

    #[test]
    fn test_select_unknown_article() {
        let mut nav = navigator("/");
        assert_eq!(
            nav.select_article("nope"),
            Err(NavigationError::UnknownArticle("nope".to_string()))
        );
        assert_eq!(nav.history().len(), 1);
    }

    #[test]
    fn test_navigate_same_page_is_noop() {
        let mut nav = navigator("/?page=articles");
        let t = nav.navigate(Page::Articles);
        assert_eq!(t, Transition::none());
        assert_eq!(nav.history().len(), 1);

        let mut home = navigator("/");
        assert_eq!(home.navigate(Page::Home), Transition::none());
        assert_eq!(home.history().len(), 1);
    }

    #[test]
    fn test_navigate_clears_selection() {
        let mut nav = navigator("/?articleId=x1");
        let t = nav.navigate(Page::Home);
        assert_eq!(t.pushed.as_deref(), Some("/"));
        assert!(!t.scroll_to_top);
        assert_eq!(nav.view(), View::Home);

        let t = nav.navigate(Page::About);
        assert_eq!(t.pushed.as_deref(), Some("/?page=about"));
        assert!(t.scroll_to_top);
    }

    #[test]
    fn test_home_article_back_scenario() {
        let mut nav = navigator("/");

        nav.select_article("x1").unwrap();
        assert!(matches!(nav.view(), View::Article(a) if a.id == "x1"));
        assert_eq!(nav.history().location(), "/?articleId=x1");

        let t = nav.go_back();
        assert_eq!(nav.view(), View::Articles);
        assert_eq!(t.pushed.as_deref(), Some("/?page=articles"));
        assert_eq!(nav.history().location(), "/?page=articles");

        let t = nav.back().expect("history has a previous entry");
        assert!(t.pushed.is_none());
        assert!(t.scroll_to_top);
        assert!(matches!(nav.view(), View::Article(a) if a.id == "x1"));
        assert_eq!(nav.history().location(), "/?articleId=x1");

        nav.back().unwrap();
        assert_eq!(nav.view(), View::Home);
        assert!(nav.back().is_none());

        nav.forward().unwrap();
        assert_eq!(nav.state().selected_article.as_deref(), Some("x1"));
    }

    #[test]
    fn test_push_discards_forward_entries() {
        let mut history = MemoryHistory::new("/");
        history.push("/?page=about".to_string());
        history.push("/?page=articles".to_string());
        assert!(history.back());
        history.push("/?articleId=x1".to_string());
        assert_eq!(history.entries(), ["/", "/?page=about", "/?articleId=x1"]);
        assert!(!history.forward());
    }

    #[test]
    fn test_add_comment_updates_collection_and_selection() {
        let mut nav = navigator("/?articleId=x1");
        let now = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        let c = nav.add_comment_at("x1", "Sam", "Great read", now).unwrap();
        assert_eq!(c.date, "March 5, 2024");
        assert_eq!(c.id, now.timestamp_millis());

        let from_list = nav.article("x1").unwrap().comments.clone();
        let from_detail = nav.selected_article().unwrap().comments.clone();
        assert_eq!(from_list, vec![c.clone()]);
        assert_eq!(from_list, from_detail);

        // Still present after navigating away and back.
        nav.go_back();
        nav.back();
        assert_eq!(nav.selected_article().unwrap().comments, vec![c]);
    }

    #[test]
    fn test_comment_ids_strictly_increase() {
        let mut nav = navigator("/");
        let now = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let a = nav.add_comment_at("x1", "A", "one", now).unwrap();
        let b = nav.add_comment_at("x2", "B", "two", now).unwrap();
        let c = nav.add_comment_at("x1", "C", "three", now).unwrap();
        assert!(a.id < b.id && b.id < c.id);

        let d = nav.add_comment("x2", "D", "live clock").unwrap();
        assert!(d.id > c.id);
    }

    #[test]
    fn test_add_comment_rejects_blank_and_unknown() {
        let mut nav = navigator("/");
        assert!(nav.add_comment("x1", "  ", "text").is_none());
        assert!(nav.add_comment("x1", "Sam", "").is_none());
        assert!(nav.add_comment("missing", "Sam", "text").is_none());
        assert!(nav.article("x1").unwrap().comments.is_empty());
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut nav = navigator("/");
        let mut store = MemoryStore::new();
        assert_eq!(nav.toggle_theme(&mut store).unwrap(), Theme::Light);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("light"));
        assert_eq!(nav.state(), &NavigationState::default());
    }

    struct ReadOnlyStore;

    impl LocalStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("storage is read-only")
        }
    }

    #[test]
    fn test_toggle_theme_keeps_theme_when_store_fails() {
        let mut nav = navigator("/");
        assert!(nav.toggle_theme(&mut ReadOnlyStore).is_err());
        assert_eq!(nav.theme(), Theme::Dark);
    }

    #[test]
    fn test_article_id_is_url_encoded() {
        let state = NavigationState {
            page: Page::Home,
            selected_article: Some("a b&c".to_string()),
        };
        let url = state_url("/", &state);
        assert_eq!(url, "/?articleId=a+b%26c");
        assert_eq!(
            QueryParams::parse(&url).article_id.as_deref(),
            Some("a b&c")
        );
    }
}
