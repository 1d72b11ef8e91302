//! # Bylines
//!
//! A CMS-driven personal site engine: articles and a bio come from a
//! Contentful space, AI assists (summaries, narration, chat) come from
//! Gemini, and a URL-driven navigation state machine ties the views
//! together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐
//! │  Contentful  │──▶│ ContentGateway │──▶│  bylines-core    │
//! │  (CDA REST)  │   │   (cms.rs)     │   │  mapper/richtext │
//! └──────────────┘   └────────────────┘   └────────┬─────────┘
//!                                                  │ SiteContent
//! ┌──────────────┐   ┌────────────────┐   ┌────────▼─────────┐
//! │    Gemini    │──▶│ AssistGateway  │──▶│ Navigator / CLI  │
//! │   (REST)     │   │  (assist.rs)   │   │   / JSON API     │
//! └──────────────┘   └────────────────┘   └──────────────────┘
//! ```
//!
//! Pure logic (mapping, rendering, navigation, theme, audio state) lives
//! in the `bylines-core` crate; this crate owns I/O.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Gateway error types |
//! | [`logging`] | Tracing subscriber setup |
//! | [`cms`] | Contentful content gateway |
//! | [`assist`] | Gemini summaries, speech and chat |
//! | [`site`] | Joint site load and load-failure diagnostics |
//! | [`storage`] | File-backed local storage (theme) |
//! | [`speech`] | WAV playback backend |
//! | [`browse`] | Terminal navigator |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | JSON HTTP API |

pub mod assist;
pub mod browse;
pub mod cms;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod site;
pub mod speech;
pub mod storage;
