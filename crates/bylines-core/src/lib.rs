//! # Bylines Core
//!
//! Pure, I/O-free logic for Bylines: content models, CMS entry mapping,
//! rich-text rendering, author resolution, the navigation state machine,
//! theme preference, and the audio playback state machine.
//!
//! This crate performs no network or filesystem access, so every mapping
//! and transition can be tested offline against fixture CMS payloads.

pub mod audio;
pub mod authors;
pub mod error;
pub mod mapper;
pub mod markup;
pub mod models;
pub mod navigation;
pub mod richtext;
pub mod theme;
