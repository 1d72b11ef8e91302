//! Error types for the content mapping layer.

/// A single CMS entry that could not be mapped to an [`Article`](crate::models::Article).
///
/// Never fatal to a listing: the mapper logs it and skips the entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    /// The entry has no `sys.id`, so it cannot be addressed or linked.
    #[error("entry at position {index} has no sys.id")]
    MissingId { index: usize },

    /// The entry has no `fields` object.
    #[error("entry {id} has no fields object")]
    MissingFields { id: String },
}

impl EntryError {
    /// The entry id, when the entry had one.
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            Self::MissingId { .. } => None,
            Self::MissingFields { id } => Some(id),
        }
    }
}

/// A navigation intent that cannot be applied to the loaded content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no loaded article with id {0}")]
    UnknownArticle(String),
}
