//! ATOM metadata records.
//!
//! Each record is assembled from one source element and never changed after
//! the reader hands it out.

use chrono::{DateTime, FixedOffset};
use url::Url;

/// Kind of an ATOM text construct (`type` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AtomTextConstructKind {
    #[default]
    Text,
    Html,
    Xhtml,
}

/// `title`, `rights`, `subtitle` and `summary`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomTextConstruct {
    pub kind: AtomTextConstructKind,
    /// Element text, or the inner markup for `xhtml`.
    pub text: String,
}

impl AtomTextConstruct {
    pub fn new(kind: AtomTextConstructKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// `author` and `contributor`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomPersonMetadata {
    pub name: Option<String>,
    pub uri: Option<Url>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomCategoryMetadata {
    pub term: Option<String>,
    pub scheme: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomGeneratorMetadata {
    /// Element text.
    pub name: Option<String>,
    pub uri: Option<Url>,
    pub version: Option<String>,
}

/// A `link` element, read without interpreting its relation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomLinkMetadata {
    pub href: Option<Url>,
    pub relation: Option<String>,
    pub media_type: Option<String>,
    pub href_lang: Option<String>,
    pub title: Option<String>,
    pub length: Option<i64>,
}

/// Metadata of a feed, or of the `source` element of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomFeedMetadata {
    /// Only set for `source` elements; a feed's id is part of the feed itself.
    pub source_id: Option<String>,
    pub authors: Vec<AtomPersonMetadata>,
    pub contributors: Vec<AtomPersonMetadata>,
    pub categories: Vec<AtomCategoryMetadata>,
    pub generator: Option<AtomGeneratorMetadata>,
    pub icon: Option<Url>,
    pub logo: Option<Url>,
    pub links: Vec<AtomLinkMetadata>,
    pub rights: Option<AtomTextConstruct>,
    pub subtitle: Option<AtomTextConstruct>,
    pub title: Option<AtomTextConstruct>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub self_link: Option<AtomLinkMetadata>,
    pub next_page_link: Option<AtomLinkMetadata>,
    pub delta_link: Option<AtomLinkMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomEntryMetadata {
    pub authors: Vec<AtomPersonMetadata>,
    pub contributors: Vec<AtomPersonMetadata>,
    pub categories: Vec<AtomCategoryMetadata>,
    pub links: Vec<AtomLinkMetadata>,
    pub published: Option<DateTime<FixedOffset>>,
    pub rights: Option<AtomTextConstruct>,
    pub source: Option<AtomFeedMetadata>,
    pub summary: Option<AtomTextConstruct>,
    pub title: Option<AtomTextConstruct>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub self_link: Option<AtomLinkMetadata>,
    pub edit_link: Option<AtomLinkMetadata>,
}

/// Links backing a named stream or the media resource of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomStreamReferenceMetadata {
    pub edit_link: Option<AtomLinkMetadata>,
    pub self_link: Option<AtomLinkMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomWorkspaceMetadata {
    pub title: Option<AtomTextConstruct>,
}

/// `app:categories` of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomCategoriesMetadata {
    /// Out-of-line category document.
    pub href: Option<Url>,
    pub fixed: Option<bool>,
    pub scheme: Option<String>,
    pub categories: Vec<AtomCategoryMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomResourceCollectionMetadata {
    pub title: Option<AtomTextConstruct>,
    pub accept: Vec<String>,
    pub categories: Vec<AtomCategoriesMetadata>,
}
