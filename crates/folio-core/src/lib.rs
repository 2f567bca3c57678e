//! # folio-core
//!
//! The portfolio document and everything that can be said about it without
//! touching a store:
//!
//! - [`model`] - the in-memory document, sections and social links
//! - [`icons`] - static icon table and name lookup
//! - [`defaults`] - the canonical default document
//! - [`reconcile`] - raw snapshot to complete document
//! - [`patch`] - partial documents for merge writes
//! - [`wire`] - the icon-free serialization boundary
//!
//! ## Example
//!
//! ```rust
//! use folio_core::{defaults, reconcile, DetailsPatch, DocumentPatch};
//! use serde_json::json;
//!
//! let raw = json!({ "details": { "name": "Ada" } });
//! let doc = reconcile(Some(&raw), &defaults());
//! assert_eq!(doc.details.name, "Ada");
//!
//! let next = DocumentPatch::new()
//!     .details(DetailsPatch::new().title("Analyst"))
//!     .apply(&doc);
//! assert_eq!(next.details.name, "Ada");
//! assert_eq!(next.details.title, "Analyst");
//! ```

pub mod defaults;
pub mod error;
pub mod icons;
pub mod model;
pub mod patch;
pub mod reconcile;
pub mod wire;

pub use defaults::defaults;
pub use error::DecodeError;
pub use icons::{resolve_icon, IconRef, IconSpec};
pub use model::{
    Contact, Entry, PersonalDetails, PortfolioDocument, Section, Skills, SocialLink,
};
pub use patch::{DetailsPatch, DocumentPatch};
pub use reconcile::{reconcile, reconcile_verbose, Reconciliation};
pub use wire::{
    contains_icon, encode_document, strip_icons, strip_section_icons, WirePatch, WireSocialLink,
};
