//! In-memory portfolio document types.
//!
//! These are the rich, local forms of the document. Social links carry an
//! [`IconRef`], so the document types do not implement `Serialize`; the wire
//! form lives in [`crate::wire`].

use crate::icons::{resolve_icon, IconRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// An opaque record inside a sequence section (a project, a job, ...).
pub type Entry = Value;

/// Named skill categories, e.g. `technical` and `soft`, in the order they
/// were written.
pub type Skills = IndexMap<String, Vec<Entry>>;

/// Top-level sections of a [`PortfolioDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Details,
    Projects,
    Skills,
    Experience,
    Education,
    Involvement,
    Gallery,
    Publications,
}

impl Section {
    /// All sections in canonical order.
    pub const ALL: [Section; 8] = [
        Section::Details,
        Section::Projects,
        Section::Skills,
        Section::Experience,
        Section::Education,
        Section::Involvement,
        Section::Gallery,
        Section::Publications,
    ];

    /// Key of this section in the wire payload.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Details => "details",
            Section::Projects => "projects",
            Section::Skills => "skills",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Involvement => "involvement",
            Section::Gallery => "gallery",
            Section::Publications => "publications",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Section::ALL.iter().copied().find(|s| s.key() == key)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A link to a social profile.
#[derive(Clone, Debug, PartialEq)]
pub struct SocialLink {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Derived from `name`; never persisted.
    pub icon: IconRef,
}

impl SocialLink {
    /// Create a link, resolving its icon from `name`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let icon = resolve_icon(&name);
        Self {
            id: id.into(),
            name,
            url: url.into(),
            icon,
        }
    }

    /// Re-derive the icon from the current name.
    pub fn refresh_icon(&mut self) {
        self.icon = resolve_icon(&self.name);
    }
}

/// Contact information.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub email: String,
    pub location: String,
    /// Contact fields this version does not know about (phone, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `details` section: independently meaningful scalar fields plus socials.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersonalDetails {
    pub name: String,
    pub title: String,
    pub avatar_url: String,
    pub professional_summary: String,
    pub personal_touch: String,
    pub unique_selling_point: String,
    pub contact: Contact,
    pub socials: Vec<SocialLink>,
    /// Detail fields this version does not know about, kept verbatim.
    pub extra: Map<String, Value>,
}

impl PersonalDetails {
    pub const NAME: &'static str = "name";
    pub const TITLE: &'static str = "title";
    pub const AVATAR_URL: &'static str = "avatarUrl";
    pub const PROFESSIONAL_SUMMARY: &'static str = "professionalSummary";
    pub const PERSONAL_TOUCH: &'static str = "personalTouch";
    pub const UNIQUE_SELLING_POINT: &'static str = "uniqueSellingPoint";
    pub const CONTACT: &'static str = "contact";
    pub const SOCIALS: &'static str = "socials";

    /// Wire keys of every field modelled explicitly.
    pub const KNOWN_FIELDS: [&'static str; 8] = [
        Self::NAME,
        Self::TITLE,
        Self::AVATAR_URL,
        Self::PROFESSIONAL_SUMMARY,
        Self::PERSONAL_TOUCH,
        Self::UNIQUE_SELLING_POINT,
        Self::CONTACT,
        Self::SOCIALS,
    ];

    /// Find a social link by platform name.
    pub fn social(&self, name: &str) -> Option<&SocialLink> {
        self.socials.iter().find(|s| s.name == name)
    }
}

/// The single portfolio document. Every section is always present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortfolioDocument {
    pub details: PersonalDetails,
    pub projects: Vec<Entry>,
    pub skills: Skills,
    pub experience: Vec<Entry>,
    pub education: Vec<Entry>,
    pub involvement: Vec<Entry>,
    pub gallery: Vec<Entry>,
    pub publications: Vec<Entry>,
}

impl PortfolioDocument {
    /// Sequence section by name. Returns `None` for `details` and `skills`.
    pub fn sequence(&self, section: Section) -> Option<&Vec<Entry>> {
        match section {
            Section::Projects => Some(&self.projects),
            Section::Experience => Some(&self.experience),
            Section::Education => Some(&self.education),
            Section::Involvement => Some(&self.involvement),
            Section::Gallery => Some(&self.gallery),
            Section::Publications => Some(&self.publications),
            Section::Details | Section::Skills => None,
        }
    }

    pub(crate) fn sequence_mut(&mut self, section: Section) -> Option<&mut Vec<Entry>> {
        match section {
            Section::Projects => Some(&mut self.projects),
            Section::Experience => Some(&mut self.experience),
            Section::Education => Some(&mut self.education),
            Section::Involvement => Some(&mut self.involvement),
            Section::Gallery => Some(&mut self.gallery),
            Section::Publications => Some(&mut self.publications),
            Section::Details | Section::Skills => None,
        }
    }

    /// Skills in one category, empty if the category does not exist.
    pub fn skills_in(&self, category: &str) -> &[Entry] {
        self.skills.get(category).map(Vec::as_slice).unwrap_or(&[])
    }
}
