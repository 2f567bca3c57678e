//! Partial documents for merge-style writes.
//!
//! A [`DocumentPatch`] names the sections it replaces. Sequence sections and
//! `skills` are replaced whole; `details` is merged field by field through a
//! [`DetailsPatch`].

use crate::model::{Contact, Entry, PersonalDetails, PortfolioDocument, Section, Skills, SocialLink};
use serde_json::{Map, Value};

/// Field-level changes to the `details` section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailsPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub avatar_url: Option<String>,
    pub professional_summary: Option<String>,
    pub personal_touch: Option<String>,
    pub unique_selling_point: Option<String>,
    pub contact: Option<Contact>,
    pub socials: Option<Vec<SocialLink>>,
    /// Unknown fields to set.
    pub extra: Map<String, Value>,
}

impl DetailsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn professional_summary(mut self, summary: impl Into<String>) -> Self {
        self.professional_summary = Some(summary.into());
        self
    }

    pub fn personal_touch(mut self, text: impl Into<String>) -> Self {
        self.personal_touch = Some(text.into());
        self
    }

    pub fn unique_selling_point(mut self, text: impl Into<String>) -> Self {
        self.unique_selling_point = Some(text.into());
        self
    }

    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    pub fn socials(mut self, socials: Vec<SocialLink>) -> Self {
        self.socials = Some(socials);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge into `details`. Fields left as `None` keep their current value.
    pub fn apply_to(&self, details: &mut PersonalDetails) {
        let text_fields = [
            (&self.name, &mut details.name),
            (&self.title, &mut details.title),
            (&self.avatar_url, &mut details.avatar_url),
            (&self.professional_summary, &mut details.professional_summary),
            (&self.personal_touch, &mut details.personal_touch),
            (&self.unique_selling_point, &mut details.unique_selling_point),
        ];
        for (patch, slot) in text_fields {
            if let Some(value) = patch {
                slot.clone_from(value);
            }
        }
        if let Some(contact) = &self.contact {
            details.contact = contact.clone();
        }
        if let Some(socials) = &self.socials {
            details.socials = socials.clone();
            for social in &mut details.socials {
                social.refresh_icon();
            }
        }
        for (key, value) in &self.extra {
            if !PersonalDetails::KNOWN_FIELDS.contains(&key.as_str()) {
                details.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

impl From<PersonalDetails> for DetailsPatch {
    fn from(details: PersonalDetails) -> Self {
        Self {
            name: Some(details.name),
            title: Some(details.title),
            avatar_url: Some(details.avatar_url),
            professional_summary: Some(details.professional_summary),
            personal_touch: Some(details.personal_touch),
            unique_selling_point: Some(details.unique_selling_point),
            contact: Some(details.contact),
            socials: Some(details.socials),
            extra: details.extra,
        }
    }
}

/// A partial document: only the sections that are `Some` are written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentPatch {
    pub details: Option<DetailsPatch>,
    pub projects: Option<Vec<Entry>>,
    pub skills: Option<Skills>,
    pub experience: Option<Vec<Entry>>,
    pub education: Option<Vec<Entry>>,
    pub involvement: Option<Vec<Entry>>,
    pub gallery: Option<Vec<Entry>>,
    pub publications: Option<Vec<Entry>>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch that replaces every section with the ones from `doc`.
    pub fn from_document(doc: &PortfolioDocument) -> Self {
        Self {
            details: Some(DetailsPatch::from(doc.details.clone())),
            projects: Some(doc.projects.clone()),
            skills: Some(doc.skills.clone()),
            experience: Some(doc.experience.clone()),
            education: Some(doc.education.clone()),
            involvement: Some(doc.involvement.clone()),
            gallery: Some(doc.gallery.clone()),
            publications: Some(doc.publications.clone()),
        }
    }

    pub fn details(mut self, details: DetailsPatch) -> Self {
        self.details = Some(details);
        self
    }

    pub fn projects(mut self, projects: Vec<Entry>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn skills(mut self, skills: Skills) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn experience(mut self, experience: Vec<Entry>) -> Self {
        self.experience = Some(experience);
        self
    }

    pub fn education(mut self, education: Vec<Entry>) -> Self {
        self.education = Some(education);
        self
    }

    pub fn involvement(mut self, involvement: Vec<Entry>) -> Self {
        self.involvement = Some(involvement);
        self
    }

    pub fn gallery(mut self, gallery: Vec<Entry>) -> Self {
        self.gallery = Some(gallery);
        self
    }

    pub fn publications(mut self, publications: Vec<Entry>) -> Self {
        self.publications = Some(publications);
        self
    }

    /// Replace a sequence section by name. Ignored for `details` and `skills`.
    pub fn sequence(mut self, section: Section, entries: Vec<Entry>) -> Self {
        if let Some(slot) = self.sequence_slot(section) {
            *slot = Some(entries);
        }
        self
    }

    fn sequence_slot(&mut self, section: Section) -> Option<&mut Option<Vec<Entry>>> {
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

    /// Sections this patch touches, in canonical order.
    pub fn sections(&self) -> Vec<Section> {
        let touched = [
            (Section::Details, self.details.is_some()),
            (Section::Projects, self.projects.is_some()),
            (Section::Skills, self.skills.is_some()),
            (Section::Experience, self.experience.is_some()),
            (Section::Education, self.education.is_some()),
            (Section::Involvement, self.involvement.is_some()),
            (Section::Gallery, self.gallery.is_some()),
            (Section::Publications, self.publications.is_some()),
        ];
        touched
            .into_iter()
            .filter_map(|(section, present)| present.then_some(section))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections().is_empty()
    }

    /// Merge into `doc` in place.
    pub fn apply_to(&self, doc: &mut PortfolioDocument) {
        if let Some(details) = &self.details {
            details.apply_to(&mut doc.details);
        }
        if let Some(skills) = &self.skills {
            doc.skills = skills.clone();
        }
        let sequences = [
            (&self.projects, &mut doc.projects),
            (&self.experience, &mut doc.experience),
            (&self.education, &mut doc.education),
            (&self.involvement, &mut doc.involvement),
            (&self.gallery, &mut doc.gallery),
            (&self.publications, &mut doc.publications),
        ];
        for (patch, slot) in sequences {
            if let Some(entries) = patch {
                slot.clone_from(entries);
            }
        }
    }

    /// Merge into a copy of `doc`.
    pub fn apply(&self, doc: &PortfolioDocument) -> PortfolioDocument {
        let mut next = doc.clone();
        self.apply_to(&mut next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::defaults;
    use crate::icons::{resolve_icon, IconRef};
    use serde_json::json;

    #[test]
    fn test_sections_reports_touched_only() {
        let patch = DocumentPatch::new()
            .projects(vec![json!({ "title": "Engine" })])
            .details(DetailsPatch::new().name("Ada"));
        assert_eq!(patch.sections(), vec![Section::Details, Section::Projects]);
        assert!(DocumentPatch::new().is_empty());
    }

    #[test]
    fn test_sequence_replace_is_whole() {
        let mut doc = defaults();
        doc.projects = vec![json!(1), json!(2)];
        let next = DocumentPatch::new().projects(vec![json!(3)]).apply(&doc);
        assert_eq!(next.projects, vec![json!(3)]);
        assert_eq!(next.details, doc.details);
    }

    #[test]
    fn test_sequence_by_section() {
        let patch = DocumentPatch::new()
            .sequence(Section::Publications, vec![json!({ "doi": "x" })])
            .sequence(Section::Details, vec![json!("ignored")]);
        assert_eq!(patch.sections(), vec![Section::Publications]);
    }

    #[test]
    fn test_details_merge_is_field_level() {
        let mut doc = defaults();
        doc.details.title = "Engineer".to_string();
        let next = DocumentPatch::new()
            .details(DetailsPatch::new().name("Ada"))
            .apply(&doc);
        assert_eq!(next.details.name, "Ada");
        assert_eq!(next.details.title, "Engineer");
        assert_eq!(next.details.socials, doc.details.socials);
    }

    #[test]
    fn test_patched_socials_get_icons_rederived() {
        let mut link = SocialLink::new("1", "LinkedIn", "u");
        link.icon = IconRef::fallback();
        let next = DocumentPatch::new()
            .details(DetailsPatch::new().socials(vec![link]))
            .apply(&defaults());
        assert_eq!(next.details.socials[0].icon, resolve_icon("LinkedIn"));
    }

    #[test]
    fn test_extra_cannot_shadow_known_fields() {
        let next = DocumentPatch::new()
            .details(
                DetailsPatch::new()
                    .extra("name", json!("shadow"))
                    .extra("pronouns", json!("they/them")),
            )
            .apply(&defaults());
        assert_eq!(next.details.name, "");
        assert!(!next.details.extra.contains_key("name"));
        assert_eq!(next.details.extra["pronouns"], json!("they/them"));
    }

    #[test]
    fn test_from_document_roundtrip() {
        let mut doc = defaults();
        doc.details.name = "Ada".to_string();
        doc.gallery = vec![json!({ "src": "a.png" })];
        let patch = DocumentPatch::from_document(&doc);
        assert_eq!(patch.sections(), Section::ALL.to_vec());
        assert_eq!(patch.apply(&PortfolioDocument::default()), doc);
    }
}
