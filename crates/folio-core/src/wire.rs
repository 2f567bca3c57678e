//! Serialization boundary between the in-memory document and the store.
//!
//! The wire form is plain JSON with the same section keys as
//! [`PortfolioDocument`]. Social links on the wire are `{id, name, url}`;
//! icons are dropped on encode and re-derived on read by the reconciler.

use crate::model::{Contact, PersonalDetails, PortfolioDocument, Section, Skills, SocialLink};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Wire form of a [`SocialLink`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireSocialLink {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl From<&SocialLink> for WireSocialLink {
    fn from(link: &SocialLink) -> Self {
        Self {
            id: link.id.clone(),
            name: link.name.clone(),
            url: link.url.clone(),
        }
    }
}

impl From<WireSocialLink> for SocialLink {
    fn from(wire: WireSocialLink) -> Self {
        SocialLink::new(wire.id, wire.name, wire.url)
    }
}

fn encode_social(link: &SocialLink) -> Value {
    json!({ "id": link.id, "name": link.name, "url": link.url })
}

fn encode_contact(contact: &Contact) -> Value {
    let mut map = contact.extra.clone();
    map.insert("email".to_string(), Value::String(contact.email.clone()));
    map.insert("location".to_string(), Value::String(contact.location.clone()));
    Value::Object(map)
}

fn encode_skills(skills: &Skills) -> Value {
    Value::Object(
        skills
            .iter()
            .map(|(category, entries)| (category.clone(), Value::Array(entries.clone())))
            .collect(),
    )
}

/// Encode the `details` section. Unknown fields are written back unchanged.
pub fn encode_details(details: &PersonalDetails) -> Value {
    let mut map = details.extra.clone();
    let text_fields = [
        (PersonalDetails::NAME, &details.name),
        (PersonalDetails::TITLE, &details.title),
        (PersonalDetails::AVATAR_URL, &details.avatar_url),
        (PersonalDetails::PROFESSIONAL_SUMMARY, &details.professional_summary),
        (PersonalDetails::PERSONAL_TOUCH, &details.personal_touch),
        (PersonalDetails::UNIQUE_SELLING_POINT, &details.unique_selling_point),
    ];
    for (key, value) in text_fields {
        map.insert(key.to_string(), Value::String(value.clone()));
    }
    map.insert(
        PersonalDetails::CONTACT.to_string(),
        encode_contact(&details.contact),
    );
    map.insert(
        PersonalDetails::SOCIALS.to_string(),
        Value::Array(details.socials.iter().map(encode_social).collect()),
    );
    Value::Object(map)
}

/// Encode one section of a document.
pub fn encode_section(doc: &PortfolioDocument, section: Section) -> Value {
    match section {
        Section::Details => encode_details(&doc.details),
        Section::Skills => encode_skills(&doc.skills),
        other => doc
            .sequence(other)
            .map(|entries| Value::Array(entries.clone()))
            .unwrap_or(Value::Null),
    }
}

/// Encode a whole document into its wire form.
pub fn encode_document(doc: &PortfolioDocument) -> Value {
    Value::Object(encode_sections(doc, Section::ALL.iter().copied()))
}

fn encode_sections(
    doc: &PortfolioDocument,
    sections: impl IntoIterator<Item = Section>,
) -> Map<String, Value> {
    sections
        .into_iter()
        .map(|section| (section.key().to_string(), encode_section(doc, section)))
        .collect()
}

/// A shallow merge payload: section key to icon-free wire value.
///
/// Only constructed from a document through the codec, so it never carries
/// an icon reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WirePatch {
    sections: Map<String, Value>,
}

impl WirePatch {
    /// Take the given sections from `doc`.
    pub fn from_sections(
        doc: &PortfolioDocument,
        sections: impl IntoIterator<Item = Section>,
    ) -> Self {
        Self {
            sections: encode_sections(doc, sections),
        }
    }

    /// Every section of `doc`.
    pub fn full(doc: &PortfolioDocument) -> Self {
        Self::from_sections(doc, Section::ALL)
    }

    /// Sections carried by this payload.
    pub fn sections(&self) -> Vec<Section> {
        self.sections
            .keys()
            .filter_map(|key| Section::from_key(key))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.sections
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.sections.clone())
    }
}

/// Remove `icon` from every `details.socials[]` entry of a wire payload.
///
/// Returns the number of icon fields removed.
pub fn strip_icons(payload: &mut Value) -> usize {
    payload.as_object_mut().map(strip_section_icons).unwrap_or(0)
}

/// [`strip_icons`] for a payload already split into sections.
pub fn strip_section_icons(sections: &mut Map<String, Value>) -> usize {
    let Some(socials) = sections
        .get_mut(Section::Details.key())
        .and_then(|details| details.get_mut(PersonalDetails::SOCIALS))
        .and_then(Value::as_array_mut)
    else {
        return 0;
    };

    socials
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .filter_map(|entry| entry.remove("icon"))
        .count()
}

/// Whether any `details.socials[]` entry of a payload carries an `icon` field.
pub fn contains_icon(payload: &Value) -> bool {
    payload
        .get("details")
        .and_then(|details| details.get(PersonalDetails::SOCIALS))
        .and_then(Value::as_array)
        .map(|socials| socials.iter().any(|entry| entry.get("icon").is_some()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::defaults;

    #[test]
    fn test_encode_document_has_every_section() {
        let wire = encode_document(&defaults());
        let map = wire.as_object().unwrap();
        for section in Section::ALL {
            assert!(map.contains_key(section.key()), "missing {}", section);
        }
        assert!(!contains_icon(&wire));
    }

    #[test]
    fn test_encode_socials_plain() {
        let mut doc = defaults();
        doc.details.socials = vec![SocialLink::new("1", "GitHub", "https://github.com/ada")];
        let wire = encode_section(&doc, Section::Details);
        assert_eq!(
            wire["socials"],
            json!([{ "id": "1", "name": "GitHub", "url": "https://github.com/ada" }])
        );
    }

    #[test]
    fn test_details_extra_written_back() {
        let mut doc = defaults();
        doc.details
            .extra
            .insert("pronouns".to_string(), json!("she/her"));
        let wire = encode_details(&doc.details);
        assert_eq!(wire["pronouns"], json!("she/her"));
    }

    #[test]
    fn test_wire_patch_sections() {
        let patch = WirePatch::from_sections(&defaults(), [Section::Projects, Section::Skills]);
        assert_eq!(patch.sections(), vec![Section::Projects, Section::Skills]);
        assert!(!patch.as_map().contains_key("details"));
    }

    #[test]
    fn test_strip_icons() {
        let mut payload = json!({
            "details": { "socials": [
                { "id": "1", "name": "GitHub", "url": "u", "icon": "<svg/>" },
                { "id": "2", "name": "Email", "url": "m" },
                "garbage"
            ]},
            "projects": [{ "icon": "kept" }]
        });
        assert!(contains_icon(&payload));
        assert_eq!(strip_icons(&mut payload), 1);
        assert!(!contains_icon(&payload));
        assert_eq!(payload["projects"][0]["icon"], json!("kept"));
    }

    #[test]
    fn test_strip_icons_on_odd_payloads() {
        assert_eq!(strip_icons(&mut Value::Null), 0);
        assert_eq!(strip_icons(&mut json!({ "details": 3 })), 0);
        assert_eq!(strip_icons(&mut json!({ "details": { "socials": {} } })), 0);
    }
}
