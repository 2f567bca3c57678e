//! Snapshot reconciliation.
//!
//! Turns an untrusted raw payload into a complete [`PortfolioDocument`].
//! Every section is decoded on its own so a corrupt section only costs that
//! section: it is replaced by its default while the rest of the payload is
//! kept. `details` is merged field by field on top of the default details.
//!
//! ```text
//! raw snapshot ──► per-section decode ──► details field merge ──► icon derivation
//!                      │ failure                 │ failure
//!                      ▼                         ▼
//!                 default section          default field
//! ```

use crate::error::{kind_of, DecodeError, Result};
use crate::model::{Contact, PersonalDetails, PortfolioDocument, Section, Skills, SocialLink};
use crate::wire::WireSocialLink;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Outcome of reconciling one snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation {
    /// The complete document.
    pub document: PortfolioDocument,
    /// Everything that had to be replaced by a default.
    pub issues: Vec<DecodeError>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Reconcile a raw snapshot against the default shape.
///
/// `None`, `null` and non-object payloads yield `defaults` unchanged. Never
/// fails; decode problems are logged at debug level.
pub fn reconcile(raw: Option<&Value>, defaults: &PortfolioDocument) -> PortfolioDocument {
    let reconciliation = reconcile_verbose(raw, defaults);
    for issue in &reconciliation.issues {
        debug!(%issue, "substituted default while reconciling snapshot");
    }
    reconciliation.document
}

/// Like [`reconcile`], but also returns the substitutions that were made.
pub fn reconcile_verbose(raw: Option<&Value>, defaults: &PortfolioDocument) -> Reconciliation {
    let mut issues = Vec::new();

    let raw = match raw {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            issues.push(DecodeError::NotAnObject(kind_of(other)));
            None
        }
    };
    let Some(raw) = raw else {
        return Reconciliation {
            document: defaults.clone(),
            issues,
        };
    };

    let mut document = PortfolioDocument {
        details: reconcile_details(
            present(raw, Section::Details.key()),
            &defaults.details,
            &mut issues,
        ),
        skills: section_or_default::<Skills>(raw, Section::Skills, &defaults.skills, &mut issues),
        ..defaults.clone()
    };

    for section in Section::ALL {
        let Some(fallback) = defaults.sequence(section) else {
            continue;
        };
        let value = section_or_default(raw, section, fallback, &mut issues);
        if let Some(slot) = document.sequence_mut(section) {
            *slot = value;
        }
    }

    for social in &mut document.details.socials {
        social.refresh_icon();
    }

    Reconciliation { document, issues }
}

/// A key's value, treating `null` as absent.
fn present<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|value| !value.is_null())
}

fn decode<T: DeserializeOwned>(value: &Value) -> std::result::Result<T, serde_json::Error> {
    T::deserialize(value)
}

fn section_or_default<T: DeserializeOwned + Clone>(
    raw: &Map<String, Value>,
    section: Section,
    fallback: &T,
    issues: &mut Vec<DecodeError>,
) -> T {
    match present(raw, section.key()).map(decode::<T>) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            issues.push(DecodeError::section(section, err));
            fallback.clone()
        }
        None => fallback.clone(),
    }
}

fn field<T: DeserializeOwned>(raw: &Map<String, Value>, key: &'static str) -> Option<Result<T>> {
    present(raw, key).map(|value| decode(value).map_err(|err| DecodeError::field(key, err)))
}

fn merge_field<T: DeserializeOwned>(
    raw: &Map<String, Value>,
    key: &'static str,
    slot: &mut T,
    issues: &mut Vec<DecodeError>,
) {
    match field(raw, key) {
        Some(Ok(value)) => *slot = value,
        Some(Err(issue)) => issues.push(issue),
        None => {}
    }
}

fn reconcile_details(
    raw: Option<&Value>,
    fallback: &PersonalDetails,
    issues: &mut Vec<DecodeError>,
) -> PersonalDetails {
    let mut details = fallback.clone();
    let raw = match raw {
        None => return details,
        Some(Value::Object(map)) => map,
        Some(other) => {
            issues.push(DecodeError::MalformedSection {
                section: Section::Details,
                reason: format!("expected object, found {}", kind_of(other)),
            });
            return details;
        }
    };

    merge_field(raw, PersonalDetails::NAME, &mut details.name, issues);
    merge_field(raw, PersonalDetails::TITLE, &mut details.title, issues);
    merge_field(raw, PersonalDetails::AVATAR_URL, &mut details.avatar_url, issues);
    merge_field(
        raw,
        PersonalDetails::PROFESSIONAL_SUMMARY,
        &mut details.professional_summary,
        issues,
    );
    merge_field(
        raw,
        PersonalDetails::PERSONAL_TOUCH,
        &mut details.personal_touch,
        issues,
    );
    merge_field(
        raw,
        PersonalDetails::UNIQUE_SELLING_POINT,
        &mut details.unique_selling_point,
        issues,
    );
    merge_field::<Contact>(raw, PersonalDetails::CONTACT, &mut details.contact, issues);

    match present(raw, PersonalDetails::SOCIALS) {
        Some(Value::Array(entries)) => details.socials = reconcile_socials(entries, issues),
        Some(other) => issues.push(DecodeError::MalformedField {
            field: PersonalDetails::SOCIALS,
            reason: format!("expected array, found {}", kind_of(other)),
        }),
        None => {}
    }

    for (key, value) in raw {
        if !PersonalDetails::KNOWN_FIELDS.contains(&key.as_str()) {
            details.extra.insert(key.clone(), value.clone());
        }
    }

    details
}

/// Decode each link on its own; a malformed entry is dropped, the rest kept.
fn reconcile_socials(entries: &[Value], issues: &mut Vec<DecodeError>) -> Vec<SocialLink> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match decode::<WireSocialLink>(entry) {
            Ok(link) => Some(SocialLink::from(link)),
            Err(err) => {
                issues.push(DecodeError::social(index, err));
                None
            }
        })
        .collect()
}
