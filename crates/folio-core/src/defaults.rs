//! The canonical default document.
//!
//! Used as the initial cached value, as the document written when the store
//! has none, and as the per-section fallback during reconciliation.

use crate::model::{Contact, PersonalDetails, PortfolioDocument, Skills, SocialLink};
use serde_json::Map;
use std::sync::OnceLock;

pub use crate::icons::resolve_icon;

static DEFAULTS: OnceLock<PortfolioDocument> = OnceLock::new();

/// Skill categories present in a fresh document.
pub const DEFAULT_SKILL_CATEGORIES: [&str; 2] = ["technical", "soft"];

/// The default document. Always returns the same value.
pub fn defaults() -> PortfolioDocument {
    DEFAULTS.get_or_init(build_defaults).clone()
}

fn build_defaults() -> PortfolioDocument {
    let details = PersonalDetails {
        name: String::new(),
        title: String::new(),
        avatar_url: String::new(),
        professional_summary: String::new(),
        personal_touch: String::new(),
        unique_selling_point: String::new(),
        contact: Contact::default(),
        socials: vec![
            SocialLink::new("github", "GitHub", ""),
            SocialLink::new("linkedin", "LinkedIn", ""),
            SocialLink::new("email", "Email", ""),
        ],
        extra: Map::new(),
    };

    let skills: Skills = DEFAULT_SKILL_CATEGORIES
        .iter()
        .map(|category| (category.to_string(), Vec::new()))
        .collect();

    PortfolioDocument {
        details,
        projects: Vec::new(),
        skills,
        experience: Vec::new(),
        education: Vec::new(),
        involvement: Vec::new(),
        gallery: Vec::new(),
        publications: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_stable() {
        assert_eq!(defaults(), defaults());
    }

    #[test]
    fn test_default_shape() {
        let doc = defaults();
        assert!(doc.projects.is_empty());
        assert_eq!(doc.skills.keys().collect::<Vec<_>>(), vec!["technical", "soft"]);
        assert!(doc.skills_in("technical").is_empty());
        assert!(doc.skills_in("soft").is_empty());
        assert_eq!(doc.details.socials.len(), 3);
        for social in &doc.details.socials {
            assert_eq!(social.icon, resolve_icon(&social.name));
        }
    }
}
