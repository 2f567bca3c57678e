//! Social platform icons.
//!
//! An [`IconRef`] is a local-only rendering handle resolved from a social
//! link's platform name. It is intentionally neither `Serialize` nor
//! `Deserialize`: the only way to obtain one is [`resolve_icon`], so an icon
//! can never be read from or written to the remote store.

use std::fmt;

/// Render function attached to an icon entry.
pub type RenderFn = fn(&IconSpec, &str) -> String;

/// A static icon table entry.
pub struct IconSpec {
    /// Canonical platform name used as the lookup key.
    pub key: &'static str,
    /// Short glyph used for terminal rendering.
    pub glyph: &'static str,
    render: RenderFn,
}

fn render_labelled(spec: &IconSpec, label: &str) -> String {
    format!("[{}] {}", spec.glyph, label)
}

fn render_mail(spec: &IconSpec, label: &str) -> String {
    format!("[{}] <{}>", spec.glyph, label)
}

/// Icon table. The first entry is the fallback.
static ICONS: &[IconSpec] = &[
    IconSpec { key: "GitHub", glyph: "gh", render: render_labelled },
    IconSpec { key: "LinkedIn", glyph: "in", render: render_labelled },
    IconSpec { key: "Twitter", glyph: "tw", render: render_labelled },
    IconSpec { key: "X", glyph: "x", render: render_labelled },
    IconSpec { key: "Instagram", glyph: "ig", render: render_labelled },
    IconSpec { key: "Email", glyph: "@", render: render_mail },
    IconSpec { key: "Website", glyph: "www", render: render_labelled },
    IconSpec { key: "YouTube", glyph: "yt", render: render_labelled },
    IconSpec { key: "Medium", glyph: "md", render: render_labelled },
    IconSpec { key: "Dribbble", glyph: "dr", render: render_labelled },
    IconSpec { key: "Behance", glyph: "be", render: render_labelled },
    IconSpec { key: "Facebook", glyph: "fb", render: render_labelled },
    IconSpec { key: "ORCID", glyph: "id", render: render_labelled },
    IconSpec { key: "Google Scholar", glyph: "gs", render: render_labelled },
];

/// Handle to an entry in the static icon table.
#[derive(Clone, Copy)]
pub struct IconRef(&'static IconSpec);

impl IconRef {
    /// The fallback icon used for unrecognized platform names.
    pub fn fallback() -> Self {
        IconRef(&ICONS[0])
    }

    /// Canonical platform key of this icon.
    pub fn key(&self) -> &'static str {
        self.0.key
    }

    pub fn glyph(&self) -> &'static str {
        self.0.glyph
    }

    /// Render the icon next to a label.
    pub fn render(&self, label: &str) -> String {
        (self.0.render)(self.0, label)
    }

    /// Whether this is the fallback icon.
    pub fn is_fallback(&self) -> bool {
        std::ptr::eq(self.0, &ICONS[0])
    }
}

impl PartialEq for IconRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for IconRef {}

impl fmt::Debug for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IconRef").field(&self.0.key).finish()
    }
}

impl Default for IconRef {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Resolve the icon for a platform name.
///
/// Exact matches win, then a case-insensitive match. Unknown names resolve
/// to [`IconRef::fallback`]; this never fails.
pub fn resolve_icon(name: &str) -> IconRef {
    let name = name.trim();
    ICONS
        .iter()
        .find(|spec| spec.key == name)
        .or_else(|| ICONS.iter().find(|spec| spec.key.eq_ignore_ascii_case(name)))
        .map(IconRef)
        .unwrap_or_else(IconRef::fallback)
}

/// Names of all recognized platforms.
pub fn known_platforms() -> impl Iterator<Item = &'static str> {
    ICONS.iter().map(|spec| spec.key)
}
