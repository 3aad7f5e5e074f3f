//! The normalized safety-message data model.
//!
//! Messages are produced in bulk by a provider's load operation and
//! replace the previous list wholesale; they are never mutated in place
//! once published. Localized content hangs off each entity as a list of
//! per-language description records.

mod attachment;
mod geometry;
mod message;
mod tree;

pub use attachment::Attachment;
pub use geometry::{Location, LocationDesc, LocationType, Point, PointDesc};
pub use message::{
    Chart, MainType, Message, MessageDesc, Reference, ReferenceKind, SeriesId, Status, WarningType,
};
pub use tree::{Area, AreaDesc, Category, CategoryDesc, Chain};

/// An entity carrying per-language description records.
///
/// Provides the shared language-selection rules: an exact language match
/// wins, and when no description matches the requested language the first
/// available one is used as a fallback (never both).
pub trait Localized {
    type Desc: Clone;

    fn descs(&self) -> &[Self::Desc];
    fn descs_mut(&mut self) -> &mut Vec<Self::Desc>;
    fn desc_lang(desc: &Self::Desc) -> &str;

    /// The description for the given language, if present.
    fn desc(&self, lang: &str) -> Option<&Self::Desc> {
        self.descs().iter().find(|d| Self::desc_lang(d).eq_ignore_ascii_case(lang))
    }

    /// Descriptions selected for the given language.
    ///
    /// With no language, all descriptions are kept. Otherwise the result
    /// contains exactly the matching descriptions, or — if none match —
    /// the first available description.
    fn select_descs(&self, lang: Option<&str>) -> Vec<Self::Desc> {
        let descs = self.descs();
        let Some(lang) = lang else {
            return descs.to_vec();
        };

        let matched: Vec<Self::Desc> =
            descs.iter().filter(|d| Self::desc_lang(d) == lang).cloned().collect();
        if matched.is_empty() {
            return descs.first().cloned().into_iter().collect();
        }
        matched
    }

    /// Stable-sorts descriptions so the given language comes first.
    fn sort_descs(&mut self, lang: &str) {
        self.descs_mut().sort_by_key(|d| if Self::desc_lang(d) == lang { 0u8 } else { 1u8 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_langs(langs: &[&str]) -> Message {
        let mut msg = Message::new(1, SeriesId::new(MainType::Msi, "DK", 2014), WarningType::CoastalWarning);
        for lang in langs {
            msg.descs.push(MessageDesc::new(*lang));
        }
        msg
    }

    #[test]
    fn test_select_descs_exact_match() {
        let msg = message_with_langs(&["da", "en"]);
        let descs = msg.select_descs(Some("en"));
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].lang, "en");
    }

    #[test]
    fn test_select_descs_fallback_to_first() {
        let msg = message_with_langs(&["da", "en"]);
        let descs = msg.select_descs(Some("fr"));
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].lang, "da");
    }

    #[test]
    fn test_select_descs_no_language() {
        let msg = message_with_langs(&["da", "en"]);
        assert_eq!(msg.select_descs(None).len(), 2);
    }

    #[test]
    fn test_select_descs_empty() {
        let msg = message_with_langs(&[]);
        assert!(msg.select_descs(Some("da")).is_empty());
    }

    #[test]
    fn test_sort_descs_puts_language_first() {
        let mut msg = message_with_langs(&["da", "en"]);
        msg.sort_descs("en");
        assert_eq!(msg.descs[0].lang, "en");
        assert_eq!(msg.descs[1].lang, "da");
    }
}
