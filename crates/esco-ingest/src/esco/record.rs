//! Flattening of skill details into fixed-schema records

use esco_common::Version;
use serde::{Deserialize, Serialize};

use crate::config::CrawlConfig;
use crate::esco::context::AncestorContext;
use crate::esco::models::SkillDetail;

/// Joins alternative labels in `alternativeLabel_en`
pub const LABEL_SEPARATOR: &str = " | ";

/// One output row per skill
///
/// Every column is always present; missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputRecord {
    pub uri: String,
    pub title: String,
    pub description_en: String,
    #[serde(rename = "alternativeLabel_en")]
    pub alternative_label_en: String,
    pub uri_level_0: String,
    pub title_level_0: String,
    pub uri_level_1: String,
    pub title_level_1: String,
    pub uri_level_2: String,
    pub title_level_2: String,
    #[serde(rename = "selectedVersion")]
    pub selected_version: String,
}

impl OutputRecord {
    /// Column names in serialization order
    pub const COLUMNS: [&'static str; 11] = [
        "uri",
        "title",
        "description_en",
        "alternativeLabel_en",
        "uri_level_0",
        "title_level_0",
        "uri_level_1",
        "title_level_1",
        "uri_level_2",
        "title_level_2",
        "selectedVersion",
    ];

    /// Column used as the replication key by hosts
    pub const REPLICATION_KEY: &'static str = "selectedVersion";

    fn set_level(&mut self, level: usize, uri: String, title: String) {
        let (uri_slot, title_slot) = match level {
            0 => (&mut self.uri_level_0, &mut self.title_level_0),
            1 => (&mut self.uri_level_1, &mut self.title_level_1),
            2 => (&mut self.uri_level_2, &mut self.title_level_2),
            _ => return,
        };
        *uri_slot = uri;
        *title_slot = title;
    }
}

/// Pure mapping from detail + context to [`OutputRecord`]
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    description_locale: String,
    label_locale: String,
    max_ancestor_depth: usize,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(&CrawlConfig::default())
    }
}

impl RecordBuilder {
    pub fn new(crawl: &CrawlConfig) -> Self {
        Self {
            description_locale: crawl.description_locale.clone(),
            label_locale: crawl.label_locale.clone(),
            max_ancestor_depth: crawl.max_ancestor_depth,
        }
    }

    pub fn build(
        &self,
        detail: &SkillDetail,
        context: &AncestorContext,
        version: &Version,
    ) -> OutputRecord {
        let description_en = detail
            .description
            .get(&self.description_locale)
            .and_then(|text| text.literal.clone())
            .unwrap_or_default();

        let alternative_label_en = detail
            .alternative_label
            .get(&self.label_locale)
            .map(|labels| labels.join(LABEL_SEPARATOR))
            .unwrap_or_default();

        let mut record = OutputRecord {
            uri: detail.uri.clone(),
            title: detail.title.clone().unwrap_or_default(),
            description_en,
            alternative_label_en,
            selected_version: version.to_string(),
            ..OutputRecord::default()
        };

        for level in 0..self.max_ancestor_depth {
            if let Some(ancestor) = context.get(level) {
                record.set_level(level, ancestor.uri.clone(), ancestor.title.clone());
            }
        }

        record
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail(value: serde_json::Value) -> SkillDetail {
        serde_json::from_value(value).unwrap()
    }

    fn version() -> Version {
        Version::new(1, 2, 0)
    }

    #[test]
    fn test_description_and_labels() {
        let detail = detail(json!({
            "uri": "http://data.europa.eu/esco/skill/foo",
            "title": "foo",
            "description": { "en-us": { "literal": "Foo" } },
            "alternativeLabel": { "en": ["a", "b"] }
        }));

        let record = RecordBuilder::default().build(&detail, &AncestorContext::new(), &version());

        assert_eq!(record.description_en, "Foo");
        assert_eq!(record.alternative_label_en, "a | b");
        assert_eq!(record.selected_version, "v1.2.0");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let detail = detail(json!({ "uri": "http://data.europa.eu/esco/skill/bare" }));
        let record = RecordBuilder::default().build(&detail, &AncestorContext::new(), &version());

        assert_eq!(record.uri, "http://data.europa.eu/esco/skill/bare");
        assert_eq!(record.title, "");
        assert_eq!(record.description_en, "");
        assert_eq!(record.alternative_label_en, "");
        assert_eq!(record.uri_level_0, "");
        assert_eq!(record.title_level_2, "");
    }

    #[test]
    fn test_other_locales_are_ignored() {
        let detail = detail(json!({
            "uri": "u",
            "description": { "fr": { "literal": "Bonjour" } },
            "alternativeLabel": { "de": ["x"] }
        }));
        let record = RecordBuilder::default().build(&detail, &AncestorContext::new(), &version());
        assert_eq!(record.description_en, "");
        assert_eq!(record.alternative_label_en, "");
    }

    #[test]
    fn test_ancestor_columns() {
        let context = AncestorContext::new()
            .descend(0, "S1", "communication")
            .descend(1, "S1.1", "negotiating")
            .descend(2, "S1.1.1", "mediation");
        let record = RecordBuilder::default().build(&detail(json!({ "uri": "u" })), &context, &version());

        assert_eq!(record.uri_level_0, "S1");
        assert_eq!(record.title_level_1, "negotiating");
        assert_eq!(record.uri_level_2, "S1.1.1");
    }

    #[test]
    fn test_max_ancestor_depth_limits_columns() {
        let crawl = CrawlConfig {
            max_ancestor_depth: 1,
            ..CrawlConfig::default()
        };
        let context = AncestorContext::new().descend(0, "S1", "a").descend(1, "S1.1", "b");
        let record = RecordBuilder::new(&crawl).build(&detail(json!({ "uri": "u" })), &context, &version());

        assert_eq!(record.uri_level_0, "S1");
        assert_eq!(record.uri_level_1, "");
    }

    #[test]
    fn test_serialized_keys_match_columns() {
        let value = serde_json::to_value(OutputRecord::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = OutputRecord::COLUMNS.to_vec();
        expected.sort_unstable();
        let mut keys_sorted = keys.clone();
        keys_sorted.sort_unstable();
        assert_eq!(keys_sorted, expected);
    }
}
