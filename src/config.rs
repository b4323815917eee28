//! Typed, defaulted options consumed from a pipeline/step definition.
//!
//! Step definitions arrive as JSON-shaped documents; all fields have
//! defaults so a minimal definition stays minimal. The selector fields
//! accept either a single string or a list, matching how step authors write
//! them.

use serde::Deserialize;

use crate::generator::DEFAULT_RECORD_COUNT;

/// How a fill drives its transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingType {
    /// Decouple the producer through a queue; records flow while the
    /// generator is still producing.
    Stream,
    /// Run each transfer to completion on the calling thread.
    #[default]
    Batch,
}

/// How finely the stream side reports and batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamGranularity {
    /// Record-at-a-time batches.
    Record,
    /// Whole-resource batches.
    #[default]
    Resource,
}

/// Configuration surface of a fill run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillOptions {
    /// Selectors for the target resources to fill.
    #[serde(alias = "dataSelector", deserialize_with = "one_or_many")]
    pub data_selectors: Vec<String>,
    /// Fail when a selector matches nothing.
    pub strict_selection: bool,
    pub processing_type: ProcessingType,
    /// Default per-resource record cap in stream granularity.
    pub stream_record_count: u64,
    pub stream_granularity: StreamGranularity,
    /// Default cap assigned to generators without an explicit one.
    pub max_record_count: Option<u64>,
    /// Selectors for the generator resources feeding the fill.
    #[serde(alias = "generatorSelector", deserialize_with = "one_or_many")]
    pub generator_selectors: Vec<String>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            data_selectors: Vec::new(),
            strict_selection: true,
            processing_type: ProcessingType::default(),
            stream_record_count: DEFAULT_RECORD_COUNT,
            stream_granularity: StreamGranularity::default(),
            max_record_count: None,
            generator_selectors: Vec::new(),
        }
    }
}

impl FillOptions {
    /// The record cap handed to generators that carry none of their own.
    pub fn default_record_count(&self) -> u64 {
        self.max_record_count.unwrap_or(self.stream_record_count)
    }
}

/// Accept `"a"` or `["a", "b"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_definition() {
        let options: FillOptions = serde_json::from_str("{}").unwrap();
        assert!(options.strict_selection);
        assert_eq!(options.processing_type, ProcessingType::Batch);
        assert_eq!(options.stream_record_count, DEFAULT_RECORD_COUNT);
        assert_eq!(options.stream_granularity, StreamGranularity::Resource);
        assert!(options.max_record_count.is_none());
    }

    #[test]
    fn singular_and_plural_selectors() {
        let options: FillOptions =
            serde_json::from_str(r#"{"dataSelector": "orders", "generatorSelectors": ["a", "b"]}"#)
                .unwrap();
        assert_eq!(options.data_selectors, vec!["orders"]);
        assert_eq!(options.generator_selectors, vec!["a", "b"]);
    }

    #[test]
    fn enums_parse_lowercase() {
        let options: FillOptions = serde_json::from_str(
            r#"{"processingType": "stream", "streamGranularity": "record"}"#,
        )
        .unwrap();
        assert_eq!(options.processing_type, ProcessingType::Stream);
        assert_eq!(options.stream_granularity, StreamGranularity::Record);
    }
}
