use serde::{Deserialize, Serialize};

/// A named transcription toggle requested by the caller.
///
/// Feature names are caller-facing; [`merged_options`] maps them to the
/// vendor's option keys before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: FeatureValue,
}

/// Value carried by a feature: a boolean toggle, a numeric threshold, or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Query-parameter rendering of the value.
    pub fn to_query(&self) -> String {
        match self {
            FeatureValue::Bool(flag) => flag.to_string(),
            FeatureValue::Number(number) => {
                if number.fract() == 0.0 {
                    format!("{}", *number as i64)
                } else {
                    number.to_string()
                }
            }
            FeatureValue::Text(text) => text.clone(),
        }
    }

    fn is_disabled(&self) -> bool {
        matches!(self, FeatureValue::Bool(false))
    }
}

impl From<bool> for FeatureValue {
    fn from(flag: bool) -> Self {
        FeatureValue::Bool(flag)
    }
}

impl From<f64> for FeatureValue {
    fn from(number: f64) -> Self {
        FeatureValue::Number(number)
    }
}

impl From<&str> for FeatureValue {
    fn from(text: &str) -> Self {
        FeatureValue::Text(text.to_string())
    }
}

/// Ordered option mapping submitted to the transcription vendor.
pub type OptionMap = Vec<(String, FeatureValue)>;

/// Vendor option key for a requested feature name, if the feature is known.
fn vendor_key(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
    let key = match normalized.as_str() {
        "punctuate" | "punctuation" => "punctuate",
        "smart_format" => "smart_format",
        "diarize" | "speaker_labels" => "diarize",
        "paragraphs" => "paragraphs",
        "utterances" => "utterances",
        "summarize" => "summarize",
        "topics" | "detect_topics" => "detect_topics",
        "entities" | "detect_entities" => "detect_entities",
        "profanity_filter" => "profanity_filter",
        "language" => "language",
        "keywords" => "keywords",
        "model" => "model",
        "utt_split" => "utt_split",
        _ => return None,
    };
    Some(key)
}

/// Options every submission carries unless the request sets the same key.
fn default_options() -> OptionMap {
    vec![
        ("model".to_string(), FeatureValue::Text("nova-2".to_string())),
        ("llm".to_string(), FeatureValue::Number(1.0)),
        ("tag".to_string(), FeatureValue::Text("deeptube".to_string())),
        ("utt_split".to_string(), FeatureValue::Number(1.2)),
    ]
}

/// Map the enabled request features to vendor options and append the defaults.
///
/// The merge is ordered and first-wins: request entries come before the
/// defaults, so a key set by the request shadows the default of the same
/// name, and the first of two request entries with the same name shadows the
/// second. Entries whose value is boolean `false` and names with no vendor
/// mapping are dropped.
pub fn merged_options(features: &[Feature]) -> OptionMap {
    let mut merged: OptionMap = Vec::new();

    for feature in features {
        if feature.value.is_disabled() {
            continue;
        }
        let Some(key) = vendor_key(&feature.name) else {
            tracing::debug!(feature = %feature.name, "skipping unrecognized feature");
            continue;
        };
        push_unique(&mut merged, key.to_string(), feature.value.clone());
    }

    for (key, value) in default_options() {
        push_unique(&mut merged, key, value);
    }

    merged
}

fn push_unique(options: &mut OptionMap, key: String, value: FeatureValue) {
    if options.iter().all(|(existing, _)| *existing != key) {
        options.push((key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str, value: impl Into<FeatureValue>) -> Feature {
        Feature {
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn value_of<'a>(options: &'a OptionMap, key: &str) -> Option<&'a FeatureValue> {
        options
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    #[test]
    fn defaults_present_for_empty_request() {
        let options = merged_options(&[]);

        assert_eq!(value_of(&options, "model"), Some(&"nova-2".into()));
        assert_eq!(value_of(&options, "llm"), Some(&FeatureValue::Number(1.0)));
        assert_eq!(value_of(&options, "tag"), Some(&"deeptube".into()));
        assert_eq!(
            value_of(&options, "utt_split"),
            Some(&FeatureValue::Number(1.2))
        );
    }

    #[test]
    fn false_valued_features_are_excluded() {
        let options = merged_options(&[
            feature("punctuate", false),
            feature("diarize", true),
        ]);

        assert!(value_of(&options, "punctuate").is_none());
        assert_eq!(value_of(&options, "diarize"), Some(&FeatureValue::Bool(true)));
    }

    #[test]
    fn request_entry_shadows_default() {
        let options = merged_options(&[feature("model", "nova-2-meeting")]);

        assert_eq!(value_of(&options, "model"), Some(&"nova-2-meeting".into()));
        assert_eq!(
            options
                .iter()
                .filter(|(key, _)| key == "model")
                .count(),
            1
        );
    }

    #[test]
    fn first_request_entry_wins() {
        let options = merged_options(&[
            feature("utt_split", 0.8),
            feature("utt_split", 2.5),
        ]);

        assert_eq!(
            value_of(&options, "utt_split"),
            Some(&FeatureValue::Number(0.8))
        );
    }

    #[test]
    fn unrecognized_features_are_dropped() {
        let options = merged_options(&[feature("frobnicate", true)]);

        assert!(value_of(&options, "frobnicate").is_none());
        // Defaults still apply.
        assert_eq!(value_of(&options, "model"), Some(&"nova-2".into()));
    }

    #[test]
    fn caller_facing_names_normalize_to_vendor_keys() {
        let options = merged_options(&[
            feature("Speaker Labels", true),
            feature("smart-format", true),
        ]);

        assert_eq!(value_of(&options, "diarize"), Some(&FeatureValue::Bool(true)));
        assert_eq!(
            value_of(&options, "smart_format"),
            Some(&FeatureValue::Bool(true))
        );
    }

    #[test]
    fn query_rendering() {
        assert_eq!(FeatureValue::Bool(true).to_query(), "true");
        assert_eq!(FeatureValue::Number(1.0).to_query(), "1");
        assert_eq!(FeatureValue::Number(1.2).to_query(), "1.2");
        assert_eq!(FeatureValue::Text("en".to_string()).to_query(), "en");
    }
}
