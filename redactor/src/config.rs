//! Immutable pipeline configuration.
//!
//! A [`PipelineConfig`] is built once (in code or from TOML) and handed to the
//! pipeline entry point. Nothing in this crate reads the environment or keeps
//! process-wide settings.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigurationError, placeholder::is_valid_label};

/// An RGB color.
pub type Color = [u8; 3];

/// Candidate filtering and placeholder labeling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    /// When set, only these type tags are redacted.
    pub allowed_types: Option<BTreeSet<String>>,
    /// Placeholder label per type tag, e.g. `OCR_TEXT = "TEXT"`.
    pub label_aliases: BTreeMap<String, String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            allowed_types: None,
            label_aliases: BTreeMap::new(),
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigurationError::ConfidenceOutOfRange(self.min_confidence));
        }
        for (type_tag, label) in &self.label_aliases {
            if !is_valid_label(label) {
                return Err(ConfigurationError::InvalidAlias {
                    type_tag: type_tag.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Drawing settings for image redaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageRedactionConfig {
    pub draw_borders: bool,
    pub border_color: Color,
    /// Pixels the border extends outward from the blacked-out box.
    pub border_width: u32,
    pub fill_color: Color,
    pub label_color: Color,
    /// Boxes narrower or shorter than this get no label.
    pub min_label_size: u32,
}

impl Default for ImageRedactionConfig {
    fn default() -> Self {
        Self {
            draw_borders: true,
            border_color: [255, 0, 0],
            border_width: 2,
            fill_color: [0, 0, 0],
            label_color: [255, 255, 255],
            min_label_size: 10,
        }
    }
}

/// Top-level configuration for one [`crate::Pipeline`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub aggregation: AggregationConfig,
    pub image: ImageRedactionConfig,
    /// Image entity types whose recognized text can be restored.
    pub restorable_types: BTreeSet<String>,
    pub detection_timeout_ms: u64,
    pub inference_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            image: ImageRedactionConfig::default(),
            restorable_types: BTreeSet::from(["OCR_TEXT".to_string()]),
            detection_timeout_ms: 30_000,
            inference_timeout_ms: 60_000,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            toml::from_str(source).map_err(|err| ConfigurationError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.detection_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroTimeout {
                name: "detection_timeout_ms",
            });
        }
        if self.inference_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroTimeout {
                name: "inference_timeout_ms",
            });
        }
        self.aggregation.validate()
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.restorable_types.contains("OCR_TEXT"));
        assert_eq!(config.image.min_label_size, 10);
    }

    #[test]
    fn toml_overrides_nested_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            inference_timeout_ms = 500

            [aggregation]
            min_confidence = 0.5
            allowed_types = ["PERSON", "EMAIL"]

            [aggregation.label_aliases]
            OCR_TEXT = "TEXT"

            [image]
            draw_borders = false
            border_color = [0, 255, 0]
            "#,
        )
        .unwrap();
        assert_eq!(config.inference_timeout(), Duration::from_millis(500));
        assert_eq!(config.aggregation.min_confidence, 0.5);
        assert_eq!(config.aggregation.label_aliases["OCR_TEXT"], "TEXT");
        assert!(!config.image.draw_borders);
        assert_eq!(config.image.border_color, [0, 255, 0]);
        assert_eq!(config.image.border_width, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_toml_str("detection_timeout = 5").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = PipelineConfig::from_toml_str("detection_timeout_ms = 0").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ZeroTimeout {
                name: "detection_timeout_ms"
            }
        );
    }

    #[test]
    fn invalid_alias_and_confidence_are_rejected() {
        let mut config = PipelineConfig::default();
        config
            .aggregation
            .label_aliases
            .insert("OCR_TEXT".into(), "text".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidAlias { .. })
        ));

        let mut config = PipelineConfig::default();
        config.aggregation.min_confidence = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ConfidenceOutOfRange(1.5))
        );
    }
}
