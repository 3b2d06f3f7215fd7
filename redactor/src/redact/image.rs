use std::collections::HashSet;

use ::image::RgbImage;
use slog::{debug, info, o, warn, Logger};

use super::{check_placeholder, Canvas, Redaction, Redactor, RestorePolicy};
use crate::{
    config::ImageRedactionConfig,
    entity::Entity,
    error::{InputError, RedactionError},
    mapping::{MappingEntry, PlaceholderMap},
    placeholder::scan,
};

const METHODS: &[&str] = &["hybrid_blackout_and_label"];

/// Blacks out each entity's pixel box and draws its placeholder on top.
///
/// With borders enabled, a colored frame `border_width` pixels wide is drawn
/// around each box first, so the fill leaves it visible as an outline. Boxes
/// smaller than `min_label_size` in either dimension are filled without a
/// label but are still mapped. A placeholder that occurs in any entity's
/// recognized text is rejected as a collision.
#[derive(Clone, Debug)]
pub struct ImageRedactor {
    config: ImageRedactionConfig,
    policy: RestorePolicy,
    logger: Logger,
}

/// What [`ImageRedactor::redact_canvas`] did to a canvas.
#[derive(Clone, Debug, Default)]
pub struct CanvasReport {
    pub mapping: PlaceholderMap,
    pub skipped: Vec<RedactionError>,
    pub unlabeled: Vec<String>,
}

impl ImageRedactor {
    pub fn new(config: ImageRedactionConfig, policy: RestorePolicy) -> Self {
        Self {
            config,
            policy,
            logger: crate::slog::discard(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: &Logger) -> Self {
        self.logger = logger.new(o!("component" => "image_redactor"));
        self
    }

    pub fn config(&self) -> &ImageRedactionConfig {
        &self.config
    }

    /// Human-readable description of the drawing settings.
    pub fn describe(&self) -> String {
        let border = if self.config.draw_borders && self.config.border_width > 0 {
            format!(
                "{}px border in {:?}",
                self.config.border_width, self.config.border_color
            )
        } else {
            "no border".to_string()
        };
        format!(
            "{:?} fill with {border}, labels in {:?} on boxes of at least {}px",
            self.config.fill_color,
            self.config.label_color,
            self.config.min_label_size
        )
    }

    /// Paints every entity onto `canvas` in place.
    pub fn redact_canvas<C: Canvas>(&self, canvas: &mut C, entities: &[Entity]) -> CanvasReport {
        let (width, height) = canvas.dimensions();
        let mut report = CanvasReport::default();
        let existing: HashSet<&str> = entities
            .iter()
            .filter_map(|e| e.original_text.as_deref())
            .flat_map(|value| scan(value).map(|token| token.text))
            .collect();

        for entity in entities {
            let Some(bbox) = entity.bbox() else {
                report.skipped.push(RedactionError::MissingLocation {
                    placeholder: entity.placeholder.clone(),
                    expected: "pixel box",
                });
                continue;
            };
            if let Err(err) = check_placeholder(entity, &existing, |p| report.mapping.contains(p)) {
                report.skipped.push(err);
                continue;
            }
            let visible = bbox.clamp_to(width, height);
            if bbox.is_empty() || visible.is_empty() {
                report.skipped.push(RedactionError::EmptyRegion {
                    placeholder: entity.placeholder.clone(),
                });
                continue;
            }

            if self.config.draw_borders && self.config.border_width > 0 {
                canvas.fill_rect(bbox.expand(self.config.border_width), self.config.border_color);
            }
            canvas.fill_rect(visible, self.config.fill_color);

            let too_small = bbox.width() < self.config.min_label_size
                || bbox.height() < self.config.min_label_size;
            if too_small {
                warn!(self.logger, "region too small for a label";
                    "placeholder" => entity.placeholder.as_str(),
                    "width" => bbox.width(),
                    "height" => bbox.height(),
                    "min_label_size" => self.config.min_label_size,
                );
                report.unlabeled.push(entity.placeholder.clone());
            } else if !canvas.draw_centered_text(visible, &entity.placeholder, self.config.label_color)
            {
                warn!(self.logger, "label does not fit region";
                    "placeholder" => entity.placeholder.as_str(),
                    "width" => visible.width(),
                    "height" => visible.height(),
                );
                report.unlabeled.push(entity.placeholder.clone());
            }

            let restorable = self.policy.is_restorable(entity);
            if let Err(err) = report
                .mapping
                .insert(MappingEntry::new(entity.clone(), restorable))
            {
                report.skipped.push(err);
            }
        }

        for err in &report.skipped {
            warn!(self.logger, "entity skipped"; "reason" => %err);
        }
        report
    }

    /// Redacts a copy of `image`.
    pub fn redact_image(&self, image: &RgbImage, entities: &[Entity]) -> Redaction<RgbImage> {
        if entities.is_empty() {
            debug!(self.logger, "no entities, image returned unchanged");
            return Redaction::unchanged(image.clone());
        }
        let mut canvas = image.clone();
        let report = self.redact_canvas(&mut canvas, entities);
        info!(self.logger, "image redacted";
            "regions" => report.mapping.len(),
            "unlabeled" => report.unlabeled.len(),
            "skipped" => report.skipped.len(),
        );
        Redaction {
            document: canvas,
            mapping: report.mapping,
            skipped: report.skipped,
            unlabeled: report.unlabeled,
        }
    }

    /// Decodes an encoded image (PNG or JPEG) and redacts it.
    pub fn redact_encoded(
        &self,
        bytes: &[u8],
        entities: &[Entity],
    ) -> Result<Redaction<RgbImage>, InputError> {
        let image = ::image::load_from_memory(bytes)?.to_rgb8();
        Ok(self.redact_image(&image, entities))
    }
}

impl Default for ImageRedactor {
    fn default() -> Self {
        Self::new(ImageRedactionConfig::default(), RestorePolicy::default())
    }
}

impl Redactor for ImageRedactor {
    type Document = RgbImage;

    fn redact(&self, document: &RgbImage, entities: &[Entity]) -> Redaction<RgbImage> {
        self.redact_image(document, entities)
    }

    fn redaction_methods(&self) -> &'static [&'static str] {
        METHODS
    }
}
