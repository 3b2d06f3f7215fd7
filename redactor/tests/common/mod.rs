//! Detection sources and inference clients shared by the integration tests.

#![allow(dead_code)]

use std::{thread, time::Duration};

use redactor::{
    DetectionBackendError, DetectionSource, Document, InferenceClient, InferenceError,
    RawCandidate,
};

/// Finds fixed strings in text documents.
pub struct Lexicon {
    pub name: &'static str,
    pub entries: Vec<(&'static str, &'static str)>,
}

impl Lexicon {
    pub fn new(name: &'static str, entries: &[(&'static str, &'static str)]) -> Self {
        Self {
            name,
            entries: entries.to_vec(),
        }
    }
}

impl DetectionSource for Lexicon {
    fn name(&self) -> &str {
        self.name
    }

    fn model_info(&self) -> Option<String> {
        Some(format!("{}-lexicon", self.name))
    }

    fn detect(&self, document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
        let Document::Text(text) = document else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for (needle, entity_type) in &self.entries {
            for (byte, _) in text.match_indices(needle) {
                let start = text[..byte].chars().count();
                let end = start + needle.chars().count();
                found.push(RawCandidate::text_span(*entity_type, start, end, 0.9));
            }
        }
        Ok(found)
    }
}

/// Reports one face and one line of recognized text on any image.
pub struct Vision;

impl DetectionSource for Vision {
    fn name(&self) -> &str {
        "vision"
    }

    fn supported_types(&self) -> Vec<String> {
        vec!["FACE".into(), "OCR_TEXT".into()]
    }

    fn accelerated(&self) -> bool {
        true
    }

    fn detect(&self, document: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
        if !matches!(document, Document::Image(_)) {
            return Ok(Vec::new());
        }
        Ok(vec![
            RawCandidate::image_region("FACE", (50, 50, 250, 250), 0.95),
            RawCandidate::image_region("OCR_TEXT", (300, 100, 700, 150), 0.88)
                .with_text("Secret Text"),
            RawCandidate::image_region("FACE", (600, 400, 606, 430), 0.7),
        ])
    }
}

pub struct Broken;

impl DetectionSource for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn detect(&self, _: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
        Err(DetectionBackendError::Unavailable("model not loaded".into()))
    }
}

pub struct Sleepy(pub Duration);

impl DetectionSource for Sleepy {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn detect(&self, _: &Document) -> Result<Vec<RawCandidate>, DetectionBackendError> {
        thread::sleep(self.0);
        Ok(vec![RawCandidate::text_span("LATE", 0, 1, 1.0)])
    }
}

/// Answers with a fixed template; `{doc}` is replaced by the sanitized text.
pub struct Scripted(pub &'static str);

impl InferenceClient for Scripted {
    fn infer(&self, sanitized: &Document) -> Result<String, InferenceError> {
        let doc = match sanitized {
            Document::Text(text) => text.clone(),
            Document::Image(image) => format!("{}x{} image", image.width(), image.height()),
        };
        Ok(self.0.replace("{doc}", &doc))
    }
}

pub struct Refusing;

impl InferenceClient for Refusing {
    fn infer(&self, _: &Document) -> Result<String, InferenceError> {
        Err("quota exceeded".into())
    }
}
