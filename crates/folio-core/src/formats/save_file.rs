//! # Save File
//!
//! The JSON document written by editors:
//!
//! ```json
//! { "version": "0.46.0", "modelFilename": "car.ldr", "state": { ... } }
//! ```
//!
//! Loading parses the envelope loosely, runs `state` through
//! [`compat::normalize`] for the tagged version, then deserializes it.

use super::compat::{self, CURRENT_VERSION};
use crate::document::DocumentState;
use crate::types::FolioError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest save file accepted.
pub const MAX_SAVE_FILE_SIZE: usize = 256 * 1024 * 1024; // 256 MB

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub version: String,
    #[serde(default)]
    pub model_filename: Option<String>,
    pub state: DocumentState,
}

impl SaveFile {
    /// Envelope at the current version.
    #[must_use]
    pub fn new(state: DocumentState, model_filename: Option<String>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            model_filename,
            state,
        }
    }

    /// # Errors
    ///
    /// `SerializationError` if the state cannot be encoded.
    pub fn to_json(&self, indent: Option<usize>) -> Result<String, FolioError> {
        let encode = |e: serde_json::Error| FolioError::SerializationError(e.to_string());
        let Some(width) = indent else {
            return serde_json::to_string(self).map_err(encode);
        };
        let indent = vec![b' '; width];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser).map_err(encode)?;
        String::from_utf8(out).map_err(|e| FolioError::SerializationError(e.to_string()))
    }

    /// Parse and upgrade a save file.
    ///
    /// The returned envelope carries [`CURRENT_VERSION`].
    ///
    /// # Errors
    ///
    /// `DeserializationError` for oversized or malformed input or a missing
    /// version tag; `UnsupportedVersion` from [`compat::normalize`].
    pub fn from_json(text: &str) -> Result<Self, FolioError> {
        if text.len() > MAX_SAVE_FILE_SIZE {
            return Err(FolioError::DeserializationError(format!(
                "save file of {} bytes exceeds maximum allowed {MAX_SAVE_FILE_SIZE} bytes",
                text.len()
            )));
        }
        let mut envelope: Value = serde_json::from_str(text)?;
        let Some(obj) = envelope.as_object_mut() else {
            return Err(FolioError::DeserializationError("save file is not an object".to_string()));
        };
        let Some(version) = obj.get("version").and_then(Value::as_str).map(str::to_owned) else {
            return Err(FolioError::DeserializationError("save file has no version".to_string()));
        };
        let model_filename = obj.get("modelFilename").and_then(Value::as_str).map(str::to_owned);
        let raw = obj.remove("state").unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let normalized = compat::normalize(raw, &version, model_filename.as_deref())?;
        let state: DocumentState = serde_json::from_value(normalized)?;
        Ok(Self::new(state, model_filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::page::AddPage;
    use crate::mutations::step::AddStep;
    use crate::mutations::{PageMutations, StepMutations};
    use crate::store::Store;
    use crate::types::{ItemId, PageSubtype};
    use std::io::Write as _;

    fn sample() -> SaveFile {
        let mut store = Store::new();
        let page = PageMutations::add(&mut store, &AddPage::default()).expect("page");
        StepMutations::add(&mut store, &AddStep::new(page)).expect("step");
        let mut state = store.into_state();
        state.filename = Some("car".to_string());
        SaveFile::new(state, Some("car.ldr".to_string()))
    }

    #[test]
    fn envelope_uses_camel_case() {
        let json = sample().to_json(None).expect("encode");
        let value: Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["version"], CURRENT_VERSION);
        assert_eq!(value["modelFilename"], "car.ldr");
        assert!(value["state"]["pages"].is_array());
    }

    #[test]
    fn file_roundtrip() {
        let save = sample();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(save.to_json(Some(2)).expect("encode").as_bytes())
            .expect("write");
        let text = std::fs::read_to_string(file.path()).expect("read");
        assert!(text.contains("\n  \"version\""));
        assert_eq!(SaveFile::from_json(&text).expect("decode"), save);
    }

    #[test]
    fn old_files_are_upgraded_on_load() {
        let text = r#"{
            "version": "0.30.0",
            "modelFilename": "trike.ldr",
            "state": {"pages": [{"id": 0, "number": 1}], "templatePage": {"id": 0}}
        }"#;
        let save = SaveFile::from_json(text).expect("decode");
        assert_eq!(save.version, CURRENT_VERSION);
        assert_eq!(save.state.filename.as_deref(), Some("trike"));
        let template = save.state.pages.first().expect("template page");
        assert_eq!(template.subtype, PageSubtype::TemplatePage);
        assert_eq!(template.id, ItemId(1));
        assert!(save.state.books.is_empty());
    }

    #[test]
    fn missing_version_or_state_shape_is_rejected() {
        assert!(matches!(
            SaveFile::from_json(r#"{"state": {}}"#),
            Err(FolioError::DeserializationError(_))
        ));
        assert!(SaveFile::from_json("[1, 2]").is_err());
        assert!(SaveFile::from_json(r#"{"version": "0.46", "state": {"pages": 7}}"#).is_err());
    }
}
