//! Mapping between classifier output indices and speaker labels.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PredictError;

/// On-disk formats accepted for the label mapping.
///
/// Either a bare array of classes, or an object with a `classes` field.
/// Classes may be strings or numbers; numbers are rendered as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    Classes(Vec<Value>),
    Object { classes: Vec<Value> },
}

/// Bidirectional mapping between class indices and speaker labels.
///
/// Index `i` of the classifier output corresponds to `classes()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Creates an encoder from an ordered list of classes.
    ///
    /// Rejects empty lists and duplicate classes.
    pub fn new(classes: Vec<String>) -> Result<Self, PredictError> {
        if classes.is_empty() {
            return Err(PredictError::Labels("no classes".into()));
        }
        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), i).is_some() {
                return Err(PredictError::Labels(format!("duplicate class {class:?}")));
            }
        }
        Ok(Self { classes, index })
    }

    /// Parses a JSON label mapping.
    pub fn from_json(data: &str) -> Result<Self, PredictError> {
        let file: LabelFile =
            serde_json::from_str(data).map_err(|e| PredictError::Labels(e.to_string()))?;
        let values = match file {
            LabelFile::Classes(v) | LabelFile::Object { classes: v } => v,
        };

        let classes = values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(PredictError::Labels(format!(
                    "class must be a string or number, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(classes)
    }

    /// Loads a JSON label mapping from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PredictError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Returns the label for a class index.
    pub fn decode(&self, index: usize) -> Result<&str, PredictError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(PredictError::LabelOutOfRange {
                index,
                len: self.classes.len(),
            })
    }

    /// Returns the class index for a label.
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Returns all classes in index order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false: an encoder holds at least one class.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_array() {
        let enc = LabelEncoder::from_json(r#"["alice", "bob", "carol"]"#).unwrap();
        assert_eq!(enc.len(), 3);
        assert_eq!(enc.decode(1).unwrap(), "bob");
        assert_eq!(enc.encode("carol"), Some(2));
        assert_eq!(enc.encode("dave"), None);
    }

    #[test]
    fn parse_object_with_numeric_classes() {
        let enc = LabelEncoder::from_json(r#"{"classes": [19, 26, 27]}"#).unwrap();
        assert_eq!(enc.classes(), &["19", "26", "27"]);
        assert_eq!(enc.decode(2).unwrap(), "27");
    }

    #[test]
    fn decode_out_of_range() {
        let enc = LabelEncoder::from_json(r#"["a"]"#).unwrap();
        let err = enc.decode(5).unwrap_err();
        assert!(matches!(err, PredictError::LabelOutOfRange { index: 5, len: 1 }));
    }

    #[test]
    fn rejects_bad_mappings() {
        assert!(LabelEncoder::from_json("[]").is_err());
        assert!(LabelEncoder::from_json(r#"["a", "a"]"#).is_err());
        assert!(LabelEncoder::from_json(r#"[true]"#).is_err());
        assert!(LabelEncoder::from_json("not json").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_encoder.json");
        std::fs::write(&path, r#"["spk_a", "spk_b"]"#).unwrap();
        let enc = LabelEncoder::from_json_file(&path).unwrap();
        assert_eq!(enc.decode(0).unwrap(), "spk_a");

        let missing = LabelEncoder::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(PredictError::Io(_))));
    }
}
