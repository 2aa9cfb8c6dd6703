use std::path::Path;

use bytes::Bytes;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::{FeatureError, FeatureWarning},
    spr::StandardPlacesResponse,
};

/// A parsed record the encoder can write.
///
/// The encoder only borrows a feature for the duration of one write.
pub trait Feature {
    /// Compact summary written in [`crate::EncodeMode::Summary`].
    fn spr(&self) -> Result<StandardPlacesResponse, FeatureError>;

    /// Original serialized record, reparsed in [`crate::EncodeMode::Raw`].
    fn bytes(&self) -> &[u8];
}

/// A Who's On First GeoJSON record.
#[derive(Debug, Clone)]
pub struct WofFeature {
    raw: Bytes,
    value: Value,
}

impl WofFeature {
    pub fn from_bytes(raw: impl Into<Bytes>) -> Result<Self, FeatureError> {
        let raw = raw.into();
        let value: Value = serde_json::from_slice(&raw)?;

        let obj = value.as_object().ok_or(FeatureError::NotAnObject)?;
        match obj.get("type").and_then(Value::as_str) {
            Some("Feature") => {}
            Some(other) => return Err(FeatureError::NotAFeature(other.to_string())),
            None => return Err(FeatureError::NotAFeature(String::new())),
        }
        if !obj.get("properties").is_some_and(Value::is_object) {
            return Err(FeatureError::MissingProperties);
        }

        Ok(Self { raw, value })
    }

    pub async fn from_reader<R>(mut reader: R) -> Result<Self, FeatureError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Self::from_bytes(buf)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let buf = tokio::fs::read(path).await?;
        Self::from_bytes(buf)
    }

    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.value.get("properties").and_then(Value::as_object)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties()?.get(key)
    }

    pub fn id(&self) -> Option<i64> {
        self.property("wof:id").and_then(Value::as_i64)
    }

    pub fn name(&self) -> Option<&str> {
        self.property("wof:name").and_then(Value::as_str)
    }

    pub fn placetype(&self) -> Option<&str> {
        self.property("wof:placetype").and_then(Value::as_str)
    }

    /// Top-level `bbox` member, if any.
    pub fn bbox(&self) -> Option<&Value> {
        self.value.get("bbox")
    }

    /// Problems that do not stop the feature from being loaded.
    pub fn warnings(&self) -> Vec<FeatureWarning> {
        let mut warnings = Vec::new();
        if self.id().is_none() {
            warnings.push(FeatureWarning::MissingProperty("wof:id"));
        }
        if self.name().is_none() {
            warnings.push(FeatureWarning::MissingProperty("wof:name"));
        }
        if self.placetype().is_none() {
            warnings.push(FeatureWarning::MissingProperty("wof:placetype"));
        }
        if self.value.get("geometry").is_none_or(Value::is_null) {
            warnings.push(FeatureWarning::MissingGeometry);
        }
        warnings
    }
}

impl Feature for WofFeature {
    fn spr(&self) -> Result<StandardPlacesResponse, FeatureError> {
        StandardPlacesResponse::from_feature(self)
    }

    fn bytes(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_minimal() {
        let f = WofFeature::from_bytes(r#"{"type":"Feature","properties":{"a":1}}"#).unwrap();
        assert_eq!(f.property("a"), Some(&Value::from(1)));
        assert_eq!(f.bytes(), br#"{"type":"Feature","properties":{"a":1}}"#);
    }

    #[test]
    fn test_from_bytes_rejects_non_json() {
        let err = WofFeature::from_bytes("not json").unwrap_err();
        assert!(matches!(err, FeatureError::Json(_)));
    }

    #[test]
    fn test_from_bytes_rejects_non_object() {
        let err = WofFeature::from_bytes("[1,2,3]").unwrap_err();
        assert!(matches!(err, FeatureError::NotAnObject));
    }

    #[test]
    fn test_from_bytes_rejects_other_types() {
        let err =
            WofFeature::from_bytes(r#"{"type":"FeatureCollection","features":[]}"#).unwrap_err();
        match err {
            FeatureError::NotAFeature(t) => assert_eq!(t, "FeatureCollection"),
            other => panic!("unexpected error {other:?}"),
        }

        let err = WofFeature::from_bytes(r#"{"properties":{}}"#).unwrap_err();
        assert!(matches!(err, FeatureError::NotAFeature(_)));
    }

    #[test]
    fn test_from_bytes_requires_properties() {
        let err = WofFeature::from_bytes(r#"{"type":"Feature","properties":null}"#).unwrap_err();
        assert!(matches!(err, FeatureError::MissingProperties));
    }

    #[test]
    fn test_warnings() {
        let f = WofFeature::from_bytes(r#"{"type":"Feature","properties":{"wof:id":1}}"#).unwrap();
        assert_eq!(
            f.warnings(),
            vec![
                FeatureWarning::MissingProperty("wof:name"),
                FeatureWarning::MissingProperty("wof:placetype"),
                FeatureWarning::MissingGeometry,
            ]
        );

        let f = WofFeature::from_bytes(
            r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},
                "properties":{"wof:id":1,"wof:name":"x","wof:placetype":"locality"}}"#,
        )
        .unwrap();
        assert!(f.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_from_reader() {
        let data: &[u8] = br#"{"type":"Feature","properties":{"wof:id":85633041}}"#;
        let f = WofFeature::from_reader(data).await.unwrap();
        assert_eq!(f.id(), Some(85633041));
    }
}
