//! Pieces shared by the Google Gemini API adapters (Lyria, Veo, Imagen)

use base64::Engine as _;
use serde::Deserialize;

use crate::core::settings::GoogleSettings;
use crate::core::{CoreError, CoreResult};

/// Header carrying the Gemini API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Returns the configured API key or an authentication error for `provider`
pub fn require_api_key(settings: &GoogleSettings, provider: &str) -> CoreResult<String> {
    settings
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| CoreError::authentication(provider))
}

/// Body of a `:predict` response
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

/// One inline media prediction
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Set when the safety filter dropped the output
    #[serde(default)]
    pub rai_filtered_reason: Option<String>,
}

/// Decodes the first inline prediction into bytes and its MIME type
pub fn decode_first_prediction(
    provider: &str,
    predictions: Vec<Prediction>,
) -> CoreResult<(Vec<u8>, Option<String>)> {
    let prediction = predictions
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::provider(provider, "Response contained no predictions"))?;

    if let Some(reason) = prediction.rai_filtered_reason.as_deref() {
        if prediction.bytes_base64_encoded.is_none() {
            return Err(CoreError::provider(
                provider,
                format!("Output was filtered: {}", reason),
            ));
        }
    }

    let encoded = prediction
        .bytes_base64_encoded
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::provider(provider, "Prediction contained no media bytes"))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| CoreError::provider(provider, format!("Invalid base64 payload: {}", e)))?;

    Ok((bytes, prediction.mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Vec<Prediction> {
        serde_json::from_value::<PredictResponse>(value)
            .unwrap()
            .predictions
    }

    #[test]
    fn test_require_api_key() {
        let mut settings = GoogleSettings::default();
        assert!(require_api_key(&settings, "veo").unwrap_err().is_authentication());

        settings.api_key = Some("".to_string());
        assert!(require_api_key(&settings, "veo").is_err());

        settings.api_key = Some("abc".to_string());
        assert_eq!(require_api_key(&settings, "veo").unwrap(), "abc");
    }

    #[test]
    fn test_decode_first_prediction() {
        let predictions = parse(json!({
            "predictions": [{ "bytesBase64Encoded": "UklGRg==", "mimeType": "audio/wav" }]
        }));
        let (bytes, mime) = decode_first_prediction("lyria", predictions).unwrap();
        assert_eq!(bytes, b"RIFF");
        assert_eq!(mime.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn test_decode_empty_predictions() {
        assert!(decode_first_prediction("imagen", parse(json!({}))).is_err());
        assert!(decode_first_prediction("imagen", parse(json!({ "predictions": [] }))).is_err());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let predictions = parse(json!({ "predictions": [{ "bytesBase64Encoded": "%%%" }] }));
        let err = decode_first_prediction("lyria", predictions).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_decode_filtered_output() {
        let predictions = parse(json!({
            "predictions": [{ "raiFilteredReason": "blocked by safety filter" }]
        }));
        let err = decode_first_prediction("imagen", predictions).unwrap_err();
        assert!(err.to_string().contains("filtered"));
    }
}
