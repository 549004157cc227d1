//! Wire payloads for the Gemini API and the relay endpoint.

use serde::{Deserialize, Serialize};

pub mod gemini;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

/// One conversation turn as the Gemini API sees it (`role` is "user" or
/// "model"). Also the history entry shape of the relay request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

/// The fixed content-safety policy applied to every request: four harm
/// categories, blocking at medium and above. Not configurable per call.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    const THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: THRESHOLD,
    })
    .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, if any.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let content = candidate.content.as_ref()?;
        let mut out = String::new();
        for part in &content.parts {
            if let Some(text) = &part.text {
                out.push_str(text);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

/// Body of `POST /api/chat` on the relay.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRelayRequest {
    pub history: Vec<Content>,
    pub message: String,
}

/// JSON error body returned by the relay on non-success statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_request_serializes_with_nested_parts() {
        let request = ChatRelayRequest {
            history: vec![Content::user("Hi"), Content::model("Hello!")],
            message: "How are you?".to_string(),
        };

        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(json["history"][0]["role"], "user");
        assert_eq!(json["history"][0]["parts"][0]["text"], "Hi");
        assert_eq!(json["history"][1]["role"], "model");
        assert_eq!(json["message"], "How are you?");
    }

    #[test]
    fn generate_request_uses_camel_case_keys() {
        let request = GenerateContentRequest {
            contents: vec![Content::user("Hi")],
            system_instruction: Some(Content {
                role: "system".to_string(),
                parts: vec![Part {
                    text: "Be brief.".to_string(),
                }],
            }),
            safety_settings: default_safety_settings(),
        };

        let json = serde_json::to_value(&request).expect("serializes");
        assert!(json.get("systemInstruction").is_some());
        assert_eq!(json["safetySettings"].as_array().map(Vec::len), Some(4));
        assert_eq!(
            json["safetySettings"][0]["threshold"],
            "BLOCK_MEDIUM_AND_ABOVE"
        );
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).expect("parses");
        assert_eq!(response.text().as_deref(), Some("Hello"));
    }

    #[test]
    fn response_text_is_none_for_empty_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).expect("parses");
        assert!(response.text().is_none());
    }
}
