//! Wire model for the `generateContent` call and the rules for reading its answer.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbaImage;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::state::Style;

pub const PNG_MIME: &str = "image/png";

/// The text half of a submission.
pub fn instruction(prompt: &str, style: Style) -> String {
    format!("{prompt}. Generate the image in a {} style.", style.label())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part { text: Some(text.into()), inline_data: None }
    }

    pub fn png(bytes: &[u8]) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData { mime_type: PNG_MIME.to_string(), data: STANDARD.encode(bytes) }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// One multimodal turn: the flattened drawing, then the styled instruction.
    pub fn from_drawing(png: &[u8], prompt: &str, style: Style) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: Some(vec![Part::png(png), Part::text(instruction(prompt, style))]),
            }],
            generation_config: GenerationConfig {
                response_modalities: vec![Modality::Text, Modality::Image],
            },
        }
    }

    pub fn instruction_text(&self) -> Option<&str> {
        self.contents
            .iter()
            .filter_map(|c| c.parts.as_ref())
            .flatten()
            .find_map(|p| p.text.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
    #[serde(default)]
    pub block_reason_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    pub fn from_json(body: &str) -> Result<Self, GenerateError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// A usable answer: an image, plus whatever text the model sent with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub message: Option<String>,
    pub image_data: String,
}

impl Generation {
    pub fn decode_image(&self) -> Result<RgbaImage, GenerateError> {
        let bytes = STANDARD.decode(self.image_data.trim())?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Read a response the way the page does: the first candidate's parts win,
/// then a prompt block, then "no content".
pub fn interpret(response: &GenerateContentResponse) -> Result<Generation, GenerateError> {
    let parts = response
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.as_ref());

    let has_candidates = response.candidates.as_ref().is_some_and(|c| !c.is_empty());

    let Some(parts) = parts else {
        if !has_candidates {
            if let Some(feedback) = &response.prompt_feedback {
                let err = GenerateError::Blocked {
                    reason: feedback.block_reason.clone().unwrap_or_else(|| "BLOCK_REASON_UNSPECIFIED".to_string()),
                    message: feedback.block_reason_message.clone(),
                };
                error!("Failed to generate image: {err}");
                return Err(err);
            }
        }
        error!("Failed to generate image: {}", GenerateError::NoContent);
        return Err(GenerateError::NoContent);
    };

    let mut message = None;
    let mut image_data = None;
    for part in parts {
        if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
            info!("Received text response: {text}");
            message = Some(text.to_string());
        } else if let Some(inline) = &part.inline_data {
            info!("Received image data, length: {}", inline.data.len());
            image_data = Some(inline.data.clone());
        }
    }

    info!(
        "Response: message={:?} imageData={}",
        message,
        image_data.as_deref().map(truncate_for_log).unwrap_or_else(|| "null".to_string())
    );

    match image_data {
        Some(image_data) => Ok(Generation { message, image_data }),
        None => {
            error!("Failed to generate image: {}", GenerateError::NoImage);
            Err(GenerateError::NoImage)
        }
    }
}

fn truncate_for_log(data: &str) -> String {
    match data.char_indices().nth(50) {
        Some((cut, _)) => format!("{}... (truncated)", &data[..cut]),
        None => data.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn instruction_names_the_style() {
        assert_eq!(instruction("add a sun", Style::Cartoon), "add a sun. Generate the image in a Cartoon style.");
        assert_eq!(
            instruction("make it glow", Style::Render3D),
            "make it glow. Generate the image in a 3D Render style."
        );
    }

    #[test]
    fn request_serializes_as_one_multimodal_turn() {
        let request = GenerateContentRequest::from_drawing(&[1, 2, 3], "add a sun", Style::Cartoon);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                        {"text": "add a sun. Generate the image in a Cartoon style."}
                    ]
                }],
                "generationConfig": {"responseModalities": ["TEXT", "IMAGE"]}
            })
        );
        assert_eq!(request.instruction_text(), Some("add a sun. Generate the image in a Cartoon style."));
    }

    #[test]
    fn text_and_image_parts_are_collected() {
        let response = GenerateContentResponse::from_json(
            r#"{"candidates":[{"content":{"role":"model","parts":[
                {"text":"Here you go"},
                {"inlineData":{"mimeType":"image/png","data":"AAAA"}}
            ]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();

        let generation = interpret(&response).unwrap();
        assert_eq!(generation.message.as_deref(), Some("Here you go"));
        assert_eq!(generation.image_data, "AAAA");
    }

    #[test]
    fn last_parts_win() {
        let response = GenerateContentResponse::from_json(
            r#"{"candidates":[{"content":{"parts":[
                {"inlineData":{"data":"first","mimeType":"image/png"}},
                {"text":"one"},
                {"inlineData":{"data":"second","mimeType":"image/png"}},
                {"text":"two"}
            ]}}]}"#,
        )
        .unwrap();

        let generation = interpret(&response).unwrap();
        assert_eq!(generation.image_data, "second");
        assert_eq!(generation.message.as_deref(), Some("two"));
    }

    #[test]
    fn text_only_answer_is_an_error() {
        let response =
            GenerateContentResponse::from_json(r#"{"candidates":[{"content":{"parts":[{"text":"I can't draw that"}]}}]}"#)
                .unwrap();
        let err = interpret(&response).unwrap_err();
        assert!(matches!(err, GenerateError::NoImage));
        assert_eq!(err.to_string(), "Failed to generate image. Please try again.");
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let response = GenerateContentResponse::from_json(
            r#"{"promptFeedback":{"blockReason":"SAFETY","blockReasonMessage":"Unsafe request"}}"#,
        )
        .unwrap();
        let err = interpret(&response).unwrap_err();
        assert_eq!(err.to_string(), "Image generation failed: SAFETY Unsafe request");
    }

    #[test]
    fn empty_response_has_no_content() {
        let response = GenerateContentResponse::from_json("{}").unwrap();
        let err = interpret(&response).unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate image. No content returned from the model.");
    }

    #[test]
    fn candidate_without_parts_has_no_content() {
        let response = GenerateContentResponse::from_json(
            r#"{"candidates":[{"finishReason":"SAFETY"}],"promptFeedback":{"blockReason":"OTHER"}}"#,
        )
        .unwrap();
        assert!(matches!(interpret(&response).unwrap_err(), GenerateError::NoContent));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            GenerateContentResponse::from_json("<html>").unwrap_err(),
            GenerateError::MalformedResponse(_)
        ));
    }

    #[test]
    fn decodes_png_payload() {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255]));
        let png = crate::surface::encode_png(image::DynamicImage::ImageRgba8(img)).unwrap();
        let generation = Generation { message: None, image_data: STANDARD.encode(png) };
        let decoded = generation.decode_image().unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(*decoded.get_pixel(2, 1), image::Rgba([9, 8, 7, 255]));

        let junk = Generation { message: None, image_data: "!!!".into() };
        assert!(matches!(junk.decode_image().unwrap_err(), GenerateError::Base64(_)));
    }
}
