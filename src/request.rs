use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};
use log::debug;

use crate::config::ClientConfig;
use crate::error::GenerateError;
use crate::gemini::{GenerateContentRequest, GenerateContentResponse};

fn transport_error(value: JsValue) -> GenerateError {
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    GenerateError::Transport(message)
}

/// POST one `generateContent` call through `window.fetch`.
/// Non-2xx answers come back as `Http` with the body kept verbatim.
pub async fn generate_content(config: &ClientConfig, body: &GenerateContentRequest) -> Result<GenerateContentResponse, GenerateError> {
    let api_key = config.api_key.as_deref().ok_or(GenerateError::MissingApiKey)?;
    let body = serde_json::to_string(body).map_err(|e| GenerateError::Transport(e.to_string()))?;

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_mode(RequestMode::Cors);
    opts.set_body(&JsValue::from_str(&body));

    let url = config.generate_content_url();
    let request = Request::new_with_str_and_init(&url, &opts).map_err(transport_error)?;

    let headers = request.headers();
    headers.set("Content-Type", "application/json").map_err(transport_error)?;
    headers.set("x-goog-api-key", api_key).map_err(transport_error)?;

    debug!("POST {url} ({} bytes)", body.len());

    let window = web_sys::window().ok_or_else(|| GenerateError::Transport("No window object".to_string()))?;
    let response = JsFuture::from(window.fetch_with_request(&request)).await.map_err(transport_error)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| GenerateError::Transport("Response conversion failed".to_string()))?;

    let text = JsFuture::from(response.text().map_err(transport_error)?).await.map_err(transport_error)?;
    let text = text.as_string().unwrap_or_default();

    if response.ok() {
        GenerateContentResponse::from_json(&text)
    } else {
        Err(GenerateError::http(response.status(), text))
    }
}
