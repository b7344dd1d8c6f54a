use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, Rgba, RgbaImage};

use codrawing::gemini::GenerateContentResponse;
use codrawing::geometry::{PixelRect, Point2D};
use codrawing::state::{RequestPhase, Style};
use codrawing::surface::encode_png;
use codrawing::{parse_error, Controller, GenerateError, Settlement};

fn model_answer(image: RgbaImage) -> GenerateContentResponse {
    let png = encode_png(DynamicImage::ImageRgba8(image)).unwrap();
    let body = format!(
        r#"{{"candidates":[{{"content":{{"role":"model","parts":[{{"text":"A sunny scene"}},{{"inlineData":{{"mimeType":"image/png","data":"{}"}}}}]}}}}]}}"#,
        STANDARD.encode(png)
    );
    GenerateContentResponse::from_json(&body).unwrap()
}

fn scribble(controller: &mut Controller, from: (f64, f64), to: (f64, f64)) {
    controller.pointer_down(Point2D::new(from.0, from.1));
    controller.pointer_move(Point2D::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
    controller.pointer_move(Point2D::new(to.0, to.1));
    controller.pointer_up();
}

#[test]
fn sketch_submit_draw_over_and_download() {
    let mut controller = Controller::new();
    scribble(&mut controller, (100.0, 100.0), (300.0, 100.0));

    controller.select_style(Style::Cartoon);
    let ticket = controller.begin_generation("add a sun").unwrap();
    assert!(controller.is_loading());

    // outbound payload: styled instruction plus the flattened sketch
    assert_eq!(ticket.request.instruction_text(), Some("add a sun. Generate the image in a Cartoon style."));
    let parts = ticket.request.contents[0].parts.as_ref().unwrap();
    let inline = parts[0].inline_data.as_ref().unwrap();
    assert_eq!(inline.mime_type, "image/png");
    let sketch = image::load_from_memory(&STANDARD.decode(&inline.data).unwrap()).unwrap();
    assert_eq!((sketch.width(), sketch.height()), (1280, 720));
    assert!(!sketch.color().has_alpha());
    assert_eq!(sketch.to_rgb8().get_pixel(200, 99).0, [0, 0, 0]);

    let generated = RgbaImage::from_pixel(1024, 1024, Rgba([0, 200, 0, 255]));
    let settlement = controller.complete_generation(ticket.request_id, Ok(model_answer(generated)));
    assert_eq!(settlement, Settlement::Generated { placement: Some(PixelRect {x: 280, y: 0, width: 720, height: 720}) });
    assert!(!controller.is_loading());
    assert_eq!(controller.state().last_message(), Some("A sunny scene"));

    // the earlier sketch is gone, replaced by the pillarboxed result
    assert_eq!(*controller.surface().pixels().get_pixel(200, 99), Rgba([255, 255, 255, 255]));

    controller.set_pen_color("#ff0000").unwrap();
    scribble(&mut controller, (600.0, 360.0), (680.0, 360.0));

    let png = controller.export_png().unwrap();
    let exported = image::load_from_memory(&png).unwrap();
    assert_eq!((exported.width(), exported.height()), (1024, 1024));

    controller.clear();
    let png = controller.export_png().unwrap();
    let exported = image::load_from_memory(&png).unwrap();
    assert_eq!((exported.width(), exported.height()), (1280, 720));
    assert!(exported.to_rgba8().pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
}

#[test]
fn failures_always_settle_loading() {
    let failures = vec![
        GenerateError::Transport("Failed to fetch".into()),
        GenerateError::Http { status: 400, body: r#"{"error":{"code":400,"message":"API key not valid."}}"#.into() },
        GenerateError::MissingApiKey,
        GenerateError::NoContent,
    ];

    let mut controller = Controller::new();
    for failure in failures {
        let ticket = controller.begin_generation("a cat").unwrap();
        assert!(controller.is_loading());
        let settlement = controller.complete_generation(ticket.request_id, Err(failure));
        assert!(matches!(settlement, Settlement::Failed(_)));
        assert!(!controller.is_loading());
        assert_eq!(controller.state().phase(), RequestPhase::Error);
        assert!(controller.snapshot().show_error_modal);
    }

    assert_eq!(controller.snapshot().error_message, "Failed to generate image. No content returned from the model.");
}

#[test]
fn http_failure_shows_service_message() {
    let mut controller = Controller::new();
    let ticket = controller.begin_generation("a cat").unwrap();
    let settlement = controller.complete_generation(
        ticket.request_id,
        Err(GenerateError::Http { status: 429, body: r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#.into() }),
    );
    let Settlement::Failed(raw) = settlement else {
        panic!("expected a failure");
    };
    assert_eq!(parse_error(&raw), "Quota exceeded");
    assert_eq!(controller.snapshot().error_message, "Quota exceeded");
}

#[test]
fn undecodable_image_is_an_error() {
    let mut controller = Controller::new();
    let ticket = controller.begin_generation("a cat").unwrap();
    let response = GenerateContentResponse::from_json(
        r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"aGVsbG8="}}]}}]}"#,
    )
    .unwrap();
    let settlement = controller.complete_generation(ticket.request_id, Ok(response));
    assert!(matches!(settlement, Settlement::Failed(_)));
    assert!(controller.background().is_none());
    assert!(!controller.is_loading());
}

#[test]
fn pretty_printed_service_error_shows_its_message() {
    let mut controller = Controller::new();
    let ticket = controller.begin_generation("a cat").unwrap();
    let body = "{\n  \"error\": {\n    \"code\": 400,\n    \"message\": \"API key not valid. Please pass a valid API key.\",\n    \"status\": \"INVALID_ARGUMENT\"\n  }\n}\n";
    controller.complete_generation(ticket.request_id, Err(GenerateError::http(400, body.to_string())));
    assert_eq!(controller.snapshot().error_message, "API key not valid. Please pass a valid API key.");
}
