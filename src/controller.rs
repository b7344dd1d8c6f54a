use image::{ImageError, RgbaImage};
use log::{error, info, warn};

use crate::error::{GenerateError, SubmitError};
use crate::gemini::{interpret, GenerateContentRequest, GenerateContentResponse, Generation};
use crate::geometry::{PixelRect, Point2D};
use crate::state::{AppState, RequestPhase, StateSnapshot, Style};
use crate::stroke::{InvalidColor, Pen, PenColor, STROKE_WIDTH};
use crate::surface::Surface;

/// A submission that has been accepted and is waiting for its response.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub request_id: u64,
    pub request: GenerateContentRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The response belonged to a request that is no longer the current one.
    Stale,
    /// A new background is in place.
    Generated { placement: Option<PixelRect> },
    /// The raw error text; `parse_error` turns it into dialog text.
    Failed(String),
}

/// Owns the canvas raster, the optional generated background and the UI state,
/// and applies every user action to them.
pub struct Controller {
    surface: Surface,
    background: Option<RgbaImage>,
    pen: Pen,
    state: AppState,
    next_request_id: u64,
}

impl Controller {
    pub fn new() -> Self {
        Controller {
            surface: Surface::new(),
            background: None,
            pen: Pen::new(),
            state: AppState::new(),
            next_request_id: 1,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn background(&self) -> Option<&RgbaImage> {
        self.background.as_ref()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_drawing()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn pointer_down(&mut self, at: Point2D) {
        self.pen.pen_down(at);
    }

    /// Extend the current stroke; returns the repainted area.
    pub fn pointer_move(&mut self, to: Point2D) -> Option<PixelRect> {
        let segment = self.pen.pen_move(to)?;
        self.surface.stroke_segment(&segment, self.state.pen_color(), STROKE_WIDTH)
    }

    pub fn pointer_up(&mut self) {
        self.pen.pen_up();
    }

    pub fn clear(&mut self) {
        self.surface.fill_white();
        self.background = None;
        self.state.set_has_generated_image(false);
        self.state.set_last_message(None);
        info!("canvas cleared");
    }

    pub fn set_pen_color(&mut self, value: &str) -> Result<(), InvalidColor> {
        let color: PenColor = value.parse()?;
        self.state.set_pen_color(color);
        info!("Color changed to ={}", color);
        Ok(())
    }

    pub fn toggle_style_dropdown(&mut self) {
        let open = self.state.is_style_dropdown_open();
        self.state.set_style_dropdown_open(!open);
    }

    pub fn select_style(&mut self, style: Style) {
        self.state.set_style(style);
        self.state.set_style_dropdown_open(false);
        info!("style changed to {}", style);
    }

    pub fn dismiss_error(&mut self) {
        self.state.close_error_modal();
    }

    /// Accept a submission: flatten the drawing and build the request.
    /// Only one request may be outstanding; it is identified by the ticket's id.
    pub fn begin_generation(&mut self, prompt: &str) -> Result<GenerationTicket, SubmitError> {
        if prompt.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        if self.state.is_loading() {
            warn!("generation already in flight; submission ignored");
            return Err(SubmitError::AlreadyLoading);
        }

        self.state.reset_error();

        let png = match self.surface.flatten_png() {
            Ok(png) => png,
            Err(err) => {
                error!("Error submitting drawing: {err}");
                let message = err.to_string();
                self.state.raise_error(message.clone());
                self.state.set_phase(RequestPhase::Error);
                return Err(SubmitError::Encode(message));
            }
        };

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.state.set_phase(RequestPhase::Loading { request_id });

        info!("Sending prompt and image to Gemini... (request {request_id})");
        let request = GenerateContentRequest::from_drawing(&png, prompt, self.state.style());
        Ok(GenerationTicket { request_id, request })
    }

    /// Settle request `request_id`. Anything but the in-flight request is dropped.
    pub fn complete_generation(
        &mut self,
        request_id: u64,
        outcome: Result<GenerateContentResponse, GenerateError>,
    ) -> Settlement {
        match self.state.phase() {
            RequestPhase::Loading { request_id: current } if current == request_id => {}
            phase => {
                warn!("dropping response for request {request_id}; current phase is {:?}", phase);
                return Settlement::Stale;
            }
        }

        let decoded = outcome
            .and_then(|response| interpret(&response))
            .and_then(|generation| {
                let image = generation.decode_image()?;
                Ok::<(Generation, RgbaImage), GenerateError>((generation, image))
            });

        match decoded {
            Ok((generation, image)) => {
                let placement = self.surface.draw_background(&image);
                info!("generated image {}x{}", image.width(), image.height());
                self.background = Some(image);
                self.state.set_has_generated_image(true);
                self.state.set_last_message(generation.message);
                self.state.set_phase(RequestPhase::Success);
                Settlement::Generated { placement }
            }
            Err(err) => {
                error!("Error submitting drawing: {err}");
                let message = err.to_string();
                self.state.raise_error(message.clone());
                self.state.set_phase(RequestPhase::Error);
                Settlement::Failed(message)
            }
        }
    }

    /// PNG bytes for the download action.
    pub fn export_png(&self) -> Result<Vec<u8>, ImageError> {
        let background = self.background.as_ref().map(|image| image.dimensions());
        self.surface.export_png(background)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new()
    }
}
