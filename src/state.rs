use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::stroke::PenColor;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Photorealistic,
    Cartoon,
    Watercolor,
    PixelArt,
    MinimalistLineArt,
    Render3D,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Photorealistic,
        Style::Cartoon,
        Style::Watercolor,
        Style::PixelArt,
        Style::MinimalistLineArt,
        Style::Render3D,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Style::Photorealistic => "Photorealistic",
            Style::Cartoon => "Cartoon",
            Style::Watercolor => "Watercolor",
            Style::PixelArt => "Pixel Art",
            Style::MinimalistLineArt => "Minimalist Line Art",
            Style::Render3D => "3D Render",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .iter()
            .copied()
            .find(|style| style.label() == label)
            .ok_or_else(|| format!("unknown style: {label}"))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RequestPhase {
    #[default]
    Idle,
    Loading { request_id: u64 },
    Success,
    Error,
}

pub struct AppState {
    pen_color: PenColor,
    style: Style,
    style_dropdown_open: bool,
    phase: RequestPhase,
    error_message: String,
    show_error_modal: bool,
    last_message: Option<String>,
    has_generated_image: bool,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            pen_color: PenColor::BLACK,
            style: Style::default(),
            style_dropdown_open: false,
            phase: RequestPhase::Idle,
            error_message: String::new(),
            show_error_modal: false,
            last_message: None,
            has_generated_image: false,
        }
    }

    pub fn pen_color(&self) -> PenColor {
        self.pen_color
    }

    pub fn set_pen_color(&mut self, value: PenColor) {
        self.pen_color = value;
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn set_style(&mut self, value: Style) {
        self.style = value;
    }

    pub fn is_style_dropdown_open(&self) -> bool {
        self.style_dropdown_open
    }

    pub fn set_style_dropdown_open(&mut self, value: bool) {
        self.style_dropdown_open = value;
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn set_phase(&mut self, value: RequestPhase) {
        self.phase = value;
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, RequestPhase::Loading {..})
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn show_error_modal(&self) -> bool {
        self.show_error_modal
    }

    pub fn raise_error(&mut self, message: String) {
        self.error_message = message;
        self.show_error_modal = true;
    }

    pub fn reset_error(&mut self) {
        self.error_message.clear();
        self.show_error_modal = false;
    }

    pub fn close_error_modal(&mut self) {
        self.show_error_modal = false;
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn set_last_message(&mut self, value: Option<String>) {
        self.last_message = value;
    }

    pub fn has_generated_image(&self) -> bool {
        self.has_generated_image
    }

    pub fn set_has_generated_image(&mut self, value: bool) {
        self.has_generated_image = value;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            pen_color: self.pen_color.to_hex(),
            style: self.style.label(),
            style_dropdown_open: self.style_dropdown_open,
            phase: self.phase,
            loading: self.is_loading(),
            error_message: if self.show_error_modal {
                crate::error::parse_error(&self.error_message)
            } else {
                String::new()
            },
            show_error_modal: self.show_error_modal,
            last_message: self.last_message.clone(),
            has_generated_image: self.has_generated_image,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}

/// What the page needs to render, handed to JS as a plain object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub pen_color: String,
    pub style: &'static str,
    pub style_dropdown_open: bool,
    pub phase: RequestPhase,
    pub loading: bool,
    /// already run through `parse_error`
    pub error_message: String,
    pub show_error_modal: bool,
    pub last_message: Option<String>,
    pub has_generated_image: bool,
}
