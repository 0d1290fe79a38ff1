//! Chart Viewer Widget
//! Central panel showing the current figure, a selection hint or an error.

use crate::charts::{ChartPlotter, Figure, FigureBody, StaticChartRenderer};
use egui::{Color32, RichText, TextureHandle};
use tracing::warn;

const CARD_HEIGHT: f32 = 520.0;
const BITMAP_WIDTH: u32 = 960;
const BITMAP_HEIGHT: u32 = 640;

#[derive(Default)]
enum ViewerState {
    #[default]
    Empty,
    /// The selection is incomplete.
    Hint(String),
    Error(String),
    Figure(Figure),
}

/// Displays one figure at a time. 3D figures are rendered once into a
/// texture and reused until the figure changes.
#[derive(Default)]
pub struct ChartViewer {
    state: ViewerState,
    texture: Option<TextureHandle>,
    render_error: Option<String>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.set_state(ViewerState::Empty);
    }

    pub fn set_hint(&mut self, hint: impl Into<String>) {
        self.set_state(ViewerState::Hint(hint.into()));
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.set_state(ViewerState::Error(error.into()));
    }

    pub fn set_figure(&mut self, figure: Figure) {
        self.set_state(ViewerState::Figure(figure));
    }

    fn set_state(&mut self, state: ViewerState) {
        self.state = state;
        self.texture = None;
        self.render_error = None;
    }

    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        match &self.state {
            ViewerState::Empty => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No Data").size(20.0));
                });
            }
            ViewerState::Hint(hint) => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new(hint).size(16.0).color(Color32::GRAY));
                });
            }
            ViewerState::Error(error) => {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new(error)
                            .size(16.0)
                            .color(Color32::from_rgb(220, 53, 69)),
                    );
                });
            }
            ViewerState::Figure(figure) => {
                if matches!(figure.body, FigureBody::Volume(_))
                    && self.texture.is_none()
                    && self.render_error.is_none()
                {
                    match StaticChartRenderer::render(figure, BITMAP_WIDTH, BITMAP_HEIGHT) {
                        Ok(image) => {
                            let color_image = egui::ColorImage::from_rgb(
                                [image.width as usize, image.height as usize],
                                &image.pixels,
                            );
                            self.texture = Some(ctx.load_texture(
                                format!("volume_{}", figure.kind.id()),
                                color_image,
                                egui::TextureOptions::LINEAR,
                            ));
                        }
                        Err(e) => {
                            warn!(kind = figure.kind.id(), error = %e, "3D render failed");
                            self.render_error = Some(e.to_string());
                        }
                    }
                }
                Self::draw_card(ui, figure, self.texture.as_ref(), self.render_error.as_deref());
            }
        }
    }

    fn draw_card(
        ui: &mut egui::Ui,
        figure: &Figure,
        texture: Option<&TextureHandle>,
        render_error: Option<&str>,
    ) {
        egui::Frame::none()
            .rounding(8.0)
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(RichText::new(&figure.title).size(18.0).strong());
                ui.add_space(8.0);

                if let FigureBody::Volume(_) = figure.body {
                    if let Some(error) = render_error {
                        ui.label(
                            RichText::new(error)
                                .size(14.0)
                                .color(Color32::from_rgb(220, 53, 69)),
                        );
                    } else if let Some(texture) = texture {
                        let size = texture.size_vec2();
                        let scale = (ui.available_width() / size.x).min(1.0);
                        ui.add(egui::Image::new(egui::load::SizedTexture::new(
                            texture.id(),
                            size * scale,
                        )));
                    }
                } else {
                    ChartPlotter::draw(ui, figure, CARD_HEIGHT);
                }
            });
    }
}
