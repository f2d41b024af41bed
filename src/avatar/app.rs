//! eframe application: paints the avatar and drives the conversation once
//! per frame.

use std::time::{Duration, Instant};

use eframe::egui::{self, Align2, Color32, FontId, Shape, Stroke};
use tracing::{error, info};

use super::scene::{box_padding, AvatarShape, Layout, RippleField};
use crate::conversation::{Conversation, ConversationEvent, EventSender, Tick};

pub const WINDOW_TITLE: &str = "Voice Ganga";

const PROJECT_NAME: &str = "VoiceGanga";
const TEAM_NAME: &str = "Made by Team KBM1";
const PROJECT_PART: &str = "Minor Project Part 2";

const BACKGROUND: Color32 = Color32::from_rgb(50, 50, 50);
const AVATAR_COLOR: Color32 = Color32::from_rgb(255, 0, 0);
const HEARD_BOX: Color32 = Color32::from_rgb(80, 80, 80);
const RESPONSE_BOX: Color32 = Color32::from_rgb(70, 70, 70);
const TEXT_COLOR: Color32 = Color32::WHITE;

const TITLE_SIZE: f32 = 32.0;
const BODY_SIZE: f32 = 16.0;

/// Upper bound on the idle frame interval.
const FRAME_INTERVAL: Duration = Duration::from_millis(10);

pub struct GangaApp {
    conversation: Conversation,
    events: EventSender,
    ripples: RippleField,
    closing: bool,
}

impl GangaApp {
    /// `events` is the sending side of the channel the conversation reads,
    /// used to report the window closing.
    pub fn new(conversation: Conversation, events: EventSender) -> Self {
        Self {
            conversation,
            events,
            ripples: RippleField::default(),
            closing: false,
        }
    }

    fn drive(&mut self, ctx: &egui::Context) {
        if self.closing {
            return;
        }
        match self.conversation.tick() {
            Ok(Tick::Exit(reason)) => {
                info!(?reason, "Conversation ended");
                self.close(ctx);
            }
            Ok(_) => {}
            Err(e) => {
                error!("An error occurred in main loop: {e:?}");
                self.close(ctx);
            }
        }
    }

    fn close(&mut self, ctx: &egui::Context) {
        self.closing = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn paint(&self, painter: &egui::Painter, layout: &Layout) {
        let state = self.conversation.state();
        let body = FontId::proportional(BODY_SIZE);

        if state.speaking {
            let galley = painter.layout_no_wrap(state.last_heard.clone(), body.clone(), TEXT_COLOR);
            let rect = Align2::CENTER_CENTER.anchor_size(layout.heard, galley.size());
            painter.rect_filled(rect.expand2(box_padding()), 0.0, HEARD_BOX);
            painter.galley(rect.min, galley, TEXT_COLOR);
        }

        let galley = painter.layout(
            state.last_response.clone(),
            body.clone(),
            TEXT_COLOR,
            layout.response_wrap_width,
        );
        let rect = egui::Rect::from_min_size(layout.response, galley.size());
        painter.rect_filled(rect.expand2(box_padding()), 0.0, RESPONSE_BOX);
        painter.galley(rect.min, galley, TEXT_COLOR);

        painter.text(
            layout.title,
            Align2::CENTER_CENTER,
            PROJECT_NAME,
            FontId::proportional(TITLE_SIZE),
            TEXT_COLOR,
        );
        painter.text(layout.team, Align2::CENTER_CENTER, TEAM_NAME, body.clone(), TEXT_COLOR);
        painter.text(
            layout.project_part,
            Align2::CENTER_CENTER,
            PROJECT_PART,
            body,
            TEXT_COLOR,
        );

        let shape = AvatarShape::centered_at(layout.center);
        painter.rect_filled(shape.body, 0.0, AVATAR_COLOR);
        for triangle in [shape.top, shape.bottom] {
            painter.add(Shape::convex_polygon(
                triangle.to_vec(),
                AVATAR_COLOR,
                Stroke::NONE,
            ));
        }

        for ripple in self.ripples.ripples() {
            let color = Color32::from_rgba_unmultiplied(255, 0, 0, ripple.alpha_u8());
            painter.circle_stroke(ripple.center, ripple.radius, Stroke::new(2.0, color));
        }
    }
}

impl eframe::App for GangaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.closing {
            info!("Window close requested");
            // The receiver may already be gone if the conversation ended.
            let _ = self.events.send(ConversationEvent::ShutdownRequested);
        }

        self.drive(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BACKGROUND))
            .show(ctx, |ui| {
                let layout = Layout::for_size(ui.max_rect().size());
                self.ripples.step(
                    layout.center,
                    self.conversation.state().speaking,
                    Instant::now(),
                );
                self.paint(ui.painter(), &layout);
            });

        ctx.request_repaint_after(FRAME_INTERVAL);
    }
}
