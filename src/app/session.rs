use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Align, Context, Layout, Ui};
use tracing::warn;

use crate::model::{FrameSelection, GraphModel, Topology};
use crate::views::{ForceLayoutView, HierarchicalBundleView, ViewAction, ViewMount};

use super::{Launch, ViewKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum FrameMode {
    Single,
    Range,
}

/// One loaded dataset: the model, both mounted views and the control state.
pub(super) struct Session {
    pub(super) model: GraphModel,
    pub(super) bundle: Rc<RefCell<HierarchicalBundleView>>,
    pub(super) force: Rc<RefCell<ForceLayoutView>>,
    pub(super) active_view: ViewKind,
    pub(super) frame_mode: FrameMode,
    pub(super) frame_begin: usize,
    pub(super) frame_end: usize,
    pub(super) search: String,
    pub(super) last_error: Option<String>,
}

impl Session {
    pub(super) fn new(topology: Topology, launch: &Launch) -> Result<Self> {
        let mut model = GraphModel::new(topology).context("dataset cannot be shown")?;
        let bundle = HierarchicalBundleView::mount(
            &mut model,
            ViewMount::new("bundle", launch.extent),
            launch.layout.bundle.clone(),
        );
        let force = ForceLayoutView::mount(
            &mut model,
            ViewMount::new("force", launch.extent),
            launch.layout.force.clone(),
        );

        if let Some(selection) = launch.frames {
            model
                .set_frames(selection)
                .with_context(|| format!("--frames {selection}"))?;
        }

        let (frame_mode, (frame_begin, frame_end)) = match model.frames() {
            selection @ FrameSelection::Single { .. } => (FrameMode::Single, selection.bounds()),
            selection @ FrameSelection::Range { .. } => (FrameMode::Range, selection.bounds()),
        };

        Ok(Self {
            model,
            bundle,
            force,
            active_view: launch.view,
            frame_mode,
            frame_begin,
            frame_end,
            search: String::new(),
            last_error: None,
        })
    }

    pub(super) fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_reloading: bool) {
        let mut next_view = self.active_view;
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("flareview");
                    ui.separator();
                    ui.label(format!("vertices: {}", self.model.vertices().len()));
                    ui.label(format!("edges: {}", self.model.edges().len()));
                    ui.label(format!("frames: {}", self.model.total_frames()));
                    ui.separator();
                    for kind in [ViewKind::Bundle, ViewKind::Force] {
                        ui.selectable_value(&mut next_view, kind, kind.label());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let reload_button =
                            ui.add_enabled(!is_reloading, egui::Button::new("Reload dataset"));
                        if reload_button.clicked() {
                            *reload_requested = true;
                        }
                    });
                });
            });
        self.switch_view(next_view);

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                let actions = self.draw_active_view(ui);
                self.apply_actions(actions);
            });
        });
    }

    /// Hidden views never see the pointer leave, so the outgoing view drops
    /// its hover highlight here.
    pub(super) fn switch_view(&mut self, view: ViewKind) {
        if view == self.active_view {
            return;
        }

        let actions = match self.active_view {
            ViewKind::Bundle => self.bundle.borrow_mut().clear_hover(),
            ViewKind::Force => self.force.borrow_mut().clear_hover(),
        };
        self.active_view = view;
        self.apply_actions(actions);
    }

    fn draw_active_view(&mut self, ui: &mut Ui) -> Vec<ViewAction> {
        match self.active_view {
            ViewKind::Bundle => self.bundle.borrow_mut().show(ui, &self.model),
            ViewKind::Force => self.force.borrow_mut().show(ui, &self.model),
        }
    }

    /// The view borrow must be released before applying, since the model
    /// notifies the views synchronously.
    pub(super) fn apply_actions(&mut self, actions: Vec<ViewAction>) {
        for action in actions {
            if let Err(error) = action.apply(&mut self.model) {
                warn!(?action, %error, "view action rejected");
                self.last_error = Some(error.to_string());
            }
        }
    }

    pub(super) fn apply_frames(&mut self) {
        let last = self.model.total_frames().saturating_sub(1);
        self.frame_begin = self.frame_begin.min(last);
        self.frame_end = self.frame_end.clamp(self.frame_begin, last);

        let selection = match self.frame_mode {
            FrameMode::Single => FrameSelection::Single {
                frame: self.frame_begin,
            },
            FrameMode::Range => FrameSelection::Range {
                begin: self.frame_begin,
                end: self.frame_end,
            },
        };
        if selection == self.model.frames() {
            return;
        }

        match self.model.set_frames(selection) {
            Ok(()) => self.last_error = None,
            Err(error) => {
                warn!(%error, "frame selection rejected");
                self.last_error = Some(error.to_string());
            }
        }
    }
}
