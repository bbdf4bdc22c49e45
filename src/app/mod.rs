use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{error, info};

use crate::config::LayoutOptions;
use crate::dataset::load_dataset;
use crate::model::{FrameSelection, Topology};
use crate::views::Extent;

mod controls;
mod details;
mod session;

use session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ViewKind {
    Bundle,
    Force,
}

impl ViewKind {
    fn label(self) -> &'static str {
        match self {
            Self::Bundle => "Hierarchical bundle",
            Self::Force => "Force layout",
        }
    }
}

/// Everything the host needs to (re)build a session.
#[derive(Clone, Debug)]
pub struct Launch {
    pub dataset: PathBuf,
    pub extent: Extent,
    pub view: ViewKind,
    pub layout: LayoutOptions,
    pub frames: Option<FrameSelection>,
}

pub struct FlareviewApp {
    launch: Launch,
    state: AppState,
    reload_rx: Option<Receiver<Result<Topology, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Topology, String>>,
    },
    Ready(Box<Session>),
    Error(String),
}

impl FlareviewApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, launch: Launch) -> Self {
        let state = Self::start_load(&launch);
        Self {
            launch,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(dataset: PathBuf) -> Receiver<Result<Topology, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_dataset(&dataset).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(launch: &Launch) -> AppState {
        info!(dataset = %launch.dataset.display(), "loading dataset");
        AppState::Loading {
            rx: Self::spawn_load(launch.dataset.clone()),
        }
    }

    fn ready_state(&self, result: Result<Topology, String>) -> AppState {
        let outcome = result.and_then(|topology| {
            Session::new(topology, &self.launch).map_err(|error| format!("{error:#}"))
        });
        match outcome {
            Ok(session) => AppState::Ready(Box::new(session)),
            Err(message) => {
                error!(%message, "dataset could not be shown");
                AppState::Error(message)
            }
        }
    }
}

impl eframe::App for FlareviewApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(result),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading {}...", self.launch.dataset.display()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(session) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                session.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.launch.dataset.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err("background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if retry {
            self.state = Self::start_load(&self.launch);
        } else if let Some(result) = transition {
            self.reload_rx = None;
            self.state = self.ready_state(result);
        }
    }
}
