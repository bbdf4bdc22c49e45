use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;
use tracing::warn;

use super::GraphModel;
use super::frames::FrameSelection;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    VertexChange,
    FramesChange,
    VertexHighlight,
    VertexToggle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    VertexChange,
    FramesChange(FrameSelection),
    /// Every currently highlighted vertex name.
    VertexHighlight(Vec<String>),
    /// Every currently toggled vertex name.
    VertexToggle(Vec<String>),
}

impl ModelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::VertexChange => EventKind::VertexChange,
            Self::FramesChange(_) => EventKind::FramesChange,
            Self::VertexHighlight(_) => EventKind::VertexHighlight,
            Self::VertexToggle(_) => EventKind::VertexToggle,
        }
    }
}

#[derive(Debug, Error)]
pub enum ListenerFailure {
    #[error("listener rejected event: {0}")]
    Rejected(String),
    #[error("listener panicked: {0}")]
    Panicked(String),
    #[error("listener is already handling an event")]
    Busy,
}

pub trait ModelListener {
    fn fire(&mut self, event: &ModelEvent, model: &GraphModel) -> Result<(), ListenerFailure>;
}

impl<F> ModelListener for F
where
    F: FnMut(&ModelEvent, &GraphModel) -> Result<(), ListenerFailure>,
{
    fn fire(&mut self, event: &ModelEvent, model: &GraphModel) -> Result<(), ListenerFailure> {
        self(event, model)
    }
}

pub type SharedListener = Rc<RefCell<dyn ModelListener>>;

#[derive(Default)]
pub(super) struct ListenerRegistry {
    vertex_change: Vec<SharedListener>,
    frames: Vec<SharedListener>,
    highlight: Vec<SharedListener>,
    toggle: Vec<SharedListener>,
}

impl ListenerRegistry {
    pub(super) fn add(&mut self, kind: EventKind, listener: SharedListener) {
        self.slot_mut(kind).push(listener);
    }

    pub(super) fn for_kind(&self, kind: EventKind) -> &[SharedListener] {
        match kind {
            EventKind::VertexChange => &self.vertex_change,
            EventKind::FramesChange => &self.frames,
            EventKind::VertexHighlight => &self.highlight,
            EventKind::VertexToggle => &self.toggle,
        }
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut Vec<SharedListener> {
        match kind {
            EventKind::VertexChange => &mut self.vertex_change,
            EventKind::FramesChange => &mut self.frames,
            EventKind::VertexHighlight => &mut self.highlight,
            EventKind::VertexToggle => &mut self.toggle,
        }
    }
}

/// Delivers `event` to every listener in registration order. Failures are
/// logged and counted; they never stop delivery to the rest.
pub(super) fn dispatch(
    listeners: &[SharedListener],
    event: &ModelEvent,
    model: &GraphModel,
) -> usize {
    let mut failures = 0;

    for (position, listener) in listeners.iter().enumerate() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let Ok(mut listener) = listener.try_borrow_mut() else {
                return Err(ListenerFailure::Busy);
            };
            listener.fire(event, model)
        }))
        .unwrap_or_else(|payload| Err(ListenerFailure::Panicked(panic_message(payload.as_ref()))));

        if let Err(failure) = outcome {
            failures += 1;
            warn!(kind = ?event.kind(), listener = position, %failure, "model listener failed");
        }
    }

    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
