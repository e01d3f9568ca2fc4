// Display coordinator module
// The actor that owns all view state. Window input, configure notifications and
// finished image loads arrive as events on one channel and are handled one at a
// time, so nothing here needs locking.

use crate::error::ViewerError;
use crate::geometry::{clamp_origin, visible_size, wrap_index, Point, Size};
use crate::image_loader::{Displayable, ImageLoader, ImageSource, LoadResult};
use crate::surface::DisplaySurface;
use anyhow::{Context, Result};
use log::{debug, error, info, trace, warn};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

/// Title shown once every image has failed to load
pub const NO_IMAGES_TITLE: &str = "No images available";

/// Direction of a single keyboard pan step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Origin delta for one step of `increment` pixels. Window y grows downwards.
    pub fn delta(self, increment: i32) -> (i32, i32) {
        match self {
            Direction::Left => (-increment, 0),
            Direction::Right => (increment, 0),
            Direction::Up => (0, -increment),
            Direction::Down => (0, increment),
        }
    }
}

/// Everything the coordinator reacts to
#[derive(Debug, Clone)]
pub enum Event {
    /// A loader finished (successfully or not)
    LoadCompleted(LoadResult),
    Previous,
    Next,
    /// Jump to an absolute index; wrapped into range
    Navigate(i64),
    StepPan(Direction),
    DragStart(Point),
    DragMove(Point),
    DragEnd(Point),
    ResizeToFit,
    /// The window's size changed. Redrawing waits for the following `Expose`.
    ViewportChanged(Size),
    /// The window needs repainting
    Expose,
    Quit,
}

/// Whether the loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Settings fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    pub initial_viewport: Size,
    /// Pixels moved by one keyboard pan step
    pub step: u32,
    /// Resize the window to the first image shown
    pub auto_resize: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_viewport: Size::new(600, 600),
            step: 20,
            auto_resize: false,
        }
    }
}

/// Load status of one image
#[derive(Debug, Clone)]
pub enum SlotState {
    Unrequested,
    Loading,
    Ready {
        image: Displayable,
        width: u32,
        height: u32,
        name: String,
    },
    Failed,
}

impl SlotState {
    fn label(&self) -> &'static str {
        match self {
            SlotState::Unrequested => "unrequested",
            SlotState::Loading => "loading",
            SlotState::Ready { .. } => "ready",
            SlotState::Failed => "failed",
        }
    }
}

#[derive(Debug)]
struct Slot {
    source: ImageSource,
    state: SlotState,
}

/// Pointer position and pan origin captured when a drag started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PanDrag {
    start: Point,
    origin_at_start: Point,
}

/// The display-coordination engine
pub struct Coordinator<S, L> {
    slots: Vec<Slot>,
    current: usize,
    origin: Point,
    viewport: Size,
    drag: Option<PanDrag>,
    step: i32,
    auto_resize_pending: bool,
    degraded: bool,
    surface: S,
    loader: L,
}

impl<S: DisplaySurface, L: ImageLoader> Coordinator<S, L> {
    /// Build a coordinator over `sources`. Fails when there is nothing to show.
    pub fn new(
        sources: Vec<ImageSource>,
        config: ViewerConfig,
        surface: S,
        loader: L,
    ) -> Result<Self, ViewerError> {
        if sources.is_empty() {
            return Err(ViewerError::EmptyImageSet);
        }

        let slots = sources
            .into_iter()
            .map(|source| Slot {
                source,
                state: SlotState::Unrequested,
            })
            .collect();

        Ok(Self {
            slots,
            current: 0,
            origin: Point::ORIGIN,
            viewport: config.initial_viewport,
            drag: None,
            step: config.step.min(i32::MAX as u32) as i32,
            auto_resize_pending: config.auto_resize,
            degraded: false,
            surface,
            loader,
        })
    }

    /// Process events until `Quit` arrives or every sender is gone.
    ///
    /// Shows the first image before blocking on the intake.
    pub fn run(mut self, intake: Receiver<Event>) -> Self {
        debug!("Coordinator: starting event loop with {} images", self.slots.len());
        self.navigate(0, true);

        loop {
            let event = match intake.recv() {
                Ok(event) => event,
                Err(_) => {
                    info!("Coordinator: intake closed, shutting down");
                    break;
                }
            };

            if self.handle(event) == Flow::Quit {
                info!("Coordinator: quit requested");
                break;
            }
        }

        self.surface.close();
        self
    }

    /// Apply one event to the view state
    pub fn handle(&mut self, event: Event) -> Flow {
        trace!("Coordinator: handling {:?}", event);
        match event {
            Event::LoadCompleted(result) => self.load_completed(result),
            Event::Previous => self.navigate(self.current as i64 - 1, false),
            Event::Next => self.navigate(self.current as i64 + 1, true),
            Event::Navigate(target) => self.navigate(target, true),
            Event::StepPan(direction) => {
                let (dx, dy) = direction.delta(self.step);
                self.pan_to(self.origin.offset(dx, dy));
            }
            Event::DragStart(pt) => {
                self.drag = Some(PanDrag {
                    start: pt,
                    origin_at_start: self.origin,
                });
            }
            Event::DragMove(pt) => match self.drag {
                Some(drag) => {
                    let target = drag.origin_at_start.offset(
                        drag.start.x.saturating_sub(pt.x),
                        drag.start.y.saturating_sub(pt.y),
                    );
                    self.pan_to(target);
                }
                None => debug!("Coordinator: drag move without an active drag, ignoring"),
            },
            Event::DragEnd(_) => self.drag = None,
            Event::ResizeToFit => self.resize_to_fit(),
            Event::ViewportChanged(size) => {
                debug!("Coordinator: viewport is now {}x{}", size.width, size.height);
                self.viewport = size;
            }
            Event::Expose => self.present_current(),
            Event::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Make `target` (wrapped) the current slot, skipping failed slots.
    ///
    /// `forward` decides which way failed slots are skipped. After one full lap
    /// of failed slots the viewer is degraded and stops rendering.
    fn navigate(&mut self, target: i64, forward: bool) {
        let len = self.slots.len();
        let mut index = wrap_index(target, len);

        for _ in 0..len {
            if !matches!(self.slots[index].state, SlotState::Failed) {
                self.show_slot(index);
                return;
            }
            debug!("Coordinator: skipping failed slot {}", index);
            let step = if forward { 1 } else { -1 };
            index = wrap_index(index as i64 + step, len);
        }

        self.enter_degraded();
    }

    fn show_slot(&mut self, index: usize) {
        self.current = index;
        self.origin = Point::ORIGIN;

        if matches!(self.slots[index].state, SlotState::Unrequested) {
            self.slots[index].state = SlotState::Loading;
            info!(
                "Coordinator: requesting load of slot {} ({})",
                index,
                self.slots[index].source.path.display()
            );
            self.loader.request_load(index, &self.slots[index].source.path);
        }

        self.present_current();
    }

    /// Put the current slot on screen according to its state
    fn present_current(&mut self) {
        if self.degraded {
            return;
        }

        let slot = &self.slots[self.current];
        match &slot.state {
            SlotState::Ready {
                image,
                width,
                height,
                name,
            } => {
                let image = image.clone();
                let image_size = Size::new(*width, *height);
                let title = format!("{} ({}x{})", name, width, height);

                if self.auto_resize_pending {
                    self.auto_resize_pending = false;
                    debug!("Coordinator: auto-resizing to {}x{}", width, height);
                    self.surface.resize(image_size.width, image_size.height);
                }

                self.origin = clamp_origin(self.origin, image_size, self.viewport);
                self.surface.render(
                    &image,
                    self.origin,
                    visible_size(image_size, self.viewport),
                );
                self.surface.set_title(&title);
            }
            SlotState::Unrequested | SlotState::Loading => {
                let title = format!("{} - Loading...", slot.source.name);
                self.surface.set_title(&title);
                self.surface.clear();
            }
            SlotState::Failed => {
                let title = format!("{} - Failed to load", slot.source.name);
                self.surface.set_title(&title);
                self.surface.clear();
            }
        }
    }

    fn enter_degraded(&mut self) {
        if !self.degraded {
            warn!("Coordinator: every image failed to load");
            self.degraded = true;
        }
        self.drag = None;
        self.surface.set_title(NO_IMAGES_TITLE);
        self.surface.clear();
    }

    fn load_completed(&mut self, result: LoadResult) {
        let Some(slot) = self.slots.get_mut(result.slot) else {
            warn!("Coordinator: load result for unknown slot {}", result.slot);
            return;
        };

        if !matches!(slot.state, SlotState::Loading) {
            warn!(
                "Coordinator: ignoring load result for slot {} which is {}",
                result.slot,
                slot.state.label()
            );
            return;
        }

        slot.state = match result.image {
            Some(image) => {
                debug!(
                    "Coordinator: slot {} ready ({}x{})",
                    result.slot, result.width, result.height
                );
                SlotState::Ready {
                    image,
                    width: result.width,
                    height: result.height,
                    name: result.name,
                }
            }
            None => {
                warn!("Coordinator: slot {} failed to load", result.slot);
                SlotState::Failed
            }
        };

        let all_failed = self
            .slots
            .iter()
            .all(|slot| matches!(slot.state, SlotState::Failed));
        if all_failed {
            self.enter_degraded();
        } else if result.slot == self.current {
            self.origin = Point::ORIGIN;
            self.present_current();
        }
    }

    /// Move the pan origin (clamped) and redraw. Only a ready image can pan.
    fn pan_to(&mut self, target: Point) {
        if self.degraded {
            return;
        }
        let size = match &self.slots[self.current].state {
            SlotState::Ready { width, height, .. } => Size::new(*width, *height),
            _ => return,
        };
        self.origin = clamp_origin(target, size, self.viewport);
        self.present_current();
    }

    fn resize_to_fit(&mut self) {
        match &self.slots[self.current].state {
            SlotState::Ready { width, height, .. } if !self.degraded => {
                self.surface.resize(*width, *height);
            }
            _ => debug!("Coordinator: nothing loaded to resize to"),
        }
    }
}

/// Read-only views of the coordinator state
#[cfg(test)]
impl<S, L> Coordinator<S, L> {
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn slot_state(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index).map(|slot| &slot.state)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

/// Handle to a coordinator running on its own thread
pub struct CoordinatorActor {
    thread_handle: Option<JoinHandle<()>>,
}

impl CoordinatorActor {
    /// Spawn `coordinator` on a background thread reading from `intake`
    pub fn spawn<S, L>(coordinator: Coordinator<S, L>, intake: Receiver<Event>) -> Result<Self>
    where
        S: DisplaySurface + Send + 'static,
        L: ImageLoader + Send + 'static,
    {
        let thread_handle = thread::Builder::new()
            .name("coordinator".to_string())
            .spawn(move || {
                coordinator.run(intake);
            })
            .context("Failed to spawn coordinator thread")?;

        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    /// Wait for the coordinator thread to finish
    pub fn join(mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("Coordinator thread panicked");
            }
        }
    }
}
