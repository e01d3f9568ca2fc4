// Wayland integration module
// Window, input and painting for the viewer using smithay-client-toolkit

use crate::coordinator::{Event, ViewerConfig};
use crate::geometry::{center_offset, Point, Size};
use crate::image_loader::{Displayable, ImageData};
use crate::keybindings;
use crate::surface::SurfaceCommand;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_output, delegate_pointer, delegate_registry,
    delegate_seat, delegate_shm, delegate_xdg_shell, delegate_xdg_window,
    output::{OutputHandler, OutputState},
    reexports::{
        calloop::{
            channel::{self, Channel},
            EventLoop,
        },
        calloop_wayland_source::WaylandSource,
    },
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        xdg::{
            window::{Window, WindowConfigure, WindowDecorations, WindowHandler},
            XdgShell,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use std::sync::mpsc::Sender;
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};

/// Mouse button constants
const BTN_LEFT: u32 = 272;

/// Minimum window size
pub const MIN_SIZE: u32 = 50;

/// Maximum window size to prevent buffer allocation failures
pub const MAX_SIZE: u32 = 8192;

/// Background behind and around the image (BGRA)
const BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Every window title starts with this
const TITLE_PREFIX: &str = "wimgv :: ";

/// Main Wayland application state
struct WaylandApp {
    // Registry state
    registry_state: RegistryState,
    // Seat state for input handling
    seat_state: SeatState,
    // Output state for display info
    output_state: OutputState,
    // Shared memory for buffer allocation
    shm: Shm,

    // Where input and window events go
    intake: Sender<Event>,
    should_exit: bool,

    // Surface and buffer management
    window: Window,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,

    // What the coordinator last asked us to show
    image: Option<Displayable>,
    origin: Point,
    region: Size,

    // Pointer state
    pointer_pos: (f64, f64),
    dragging: bool,
}

impl WaylandApp {
    /// Create a new Wayland application
    fn new(
        registry_state: RegistryState,
        seat_state: SeatState,
        output_state: OutputState,
        shm: Shm,
        window: Window,
        intake: Sender<Event>,
        initial: Size,
    ) -> Self {
        Self {
            registry_state,
            seat_state,
            output_state,
            shm,
            intake,
            should_exit: false,
            window,
            pool: None,
            buffer: None,
            width: initial.width.clamp(MIN_SIZE, MAX_SIZE),
            height: initial.height.clamp(MIN_SIZE, MAX_SIZE),
            configured: false,
            image: None,
            origin: Point::ORIGIN,
            region: Size::default(),
            pointer_pos: (0.0, 0.0),
            dragging: false,
        }
    }

    /// Forward an event to the coordinator. Exits when it is no longer listening.
    fn send(&mut self, event: Event) {
        if self.intake.send(event).is_err() {
            warn!("Coordinator is gone, closing the window");
            self.should_exit = true;
        }
    }

    fn viewport(&self) -> Size {
        Size::new(self.width, self.height)
    }

    fn pointer_point(&self) -> Point {
        Point::new(self.pointer_pos.0 as i32, self.pointer_pos.1 as i32)
    }

    /// Apply a command coming from the coordinator
    fn apply(&mut self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::Render {
                image,
                origin,
                size,
            } => {
                self.image = Some(image);
                self.origin = origin;
                self.region = size;
                self.draw();
            }
            SurfaceCommand::Resize(size) => {
                let width = size.width.clamp(MIN_SIZE, MAX_SIZE);
                let height = size.height.clamp(MIN_SIZE, MAX_SIZE);
                if (width, height) != (self.width, self.height) {
                    info!("Resizing window to {}x{}", width, height);
                    self.width = width;
                    self.height = height;
                    // Reset pool to force buffer recreation
                    self.pool = None;
                    let viewport = self.viewport();
                    self.send(Event::ViewportChanged(viewport));
                    self.send(Event::Expose);
                }
            }
            SurfaceCommand::SetTitle(title) => {
                self.window.set_title(format!("{}{}", TITLE_PREFIX, title));
            }
            SurfaceCommand::Clear => {
                self.image = None;
                self.draw();
            }
            SurfaceCommand::Close => {
                info!("Coordinator closed the display");
                self.should_exit = true;
            }
        }
    }

    /// Paint the current image region into a fresh shared memory buffer
    fn draw(&mut self) {
        if !self.configured {
            return;
        }

        let width = self.width;
        let height = self.height;

        // Calculate buffer size (4 bytes per pixel for ARGB)
        let stride = width as i32 * 4;
        let buffer_size = width as usize * height as usize * 4;

        // Initialize pool if needed
        if self.pool.is_none() {
            match SlotPool::new(buffer_size, &self.shm) {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    error!(
                        "Failed to create slot pool: {}. Buffer size: {} bytes",
                        e, buffer_size
                    );
                    return;
                }
            }
        }

        let Some(pool) = self.pool.as_mut() else {
            return;
        };

        // Resize pool if needed
        if pool.len() < buffer_size {
            if let Err(e) = pool.resize(buffer_size) {
                error!("Failed to resize pool to {} bytes: {}", buffer_size, e);
                self.pool = None;
                return;
            }
        }

        let (buffer, canvas) = match pool.create_buffer(
            width as i32,
            height as i32,
            stride,
            wl_shm::Format::Argb8888,
        ) {
            Ok(buf) => buf,
            Err(e) => {
                error!("Failed to create buffer {}x{}: {}", width, height, e);
                return;
            }
        };

        let canvas_size = Size::new(width, height);
        fill(canvas, BACKGROUND);
        if let Some(image) = &self.image {
            paint_region(canvas, canvas_size, image, self.origin, self.region);
        }

        // Attach and commit
        let surface = self.window.wl_surface();
        if let Err(e) = buffer.attach_to(surface) {
            error!("Failed to attach buffer: {:?}", e);
            return;
        }
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.buffer = Some(buffer);
    }
}

/// Fill the whole canvas with one BGRA color
fn fill(canvas: &mut [u8], color: [u8; 4]) {
    for pixel in canvas.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

/// Blend one BGRA pixel over the background
fn blend(src: &[u8]) -> [u8; 4] {
    let alpha = src[3] as u32;
    let over = |c: u8, bg: u8| ((c as u32 * alpha + bg as u32 * (255 - alpha)) / 255) as u8;
    [
        over(src[0], BACKGROUND[0]),
        over(src[1], BACKGROUND[1]),
        over(src[2], BACKGROUND[2]),
        255,
    ]
}

/// Copy the `region` of `image` starting at `origin` into the canvas, centered
/// when the image is smaller than the canvas. Parts falling outside either the
/// image or the canvas are skipped.
fn paint_region(canvas: &mut [u8], canvas_size: Size, image: &ImageData, origin: Point, region: Size) {
    let dst = center_offset(image.size(), canvas_size);
    let (ox, oy) = (origin.x.max(0) as u32, origin.y.max(0) as u32);
    let (dx, dy) = (dst.x as u32, dst.y as u32);

    let cols = region
        .width
        .min(image.width.saturating_sub(ox))
        .min(canvas_size.width.saturating_sub(dx));
    let rows = region
        .height
        .min(image.height.saturating_sub(oy))
        .min(canvas_size.height.saturating_sub(dy));

    for row in 0..rows {
        let src_start = (((oy + row) * image.width + ox) * 4) as usize;
        let dst_start = (((dy + row) * canvas_size.width + dx) * 4) as usize;
        let len = (cols * 4) as usize;

        let (Some(src), Some(out)) = (
            image.bgra_data.get(src_start..src_start + len),
            canvas.get_mut(dst_start..dst_start + len),
        ) else {
            break;
        };

        for (out_px, src_px) in out.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            out_px.copy_from_slice(&blend(src_px));
        }
    }
}

// Implement required traits for smithay-client-toolkit

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("Scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for WaylandApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl WindowHandler for WaylandApp {
    fn request_close(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _window: &Window) {
        info!("Window close requested");
        self.send(Event::Quit);
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _window: &Window,
        configure: WindowConfigure,
        _serial: u32,
    ) {
        debug!("Window configured: {:?}", configure.new_size);

        // The compositor leaves the choice to us when a dimension is None
        let width = configure
            .new_size
            .0
            .map_or(self.width, |w| w.get().clamp(MIN_SIZE, MAX_SIZE));
        let height = configure
            .new_size
            .1
            .map_or(self.height, |h| h.get().clamp(MIN_SIZE, MAX_SIZE));

        // The first configure always reports the size actually in use
        if !self.configured || (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.pool = None;
            let viewport = self.viewport();
            self.send(Event::ViewportChanged(viewport));
        }

        self.configured = true;

        // Draw what we have now; the coordinator answers the expose with a fresh render
        self.draw();
        self.send(Event::Expose);
    }
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard {
            if let Err(e) = self.seat_state.get_keyboard(qh, &seat, None) {
                error!("Failed to get keyboard: {}", e);
            }
        }
        if capability == Capability::Pointer {
            if let Err(e) = self.seat_state.get_pointer(qh, &seat) {
                error!("Failed to get pointer: {}", e);
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        _capability: Capability,
    ) {
        debug!("Capability removed");
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        debug!("Key pressed: {:?}", event.keysym);

        if let Some(intent) = keybindings::lookup(event.keysym) {
            self.send(intent);
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {
    }
}

impl PointerHandler for WaylandApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            self.pointer_pos = event.position;
            match event.kind {
                PointerEventKind::Enter { .. } => {
                    debug!("Pointer entered");
                }
                PointerEventKind::Leave { .. } => {
                    debug!("Pointer left");
                    if self.dragging {
                        self.dragging = false;
                        let pt = self.pointer_point();
                        self.send(Event::DragEnd(pt));
                    }
                }
                PointerEventKind::Motion { .. } => {
                    if self.dragging {
                        let pt = self.pointer_point();
                        self.send(Event::DragMove(pt));
                    }
                }
                PointerEventKind::Press { button, .. } => {
                    debug!("Pointer button pressed: {}", button);
                    if button == BTN_LEFT {
                        self.dragging = true;
                        let pt = self.pointer_point();
                        self.send(Event::DragStart(pt));
                    }
                }
                PointerEventKind::Release { button, .. } => {
                    if button == BTN_LEFT && self.dragging {
                        self.dragging = false;
                        let pt = self.pointer_point();
                        self.send(Event::DragEnd(pt));
                    }
                }
                PointerEventKind::Axis { .. } => {}
            }
        }
    }
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

// Delegate macros
delegate_compositor!(WaylandApp);
delegate_output!(WaylandApp);
delegate_xdg_shell!(WaylandApp);
delegate_xdg_window!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_pointer!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_registry!(WaylandApp);

/// Run the Wayland window until the coordinator closes it.
///
/// Input and window events are sent to `intake`; display commands are read
/// from `commands`.
pub fn run(config: &ViewerConfig, intake: Sender<Event>, commands: Channel<SurfaceCommand>) -> Result<()> {
    info!("Connecting to Wayland display");

    // Connect to Wayland display
    let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;

    // Initialize registry and event queue
    let (globals, event_queue) =
        registry_queue_init(&conn).context("Failed to initialize registry")?;
    let qh = event_queue.handle();

    let mut event_loop: EventLoop<WaylandApp> =
        EventLoop::try_new().context("Failed to create event loop")?;
    let loop_handle = event_loop.handle();
    WaylandSource::new(conn.clone(), event_queue)
        .insert(loop_handle.clone())
        .map_err(|e| anyhow!("Failed to insert Wayland source: {}", e.error))?;

    // Initialize required globals
    let compositor_state =
        CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
    let xdg_shell = XdgShell::bind(&globals, &qh).context("Failed to bind xdg shell")?;
    let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;

    // Create the window before any image is decoded so the user sees something
    let surface = compositor_state.create_surface(&qh);
    let window = xdg_shell.create_window(surface, WindowDecorations::RequestServer, &qh);
    window.set_title(format!("{}Loading images...", TITLE_PREFIX));
    window.set_app_id("wimgv");
    window.set_min_size(Some((MIN_SIZE, MIN_SIZE)));

    // Commit the surface to trigger configure
    window.commit();

    loop_handle
        .insert_source(commands, |event, _, app: &mut WaylandApp| match event {
            channel::Event::Msg(command) => app.apply(command),
            channel::Event::Closed => {
                debug!("Display command channel closed");
                app.should_exit = true;
            }
        })
        .map_err(|e| anyhow!("Failed to insert display command source: {}", e.error))?;

    // Create application state
    let mut app = WaylandApp::new(
        RegistryState::new(&globals),
        SeatState::new(&globals, &qh),
        OutputState::new(&globals, &qh),
        shm,
        window,
        intake,
        config.initial_viewport,
    );

    info!("Starting event loop");

    // Main event loop
    loop {
        event_loop
            .dispatch(None, &mut app)
            .context("Wayland event loop failed")?;

        if app.should_exit {
            info!("Exiting application");
            break;
        }
    }

    Ok(())
}
