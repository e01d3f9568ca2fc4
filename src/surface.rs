// Display surface module
// The commands the coordinator issues to whatever shows the images

use crate::geometry::{Point, Size};
use crate::image_loader::Displayable;
use log::warn;
use smithay_client_toolkit::reexports::calloop::channel::Sender;

/// Output side of the coordinator
pub trait DisplaySurface {
    /// Paint the `size` region of `image` starting at `origin` (image coordinates)
    fn render(&mut self, image: &Displayable, origin: Point, size: Size);
    /// Resize the window to exactly these dimensions
    fn resize(&mut self, width: u32, height: u32);
    fn set_title(&mut self, title: &str);
    /// Blank the window
    fn clear(&mut self);
    /// Tear the surface down; sent once when the coordinator stops
    fn close(&mut self);
}

/// A display command in transit to the Wayland thread
#[derive(Debug, Clone)]
pub enum SurfaceCommand {
    Render {
        image: Displayable,
        origin: Point,
        size: Size,
    },
    Resize(Size),
    SetTitle(String),
    Clear,
    Close,
}

/// Surface that forwards every command over a calloop channel, waking the
/// Wayland event loop that owns the real window.
pub struct ChannelSurface {
    tx: Sender<SurfaceCommand>,
    disconnected: bool,
}

impl ChannelSurface {
    pub fn new(tx: Sender<SurfaceCommand>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }

    fn send(&mut self, command: SurfaceCommand) {
        if self.disconnected {
            return;
        }
        if self.tx.send(command).is_err() {
            warn!("Display surface is gone, dropping further display commands");
            self.disconnected = true;
        }
    }
}

impl DisplaySurface for ChannelSurface {
    fn render(&mut self, image: &Displayable, origin: Point, size: Size) {
        self.send(SurfaceCommand::Render {
            image: image.clone(),
            origin,
            size,
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.send(SurfaceCommand::Resize(Size::new(width, height)));
    }

    fn set_title(&mut self, title: &str) {
        self.send(SurfaceCommand::SetTitle(title.to_string()));
    }

    fn clear(&mut self) {
        self.send(SurfaceCommand::Clear);
    }

    fn close(&mut self) {
        self.send(SurfaceCommand::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageData;
    use smithay_client_toolkit::reexports::calloop::channel::{channel, Event};
    use smithay_client_toolkit::reexports::calloop::EventLoop;
    use std::sync::Arc;

    #[test]
    fn commands_arrive_in_order() {
        let (tx, rx) = channel();
        let mut surface = ChannelSurface::new(tx);
        let image = Arc::new(ImageData {
            width: 1,
            height: 1,
            bgra_data: vec![0; 4],
        });

        surface.set_title("a.png (1x1)");
        surface.render(&image, Point::new(0, 0), Size::new(1, 1));
        surface.clear();

        let mut event_loop: EventLoop<Vec<SurfaceCommand>> = EventLoop::try_new().unwrap();
        event_loop
            .handle()
            .insert_source(rx, |event, _, received| {
                if let Event::Msg(command) = event {
                    received.push(command);
                }
            })
            .unwrap();

        let mut received = Vec::new();
        event_loop
            .dispatch(Some(std::time::Duration::from_millis(100)), &mut received)
            .unwrap();

        assert_eq!(received.len(), 3);
        assert!(matches!(&received[0], SurfaceCommand::SetTitle(t) if t == "a.png (1x1)"));
        assert!(matches!(received[1], SurfaceCommand::Render { .. }));
        assert!(matches!(received[2], SurfaceCommand::Clear));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = channel::<SurfaceCommand>();
        drop(rx);
        let mut surface = ChannelSurface::new(tx);
        surface.set_title("x");
        surface.clear();
        assert!(surface.disconnected);
    }
}
