use anyhow::{Result, anyhow};
use f2f_core::Surface;
use f2f_render::{FontArc, Overlay, SkiaRenderer, default_font, load_font};
use f2f_sequencer::{Coordinator, Sequencer};
use f2f_timing::{HighPrecisionTimer, Timer};
use pixels::{Pixels, SurfaceTexture};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    monitor::MonitorHandle,
    window::{Fullscreen, Window, WindowId},
};

use crate::screen::ScreenState;

pub type AppSequencer = Sequencer<Box<dyn Coordinator>, HighPrecisionTimer>;

/// Monitor indices for the two surfaces.
#[derive(Debug, Clone, Copy)]
pub struct MonitorLayout {
    pub participant: usize,
    pub navigator: usize,
}

struct SurfaceWindow {
    surface: Surface,
    window: Arc<Window>,
    pixels: Pixels<'static>,
    renderer: SkiaRenderer,
}

pub struct App {
    sequencer: AppSequencer,
    screen: ScreenState<HighPrecisionTimer>,
    layout: MonitorLayout,
    font: FontArc,
    surfaces: Vec<SurfaceWindow>,
    timer: HighPrecisionTimer,
    aborted: bool,
    failed: Option<anyhow::Error>,
}

/// The `--font` face, or the bundled one.
pub fn resolve_font(path: Option<&Path>) -> Result<FontArc> {
    match path {
        Some(path) => load_font(path),
        None => default_font(),
    }
}

impl App {
    pub fn new(
        sequencer: AppSequencer,
        screen: ScreenState<HighPrecisionTimer>,
        timer: HighPrecisionTimer,
        layout: MonitorLayout,
        font: FontArc,
    ) -> Self {
        Self {
            sequencer,
            screen,
            layout,
            font,
            surfaces: Vec::new(),
            timer,
            aborted: false,
            failed: None,
        }
    }

    /// Runs the event loop until the sequence finishes or is aborted, and
    /// returns the sequencer so its coordinator can be dropped by the caller.
    pub fn run(mut self) -> Result<AppSequencer> {
        let event_loop = EventLoop::new()?;
        info!(
            "platform {} / {}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        event_loop.run_app(&mut self)?;

        if let Some(e) = self.failed.take() {
            return Err(e);
        }
        if self.aborted {
            warn!(
                stage = self.sequencer.stage().name(),
                cursor = self.sequencer.cursor(),
                "session aborted before the end of the sequence"
            );
        }
        Ok(self.sequencer)
    }

    fn create_surfaces(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitors: Vec<MonitorHandle> = event_loop.available_monitors().collect();
        let participant = monitors
            .get(self.layout.participant)
            .cloned()
            .or_else(|| event_loop.primary_monitor())
            .ok_or_else(|| anyhow!("No monitor available"))?;

        self.open_surface(event_loop, Surface::Participant, participant)?;

        match monitors.get(self.layout.navigator) {
            Some(navigator) if monitors.len() > 1 && self.layout.navigator != self.layout.participant => {
                self.open_surface(event_loop, Surface::Navigator, navigator.clone())?;
            }
            _ => warn!(
                monitors = monitors.len(),
                "no monitor {} for the navigator surface, running on one screen",
                self.layout.navigator
            ),
        }
        Ok(())
    }

    fn open_surface(
        &mut self,
        event_loop: &ActiveEventLoop,
        surface: Surface,
        monitor: MonitorHandle,
    ) -> Result<()> {
        let title = match surface {
            Surface::Participant => "f2f participant",
            Surface::Navigator => "f2f navigator",
        };
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            ?surface,
            monitor = %monitor.name().unwrap_or_default(),
            "surface {}x{} at scale {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let texture = SurfaceTexture::new(size.width, size.height, window.clone());
        let pixels = Pixels::new(size.width, size.height, texture)?;

        let renderer = SkiaRenderer::new(size.width, size.height, self.font.clone())?;

        window.set_cursor_visible(false);
        window.request_redraw();

        self.surfaces.push(SurfaceWindow {
            surface,
            window,
            pixels,
            renderer,
        });
        Ok(())
    }

    fn render(&mut self, id: WindowId) -> Result<()> {
        let image = self.screen.image_path().to_path_buf();
        let overlay = self.screen.overlay();

        let Some(sw) = self.surfaces.iter_mut().find(|s| s.window.id() == id) else {
            return Ok(());
        };
        // Message and timer windows belong to the participant screen.
        let overlay = match sw.surface {
            Surface::Participant => overlay,
            Surface::Navigator => Overlay::None,
        };

        let stats = sw
            .renderer
            .render_frame(Some(image.as_path()), &overlay, sw.pixels.frame_mut())?;
        let now = self.timer.now();
        sw.pixels.render()?;
        debug!(
            surface = ?sw.surface,
            "present {:.3}ms, image {:.3}ms, overlay {:.3}ms, copy {:.3}ms, total {:.3}ms",
            self.timer.elapsed(now).as_secs_f64() * 1e3,
            stats.image.as_secs_f64() * 1e3,
            stats.overlay.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            stats.total.as_secs_f64() * 1e3,
        );
        Ok(())
    }

    fn dismiss(&mut self) {
        if !self.sequencer.dismiss(&mut self.screen) {
            debug!(stage = self.sequencer.stage().name(), "nothing to dismiss");
        }
    }

    /// Pushes pending screen changes to the windows.
    fn sync(&mut self, event_loop: &ActiveEventLoop) {
        if self.screen.take_dirty() {
            for sw in &self.surfaces {
                sw.window.request_redraw();
            }
        }
        if self.screen.is_closed() || self.sequencer.is_finished() {
            info!("sequence finished");
            event_loop.exit();
        }
    }

    fn handle_resize(&mut self, id: WindowId, width: u32, height: u32) {
        let Some(sw) = self.surfaces.iter_mut().find(|s| s.window.id() == id) else {
            return;
        };
        if let Err(e) = sw.pixels.resize_surface(width, height) {
            warn!("Failed to resize surface: {e}");
        }
        if let Err(e) = sw.pixels.resize_buffer(width, height) {
            warn!("Failed to resize buffer: {e}");
        }
        if let Err(e) = sw.renderer.resize(width, height) {
            warn!("Failed to resize renderer: {e}");
        }
        debug!(surface = ?sw.surface, "resized to {width}x{height}");
        sw.window.request_redraw();
    }

    fn abort(&mut self, event_loop: &ActiveEventLoop, reason: &str) {
        warn!("{reason}, aborting");
        for sw in &self.surfaces {
            sw.window.set_cursor_visible(true);
        }
        self.aborted = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.failed = Some(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.surfaces.is_empty() {
            return;
        }
        if let Err(e) = self.create_surfaces(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        self.sequencer.start(&mut self.screen);
        self.sync(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.abort(event_loop, "window closed"),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render(id) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter) => {
                        self.dismiss();
                    }
                    PhysicalKey::Code(KeyCode::Escape) => self.abort(event_loop, "escape pressed"),
                    _ => {}
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.dismiss(),
            WindowEvent::Resized(size) => self.handle_resize(id, size.width, size.height),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self
                    .surfaces
                    .iter()
                    .find(|s| s.window.id() == id)
                    .map(|s| s.window.inner_size())
                {
                    self.handle_resize(id, size.width, size.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.aborted || self.failed.is_some() || self.surfaces.is_empty() {
            return;
        }
        if self.screen.timer_expired() {
            info!("conversation time is up");
            self.dismiss();
        }

        let due = self.sequencer.poll(&mut self.screen);
        self.sync(event_loop);

        let wake = match (due, self.screen.next_tick()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match wake {
            Some(after) => event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + after)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
