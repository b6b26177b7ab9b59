use std::sync::Arc;

use crate::{
    config::SimulationConfig,
    error::FrameError,
    gpu::{GpuLifeRenderer, Refresh},
    shaders::{EmbeddedShaders, ShaderDirectory, ShaderSource},
};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use web_sys::HtmlCanvasElement;
use winit::{
    event::{ElementState, StartCause, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::WindowAttributes,
};

#[cfg(target_arch = "wasm32")]
use winit::platform::web::WindowAttributesExtWebSys;

pub mod config;
pub mod error;
pub mod gpu;
pub mod rendering;
pub mod shaders;
pub mod sim;
pub mod util;

/// Message type for GPU renderer events
pub enum GpuMessage {
    Initialized(GpuLifeRenderer),
    Error(String),
}

struct Application {
    proxy: Option<EventLoopProxy<GpuMessage>>,
    renderer: Option<GpuLifeRenderer>,
    config: SimulationConfig,
    /// Why the loop stopped, if it did not stop because the user closed it
    fatal_error: Option<String>,
}

impl Application {
    fn new(event_loop: &EventLoop<GpuMessage>, config: SimulationConfig) -> Self {
        Self {
            proxy: Some(event_loop.create_proxy()),
            renderer: None,
            config,
            fatal_error: None,
        }
    }

    fn shader_source(&self) -> Box<dyn ShaderSource> {
        match &self.config.shader_dir {
            Some(dir) => {
                log::info!("loading shaders from {}", dir.display());
                Box::new(ShaderDirectory::new(dir))
            }
            None => Box::new(EmbeddedShaders),
        }
    }

    fn on_redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match renderer.on_refresh() {
            Ok(Refresh::Stepped(_)) => renderer.request_redraw(),
            Ok(Refresh::Idle { remaining }) => {
                // Natively, sleep until the next step is due instead of spinning.
                #[cfg(not(target_arch = "wasm32"))]
                event_loop.set_control_flow(ControlFlow::WaitUntil(
                    std::time::Instant::now() + remaining,
                ));
                #[cfg(target_arch = "wasm32")]
                {
                    let _ = remaining;
                    renderer.request_redraw();
                }
            }
            Err(FrameError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("surface lost, reconfiguring");
                renderer.recover_surface();
                renderer.request_redraw();
            }
            Err(e @ FrameError::Surface(wgpu::SurfaceError::OutOfMemory))
            | Err(e @ FrameError::DeviceLost(_)) => {
                log::error!("stopping after {} steps: {e}", renderer.steps());
                self.fatal_error = Some(e.to_string());
                self.renderer = None;
                event_loop.exit();
            }
            Err(e) => {
                log::warn!("Surface error: {e:?}");
                renderer.request_redraw();
            }
        }
    }
}

impl winit::application::ApplicationHandler<GpuMessage> for Application {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        #[cfg(target_arch = "wasm32")]
        let window_attrs = {
            let canvas: Option<HtmlCanvasElement> = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.query_selector(".main-canvas").ok().flatten())
                .and_then(|e| e.dyn_into().ok());
            if canvas.is_none() {
                log::warn!("no `.main-canvas` element found, winit will create one");
            }
            WindowAttributes::default()
                .with_canvas(canvas)
                .with_append(true)
        };

        #[cfg(not(target_arch = "wasm32"))]
        let window_attrs = WindowAttributes::default().with_title("gridlife");

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                self.fatal_error = Some(e.to_string());
                event_loop.exit();
                return;
            }
        };
        let Some(proxy) = self.proxy.take() else {
            return;
        };
        let config = self.config.clone();
        let sources = self.shader_source();

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let message = match GpuLifeRenderer::new(window, &config, sources.as_ref()).await {
                Ok(renderer) => GpuMessage::Initialized(renderer),
                Err(e) => GpuMessage::Error(e.to_string()),
            };
            let _ = proxy.send_event(message);
        });

        // On native, use pollster to block on the future
        #[cfg(not(target_arch = "wasm32"))]
        {
            let message =
                match pollster::block_on(GpuLifeRenderer::new(window, &config, sources.as_ref())) {
                    Ok(renderer) => GpuMessage::Initialized(renderer),
                    Err(e) => GpuMessage::Error(e.to_string()),
                };
            let _ = proxy.send_event(message);
        }
    }

    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            event_loop.set_control_flow(ControlFlow::Wait);
            if let Some(ref renderer) = self.renderer {
                renderer.request_redraw();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.renderer = None;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                self.renderer = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.on_redraw(event_loop),
            _ => (),
        };
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: GpuMessage) {
        match event {
            GpuMessage::Initialized(renderer) => {
                log::info!("GPU renderer initialized successfully");
                // Request first redraw to kick off the animation loop
                renderer.request_redraw();
                self.renderer = Some(renderer);
            }
            GpuMessage::Error(e) => {
                log::error!("GPU initialization error: {e}");
                self.fatal_error = Some(format!("setup failed: {e}"));
                event_loop.exit();
            }
        }
    }
}

/// Open a window and run the simulation until it is closed.
///
/// Returns an error if setup failed, in which case nothing was ever drawn, or if
/// the device was lost while running.
#[cfg(not(target_arch = "wasm32"))]
pub fn run(config: SimulationConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    log::info!("Starting simulation with {config:?}");

    let event_loop = EventLoop::<GpuMessage>::with_user_event()
        .build()
        .context("failed to create event loop")?;
    let mut app = Application::new(&event_loop, config);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    match app.fatal_error {
        Some(e) => Err(anyhow::anyhow!(e).context("simulation stopped")),
        None => Ok(()),
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("wgpu_hal", log::LevelFilter::Warn)
        .level_for("naga", log::LevelFilter::Warn)
        .chain(fern::Output::call(console_log::log))
        .apply();
}

/// Start the simulation on the page's `.main-canvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start() {
    use winit::platform::web::EventLoopExtWebSys;

    let config = SimulationConfig::default();
    log::info!("Starting simulation with {config:?}");

    let event_loop = match EventLoop::<GpuMessage>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            return;
        }
    };
    let app = Application::new(&event_loop, config);
    event_loop.spawn_app(app);
}
