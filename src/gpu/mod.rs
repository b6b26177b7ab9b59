//! Integrated GPU context that runs the automaton and draws it
//!
//! `GpuLifeRenderer` brings up the device, owns the [`ResourceSet`] and
//! [`PipelineSet`], and on every display refresh asks the [`PacedLoop`] whether a
//! step is due before handing a [`GpuFrame`] to the [`FrameOrchestrator`].

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use wgpu::{Device, DeviceLostReason, Instance, Limits, Queue};
use winit::window::Window;

use crate::{
    config::SimulationConfig,
    error::{FrameError, SetupError},
    shaders::ShaderSource,
    sim::{
        GridState,
        orchestrator::{FrameOrchestrator, FrameReport},
        pacing::{FrameClock, PacedLoop},
    },
};

pub mod frame;
pub mod pipelines;
pub mod resources;
pub mod surface;

use frame::GpuFrame;
use pipelines::PipelineSet;
use resources::ResourceSet;
use surface::DisplaySurface;

const RATE_LOG_INTERVAL: Duration = Duration::from_secs(2);

/// What happened on one display refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// No step was due. The next one is due after `remaining`.
    Idle { remaining: Duration },
    Stepped(FrameReport),
}

/// Records the reason wgpu gives when the device goes away.
///
/// The callback runs outside the event loop, so the loss is only stored here and
/// reported by the next refresh.
#[derive(Clone, Debug, Default)]
pub struct DeviceLoss(Arc<Mutex<Option<String>>>);

impl DeviceLoss {
    pub fn watch(&self, device: &Device) {
        let loss = self.clone();
        device.set_device_lost_callback(move |reason, message| loss.record(reason, &message));
    }

    pub fn record(&self, reason: DeviceLostReason, message: &str) {
        match reason {
            DeviceLostReason::Destroyed => log::debug!("GPU device destroyed: {message}"),
            DeviceLostReason::Unknown => log::error!("GPU device lost: {message}"),
        }
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| format!("{reason:?}: {message}"));
    }

    /// `Err` once the device has been lost. Stays lost.
    pub fn check(&self) -> Result<(), FrameError> {
        let slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(reason) => Err(FrameError::DeviceLost(reason.clone())),
            None => Ok(()),
        }
    }
}

pub struct GpuLifeRenderer {
    #[allow(dead_code)]
    instance: Instance, // Keep instance alive for the lifetime of the renderer
    device: Device,
    queue: Queue,
    device_loss: DeviceLoss,
    surface: DisplaySurface,
    resources: ResourceSet,
    pipelines: PipelineSet,
    orchestrator: FrameOrchestrator,
    paced: PacedLoop,
    clock: FrameClock,
    window: Arc<Window>,
    /// For debug logging: time since the step rate was last reported
    rate_window: Duration,
    /// For debug logging: steps since the step rate was last reported
    steps_in_window: u32,
}

impl GpuLifeRenderer {
    /// Acquire a device for `window` and build every GPU object the loop needs.
    ///
    /// Any error here is fatal; nothing has been drawn when it is returned.
    pub async fn new(
        window: Arc<Window>,
        config: &SimulationConfig,
        sources: &dyn ShaderSource,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let instance = Instance::new(&wgpu::InstanceDescriptor::default());

        // Create surface first to find compatible adapter
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info());

        let downlevel_caps = adapter.get_downlevel_capabilities();
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(SetupError::MissingCapability("compute shaders"));
        }
        if !downlevel_caps
            .flags
            .contains(wgpu::DownlevelFlags::VERTEX_STORAGE)
        {
            return Err(SetupError::MissingCapability(
                "storage buffers in the vertex stage",
            ));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gridlife device"),
                required_features: wgpu::Features::empty(),
                required_limits: Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let device_loss = DeviceLoss::default();
        device_loss.watch(&device);
        device.on_uncaptured_error(Arc::new(|error| {
            log::error!("uncaptured GPU error: {error}");
        }));

        let limits = device.limits();
        check_work_group(config.work_group_size, &limits)?;
        let state_bytes = resources::check_grid_fits(config.grid_size, &limits)?;
        log::debug!("cell state needs {state_bytes} bytes per buffer");

        let size = window.inner_size();
        let surface = DisplaySurface::configure(surface, &adapter, &device, size.width, size.height)?;

        let mut rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let grid = GridState::seeded(config.grid_size, config.pattern, &mut rng);

        let resources = ResourceSet::new(&device, &queue, &grid)?;
        let pipelines = PipelineSet::new(
            &device,
            resources.layout(),
            surface.format(),
            sources,
            config.work_group_size,
        )?;

        let orchestrator = FrameOrchestrator::new(config.grid_size, config.work_group_size);
        let workgroups = orchestrator.workgroups();
        log::info!(
            "grid {0}x{0} with {1} live cells, dispatching {2}x{2} work groups ({3} idle invocations), one step per {4}",
            config.grid_size,
            grid.alive(),
            workgroups.per_axis,
            workgroups.idle_invocations(config.grid_size),
            humantime::format_duration(config.max_frame_duration),
        );

        Ok(Self {
            instance,
            device,
            queue,
            device_loss,
            surface,
            resources,
            pipelines,
            orchestrator,
            paced: PacedLoop::new(config.max_frame_duration),
            clock: FrameClock::new(),
            window,
            rate_window: Duration::ZERO,
            steps_in_window: 0,
        })
    }

    /// Request a redraw of the window
    /// Call this after rendering to keep the animation loop going
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Called once per display refresh. Runs at most one frame step.
    pub fn on_refresh(&mut self) -> Result<Refresh, FrameError> {
        self.device_loss.check()?;
        let elapsed = self.clock.elapsed();
        self.log_step_rate(elapsed);

        if !self.paced.tick(elapsed) {
            return Ok(Refresh::Idle {
                remaining: self.paced.remaining(),
            });
        }

        let mut frame = GpuFrame::new(
            &self.device,
            &self.queue,
            &self.surface,
            &self.resources,
            &self.pipelines,
        );
        let report = self.orchestrator.step(&mut frame)?;
        self.steps_in_window += 1;
        log::trace!(
            "step {} rendered {:?}, wrote {:?}",
            report.step,
            report.rendered,
            report.written
        );
        Ok(Refresh::Stepped(report))
    }

    fn log_step_rate(&mut self, elapsed: Duration) {
        self.rate_window += elapsed;
        if self.rate_window < RATE_LOG_INTERVAL {
            return;
        }
        log::debug!(
            "{} steps in {:.1}s ({:.1} steps/sec, target {:.1}), total {}",
            self.steps_in_window,
            self.rate_window.as_secs_f64(),
            self.steps_in_window as f64 / self.rate_window.as_secs_f64(),
            1.0 / self.paced.min_interval().as_secs_f64().max(f64::EPSILON),
            self.orchestrator.steps(),
        );
        self.rate_window = Duration::ZERO;
        self.steps_in_window = 0;
    }

    /// Resize the render surface
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(&self.device, width, height);
    }

    /// Reconfigure after the surface reported itself lost or outdated
    pub fn recover_surface(&mut self) {
        self.surface.reconfigure(&self.device);
    }

    /// Get current step count
    pub fn steps(&self) -> u64 {
        self.orchestrator.steps()
    }
}

/// Reject work-group sizes the device cannot launch.
pub fn check_work_group(size: u32, limits: &Limits) -> Result<(), SetupError> {
    let side_limit = limits
        .max_compute_workgroup_size_x
        .min(limits.max_compute_workgroup_size_y);
    if size > side_limit {
        return Err(SetupError::WorkGroupTooLarge {
            size,
            limit: side_limit,
        });
    }
    let invocations = size.saturating_mul(size);
    if invocations > limits.max_compute_invocations_per_workgroup {
        return Err(SetupError::WorkGroupTooLarge {
            size,
            limit: limits.max_compute_invocations_per_workgroup,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_work_group_fits_downlevel_limits() {
        let limits = Limits::downlevel_defaults();
        assert!(check_work_group(8, &limits).is_ok());
        assert!(check_work_group(16, &limits).is_ok());
    }

    #[test]
    fn test_oversized_work_group_is_rejected() {
        let limits = Limits::downlevel_defaults();
        let err = check_work_group(17, &limits).unwrap_err();
        assert!(matches!(err, SetupError::WorkGroupTooLarge { size: 17, .. }));
        assert!(check_work_group(1024, &limits).is_err());
    }

    #[test]
    fn test_device_loss_is_sticky() {
        let loss = DeviceLoss::default();
        assert!(loss.check().is_ok());

        let watcher = loss.clone();
        std::thread::spawn(move || watcher.record(DeviceLostReason::Unknown, "driver reset"))
            .join()
            .unwrap();

        let err = loss.check().unwrap_err();
        assert!(matches!(&err, FrameError::DeviceLost(reason) if reason.contains("driver reset")));
        // a later report does not replace the first reason
        loss.record(DeviceLostReason::Destroyed, "dropped");
        assert!(matches!(loss.check(), Err(FrameError::DeviceLost(reason)) if reason.contains("driver reset")));
    }
}
