#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context;
#[cfg(not(target_arch = "wasm32"))]
use gridlife::config::SimulationConfig;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let config = SimulationConfig::from_env().context("invalid configuration")?;
    init_logging(config.log_level)?;
    gridlife::run(config)
}

// The web build is started through `gridlife::start` instead.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn init_logging(level: log::LevelFilter) -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("wgpu_hal", log::LevelFilter::Warn)
        .level_for("naga", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()
        .context("failed to install logger")
}
