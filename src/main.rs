// Entry point - settings, hardware setup and the forecast loop
use anyhow::{Context, Result, bail};
use clap::Parser;
use rppal::gpio::Gpio;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weatherlight::config::{DEFAULT_FORECAST_HOURS, DEFAULT_REFRESH_MINUTES};
use weatherlight::{
    CancelToken, ControlLoop, ForecastMapper, HttpProbe, LightController, LightError, Location,
    LoopExit, Pacer, PwmChannel, RunOptions, Settings, SoftPwmChannel, SystemTimeSource,
    TimeSource, WundergroundClient, announce,
};

/// Shows the weather forecast on an RGB LED.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// wunderground.com 16-character API key.
    #[arg(required_unless_present = "self_test")]
    api_key: Option<String>,

    /// <country (or US state)>/<city>, e.g. UK/Bristol.
    #[arg(required_unless_present = "self_test")]
    location: Option<Location>,

    /// How far in advance to forecast, hours (0-11).
    #[arg(
        short,
        long,
        default_value_t = i64::from(DEFAULT_FORECAST_HOURS),
        allow_negative_numbers = true
    )]
    foretime: i64,

    /// Refresh interval, minutes (5-58).
    #[arg(
        short,
        long,
        default_value_t = i64::from(DEFAULT_REFRESH_MINUTES),
        allow_negative_numbers = true
    )]
    refresh: i64,

    /// Settings file. Defaults to weatherlight.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Flash the seven test colors and exit.
    #[arg(long)]
    self_test: bool,
}

fn main() -> Result<()> {
    // Initialize tracing, `info` unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("failed to install Ctrl-C handler")?;

    // Claim the three LED legs
    let gpio = Gpio::new().context("failed to open GPIO")?;
    let pins = settings.pins;
    let frequency = settings.pwm_frequency_hz;
    let configure = |pin: u8, leg: &str| {
        SoftPwmChannel::configure(&gpio, pin, frequency)
            .with_context(|| format!("failed to configure {leg} pin {pin}"))
    };
    let red = configure(pins.red, "red")?;
    let green = configure(pins.green, "green")?;
    let blue = configure(pins.blue, "blue")?;

    let clock = SystemTimeSource;
    let mut light = LightController::new(red, green, blue, frequency, Pacer::new(&clock, cancel))
        .context("failed to initialise light")?;

    if args.self_test {
        return self_test(&mut light);
    }

    let (Some(api_key), Some(location)) = (args.api_key, args.location) else {
        bail!("an API key and a location are required");
    };
    let (options, clamps) = RunOptions::clamped(args.foretime, args.refresh);
    info!(
        %location,
        foretime = options.forecast_hours,
        refresh_minutes = options.refresh_minutes,
        "options chosen"
    );

    let probe = HttpProbe::new(settings.probe_url.clone(), settings.weather.timeout())
        .context("failed to create connectivity probe")?;
    match announce(&mut light, &clamps, &probe) {
        Ok(true) => {}
        Ok(false) => {
            light.shutdown().context("failed to release light")?;
            bail!("no connection to {}", settings.probe_url);
        }
        Err(LightError::Interrupted) => {
            info!("interrupted during startup");
            light.shutdown().context("failed to release light")?;
            return Ok(());
        }
        Err(err) => return Err(err).context("startup announcement failed"),
    }

    let client = WundergroundClient::new(
        &settings.weather.base_url,
        api_key,
        location,
        settings.weather.timeout(),
    )
    .context("failed to create forecast client")?;
    let mapper = ForecastMapper::new().context("invalid temperature color table")?;

    let exit = ControlLoop::new(&mut light, client, mapper, options)
        .run()
        .context("control loop failed")?;

    match exit {
        LoopExit::Interrupted => Ok(()),
        LoopExit::Terminated(err) => Err(err).context("stopped, error getting weather data"),
    }
}

fn self_test<C: PwmChannel, T: TimeSource>(light: &mut LightController<'_, C, T>) -> Result<()> {
    info!("running light self-test");
    match light.test_cycle() {
        Ok(()) | Err(LightError::Interrupted) => {}
        Err(err) => return Err(err).context("self-test failed"),
    }
    light.shutdown().context("failed to release light")
}
