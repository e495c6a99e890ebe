mod dht22;

use sensor_reporter_common::{Paired, Reporter, ReporterConfig};

use esp_idf_svc::hal::delay::FreeRtos;

/// Chosen at build time, the reporter has no runtime configuration.
const CONFIG: ReporterConfig = ReporterConfig::DEFAULT;

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    // Data and diagnostics both go to the console UART.
    let sensor = Paired::new(dht22::DHT22::new(CONFIG.pin.into()));
    let reporter = Reporter::new(sensor, FreeRtos, std::io::stdout(), CONFIG)?;

    match reporter.run()? {}
}
