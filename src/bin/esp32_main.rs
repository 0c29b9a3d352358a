//! ESP32 RFID access-control station.
//!
//! This is the main entry point for the physical reader station. It runs a
//! cooperative poll loop that:
//! - Samples the factory-reset and admin buttons
//! - Reads cards from the MFRC522 and drives the mode state machine
//! - Runs enrollment over the serial console
//! - Keeps WiFi and MQTT up and reports events (if enabled)
//!
//! # Hardware Setup
//!
//! See [`rfid_warden::hal::esp32::pins`] for the wiring.
//!
//! # Build
//!
//! ```bash
//! # Offline station (reader, buttons, LED, NVS)
//! cargo build --release --features esp32
//!
//! # With WiFi + MQTT
//! WIFI_SSID=lab WIFI_PASSWORD=secret MQTT_HOST=10.0.0.2 \
//!     cargo build --release --features esp32-net
//! ```

use esp_idf_hal::gpio::{OutputPin, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use rfid_warden::bus::EventBus;
use rfid_warden::controller::{AccessController, Station};
use rfid_warden::hal::esp32::{factory_mac_hex, Esp32Clock, Esp32System, Mfrc522Reader, NvsStore};
use rfid_warden::hal::{GpioButton, RgbIndicator, StdioConsole};
use rfid_warden::traits::Clock;
use rfid_warden::{Config, MqttConfig, Registry, WifiConfig};
use std::thread;
use std::time::Duration;

/// Hold time on the reader reset line before talking to the chip.
const READER_RESET_SETTLE_MS: u64 = 50;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .without_time()
        .init();

    println!();
    println!("================================");
    println!("  rfid-warden Reader Station");
    println!("================================");
    println!();

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(
            MqttConfig::default()
                .with_host(option_env!("MQTT_HOST").unwrap_or("localhost"))
                .with_port(
                    option_env!("MQTT_PORT")
                        .and_then(|p| p.parse().ok())
                        .unwrap_or(1883),
                ),
        );

    let device_id = if config.device.id.is_empty() {
        factory_mac_hex()
    } else {
        config.device.id.as_str().to_string()
    };
    println!("[OK] Device id: {}", device_id);

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // =========================================================================
    // Initialize Reader (MFRC522 on VSPI: SCK 18, MOSI 23, MISO 19, SS 5)
    // =========================================================================
    let mut reader_reset = PinDriver::output(pins.gpio21)?;
    reader_reset.set_low()?;
    thread::sleep(Duration::from_millis(READER_RESET_SETTLE_MS));
    reader_reset.set_high()?;
    thread::sleep(Duration::from_millis(READER_RESET_SETTLE_MS));

    let spi_bus = SpiDriver::new(
        peripherals.spi3,
        pins.gpio18,
        pins.gpio23,
        Some(pins.gpio19),
        &SpiDriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(
        spi_bus,
        Some(pins.gpio5),
        &SpiConfig::new().baudrate(1.MHz().into()),
    )?;
    let reader = Mfrc522Reader::new(spi)?;
    println!("[OK] Reader initialized (VSPI, RST GPIO21)");

    // =========================================================================
    // Initialize Buttons (GPIO15 admin, GPIO16 reset, pull-down)
    // =========================================================================
    let mut admin_pin = PinDriver::input(pins.gpio15)?;
    admin_pin.set_pull(Pull::Down)?;
    let mut reset_pin = PinDriver::input(pins.gpio16)?;
    reset_pin.set_pull(Pull::Down)?;
    println!("[OK] Buttons initialized (GPIO15/16)");

    // =========================================================================
    // Initialize Indicator (RGB LED on GPIO17/4/22)
    // =========================================================================
    let red = PinDriver::output(pins.gpio17.downgrade_output())?;
    let green = PinDriver::output(pins.gpio4.downgrade_output())?;
    let blue = PinDriver::output(pins.gpio22.downgrade_output())?;
    let indicator = RgbIndicator::new(red, green, blue, config.device.indicator_active_low);
    println!("[OK] Indicator initialized (GPIO17/4/22)");

    // =========================================================================
    // Initialize Storage (NVS)
    // =========================================================================
    let nvs = EspDefaultNvsPartition::take()?;
    let store = NvsStore::open(nvs.clone(), config.device.storage_namespace.as_str())?;
    let registry = Registry::load(store);
    println!(
        "[OK] Registry loaded: admin {}, {} user(s)",
        if registry.admin().is_some() { "set" } else { "unset" },
        registry.users().len()
    );

    let clock = Esp32Clock::new();

    // =========================================================================
    // Initialize WiFi and MQTT
    // =========================================================================
    #[cfg(feature = "esp32-net")]
    let mut wifi = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use rfid_warden::hal::esp32::Esp32Wifi;

        if config.wifi.should_connect() {
            let sysloop = EspSystemEventLoop::take()?;
            let wifi = Esp32Wifi::new(
                peripherals.modem,
                sysloop,
                Some(nvs),
                &config.wifi,
                config.timing.wifi_retry_ms,
                clock.now_ms(),
            )?;
            println!("[OK] WiFi started: {:?}", wifi.ip_addr());
            Some(wifi)
        } else if !config.wifi.enabled {
            println!("[SKIP] WiFi disabled");
            None
        } else {
            println!("[SKIP] WiFi not configured (set WIFI_SSID/WIFI_PASSWORD)");
            None
        }
    };

    #[cfg(feature = "esp32-net")]
    let mqtt = {
        use rfid_warden::hal::esp32::Esp32Mqtt;

        if config.mqtt.enabled && wifi.is_some() {
            let client_id = config.mqtt.client_id(&device_id);
            match Esp32Mqtt::new(&config.mqtt, client_id.as_str(), config.timing.bus_retry_ms) {
                Ok(client) => {
                    println!(
                        "[OK] MQTT client for {}:{}",
                        config.mqtt.host, config.mqtt.port
                    );
                    Some(client)
                }
                Err(e) => {
                    println!("[WARN] MQTT setup failed: {:?}", e);
                    None
                }
            }
        } else {
            println!("[SKIP] MQTT disabled");
            None
        }
    };

    #[cfg(not(feature = "esp32-net"))]
    let mqtt: Option<rfid_warden::traits::NoClient> = {
        let _ = (&device_id, &nvs);
        println!("[SKIP] Network support not built (enable esp32-net)");
        None
    };

    // =========================================================================
    // Initialize Controller
    // =========================================================================
    let bus = EventBus::new(mqtt, config.topics.clone(), config.timing.bus_retry_ms);
    let mut controller = AccessController::new(registry, bus, config.timing.clone(), clock.now_ms());

    let mut station = Station {
        reader,
        admin_button: GpioButton::active_high(admin_pin),
        reset_button: GpioButton::active_high(reset_pin),
        indicator,
        console: StdioConsole::spawn()?,
        system: Esp32System::new(),
        clock,
    };

    println!();
    println!("Controls:");
    println!("  Present card:  Admin setup / access / enrollment");
    println!("  Admin button:  Start enrollment (confirm with admin card)");
    println!("  Reset button:  Factory reset and restart");
    println!();
    println!("Mode: {}", controller.mode());
    println!();

    let poll_interval = Duration::from_millis(config.timing.poll_interval_ms);

    // =========================================================================
    // Main Loop
    // =========================================================================
    loop {
        #[cfg(feature = "esp32-net")]
        if let Some(ref mut wifi) = wifi {
            wifi.maintain(station.clock.now_ms());
        }

        controller.poll(&mut station);

        thread::sleep(poll_interval);
    }
}
