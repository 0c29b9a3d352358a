//! Desktop simulator for the reader station.
//!
//! Runs the same controller as the ESP32 firmware with simulated hardware:
//! cards and button presses are typed on stdin, the LED is printed, and the
//! registry lives in a directory of files. Events go to a real MQTT broker
//! when one is configured.
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin simulator --features desktop
//! ```
//!
//! Commands:
//!
//! ```text
//! card <HEX>   present a card (e.g. card A1B2C3D4)
//! admin        press the admin button
//! reset        press the factory-reset button
//! status       show mode, registry, token, and bus state
//! users        list enrolled users
//! quit         exit
//! ```
//!
//! During enrollment, input lines answer the prompts instead.
//!
//! # Configuration
//!
//! - `RFID_WARDEN_CONFIG`: JSON config file (see [`rfid_warden::Config`])
//! - `RFID_WARDEN_DATA`: registry directory (default `./station-data`)
//! - `MQTT_HOST`, `MQTT_PORT`: broker override
//! - `RUST_LOG`: log filter (default `info`), logs go to stderr

use std::convert::Infallible;
use std::time::{Duration, Instant};

use anyhow::Context;
use rfid_warden::bus::EventBus;
use rfid_warden::controller::{AccessController, Station};
use rfid_warden::hal::{FileStore, StdioConsole};
use rfid_warden::services::{MqttRuntimeConfig, RumqttClient};
use rfid_warden::traits::{ButtonInput, CardReader, Clock, Indicator, MqttClient, System};
use rfid_warden::{Config, IndicatorColor, Registry, Uid};
use tracing_subscriber::EnvFilter;

const DEFAULT_DATA_DIR: &str = "./station-data";

type SimStation =
    Station<SimReader, SimButton, SimButton, SimIndicator, StdioConsole, SimSystem, StdClock>;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    println!("=================================");
    println!("  rfid-warden Station Simulator");
    println!("=================================");
    println!();

    let config = load_config()?;
    let data_dir =
        std::env::var("RFID_WARDEN_DATA").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());

    let store = FileStore::open(&data_dir)
        .with_context(|| format!("cannot open data directory {}", data_dir))?;
    let registry = Registry::load(store);
    println!(
        "Registry in {}: admin {}, {} user(s)",
        data_dir,
        registry.admin().map_or("unset".to_string(), Uid::to_string),
        registry.users().len()
    );

    let device_id = if config.device.id.is_empty() {
        "sim".to_string()
    } else {
        config.device.id.as_str().to_string()
    };

    let mqtt = if config.mqtt.enabled {
        let runtime = MqttRuntimeConfig::from_config(&config.mqtt, &device_id)
            .with_retry_ms(config.timing.bus_retry_ms);
        println!("MQTT broker: {}:{}", runtime.host, runtime.port);
        Some(RumqttClient::connect(runtime)?)
    } else {
        println!("MQTT disabled");
        None
    };

    let mut station: SimStation = Station {
        reader: SimReader::default(),
        admin_button: SimButton::default(),
        reset_button: SimButton::default(),
        indicator: SimIndicator,
        console: StdioConsole::spawn()?,
        system: SimSystem::default(),
        clock: StdClock::new(),
    };

    let bus = EventBus::new(mqtt, config.topics.clone(), config.timing.bus_retry_ms);
    let mut controller =
        AccessController::new(registry, bus, config.timing.clone(), station.clock.now_ms());

    // Long enough for the debounce filter to see a stable press.
    let press_hold =
        Duration::from_millis(config.timing.debounce_ms * 2 + config.timing.poll_interval_ms * 2);
    let poll_interval = Duration::from_millis(config.timing.poll_interval_ms);

    println!();
    print_help();
    println!();
    println!("Mode: {}", controller.mode());

    loop {
        if let Some(line) = station.console.try_line() {
            match parse_command(&line) {
                Ok(Some(Command::Card(uid))) => station.reader.present(uid),
                Ok(Some(Command::Admin)) => station.admin_button.press(press_hold),
                Ok(Some(Command::Reset)) => station.reset_button.press(press_hold),
                Ok(Some(Command::Status)) => print_status(&controller),
                Ok(Some(Command::Users)) => print_users(&controller),
                Ok(Some(Command::Help)) => print_help(),
                Ok(Some(Command::Quit)) => break,
                Ok(None) => {}
                Err(message) => println!("{}", message),
            }
        } else if station.console.is_closed() {
            break;
        }

        controller.poll(&mut station);

        if station.system.take_restart() {
            println!("--- restart ---");
            let (registry, bus) = controller.into_parts();
            let registry = Registry::load(registry.into_store());
            controller =
                AccessController::new(registry, bus, config.timing.clone(), station.clock.now_ms());
            println!("Mode: {}", controller.mode());
        }

        std::thread::sleep(poll_interval);
    }

    println!("Bye.");
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::var("RFID_WARDEN_CONFIG") {
        Ok(path) => {
            let bytes = std::fs::read(&path).with_context(|| format!("cannot read {}", path))?;
            let config = Config::from_json(&bytes)?;
            println!("Config: {}", path);
            config
        }
        Err(_) => Config::default(),
    };

    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.mqtt = config.mqtt.with_host(&host);
    }
    if let Some(port) = std::env::var("MQTT_PORT").ok().and_then(|p| p.parse().ok()) {
        config.mqtt = config.mqtt.with_port(port);
    }
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, PartialEq)]
enum Command {
    Card(Uid),
    Admin,
    Reset,
    Status,
    Users,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "card" => {
            let hex = words.next().ok_or("usage: card <HEX>")?;
            Command::Card(Uid::from_hex(hex).map_err(|e| format!("bad card id: {}", e))?)
        }
        "admin" => Command::Admin,
        "reset" => Command::Reset,
        "status" => Command::Status,
        "users" => Command::Users,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

fn print_help() {
    println!("Commands:");
    println!("  card <HEX>  Present a card");
    println!("  admin       Press the admin button");
    println!("  reset       Press the factory-reset button");
    println!("  status      Show station state");
    println!("  users       List enrolled users");
    println!("  quit        Exit");
}

fn print_status<C: MqttClient>(controller: &AccessController<FileStore, C>) {
    let state = controller.state();
    println!("Mode:  {}", state.mode());
    println!(
        "Admin: {}",
        controller
            .registry()
            .admin()
            .map_or("unset".to_string(), Uid::to_string)
    );
    println!("Users: {}", controller.registry().users().len());
    println!(
        "Token: {}",
        if state.token().is_empty() { "(none)" } else { state.token() }
    );
    println!(
        "Bus:   {}",
        if controller.bus().is_connected() { "connected" } else { "offline" }
    );
}

fn print_users<C: MqttClient>(controller: &AccessController<FileStore, C>) {
    let users = controller.registry().users();
    if users.is_empty() {
        println!("No users enrolled.");
    }
    for user in users {
        println!("  {}  {:<20} {}", user.uid, user.group, user.color);
    }
}

// ============================================================================
// Simulated hardware
// ============================================================================

/// Monotonic milliseconds since simulator start.
struct StdClock {
    start: Instant,
}

impl StdClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Reader that yields each typed card once.
#[derive(Default)]
struct SimReader {
    pending: Option<Uid>,
}

impl SimReader {
    fn present(&mut self, uid: Uid) {
        self.pending = Some(uid);
    }
}

impl CardReader for SimReader {
    fn try_read_uid(&mut self) -> Option<Uid> {
        self.pending.take()
    }
}

/// Button held down until a deadline.
#[derive(Default)]
struct SimButton {
    held_until: Option<Instant>,
}

impl SimButton {
    fn press(&mut self, hold: Duration) {
        self.held_until = Some(Instant::now() + hold);
    }
}

impl ButtonInput for SimButton {
    fn raw_level(&mut self) -> bool {
        match self.held_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                self.held_until = None;
                false
            }
            None => false,
        }
    }
}

/// LED printed to stdout.
struct SimIndicator;

impl Indicator for SimIndicator {
    type Error = Infallible;

    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), Infallible> {
        println!("[LED] {}", color.as_str());
        Ok(())
    }
}

/// Records restart requests for the main loop to act on.
#[derive(Default)]
struct SimSystem {
    restart: bool,
}

impl SimSystem {
    fn take_restart(&mut self) -> bool {
        std::mem::take(&mut self.restart)
    }
}

impl System for SimSystem {
    fn restart(&mut self) {
        self.restart = true;
    }
}
