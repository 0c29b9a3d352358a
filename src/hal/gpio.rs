//! Generic `embedded-hal` 1.0 drivers for the station's buttons and LED.
//!
//! These work with any HAL that implements the `digital` traits, including
//! `esp-idf-hal`'s `PinDriver`.

use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::traits::{ButtonInput, Indicator, IndicatorColor};

/// Momentary push button on a digital input.
///
/// Buttons wired to ground with a pull-up are active-low.
pub struct GpioButton<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> GpioButton<P> {
    /// Button that reads high when pressed.
    pub fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Button that reads low when pressed.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }
}

impl<P: InputPin> ButtonInput for GpioButton<P> {
    fn raw_level(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high != self.active_low,
            // An unreadable pin counts as released
            Err(_) => false,
        }
    }
}

/// Three-channel RGB LED on digital outputs.
///
/// Common-anode LEDs light when the pin is driven low; set `active_low`
/// for those.
///
/// # Example
///
/// ```rust,ignore
/// let led = RgbIndicator::new(red_pin, green_pin, blue_pin, true);
/// led.set_indicator(IndicatorColor::Yellow)?; // red + green
/// ```
pub struct RgbIndicator<P> {
    red: P,
    green: P,
    blue: P,
    active_low: bool,
}

impl<P: OutputPin> RgbIndicator<P> {
    /// Wrap three output pins.
    pub fn new(red: P, green: P, blue: P, active_low: bool) -> Self {
        Self {
            red,
            green,
            blue,
            active_low,
        }
    }

    fn level(&self, lit: bool) -> PinState {
        PinState::from(lit != self.active_low)
    }
}

impl<P: OutputPin> Indicator for RgbIndicator<P> {
    type Error = P::Error;

    fn set_indicator(&mut self, color: IndicatorColor) -> Result<(), P::Error> {
        let (r, g, b) = color.channels();
        let (r, g, b) = (self.level(r), self.level(g), self.level(b));
        self.red.set_state(r)?;
        self.green.set_state(g)?;
        self.blue.set_state(b)?;
        Ok(())
    }
}
