use embedded_hal::blocking::i2c::{Write, Read, WriteRead};

use crate::{
  PCF8563, REG_CONTROL_STATUS2, REG_TIMER, REG_TIMER_CONTROL,
  TIMER_FLAG_BIT, TIMER_INT_ENABLE_BIT,
};

// REG_TIMER_CONTROL bits: TE in bit 7, source clock select in bits 1..0
const TIMER_ENABLE_BIT: u8 = 1 << 7;
const TIMER_SOURCE_MASK: u8 = 0b11;

/// Timer stopped, source clock parked on the lowest power 1/60 Hz setting
pub(crate) const TIMER_CONTROL_DISABLED: u8 = TimerResolution::HertzSixtieth as u8;

// Requests at or above this many seconds switch to minute resolution
const MINUTE_RESOLUTION_THRESHOLD: u32 = 270;
const MAX_COUNT: u32 = 0xFF;

/// Countdown timer source clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TimerResolution {
  /// 1 Hz: one tick per second
  Hertz1 = 0b01,
  /// 1/60 Hz: one tick per minute, lowest power
  HertzSixtieth = 0b11,
}

impl TimerResolution {
  /// Seconds per timer tick
  pub fn seconds_per_tick(&self) -> u32 {
    match self {
      TimerResolution::Hertz1 => 1,
      TimerResolution::HertzSixtieth => 60,
    }
  }

  fn from_bits(bits: u8) -> Option<Self> {
    match bits & TIMER_SOURCE_MASK {
      0b01 => Some(TimerResolution::Hertz1),
      0b11 => Some(TimerResolution::HertzSixtieth),
      _ => None,
    }
  }
}

/// A countdown timer setting: source clock and tick count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
  pub resolution: TimerResolution,
  pub count: u8,
}

impl TimerConfig {

  /// Choose the resolution and count closest to `seconds`:
  /// - below 270 s, 1 Hz ticks, count clamped to 255
  /// - from 270 s, 1/60 Hz ticks, rounded to the nearest minute and clamped to 255
  pub fn for_duration(seconds: u32) -> Self {
    if seconds < MINUTE_RESOLUTION_THRESHOLD {
      TimerConfig {
        resolution: TimerResolution::Hertz1,
        count: seconds.min(MAX_COUNT) as u8,
      }
    }
    else {
      let minutes = seconds.saturating_add(30) / 60;
      TimerConfig {
        resolution: TimerResolution::HertzSixtieth,
        count: minutes.min(MAX_COUNT) as u8,
      }
    }
  }

  /// The period this setting actually produces, in seconds
  pub fn actual_seconds(&self) -> u32 {
    u32::from(self.count) * self.resolution.seconds_per_tick()
  }

  fn control_byte(&self) -> u8 {
    TIMER_ENABLE_BIT | self.resolution as u8
  }
}

impl<I2C, E> PCF8563<I2C>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{

  /// All-in-one method to start the countdown timer.
  /// - `after_seconds` of `None` disables the timer (and its interrupt) and returns `None`
  /// - otherwise returns the period actually scheduled, which differs from the request
  ///   whenever resolution rounding or clamping applied. Use the returned value for any
  ///   downstream timing.
  /// - `int_enable` sets or clears TIE, other Control/Status 2 bits are preserved
  pub fn set_timer(&mut self, after_seconds: Option<u32>, int_enable: bool) -> Result<Option<u32>, E> {
    let seconds = match after_seconds {
      Some(seconds) => seconds,
      None => {
        self.write_register(REG_TIMER_CONTROL, TIMER_CONTROL_DISABLED)?;
        self.clear_reg_bits(REG_CONTROL_STATUS2, TIMER_INT_ENABLE_BIT)?;
        return Ok(None);
      }
    };

    let config = TimerConfig::for_duration(seconds);
    #[cfg(feature = "defmt")]
    defmt::debug!("timer requested {} s, scheduled {}", seconds, config);

    self.write_register(REG_TIMER_CONTROL, config.control_byte())?;
    self.write_register(REG_TIMER, config.count)?;
    self.set_or_clear_reg_bits(REG_CONTROL_STATUS2, TIMER_INT_ENABLE_BIT, int_enable)?;

    Ok(Some(config.actual_seconds()))
  }

  /// Stop the countdown timer, then clear TF and TIE together
  pub fn disable_timer(&mut self) -> Result<(), E> {
    self.write_register(REG_TIMER_CONTROL, TIMER_CONTROL_DISABLED)?;
    self.clear_reg_bits(REG_CONTROL_STATUS2, TIMER_FLAG_BIT | TIMER_INT_ENABLE_BIT)
  }

  /// Read back the running timer setting.
  /// Returns `None` if the timer is disabled or clocked from a source
  /// this driver does not configure.
  /// Note the timer register counts down while running.
  pub fn get_timer(&mut self) -> Result<Option<TimerConfig>, E> {
    let mut read_buf = [0u8; 2];
    self.read_multi_registers(REG_TIMER_CONTROL, &mut read_buf)?;
    if 0 == (read_buf[0] & TIMER_ENABLE_BIT) {
      return Ok(None);
    }
    Ok(TimerResolution::from_bits(read_buf[0])
      .map(|resolution| TimerConfig { resolution, count: read_buf[1] }))
  }

}
