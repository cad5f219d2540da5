#![cfg_attr(not(test), no_std)]

//! PCF8563 Real-Time Clock / Calendar with I2C-Bus Interface
//! rust no_std driver (utilizes the embedded_hal i2c interface)
//!
//! The device registers are the only state: every method is a synchronous,
//! immediate register transaction (or a short ordered sequence of them).
//!
//! # Concurrency
//! Several methods toggle individual bits with a read-modify-write sequence
//! on a shared register (Control/Status 2). These sequences are not atomic:
//! at most one register sequence may be in flight per device at a time.
//! If a driver instance is shared between threads or tasks, the caller must
//! serialize access externally (for example with a mutex around the driver),
//! otherwise two overlapping `clear_*_flag` calls can silently lose one clear.

pub use rtcc::{
  DateTimeAccess, NaiveDate, NaiveDateTime, Datelike, Timelike,
};

use embedded_hal::blocking::i2c::{Write, Read, WriteRead};

mod alarm;
mod time;
mod timer;

#[cfg(test)]
mod fake_bus;

pub use alarm::AlarmTime;
pub use time::{CivilTime, Time};
pub use timer::{TimerConfig, TimerResolution};

/// Fixed i2c bus address of the device (7-bit)
pub const PCF8563_ADDRESS: u8 = 0xA2 >> 1;

/// Register map
pub mod registers {
  // Control/Status 1: EXT_CLK test mode, STOP bit, power-on-reset override.
  // Initialized to 0x00 (clock running, normal mode).
  pub const REG_CONTROL_STATUS1: u8 = 0x00;

  // Control/Status 2: TI_TP, AF, TF, AIE, TIE
  pub const REG_CONTROL_STATUS2: u8 = 0x01;

  // Holds the VL (voltage low) flag in bit 7,
  // and the seconds in two binary coded decimal (BCD) digits, 00 to 59.
  pub const REG_SECONDS: u8 = 0x02;
  pub const REG_MINUTES: u8 = 0x03;
  pub const REG_HOURS: u8 = 0x04;

  // Day of month, 01 to 31, BCD
  pub const REG_DAYS: u8 = 0x05;

  // Weekday counter, 0 to 6, raw 3-bit value
  pub const REG_WEEKDAYS: u8 = 0x06;

  // Century flag C in bit 7, month 01 to 12 in BCD
  pub const REG_CENTURY_MONTHS: u8 = 0x07;
  pub const REG_YEARS: u8 = 0x08;

  // Alarm registers. Bit 7 of each is the inverted enable AE_x:
  // when set, that field does not take part in the alarm match.
  pub const REG_MINUTE_ALARM: u8 = 0x09;
  pub const REG_HOUR_ALARM: u8 = 0x0A;
  pub const REG_DAY_ALARM: u8 = 0x0B;
  pub const REG_WEEKDAY_ALARM: u8 = 0x0C;

  // 0Dh – CLKOUT control, not used by this driver

  // Timer control: TE in bit 7, TD1..TD0 source clock select
  pub const REG_TIMER_CONTROL: u8 = 0x0E;

  // Countdown timer value, 0 to 255
  pub const REG_TIMER: u8 = 0x0F;
}

use registers::*;

// REG_CONTROL_STATUS2 bits:
const TIMER_INT_ENABLE_BIT: u8 = 1 << 0; // TIE
const ALARM_INT_ENABLE_BIT: u8 = 1 << 1; // AIE
const TIMER_FLAG_BIT: u8 = 1 << 2; // TF
const ALARM_FLAG_BIT: u8 = 1 << 3; // AF

const FLAG_AND_INT_MASK: u8 =
  TIMER_INT_ENABLE_BIT | ALARM_INT_ENABLE_BIT | TIMER_FLAG_BIT | ALARM_FLAG_BIT;

// REG_SECONDS bits:
const VOLTAGE_LOW_BIT: u8 = 1 << 7; // VL

/// Converts a binary value (0..=99) to BCD format.
/// Values above 99 are outside the contract and yield garbage;
/// callers clamp first.
pub fn bin_to_bcd(value: u8) -> u8 {
  ((value / 10) << 4) | (value % 10)
}

/// Converts a BCD value to binary format.
/// Malformed BCD (a nibble above 9) is not rejected:
/// it simply decodes to a value outside the documented range.
pub fn bcd_to_bin(value: u8) -> u8 {
  ((value & 0xF0) >> 4) * 10 + (value & 0x0F)
}

/// Snapshot of the flag and interrupt-enable bits of Control/Status 2.
/// Hardware may set a flag at any moment after the read,
/// so treat this as a point-in-time view only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlagStatus(u8);

impl FlagStatus {
  /// Raw bits: 0 TIE, 1 AIE, 2 TF, 3 AF
  pub fn bits(&self) -> u8 {
    self.0
  }

  pub fn alarm_flag(&self) -> bool {
    0 != (self.0 & ALARM_FLAG_BIT)
  }

  pub fn timer_flag(&self) -> bool {
    0 != (self.0 & TIMER_FLAG_BIT)
  }

  pub fn alarm_int_enabled(&self) -> bool {
    0 != (self.0 & ALARM_INT_ENABLE_BIT)
  }

  pub fn timer_int_enabled(&self) -> bool {
    0 != (self.0 & TIMER_INT_ENABLE_BIT)
  }
}

impl From<u8> for FlagStatus {
  fn from(raw: u8) -> Self {
    FlagStatus(raw & FLAG_AND_INT_MASK)
  }
}

/// Errors from the `DateTimeAccess` conversion layer
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// Bus read or write failed
  Transport(E),
  /// The registers hold a date or time that chrono cannot represent
  InvalidDateTime,
}

/// PCF8563
/// Real-Time Clock (RTC) / calendar with I2C-Bus Interface
/// rust no_std driver (utilizes the embedded_hal i2c interface)
pub struct PCF8563<I2C> {
  i2c: I2C,
  mux_addr: u8,
  mux_chan: u8,
}

impl<I2C, E> PCF8563<I2C>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{

  /// New driver instance, assumes that there is no i2c mux
  /// sitting between the RTC and the host.
  /// Performs no bus traffic: call `init` once at startup.
  pub fn new(i2c: I2C) -> Self {
    PCF8563 {
      i2c,
      mux_addr: 0u8,
      mux_chan: 0u8
    }
  }

  /// Allows the caller to create a new driver instance with
  /// an i2c mux between the RTC and the host.
  /// - `mux_addr` : the i2c address of the mux itself
  /// - `mux_chan` : the mux channel assigned to the RTC
  pub fn new_with_mux(i2c: I2C, mux_addr: u8, mux_chan: u8) -> Self {
    PCF8563 {
      i2c,
      mux_addr,
      mux_chan
    }
  }

  /// Give back the underlying bus
  pub fn release(self) -> I2C {
    self.i2c
  }

  /// Put the device in a known state:
  /// - Control/Status 1 and 2 cleared: clock running, all flags and interrupt enables off
  /// - countdown timer disabled, source clock set to the low power 1/60 Hz
  pub fn init(&mut self) -> Result<(), E> {
    #[cfg(feature = "defmt")]
    defmt::debug!("pcf8563 init");
    self.write_multi_registers(REG_CONTROL_STATUS1, &[0x00, 0x00])?;
    self.write_register(REG_TIMER_CONTROL, timer::TIMER_CONTROL_DISABLED)
  }

  // If using an i2c mux, tell the mux to select our channel
  fn select_mux_channel(&mut self) -> Result<(), E> {
    if self.mux_addr != 0u8 {
      self.i2c.write(self.mux_addr, &[self.mux_chan])
    }
    else {
      Ok(())
    }
  }

  fn write_register(&mut self, reg: u8, data: u8) -> Result<(), E> {
    self.select_mux_channel()?;
    self.i2c.write(PCF8563_ADDRESS, &[reg, data])
  }

  fn read_register(&mut self, reg: u8) -> Result<u8, E> {
    self.select_mux_channel()?;
    let mut buf = [0];
    self.i2c.write_read(PCF8563_ADDRESS, &[reg], &mut buf)?;
    Ok(buf[0])
  }

  // read a block of registers all at once
  fn read_multi_registers(&mut self, reg: u8, read_buf: &mut [u8]) -> Result<(), E> {
    self.select_mux_channel()?;
    self.i2c.write_read(PCF8563_ADDRESS, &[reg], read_buf)
  }

  // write a block of consecutive registers in a single bus transaction;
  // the device auto-increments the register address.
  // Longest block used is the 7 timekeeping registers.
  fn write_multi_registers(&mut self, reg: u8, data: &[u8]) -> Result<(), E> {
    let mut buf = [0u8; 8];
    let len = data.len().min(buf.len() - 1);
    buf[0] = reg;
    buf[1..=len].copy_from_slice(&data[..len]);
    self.select_mux_channel()?;
    self.i2c.write(PCF8563_ADDRESS, &buf[..=len])
  }

  // Read-modify-write:
  // bits high in `clear` are cleared, then bits high in `set` are set;
  // all other bits are written back unchanged.
  fn modify_reg_bits(&mut self, reg: u8, clear: u8, set: u8) -> Result<(), E> {
    let reg_val = self.read_register(reg)?;
    self.write_register(reg, (reg_val & !clear) | set)
  }

  // set specific bits in a register:
  // all bits must be high that you wish to set
  fn set_reg_bits(&mut self, reg: u8, bits: u8) -> Result<(), E> {
    self.modify_reg_bits(reg, 0, bits)
  }

  // clear specific bits in a register:
  // all bits must be high that you wish to be cleared
  fn clear_reg_bits(&mut self, reg: u8, bits: u8) -> Result<(), E> {
    self.modify_reg_bits(reg, bits, 0)
  }

  // If `set` is true, set the high bits given in `bits`, otherwise clear those bits
  fn set_or_clear_reg_bits(&mut self, reg: u8, bits: u8, set: bool) -> Result<(), E> {
    if set {
      self.set_reg_bits(reg, bits)
    }
    else {
      self.clear_reg_bits(reg, bits)
    }
  }

  /// Read the alarm flag, timer flag and both interrupt enable bits at once
  pub fn get_flag_and_interrupt_status(&mut self) -> Result<FlagStatus, E> {
    let reg_val = self.read_register(REG_CONTROL_STATUS2)?;
    Ok(FlagStatus::from(reg_val))
  }

  /// Clear the alarm flag AF, leaving every other bit intact
  pub fn clear_alarm_flag(&mut self) -> Result<(), E> {
    self.clear_reg_bits(REG_CONTROL_STATUS2, ALARM_FLAG_BIT)
  }

  /// Clear the timer flag TF, leaving every other bit intact
  pub fn clear_timer_flag(&mut self) -> Result<(), E> {
    self.clear_reg_bits(REG_CONTROL_STATUS2, TIMER_FLAG_BIT)
  }

  /// Check the alarm status, and if it's triggered, clear it
  /// return bool indicating whether the alarm triggered
  pub fn check_and_clear_alarm(&mut self) -> Result<bool, E> {
    let status = self.get_flag_and_interrupt_status()?;
    if status.alarm_flag() {
      self.clear_alarm_flag()?;
    }
    Ok(status.alarm_flag())
  }

  /// Check the countdown timer status, and if it's triggered, clear it
  /// return bool indicating whether the countdown expired
  pub fn check_and_clear_timer(&mut self) -> Result<bool, E> {
    let status = self.get_flag_and_interrupt_status()?;
    if status.timer_flag() {
      self.clear_timer_flag()?;
    }
    Ok(status.timer_flag())
  }

  /// Toggle whether an alarm outputs an interrupt signal on the INT pin
  pub fn toggle_alarm_int_enable(&mut self, enable: bool) -> Result<(), E> {
    self.set_or_clear_reg_bits(REG_CONTROL_STATUS2, ALARM_INT_ENABLE_BIT, enable)
  }

  /// Toggle whether the countdown timer outputs an interrupt signal on the INT pin
  pub fn toggle_timer_int_enable(&mut self, enable: bool) -> Result<(), E> {
    self.set_or_clear_reg_bits(REG_CONTROL_STATUS2, TIMER_INT_ENABLE_BIT, enable)
  }

}

impl<I2C, E> DateTimeAccess for PCF8563<I2C>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
  type Error = Error<E>;

  /// Reads all seven timekeeping registers in one transaction.
  /// Fails with `InvalidDateTime` if the registers don't hold a real calendar date.
  fn datetime(&mut self) -> Result<NaiveDateTime, Self::Error> {
    let civil = self.read_date_time().map_err(Error::Transport)?;
    civil.to_naive().ok_or(Error::InvalidDateTime)
  }

  /// The device can only hold years 1900 to 2099 (one century bit).
  /// Other years are stored modulo 100 and read back in the wrong century.
  fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Self::Error> {
    let civil = CivilTime::from_naive(datetime);
    self.write_date_time(&civil).map_err(Error::Transport)
  }
}
