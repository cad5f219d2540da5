use embedded_hal::blocking::i2c::{Write, Read, WriteRead};

use crate::{
  bcd_to_bin, bin_to_bcd, CivilTime, PCF8563, ALARM_FLAG_BIT, ALARM_INT_ENABLE_BIT,
  REG_CONTROL_STATUS2, REG_MINUTE_ALARM,
};

// Bit 7 of each alarm register is AE_x, inverted enable:
// set means "ignore this field when matching"
const ALARM_NO_WATCH_FLAG: u8 = 1 << 7;

// Fill for a field that is not matched
const ALARM_FIELD_UNUSED: u8 = 0xFF;

const MINUTE_ALARM_MASK: u8 = 0x7F;
const HOUR_ALARM_MASK: u8 = 0x3F;
const DAY_ALARM_MASK: u8 = 0x3F;
const WEEKDAY_ALARM_MASK: u8 = 0x07;

/// Which fields an alarm matches on.
/// The alarm fires when every present field equals the current time;
/// `None` fields are ignored, so e.g. only hour and minute gives a daily alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmTime {
  pub minute: Option<u8>,
  pub hour: Option<u8>,
  /// Day of month, 1..=31
  pub day: Option<u8>,
  /// 0..=6, stored raw rather than BCD
  pub weekday: Option<u8>,
}

impl AlarmTime {

  /// Alarm that fires every day at `hour`:`minute`
  pub fn hour_minute(hour: Option<u8>, minute: Option<u8>) -> Self {
    AlarmTime { minute, hour, day: None, weekday: None }
  }

  // Register images for the four alarm registers, starting at REG_MINUTE_ALARM
  fn registers(&self) -> [u8; 4] {
    let mut regs = [ALARM_FIELD_UNUSED; 4];
    if let Some(minute) = self.minute {
      regs[0] = bin_to_bcd(minute) & MINUTE_ALARM_MASK;
    }
    if let Some(hour) = self.hour {
      regs[1] = bin_to_bcd(hour) & HOUR_ALARM_MASK;
    }
    if let Some(day) = self.day {
      regs[2] = bin_to_bcd(day) & DAY_ALARM_MASK;
    }
    if let Some(weekday) = self.weekday {
      regs[3] = weekday & WEEKDAY_ALARM_MASK;
    }
    regs
  }

  fn from_registers(regs: &[u8; 4]) -> Self {
    let watched = |raw: u8| if 0 == (raw & ALARM_NO_WATCH_FLAG) { Some(raw) } else { None };
    AlarmTime {
      minute: watched(regs[0]).map(|raw| bcd_to_bin(raw & MINUTE_ALARM_MASK)),
      hour: watched(regs[1]).map(|raw| bcd_to_bin(raw & HOUR_ALARM_MASK)),
      day: watched(regs[2]).map(|raw| bcd_to_bin(raw & DAY_ALARM_MASK)),
      weekday: watched(regs[3]).map(|raw| raw & WEEKDAY_ALARM_MASK),
    }
  }
}

impl From<&CivilTime> for AlarmTime {
  /// Match minute, hour, day and weekday of `time`
  fn from(time: &CivilTime) -> Self {
    AlarmTime {
      minute: Some(time.minute),
      hour: Some(time.hour),
      day: Some(time.day),
      weekday: Some(time.weekday),
    }
  }
}

impl<I2C, E> PCF8563<I2C>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{

  /// Daily alarm at `hour`:`minute`; either may be `None` to not match on it.
  /// `int_enable` sets or clears AIE.
  pub fn set_alarm_hour_minute(&mut self, hour: Option<u8>, minute: Option<u8>,
                               int_enable: bool) -> Result<(), E> {
    self.set_alarm(&AlarmTime::hour_minute(hour, minute), int_enable)
  }

  /// All-in-one method to set an alarm:
  /// writes the four alarm registers in one transaction,
  /// then sets or clears AIE preserving the other Control/Status 2 bits.
  pub fn set_alarm(&mut self, alarm: &AlarmTime, int_enable: bool) -> Result<(), E> {
    #[cfg(feature = "defmt")]
    defmt::debug!("alarm set {}", alarm);
    self.write_multi_registers(REG_MINUTE_ALARM, &alarm.registers())?;
    self.set_or_clear_reg_bits(REG_CONTROL_STATUS2, ALARM_INT_ENABLE_BIT, int_enable)
  }

  /// Read back which fields the alarm watches, and their values
  pub fn get_alarm(&mut self) -> Result<AlarmTime, E> {
    let mut read_buf = [0u8; 4];
    self.read_multi_registers(REG_MINUTE_ALARM, &mut read_buf)?;
    Ok(AlarmTime::from_registers(&read_buf))
  }

  /// Stop watching every alarm field, then clear AF and AIE together
  pub fn disable_alarm(&mut self) -> Result<(), E> {
    self.write_multi_registers(REG_MINUTE_ALARM, &[ALARM_NO_WATCH_FLAG; 4])?;
    self.clear_reg_bits(REG_CONTROL_STATUS2, ALARM_FLAG_BIT | ALARM_INT_ENABLE_BIT)
  }

}
