use embedded_hal::blocking::i2c::{Write, Read, WriteRead};

use crate::{
  bcd_to_bin, bin_to_bcd, NaiveDate, NaiveDateTime, Datelike, Timelike, PCF8563,
  REG_DAYS, REG_SECONDS, VOLTAGE_LOW_BIT,
};

// Bit 7 of the month register: set for 19xx, clear for 20xx
const CENTURY_BIT: u8 = 1 << 7;

const SECONDS_MASK: u8 = 0x7F;
const MINUTES_MASK: u8 = 0x7F;
const HOURS_MASK: u8 = 0x3F;
const DAYS_MASK: u8 = 0x3F;
const WEEKDAYS_MASK: u8 = 0x07;
const MONTHS_MASK: u8 = 0x1F;

/// Time of day as held by the RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
}

/// Calendar date and time as held by the RTC.
/// - `year` is the full year; only 1900..=2099 can be stored
/// - `weekday` is 0..=6, 0 being Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilTime {
  pub year: u16,
  pub month: u8,
  pub day: u8,
  pub weekday: u8,
  pub hour: u8,
  pub minute: u8,
  pub second: u8,
}

impl CivilTime {

  pub fn from_naive(datetime: &NaiveDateTime) -> Self {
    CivilTime {
      year: u16::try_from(datetime.year()).unwrap_or(0),
      month: datetime.month() as u8,
      day: datetime.day() as u8,
      weekday: datetime.weekday().num_days_from_sunday() as u8,
      hour: datetime.hour() as u8,
      minute: datetime.minute() as u8,
      second: datetime.second() as u8,
    }
  }

  /// `None` if the fields don't form a real calendar date and time.
  /// The weekday is not checked against the date.
  pub fn to_naive(&self) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?
      .and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
  }

  fn time_registers(&self) -> [u8; 3] {
    [
      bin_to_bcd(self.second),
      bin_to_bcd(self.minute),
      bin_to_bcd(self.hour),
    ]
  }

  fn date_registers(&self) -> [u8; 4] {
    let century = if self.year < 2000 { CENTURY_BIT } else { 0 };
    [
      bin_to_bcd(self.day),
      self.weekday & WEEKDAYS_MASK,
      bin_to_bcd(self.month) | century,
      bin_to_bcd((self.year % 100) as u8),
    ]
  }

  // Decode the seven timekeeping registers, starting at REG_SECONDS
  fn from_registers(regs: &[u8; 7]) -> Self {
    let base_year: u16 = if 0 != (regs[5] & CENTURY_BIT) { 1900 } else { 2000 };
    CivilTime {
      second: bcd_to_bin(regs[0] & SECONDS_MASK),
      minute: bcd_to_bin(regs[1] & MINUTES_MASK),
      hour: bcd_to_bin(regs[2] & HOURS_MASK),
      day: bcd_to_bin(regs[3] & DAYS_MASK),
      weekday: regs[4] & WEEKDAYS_MASK,
      month: bcd_to_bin(regs[5] & MONTHS_MASK),
      year: base_year + u16::from(bcd_to_bin(regs[6])),
    }
  }
}

impl<I2C, E> PCF8563<I2C>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{

  /// Get time of day in binary format.
  /// The voltage low flag is masked off the seconds.
  pub fn read_time(&mut self) -> Result<Time, E> {
    let mut read_buf = [0u8; 3];
    self.read_multi_registers(REG_SECONDS, &mut read_buf)?;
    Ok(Time {
      second: bcd_to_bin(read_buf[0] & SECONDS_MASK),
      minute: bcd_to_bin(read_buf[1] & MINUTES_MASK),
      hour: bcd_to_bin(read_buf[2] & HOURS_MASK),
    })
  }

  /// Read all seven timekeeping registers in a single transaction.
  /// Register content is not validated: malformed BCD decodes to out-of-range values.
  pub fn read_date_time(&mut self) -> Result<CivilTime, E> {
    let mut read_buf = [0u8; 7];
    self.read_multi_registers(REG_SECONDS, &mut read_buf)?;
    Ok(CivilTime::from_registers(&read_buf))
  }

  /// Set hours, minutes, seconds only; date registers are untouched
  pub fn write_time(&mut self, time: &CivilTime) -> Result<(), E> {
    self.write_multi_registers(REG_SECONDS, &time.time_registers())
  }

  /// Set day, weekday, month (with century bit) and year only;
  /// time registers are untouched
  pub fn write_date(&mut self, date: &CivilTime) -> Result<(), E> {
    self.write_multi_registers(REG_DAYS, &date.date_registers())
  }

  /// Set the full date and time in one seven byte transaction,
  /// so the registers never mix the old date with the new time.
  /// Prefer this over `write_time` followed by `write_date`.
  pub fn write_date_time(&mut self, datetime: &CivilTime) -> Result<(), E> {
    let time = datetime.time_registers();
    let date = datetime.date_registers();
    let regs = [time[0], time[1], time[2], date[0], date[1], date[2], date[3]];
    self.write_multi_registers(REG_SECONDS, &regs)
  }

  /// Check the VL flag: when set, the supply dropped too low at some point
  /// and the clock content is no longer guaranteed.
  /// The device clears it on its own when the seconds register is written.
  pub fn is_voltage_low(&mut self) -> Result<bool, E> {
    let seconds = self.read_register(REG_SECONDS)?;
    Ok(0 != (seconds & VOLTAGE_LOW_BIT))
  }

}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fake_bus::RegisterFile;
  use crate::{PCF8563_ADDRESS, REG_CENTURY_MONTHS, REG_HOURS, REG_MINUTES, REG_YEARS};
  use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTrans};
  use std::vec;

  fn sample() -> CivilTime {
    CivilTime { year: 2024, month: 6, day: 25, weekday: 2, hour: 18, minute: 42, second: 7 }
  }

  #[test]
  fn test_write_time() {
    let expectations = [
      I2cTrans::write(PCF8563_ADDRESS, vec![REG_SECONDS, 0x07, 0x42, 0x18]),
    ];
    let mock = I2cMock::new(&expectations);
    let mut rtc = PCF8563::new(mock);
    rtc.write_time(&sample()).unwrap();
    rtc.release().done();
  }

  #[test]
  fn test_read_time_masks_voltage_low_and_stray_bits() {
    let expectations = [
      I2cTrans::write_read(PCF8563_ADDRESS, vec![REG_SECONDS], vec![0x80 | 0x58, 0x80 | 0x59, 0xC0 | 0x23]),
    ];
    let mock = I2cMock::new(&expectations);
    let mut rtc = PCF8563::new(mock);
    let time = rtc.read_time().unwrap();
    assert_eq!(time, Time { hour: 23, minute: 59, second: 58 });
    rtc.release().done();
  }

  #[test]
  fn test_write_date_sets_century_bit_for_1900s() {
    let date = CivilTime { year: 1987, month: 11, day: 3, weekday: 2, ..Default::default() };
    let expectations = [
      I2cTrans::write(PCF8563_ADDRESS, vec![REG_DAYS, 0x03, 0x02, 0x80 | 0x11, 0x87]),
    ];
    let mock = I2cMock::new(&expectations);
    let mut rtc = PCF8563::new(mock);
    rtc.write_date(&date).unwrap();
    rtc.release().done();
  }

  #[test]
  fn test_write_date_time_is_one_transaction() {
    let expectations = [
      I2cTrans::write(PCF8563_ADDRESS,
                      vec![REG_SECONDS, 0x07, 0x42, 0x18, 0x25, 0x02, 0x06, 0x24]),
    ];
    let mock = I2cMock::new(&expectations);
    let mut rtc = PCF8563::new(mock);
    rtc.write_date_time(&sample()).unwrap();
    rtc.release().done();
  }

  #[test]
  fn test_read_date_time() {
    let expectations = [
      I2cTrans::write_read(PCF8563_ADDRESS, vec![REG_SECONDS],
                           vec![0x80 | 0x07, 0x42, 0x18, 0x25, 0xF8 | 0x02, 0x06, 0x24]),
    ];
    let mock = I2cMock::new(&expectations);
    let mut rtc = PCF8563::new(mock);
    assert_eq!(rtc.read_date_time().unwrap(), sample());
    rtc.release().done();
  }

  #[test]
  fn test_century_decoding() {
    let mut rtc = PCF8563::new(RegisterFile::new());
    rtc.i2c.set(REG_CENTURY_MONTHS, 0x80 | 0x01);
    rtc.i2c.set(REG_YEARS, 0x99);
    assert_eq!(rtc.read_date_time().unwrap().year, 1999);
    rtc.i2c.set(REG_CENTURY_MONTHS, 0x01);
    rtc.i2c.set(REG_YEARS, 0x00);
    assert_eq!(rtc.read_date_time().unwrap().year, 2000);
  }

  #[test]
  fn test_write_then_read_date_time_round_trip() {
    let mut rtc = PCF8563::new(RegisterFile::new());
    for &year in &[1900u16, 1950, 1999, 2000, 2024, 2099] {
      for month in 1..=12u8 {
        for &(day, hour, minute, second) in &[(1u8, 0u8, 0u8, 0u8), (15, 12, 30, 30), (31, 23, 59, 59)] {
          let t = CivilTime { year, month, day, weekday: day % 7, hour, minute, second };
          rtc.write_date_time(&t).unwrap();
          assert_eq!(rtc.read_date_time().unwrap(), t);
        }
      }
    }
  }

  #[test]
  fn test_write_time_leaves_date_alone() {
    let mut rtc = PCF8563::new(RegisterFile::new());
    rtc.write_date_time(&sample()).unwrap();
    let later = CivilTime { hour: 9, minute: 5, second: 1, ..CivilTime::default() };
    rtc.write_time(&later).unwrap();
    let out = rtc.read_date_time().unwrap();
    assert_eq!((out.hour, out.minute, out.second), (9, 5, 1));
    assert_eq!((out.year, out.month, out.day, out.weekday), (2024, 6, 25, 2));
  }

  #[test]
  fn test_write_date_leaves_time_alone() {
    let mut rtc = PCF8563::new(RegisterFile::new());
    rtc.write_date_time(&sample()).unwrap();
    let other_day = CivilTime { year: 1999, month: 12, day: 31, weekday: 5, ..CivilTime::default() };
    rtc.write_date(&other_day).unwrap();
    assert_eq!(rtc.i2c.get(REG_HOURS), 0x18);
    assert_eq!(rtc.i2c.get(REG_MINUTES), 0x42);
    let out = rtc.read_date_time().unwrap();
    assert_eq!((out.year, out.month, out.day, out.weekday), (1999, 12, 31, 5));
  }

  #[test]
  fn test_is_voltage_low() {
    let mut rtc = PCF8563::new(RegisterFile::new());
    rtc.i2c.set(REG_SECONDS, 0x80 | 0x12);
    assert!(rtc.is_voltage_low().unwrap());
    rtc.write_time(&sample()).unwrap();
    assert!(!rtc.is_voltage_low().unwrap());
  }

  #[test]
  fn test_naive_conversion() {
    let dt = NaiveDate::from_ymd_opt(2024, 6, 25).unwrap()
      .and_hms_opt(18, 42, 7).unwrap();
    // 2024-06-25 was a Tuesday
    assert_eq!(CivilTime::from_naive(&dt), sample());
    assert_eq!(sample().to_naive(), Some(dt));
    let bad = CivilTime { month: 2, day: 30, ..sample() };
    assert_eq!(bad.to_naive(), None);
  }

}
