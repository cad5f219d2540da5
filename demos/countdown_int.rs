extern crate pcf8563_rtc;

use anyhow::Result;
use linux_embedded_hal::I2cdev;
use chrono::Utc;
use pcf8563_rtc::{PCF8563, TimerConfig};
use std::time::Duration;

use embedded_hal::blocking::i2c::{Write, Read, WriteRead};
// use direct linux gpio access using cdev rather than via constrained embedded_hal methods
use gpiocdev::line::EdgeDetection;

/// Example testing the countdown timer, with the INT pin of the RTC
/// connected to GPIO 17 (physical pin 11) of a Raspberry Pi 3+
/// and PCF8563 attached to i2c1.

fn one_shot<I2C, E>(rtc: &mut PCF8563<I2C>, gpio_int_req: &gpiocdev::Request, request_secs: u32)
  -> Result<(), E>
  where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
    E: std::fmt::Debug
{
  rtc.disable_timer()?;
  let config = TimerConfig::for_duration(request_secs);
  println!("request {} s -> {:?} ticks", request_secs, config);

  let start_time = Utc::now().naive_utc();
  // Use the actual scheduled period, not the request, for timing
  let actual_secs = match rtc.set_timer(Some(request_secs), true)? {
    Some(actual_secs) => actual_secs,
    None => return Ok(()),
  };

  // wake up a little before the expected expiry, then wait on the INT edge
  if actual_secs > 1 {
    spin_sleep::sleep(Duration::from_secs(u64::from(actual_secs - 1)));
  }
  let timeout = Duration::from_secs(5);
  if let Ok(true) = gpio_int_req.wait_edge_event(timeout) {
    while let Ok(true) = gpio_int_req.has_edge_event() {
      let _ = gpio_int_req.read_edge_event();
    }
  }

  let fired = rtc.check_and_clear_timer()?;
  let delta = Utc::now().naive_utc() - start_time;
  println!("requested {} s, scheduled {} s, fired {} after {} ms",
           request_secs, actual_secs, fired, delta.num_milliseconds());
  Ok(())
}

fn main() -> Result<()> {
  // Initialize the I2C device
  let i2c = I2cdev::new("/dev/i2c-1").expect("Failed to open I2C device");
  let mut rtc = PCF8563::new(i2c);
  rtc.init()?;

  // This is a specific configuration for Raspberry Pi -- YMMV
  let gpio_int_req = gpiocdev::Request::builder()
    .on_chip("/dev/gpiochip0")
    .with_line(17)
    // INT is open drain and active low, with an external pull-up
    .as_active_low()
    .with_edge_detection(EdgeDetection::FallingEdge)
    .request()?;

  one_shot(&mut rtc, &gpio_int_req, 1)?;
  one_shot(&mut rtc, &gpio_int_req, 10)?;
  one_shot(&mut rtc, &gpio_int_req, 30)?;
  // switches to minute resolution, rounds to 5 minutes
  one_shot(&mut rtc, &gpio_int_req, 290)?;

  // leave the timer off and parked on the low power source
  rtc.set_timer(None, false)?;
  Ok(())
}
