extern crate pcf8563_rtc;

use anyhow::{anyhow, Result};
use linux_embedded_hal::I2cdev;
use chrono::Utc;
use pcf8563_rtc::{PCF8563, CivilTime, DateTimeAccess};
use std::thread::sleep;
use std::time::Duration;

/// Example testing real RTC communications,
/// assuming linux environment (such as Raspberry Pi 3+)
/// with PCF8563 attached to i2c1.
/// The following was tested by enabling i2c-1 on a Raspberry Pi 3+
/// using `sudo raspi-config`
/// and connecting the SDA, SCL, GND, and 3.3V pins from RPi to the RTC

fn main() -> Result<()> {

    // Initialize the I2C device
    let i2c = I2cdev::new("/dev/i2c-1").expect("Failed to open I2C device");

    // Create a new instance of the PCF8563 driver
    let mut rtc = PCF8563::new(i2c);
    rtc.init()?;

    if rtc.is_voltage_low()? {
        println!("voltage low flag set: clock content is not trustworthy");
    }

    // write all seven timekeeping registers in one go
    let sys_dt = Utc::now().naive_utc();
    rtc.set_datetime(&sys_dt).map_err(|e| anyhow!("set_datetime: {:?}", e))?;
    println!("sys dt: {}", sys_dt);

    for _i in 0..5 {
        let civil: CivilTime = rtc.read_date_time()?;
        let time = rtc.read_time()?;
        println!("rtc {:?} wd {} | {:02}:{:02}:{:02}",
                 civil.to_naive(), civil.weekday, time.hour, time.minute, time.second);
        sleep(Duration::from_secs(1));
    }

    let rtc_dt = rtc.datetime().map_err(|e| anyhow!("datetime: {:?}", e))?;
    println!("sys {}\r\nrtc {}", Utc::now().naive_utc(), rtc_dt);
    Ok(())
}
