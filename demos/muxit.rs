extern crate pcf8563_rtc;

use linux_embedded_hal::I2cdev;
use chrono::Utc;
use pcf8563_rtc::{PCF8563, DateTimeAccess};
use std::time::Duration;
use std::thread::sleep;

/**
Example testing muxing between two different RTCs
with the same i2c device address.

Assumptions:
- The i2c mux behaves like a Texas Instruments TCA9548A
- One RTC is attached to channel 0 on the mux; the other is attached to channel 7
- The platform this example runs on behaves like a Raspberry Pi 3+ running linux
- The mux is attached to i2c1
*/

const MUX_I2C_ADDRESS: u8 = 0x70;
const MUX_CHAN_FIRST:u8 = 0b0000_0001 ; //channel 0, LSB
const MUX_CHAN_SECOND:u8 = 0b1000_0000 ; // channel 7, MSB

fn main() {

    // Initialize the I2C bus (device)
    let i2c = I2cdev::new("/dev/i2c-1").expect("Failed to open I2C device");
    let i2c_bus = shared_bus::BusManagerSimple::new(i2c);

    // Create two instances of the PCF8563 driver
    let mut rtc1 = PCF8563::new_with_mux(i2c_bus.acquire_i2c(), MUX_I2C_ADDRESS, MUX_CHAN_FIRST);
    let mut rtc2 = PCF8563::new_with_mux(i2c_bus.acquire_i2c(), MUX_I2C_ADDRESS, MUX_CHAN_SECOND);

    // the following should fail if the mux or child devices don't respond
    rtc1.init().expect("couldn't init rtc1");
    rtc2.init().expect("couldn't init rtc2");
    let sys_dt = Utc::now().naive_utc();
    rtc1.set_datetime(&sys_dt).expect("couldn't set rtc1");
    rtc2.set_datetime(&sys_dt).expect("couldn't set rtc2");

    // check the drift over and over again
    loop {
        let sys_dt = Utc::now().naive_utc();
        let out1 = rtc1.datetime().expect("couldn't get rtc1 datetime");
        let out2 = rtc2.datetime().expect("couldn't get rtc2 datetime");
        println!("sys: {} rtc1: {} rtc2: {}", sys_dt, out1, out2);
        sleep(Duration::from_secs(10));
    }

}
