extern crate pcf8563_rtc;

use linux_embedded_hal::I2cdev;
use chrono::{Duration as ChronoDuration, Utc};
use pcf8563_rtc::{PCF8563, AlarmTime, CivilTime, DateTimeAccess, Timelike};
use std::time::Duration;

// use direct linux gpio access using cdev rather than via constrained embedded_hal methods
use gpiocdev::line::EdgeDetection;

/// Example testing real RTC interaction for alarm set/get,
/// assuming linux environment (such as Raspberry Pi 3+)
/// with PCF8563 attached to i2c1.
/// The following was tested by enabling i2c-1 on a Raspberry Pi 3+
/// using `sudo raspi-config`
/// and connecting:
/// - SDA, SCL, GND, and 3.3V pins from rpi to the RTC
/// - GPIO 17 (physical pin 11) from rpi to the INT pin of the RTC

fn dump_edge_events(gpio_int_req: &gpiocdev::Request) {
    while Ok(true) == gpio_int_req.has_edge_event() {
        if let Ok(inner_evt) = gpio_int_req.read_edge_event() {
            println!("{:?}", inner_evt);
        }
    }
}

fn main() {

    // Initialize the I2C device
    let i2c = I2cdev::new("/dev/i2c-1").expect("Failed to open I2C device");
    let mut rtc = PCF8563::new(i2c);
    rtc.init().unwrap();

    let sys_dt = Utc::now().naive_utc();
    rtc.set_datetime(&sys_dt).unwrap();

    // start from a clean slate
    rtc.disable_alarm().unwrap();
    let status = rtc.get_flag_and_interrupt_status().unwrap();
    assert!(!status.alarm_flag());
    assert!(!status.alarm_int_enabled());

    // alarm on the next whole minute; the PCF8563 alarm has minute resolution
    let init_dt = rtc.datetime().unwrap();
    let alarm_dt = init_dt + ChronoDuration::seconds(60);
    let alarm = AlarmTime::from(&CivilTime::from_naive(&alarm_dt));
    println!("init_dt:  {}", init_dt);
    println!("alarm_dt: {}", alarm_dt);

    // This is a specific configuration for Raspberry Pi -- YMMV
    let gpio_int_req = gpiocdev::Request::builder()
      .on_chip("/dev/gpiochip0")
      .with_line(17)
      // INT is open drain and active low, with an external pull-up
      .as_active_low()
      .with_edge_detection(EdgeDetection::FallingEdge)
      .request().unwrap();

    if let Ok(true) = gpio_int_req.has_edge_event() {
        println!("dump stale edge events");
        dump_edge_events(&gpio_int_req);
    }

    rtc.set_alarm(&alarm, true).unwrap();
    let readback = rtc.get_alarm().unwrap();
    assert_eq!(readback, alarm);
    println!("wait for alarm to trigger: {:?}", readback);

    for _i in 0..20 {
        if let Ok(true) = gpio_int_req.wait_edge_event(Duration::from_secs(5)) {
            println!("Edge events at {}", rtc.datetime().unwrap());
            dump_edge_events(&gpio_int_req);
        }

        let cur_dt = rtc.datetime().unwrap();
        let alarm_af = rtc.check_and_clear_alarm().unwrap();
        println!("{} alarm flag: {}", cur_dt, alarm_af);
        if alarm_af {
            break;
        }
        if cur_dt > alarm_dt && cur_dt.minute() != alarm_dt.minute() {
            println!("break on minute expired");
            break;
        }
    }

    // the daily variant: hour and minute only
    rtc.set_alarm_hour_minute(Some(alarm_dt.hour() as u8), Some(alarm_dt.minute() as u8), false)
      .unwrap();
    println!("daily alarm: {:?}", rtc.get_alarm().unwrap());

    rtc.disable_alarm().unwrap();
}
