//! In-memory stand-in for the device's register file, for tests that
//! care about register state rather than the exact transaction sequence.

use core::convert::Infallible;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

use crate::PCF8563_ADDRESS;

const NUM_REGISTERS: usize = 16;

type ReadHook = Box<dyn FnOnce(&mut [u8; NUM_REGISTERS])>;

pub struct RegisterFile {
  regs: [u8; NUM_REGISTERS],
  pointer: usize,
  read_hook: Option<ReadHook>,
}

impl RegisterFile {
  pub fn new() -> Self {
    RegisterFile {
      regs: [0u8; NUM_REGISTERS],
      pointer: 0,
      read_hook: None,
    }
  }

  pub fn get(&self, reg: u8) -> u8 {
    self.regs[reg as usize]
  }

  pub fn set(&mut self, reg: u8, val: u8) {
    self.regs[reg as usize] = val;
  }

  /// Run `hook` on the registers right after the next read completes,
  /// standing in for another bus user acting between our read and write.
  pub fn after_next_read<F>(&mut self, hook: F)
    where F: FnOnce(&mut [u8; NUM_REGISTERS]) + 'static
  {
    self.read_hook = Some(Box::new(hook));
  }

  fn read_from_pointer(&mut self, buffer: &mut [u8]) {
    for byte in buffer.iter_mut() {
      *byte = self.regs[self.pointer];
      self.pointer = (self.pointer + 1) % NUM_REGISTERS;
    }
    if let Some(hook) = self.read_hook.take() {
      hook(&mut self.regs);
    }
  }
}

impl Write for RegisterFile {
  type Error = Infallible;

  fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
    // anything not addressed to the RTC (e.g. a mux) is ignored
    if address != PCF8563_ADDRESS {
      return Ok(());
    }
    if let Some((reg, data)) = bytes.split_first() {
      self.pointer = *reg as usize % NUM_REGISTERS;
      for byte in data {
        self.regs[self.pointer] = *byte;
        self.pointer = (self.pointer + 1) % NUM_REGISTERS;
      }
    }
    Ok(())
  }
}

impl Read for RegisterFile {
  type Error = Infallible;

  fn read(&mut self, _address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
    self.read_from_pointer(buffer);
    Ok(())
  }
}

impl WriteRead for RegisterFile {
  type Error = Infallible;

  fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
    self.write(address, bytes)?;
    self.read_from_pointer(buffer);
    Ok(())
  }
}
