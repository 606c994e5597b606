//! Linux sysfs GPIO backend (`/sys/class/gpio`).

use super::{GpioLines, Level};
use crate::errors::{AppError, AppResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const DEFAULT_ROOT: &str = "/sys/class/gpio";

/// udev needs a moment to fix permissions on a freshly exported line.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

pub struct SysfsLines {
    root: PathBuf,
    // value files stay open so the busy-poll loop only seeks and reads
    values: Mutex<HashMap<u8, File>>,
}

impl SysfsLines {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_ROOT)
    }

    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            values: Mutex::new(HashMap::new()),
        }
    }

    fn line_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn hw_err(pin: u8, e: impl std::fmt::Display) -> AppError {
        AppError::Hardware {
            pin,
            message: e.to_string(),
        }
    }

    fn export(&self, pin: u8) -> AppResult<()> {
        if self.line_dir(pin).exists() {
            return Ok(());
        }
        fs::write(self.root.join("export"), pin.to_string()).map_err(|e| Self::hw_err(pin, e))?;
        thread::sleep(EXPORT_SETTLE);
        Ok(())
    }

    fn setup(&self, pin: u8, direction: &str) -> AppResult<()> {
        self.export(pin)?;
        let dir = self.line_dir(pin);
        fs::write(dir.join("direction"), direction).map_err(|e| Self::hw_err(pin, e))?;

        let file = OpenOptions::new()
            .read(true)
            .write(direction == "out")
            .open(dir.join("value"))
            .map_err(|e| Self::hw_err(pin, e))?;
        self.values.lock().insert(pin, file);
        Ok(())
    }
}

impl Default for SysfsLines {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioLines for SysfsLines {
    fn setup_output(&self, pin: u8) -> AppResult<()> {
        self.setup(pin, "out")
    }

    fn setup_input(&self, pin: u8) -> AppResult<()> {
        self.setup(pin, "in")
    }

    fn write(&self, pin: u8, level: Level) -> AppResult<()> {
        let mut values = self.values.lock();
        let file = values
            .get_mut(&pin)
            .ok_or_else(|| Self::hw_err(pin, "line not configured"))?;

        let byte: &[u8] = if level.is_high() { b"1" } else { b"0" };
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(byte))
            .map_err(|e| Self::hw_err(pin, e))
    }

    fn read(&self, pin: u8) -> AppResult<Level> {
        let mut values = self.values.lock();
        let file = values
            .get_mut(&pin)
            .ok_or_else(|| Self::hw_err(pin, "line not configured"))?;

        let mut buf = [0u8; 1];
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| Self::hw_err(pin, e))?;
        Ok(Level::from(buf[0] == b'1'))
    }

    fn release(&self, pin: u8) -> AppResult<()> {
        self.values.lock().remove(&pin);
        if self.line_dir(pin).exists() {
            fs::write(self.root.join("unexport"), pin.to_string())
                .map_err(|e| Self::hw_err(pin, e))?;
        }
        Ok(())
    }
}
