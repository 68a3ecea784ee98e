/// Mapping between the logical 0-100 volume scale and the engine's native range
///
/// The engine's output stage takes a linear gain value in [-64, 64]. The
/// mapping is `native = v * 1.28 - 64` and `v = (native + 64) / 1.28`, both
/// rounded to the nearest integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeVolumeRange {
    /// Native value for logical volume 0
    pub min: i32,
    /// Native value for logical volume 100
    pub max: i32,
}

pub const MAX_VOLUME: u8 = 100;

impl Default for NativeVolumeRange {
    fn default() -> Self {
        Self { min: -64, max: 64 }
    }
}

impl NativeVolumeRange {
    fn span(&self) -> f64 {
        f64::from(self.max - self.min)
    }

    /// Convert a logical volume (0-100) to the native value
    pub fn percent_to_native(&self, percent: u8) -> i32 {
        let percent = f64::from(percent.min(MAX_VOLUME));
        (f64::from(self.min) + percent * self.span() / 100.0).round() as i32
    }

    /// Convert a native value back to a logical volume (0-100)
    pub fn native_to_percent(&self, native: i32) -> u8 {
        if self.max == self.min {
            return 0;
        }
        let percent = (f64::from(native - self.min) * 100.0 / self.span()).round();
        percent.clamp(0.0, f64::from(MAX_VOLUME)) as u8
    }
}

/// Clamp a caller-supplied volume to the logical range
pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, i32::from(MAX_VOLUME)) as u8
}
