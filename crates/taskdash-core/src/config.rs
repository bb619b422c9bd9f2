use crate::{Error, Result};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

/// Validate a requested export interval. Accepts anything in 1..=1440
/// minutes (one minute up to one day).
pub fn validate_interval(minutes: i64) -> Result<u32> {
    if minutes < MIN_INTERVAL_MINUTES as i64 || minutes > MAX_INTERVAL_MINUTES as i64 {
        return Err(Error::InvalidInterval(minutes));
    }
    Ok(minutes as u32)
}

/// Exporter settings, read once from the environment at startup. Only the
/// interval is mutable afterwards, through the control surface.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub enabled: bool,
    pub interval_minutes: u32,
}

impl ExportSettings {
    pub fn new(enabled: bool, interval_minutes: i64) -> Result<Self> {
        Ok(Self {
            enabled,
            interval_minutes: validate_interval(interval_minutes)?,
        })
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_bounds() {
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(-5).is_err());
        assert!(validate_interval(1441).is_err());
        assert_eq!(validate_interval(1).unwrap(), 1);
        assert_eq!(validate_interval(1440).unwrap(), 1440);
    }

    #[test]
    fn test_settings_reject_bad_interval() {
        assert!(ExportSettings::new(true, 2000).is_err());
        let settings = ExportSettings::new(true, 5).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.interval_minutes, 5);
    }
}
