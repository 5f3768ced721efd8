use crate::codec::{AmFrequency, FmFrequency};
use crate::error::ValidationError;

/// Lowest tunable FM frequency (87.50 MHz).
pub const FM_MIN: FmFrequency = FmFrequency::from_centi_mhz(8750);
/// Highest tunable FM frequency (108.00 MHz).
pub const FM_MAX: FmFrequency = FmFrequency::from_centi_mhz(10800);
/// Lowest tunable AM frequency.
pub const AM_MIN: AmFrequency = AmFrequency::from_khz(531);
/// Highest tunable AM frequency.
pub const AM_MAX: AmFrequency = AmFrequency::from_khz(1602);
/// AM channel spacing, counted from [`AM_MIN`].
pub const AM_CHANNEL_SPACING_KHZ: u16 = 9;

/// Checks that `frequency` lies in the FM band.
///
/// # Errors
///
/// Returns an error when the frequency is out of range.
pub fn validate_fm(frequency: FmFrequency) -> Result<FmFrequency, ValidationError> {
    if !(FM_MIN..=FM_MAX).contains(&frequency) {
        return Err(ValidationError::FmOutOfRange {
            value: frequency,
            min: FM_MIN,
            max: FM_MAX,
        });
    }
    Ok(frequency)
}

/// Checks a requested frequency in megahertz against the FM band, then
/// rounds it to hundredths.
///
/// The range check runs on the value as given, so 108.004 MHz is rejected
/// rather than rounded down onto the band edge.
///
/// ```
/// use nad_tuner::{FmFrequency, validate_fm_mhz};
///
/// assert_eq!(Ok(FmFrequency::from_centi_mhz(9680)), validate_fm_mhz(96.8));
/// assert!(validate_fm_mhz(108.004).is_err());
/// ```
///
/// # Errors
///
/// Returns an error when `mhz` is outside the band or not a number.
pub fn validate_fm_mhz(mhz: f64) -> Result<FmFrequency, ValidationError> {
    if !(FM_MIN.mhz()..=FM_MAX.mhz()).contains(&mhz) {
        return Err(ValidationError::FmRequestOutOfRange {
            mhz,
            min: FM_MIN,
            max: FM_MAX,
        });
    }
    validate_fm(FmFrequency::from_mhz(mhz)?)
}

/// Checks that `frequency` lies in the AM band and on its channel grid.
///
/// ```
/// use nad_tuner::{AmFrequency, ValidationError, validate_am};
///
/// assert!(validate_am(AmFrequency::from_khz(1008)).is_ok());
/// assert!(matches!(
///     validate_am(AmFrequency::from_khz(1009)),
///     Err(ValidationError::AmOffGrid { .. })
/// ));
/// ```
///
/// # Errors
///
/// Returns an error when the frequency is out of range or off the grid.
pub fn validate_am(frequency: AmFrequency) -> Result<AmFrequency, ValidationError> {
    if !(AM_MIN..=AM_MAX).contains(&frequency) {
        return Err(ValidationError::AmOutOfRange {
            value: frequency,
            min: AM_MIN,
            max: AM_MAX,
        });
    }
    if (frequency.khz() - AM_MIN.khz()) % AM_CHANNEL_SPACING_KHZ != 0 {
        return Err(ValidationError::AmOffGrid {
            value: frequency,
            base: AM_MIN,
            spacing_khz: AM_CHANNEL_SPACING_KHZ,
        });
    }
    Ok(frequency)
}
