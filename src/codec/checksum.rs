/// Computes the trailing checksum of a logical command.
///
/// The checksum is the two's complement of the wrapping byte sum, so a payload
/// followed by its checksum sums to zero modulo 256.
///
/// ```
/// assert_eq!(214, nad_tuner::checksum(&[1, 20, 21]));
/// ```
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    (!sum).wrapping_add(1)
}
