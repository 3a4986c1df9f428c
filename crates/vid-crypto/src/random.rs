//! Random byte generation through the `random` capability.

use zeroize::Zeroizing;

use crate::capability::RandomSource;
use crate::error::CryptoError;

/// Upper bound on a single `random_bytes` request.
pub const MAX_RANDOM_BYTES: usize = 1 << 20;

/// `length` bytes from `source`.
///
/// # Errors
///
/// `InvalidArgument` when `length` is zero or above [`MAX_RANDOM_BYTES`];
/// whatever the source reports when it cannot supply entropy.
pub fn random_bytes(source: &dyn RandomSource, length: usize) -> Result<Vec<u8>, CryptoError> {
    if length == 0 {
        return Err(CryptoError::InvalidArgument("random length must be positive".into()));
    }
    if length > MAX_RANDOM_BYTES {
        return Err(CryptoError::InvalidArgument(format!(
            "random length {length} exceeds {MAX_RANDOM_BYTES}"
        )));
    }
    let mut out = vec![0u8; length];
    source.fill(&mut out)?;
    Ok(out)
}

/// Fixed-size secret material from `source`, zeroized on drop.
pub(crate) fn random_array<const N: usize>(
    source: &dyn RandomSource,
) -> Result<Zeroizing<[u8; N]>, CryptoError> {
    let mut out = Zeroizing::new([0u8; N]);
    source.fill(&mut out[..])?;
    Ok(out)
}
