//! Layout digest computation for instance fingerprints

use crate::error::LayoutError;
use crate::layout::LayoutConstraintSet;
use crate::types::Hash;
use blake3::Hasher;

/// Compute the digest of a constraint set
///
/// digest = hash("layout:" || bincode(constraints))
///
/// Field order and dimension order are part of the encoding, so two sets that lay out the
/// same fields differently never share a digest.
pub fn compute_layout_digest(constraints: &LayoutConstraintSet) -> Result<Hash, LayoutError> {
    let encoded =
        bincode::serialize(constraints).map_err(|e| LayoutError::Encoding(e.to_string()))?;

    let mut hasher = Hasher::new();
    hasher.update(b"layout:");
    hasher.update(&encoded);

    Ok(*hasher.finalize().as_bytes())
}
