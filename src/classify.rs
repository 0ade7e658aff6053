//! Classification of `rpm -qa` output into unsigned packages and signing keys.
//!
//! Each line looks like `<name>-<version>-<release> <signature>` where a signed package's
//! signature contains `, Key ID <hex>` and an unsigned one reads `(none)`.

/// Marker present in the signature field of every signed package.
pub const KEY_ID_MARKER: &str = "Key ID";

/// Imported trust keys show up as packages with this prefix.  They are never signed.
pub const GPG_PUBKEY_PREFIX: &str = "gpg-pubkey";

const KEY_ID_SEPARATOR: &str = ", Key ID ";

/// Returns the NVR of every unsigned package, in query order.
///
/// `gpg-pubkey` entries are skipped, as are blank lines.
pub fn unsigned_rpms<S: AsRef<str>>(rpms: &[S]) -> Vec<String> {
    rpms.iter()
        .map(AsRef::as_ref)
        .filter(|rpm| !rpm.contains(KEY_ID_MARKER) && !rpm.starts_with(GPG_PUBKEY_PREFIX))
        .filter_map(|rpm| rpm.split_whitespace().next())
        .map(String::from)
        .collect()
}

/// Returns the signing key of every signed package, in query order, duplicates included.
pub fn signed_rpms_keys<S: AsRef<str>>(rpms: &[S]) -> Vec<String> {
    rpms.iter()
        .map(AsRef::as_ref)
        .filter(|rpm| rpm.contains(KEY_ID_MARKER))
        .map(|rpm| match rpm.rsplit_once(KEY_ID_SEPARATOR) {
            Some((_, key)) => key,
            None => rpm,
        })
        .map(String::from)
        .collect()
}
