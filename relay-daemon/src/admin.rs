use subtle::ConstantTimeEq;

/// Compares `presented` against the configured credential set in
/// constant time per credential, fail-closed when the set is empty
/// (admin surface unconfigured).
pub fn admin_credential_ok(configured: &[String], presented: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    let presented = presented.as_bytes();
    configured
        .iter()
        .any(|candidate| candidate.as_bytes().ct_eq(presented).into())
}
