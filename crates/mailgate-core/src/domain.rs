//! Local-domain matching for the anonymous relay policy

/// Whether `address` belongs to one of the configured local domains.
///
/// The address is lower-cased and checked for `"@" + domain` as a
/// substring; the input can be a full `Mail From:<user@host>` envelope
/// string, not just a bare address. Containment is deliberately not
/// anchored to the end of the address: a configured `a.com` also matches
/// `x@a.com.evil.com`. That permissiveness is long-standing behavior that
/// authorization outcomes depend on; do not tighten it to a suffix match
/// without an operator-level decision.
pub fn is_local_address(address: &str, domains: &[String]) -> bool {
    let address = address.to_lowercase();
    domains
        .iter()
        .any(|domain| address.contains(&format!("@{}", domain)))
}
