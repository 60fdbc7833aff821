/// Whether `identity` may unlock a lock held by `owner`.
///
/// Exact, case-sensitive comparison. This only gates UI controls; the server enforces ownership.
pub fn can_mutate(owner: &str, identity: &str) -> bool {
    owner == identity
}
