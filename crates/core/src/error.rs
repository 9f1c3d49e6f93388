//! Cross-cutting error categories (§7 of the specification).
//!
//! Each crate that needs a richer error type defines its own `thiserror`
//! enum ([`trie::TrieError`](../trie/enum.TrieError.html),
//! `daemon::ProtocolError`, `daemon::ConfigError`); this module only houses
//! the categories that are genuinely shared, so that crates agree on how a
//! failure is classified even when the concrete error type differs.

/// How a failure should be handled by its caller.
///
/// This mirrors §7's taxonomy without prescribing a concrete error type:
/// `ProtocolError` and `ResourceError` close or drain a connection,
/// `LookupMiss` is not an error at all (it is a successful empty result),
/// `ReloadBusy` is logged and retried later, and `ConfigError`/`IoError` are
/// the only categories that can be fatal (and only at start-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The connection is closed; no reply is owed.
    CloseConnection,
    /// A reply with an error status is owed, then the connection continues.
    RespondWithError,
    /// Not an error: an empty successful result.
    EmptyResult,
    /// Logged, not fatal, no reply owed (e.g. a concurrent reload request).
    Informational,
    /// The process cannot continue; only valid at start-up.
    Fatal,
}

#[cfg(test)]
mod tests {
    use super::Severity;

    #[test]
    fn severities_are_distinct() {
        assert_ne!(Severity::Fatal, Severity::Informational);
    }
}
