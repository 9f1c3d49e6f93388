//! Version banner shared by `prefix-indexer` and `prefix-matchd`.

/// The workspace version, taken from this crate's own `Cargo.toml` at
/// compile time so every binary reports the same string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Renders the `--version` banner for a binary named `program`.
pub fn banner(program: &str) -> String {
    format!("{program} {VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_includes_program_name_and_version() {
        let rendered = banner("prefix-matchd");
        assert!(rendered.starts_with("prefix-matchd "));
        assert!(rendered.ends_with(VERSION));
    }
}
