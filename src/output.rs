use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `VECTRA_QUIET=1` (or `true`) turns off colors, progress bars and banners
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("VECTRA_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
