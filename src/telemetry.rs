/// Initializes structured logging the same way the teacher's `main.rs` does —
/// `tracing_subscriber::fmt` with an env filter — generalized to this crate's name.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_thread_ids(true)
        .with_target(true)
        .with_env_filter("xigi_core=debug,tower_http=debug")
        .init();
}
