/// User agent sent with every generated request, e.g. `loadgen/0.1.0`.
pub const fn user_agent() -> &'static str {
    concat!("loadgen/", env!("CARGO_PKG_VERSION"))
}
