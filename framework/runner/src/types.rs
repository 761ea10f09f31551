/// Recommended error type for a scenario `main` function and any shared behaviour code written
/// for hooks. This type is compatible with [crate::prelude::HookResult] so `?` propagates.
pub type GustResult<T> = anyhow::Result<T>;
