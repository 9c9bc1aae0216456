/// Config for a container
/// ## Fields
/// - `on_missing`:
///   What a required resolution does when no registration is found anywhere up the container chain.
///
///   Optional resolutions are never affected, they return `None` regardless of the policy.
///
/// Child containers inherit the config of their parent unless created with their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub on_missing: MissingPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Return [`crate::ResolveErrorKind::NotRegistered`] to the caller.
    #[default]
    Error,
    /// Panic with the error message.
    /// Useful when a missing registration is always a wiring bug of the application.
    Panic,
}
