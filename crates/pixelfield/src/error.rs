/// Construction-time failures of the GPU path.
///
/// All variants describe an environment that cannot run the effect; they are
/// handled by degrading to an inert instance rather than surfaced to the host
/// as hard errors. A malformed embedded shader is a defect in this crate and
/// panics inside `wgpu` validation instead of appearing here.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("no compatible GPU adapter is available: {0}")]
    ContextUnavailable(String),
    #[error("failed to create rendering surface: {0}")]
    SurfaceCreation(String),
    #[error("GPU device request failed: {0}")]
    DeviceRequest(String),
}
