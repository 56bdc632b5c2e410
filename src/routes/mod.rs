/// Router Module Index
///
/// Routing is segregated by access policy, and the policy table is the router
/// composition itself: which module a route lives in decides whether the auth
/// middleware runs for it. Assembled once at startup, immutable afterwards.

/// Routes accessible without any credential: health, registration, login.
pub mod public;

/// Routes behind the auth middleware, open to any authenticated role.
pub mod authenticated;

/// Owner-detail routes. Also behind the auth middleware; the admin role
/// requirement is enforced inside each handler, not in the pipeline.
pub mod owner;

/// OTP send/verify routes. Merged into the public or the protected router at
/// startup, depending on `AppConfig::otp_requires_auth`.
pub mod otp;
