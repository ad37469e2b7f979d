// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_ACTIVE: &str = "session.active";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const LOGIN_SUCCEEDED: &str = "login.succeeded";
pub const LOGIN_FAILED: &str = "login.failed";
pub const LOGIN_LOCKED_OUT: &str = "login.locked_out";
pub const REGISTERED: &str = "identity.registered";
pub const FEDERATED_LOGIN: &str = "federated.login";
pub const FEDERATED_CREATED: &str = "federated.created";
pub const SECRET_SUBMITTED: &str = "secret.submitted";
