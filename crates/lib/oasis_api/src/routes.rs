//! Route paths. Auth paths are relative to the `/auth` prefix.

pub const AUTH_PREFIX: &str = "/auth";

pub const POST_REGISTER: &str = "/register";
pub const POST_LOGIN: &str = "/login";
pub const POST_REFRESH_TOKEN: &str = "/refresh-token";
pub const POST_REQUEST_PASSWORD_RESET: &str = "/request-password-reset";
pub const POST_RESET_PASSWORD: &str = "/reset-password";

pub const POST_LOGOUT: &str = "/logout";
pub const PROFILE: &str = "/profile";
pub const POST_CHANGE_PASSWORD: &str = "/change-password";
pub const GET_VERIFY_TOKEN: &str = "/verify-token";
pub const GET_SESSION: &str = "/session";

pub const GET_HEALTH: &str = "/health";
