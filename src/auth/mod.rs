//! Log-in, log-out and registration, the per-request session and the guard
//! that keeps anonymous users out of the app screens.

mod cookie;
mod log_in;
mod log_out;
mod protected_route;
mod redirect;
mod register;
mod session;
mod token;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use protected_route::{protected_route, protected_route_hx};
pub use register::{get_register_page, register_user};
pub use session::{AuthUser, Session, session_layer};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, set_auth_cookie};
