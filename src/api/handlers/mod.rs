//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod redirect;
pub mod shorten;
pub mod user_links;

pub use health::{health_handler, ping_handler};
pub use redirect::redirect_handler;
pub use shorten::{shorten_batch_handler, shorten_json_handler, shorten_plain_handler};
pub use user_links::{delete_user_links_handler, list_user_links_handler};
