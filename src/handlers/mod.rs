pub mod api;
pub mod oauth;
