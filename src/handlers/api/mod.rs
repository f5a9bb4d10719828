pub mod profile_handler;
pub mod report;
pub mod timeline_handler;

pub use profile_handler::fetch_profile;
pub use timeline_handler::fetch_posts;
