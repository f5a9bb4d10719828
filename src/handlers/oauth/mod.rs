pub mod browser;
pub mod callback_handler;
pub mod login_handler;
pub mod token_handler;
