// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login;    // POST /auth/login - authenticate and get JWT
pub mod register; // POST /auth/register - create new account
mod utils;

pub use login::login_post;
pub use register::register_post;
