pub mod cloudflare;
pub mod migrate;
pub mod pages;
pub mod plans;
pub mod users;
