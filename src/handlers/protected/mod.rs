// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix: /api/*
// Middleware: jwt_auth_middleware injects `AuthUser`; `AppState` arrives as an Extension.

pub mod billing;
pub mod events;
pub mod incidents;
pub mod pages;
pub mod session;
pub mod settings;
