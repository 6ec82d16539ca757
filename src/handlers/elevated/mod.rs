// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Route prefix: /api/admin/*
// Middleware: jwt_auth_middleware, then require_admin_middleware

pub mod plans;
pub mod users;
