// handlers/public/mod.rs - Public handlers (no authentication)
//
// Token acquisition, published page views, the edge responder and the
// Stripe webhook. Input here is untrusted.

pub mod auth;
pub mod edge;
pub mod pages;
pub mod webhook;
