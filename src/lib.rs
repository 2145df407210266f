//! Calvificador: upload a photo, a generative image model removes the
//! person's hair, and the page shows a before/after comparison slider.
//!
//! The binary serves an embedded page and keeps the upload → processing →
//! result/failed flow server-side, where it is a plain testable state
//! machine ([`state::Controller`]) fed by an injected [`gemini::ImageGenerator`].

pub mod config;
pub mod gemini;
pub mod routes;
pub mod state;
