//! TuneFlow - a catalog-backed music player core
//!
//! Keeps an embedded streaming player alive and controllable when the host
//! app goes to the background: a silent audio keep-alive, the system media
//! control surface, visibility reconciliation and a heuristic that skips
//! short pre-roll ads.

pub mod audio;
pub mod library;
pub mod media_session;
pub mod player;
pub mod utils;
