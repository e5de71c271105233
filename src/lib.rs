//! Shortcut API client
//!
//! This library provides a client for the Shortcut asynchronous
//! video-processing service: upload a video, track the server-side job to
//! completion, and retrieve the produced artifacts (main video, generated
//! shorts, subtitles).
//!
//! The core is the polling state machine in [`services::poll`]; upload and
//! results retrieval sit behind the [`services::client::Uploader`] and
//! [`services::client::ResultsFetcher`] traits, with the production HTTP
//! implementation in [`services::api`].

pub mod config;
pub mod models;
pub mod services;
