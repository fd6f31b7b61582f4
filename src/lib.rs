//! Lectern - subtitle generation and on-demand English translation
//!
//! Course videos are transcribed offline into WebVTT subtitles with a language
//! record; English translations are produced in one batched call the first
//! time a viewer needs them and cached next to the original.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod media;
pub mod metadata;
pub mod setup;
pub mod storage;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod viewer;
pub mod workflow;
