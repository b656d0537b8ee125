//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `auth` - Signup, login, password reset and profile management
//! - `tts` - Metered text-to-speech, text upload and script validation
//! - `sts` - Metered speech-to-speech conversion
//! - `cloning` - Metered synthesis with premium cloned voices
//! - `voices` - Provider voice listing, cloning and deletion
//! - `history` - Per-account operation history and statistics
//! - `audio` - Generated audio download
//! - `admin` - Usage analytics behind the admin key

pub mod admin;
pub mod api;
pub mod audio;
pub mod auth;
pub mod cloning;
pub mod history;
pub mod metered;
pub mod sts;
pub mod tts;
pub mod voices;
