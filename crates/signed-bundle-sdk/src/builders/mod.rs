//! Release artifact builders.
//!
//! | Builder | Platform | Output |
//! |---------|----------|--------|
//! | [`AndroidArtifactBuilder`] | Android | Release App Bundle, or a copy of the unsigned release APK |
//!
//! Builders never spawn tools themselves; external commands go through a
//! [`crate::process::ProcessRunner`].

pub mod android;

pub use android::{AndroidArtifactBuilder, signed_copy_path};
