//! Core genome trait
//!
//! The scheduler never looks inside a genome. It only moves, clones and
//! serializes it, so the bound is kept to exactly those capabilities.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Opaque genome representation.
///
/// Encodings and their variation operators live outside this crate. Any type
/// that can be cloned, sent between threads and written into a checkpoint
/// qualifies, so the trait is blanket-implemented.
pub trait Genome: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Genome for T where T: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {}
