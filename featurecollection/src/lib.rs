//! Streams Who's On First features into a single GeoJSON FeatureCollection.
//!
//! The [`encoder::FeatureCollectionEncoder`] writes the collection header on
//! construction, appends one body per feature as features arrive and writes
//! the footer when it is closed.

pub mod encoder;
pub mod error;
pub mod feature;
pub mod spr;

pub use encoder::{EncodeMode, EncoderChannels, EncoderOptions, FeatureCollectionEncoder};
pub use error::{EncoderError, ErrorPhase, FeatureError, FeatureWarning, FinalizeError};
pub use feature::{Feature, WofFeature};
pub use spr::StandardPlacesResponse;
