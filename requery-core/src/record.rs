//! Types and traits for recording values obtained during training and evaluation.
//!
//! * [`Record`] - A container for key-value pairs of various data types
//! * [`RecordValue`] - The types of values that can be stored
//! * [`Recorder`] - The interface for writing and aggregating records
//! * [`BufferedRecorder`] - Keeps records in memory, used for inspection in tests
//! * [`LogRecorder`] - Writes records and aggregated scalars through [`log`]
//! * [`NullRecorder`] - Discards all records
//!
//! # Basic Usage
//!
//! ```rust
//! use requery_core::record::{Record, RecordValue};
//!
//! // following values are obtained with some process in reality
//! let episode = 1;
//! let features = vec![1f32, 2.0, 3.0, 0.0];
//! let reward = -1f32;
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(episode as f32));
//! record.insert("reward", RecordValue::Scalar(reward));
//! record.insert("features", RecordValue::Array1(features));
//! record.insert("query", RecordValue::String("treatment for diabetes".to_string()));
//! ```
//!
//! The [`Trainer`](crate::Trainer) stores a record per episode in a [`Recorder`].
mod base;
mod buffered_recorder;
mod log_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
