//! Packet source implementations
//!
//! - [`LiveReader`] polls the ECM through any [`Acquire`](crate::provider::Acquire) link;
//!   each connection reads its latest packet through a [`LiveSource`]
//! - [`SerialLink`] is the serial port link to a real ECM
//! - [`SyntheticSource`] generates plausible engine data when no ECM answers

pub mod live;
pub mod serial;
pub mod synthetic;

pub use live::{LiveReader, LiveSource};
pub use serial::{DEFAULT_BAUD_RATE, RT_DATA_REQUEST, SerialLink, SerialSettings};
pub use synthetic::{
    SYNTHETIC_RPM_MAX, SYNTHETIC_RPM_MIN, SYNTHETIC_TEMP_RANGE, SYNTHETIC_VOLTAGE_RANGE, SyntheticSample,
    SyntheticSource,
};
