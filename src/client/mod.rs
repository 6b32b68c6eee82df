//! Reconnecting timeline consumer for the outermost hop.

pub mod consumer;
pub mod timeline;

pub use consumer::{EventTransport, TimelineConsumer};
pub use timeline::{NullHandler, PrintHandler, Timeline, TimelineHandler, describe};
