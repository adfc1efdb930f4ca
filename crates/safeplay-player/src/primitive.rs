//! The narrow surface of the platform playback primitive.

use crossbeam_channel::Sender;
use safeplay_core::{Millis, PrimitiveError};

/// Asynchronous callbacks raised by the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveEvent {
    /// An asynchronous prepare finished.
    Prepared,
    /// Playback reached the end of the stream.
    Completion,
    /// Buffered share of the stream, in percent.
    BufferingUpdate(u8),
    /// The primitive entered its error state.
    Error { what: i32, extra: i32 },
}

/// Channel the primitive posts its callbacks to. The receiving end lives on
/// the thread that owns the player.
pub type EventSink = Sender<PrimitiveEvent>;

/// Operations the player intercepts. Implementations may fail on any call
/// made in a state they do not allow; the wrapper keeps that from happening.
pub trait MediaPrimitive: Send {
    /// Install the sink for asynchronous callbacks. Called once, at wrap time.
    fn set_event_sink(&mut self, sink: EventSink);

    fn set_data_source(&mut self, source: &str) -> Result<(), PrimitiveError>;

    /// Begin preparing. Completion is reported with [`PrimitiveEvent::Prepared`].
    fn prepare_async(&mut self) -> Result<(), PrimitiveError>;

    fn start(&mut self) -> Result<(), PrimitiveError>;

    fn pause(&mut self) -> Result<(), PrimitiveError>;

    fn stop(&mut self) -> Result<(), PrimitiveError>;

    fn seek_to(&mut self, position: Millis) -> Result<(), PrimitiveError>;

    /// Return to the idle state, forgetting the data source.
    fn reset(&mut self);

    /// Free the underlying resources. The primitive is unusable afterwards.
    fn release(&mut self);

    fn is_playing(&self) -> bool;

    fn current_position(&self) -> Millis;

    /// Media duration, once known.
    fn duration(&self) -> Option<Millis>;
}

/// Builds fresh primitives, used when a fatal fault forces recreation.
pub trait PrimitiveFactory {
    type Primitive: MediaPrimitive;

    fn create(&mut self) -> Self::Primitive;
}

impl<F, P> PrimitiveFactory for F
where
    F: FnMut() -> P,
    P: MediaPrimitive,
{
    type Primitive = P;

    fn create(&mut self) -> P {
        self()
    }
}
