//! Chat turn pipeline: conversation state, streaming aggregation, events.

pub mod aggregator;
pub mod attachments;
pub mod conversation;
pub mod events;
pub mod session;

pub use aggregator::ResponseAggregator;
pub use attachments::{Attachment, MAX_ATTACHMENTS};
pub use conversation::{Conversation, Role, TurnMessage};
pub use events::{
    ChatEvent, ChatEventRx, ChatEventTx, ErrorKind, EventSender, create_event_channel,
};
pub use session::{ChatMode, ChatSession};
