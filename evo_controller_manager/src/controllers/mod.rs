//! Controller types shipped with the manager binary.

mod forward_command;
mod state_broadcaster;

pub use forward_command::ForwardCommandController;
pub use state_broadcaster::StateBroadcaster;
