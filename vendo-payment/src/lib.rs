pub mod manager;
pub mod mock;
pub mod poll;

pub use manager::PaymentManager;
pub use mock::MockGateway;
pub use poll::{poll_until_terminal, PollOutcome, PollPolicy};
