//! # Events Module
//!
//! Everything the sorter does that a UI might want to show is published as
//! an [`Event`] on a channel.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     while let Some(event) = receiver.recv() {
//!         match event {
//!             Event::Pending(PendingEvent::Scheduled(file)) => {
//!                 println!("{} moves at {}", file.file_name, file.move_at)
//!             }
//!             Event::Move(MoveEvent::Completed { record }) => {
//!                 println!("moved to {}", record.new_path.display())
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//!
//! let sorter = AutoSorter::builder().events(sender).build()?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
