mod activity;
mod contact;
mod lead;
mod payment;
mod payment_link;
mod proposal;
mod webhook_event;

pub use activity::*;
pub use contact::*;
pub use lead::*;
pub use payment::*;
pub use payment_link::*;
pub use proposal::*;
pub use webhook_event::*;
