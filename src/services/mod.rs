pub mod availability;
pub mod lifecycle;
pub mod mailer;
pub mod notifier;
pub mod payments;
pub mod stats;
