pub mod booking;
pub mod notification;
pub mod service;
pub mod user;

pub use booking::{
    minutes_to_time, time_to_minutes, validate_interval, Address, Booking, BookingStatus,
    Cancellation, Location, Participant, Participants, PaymentStatus, Photographer, Pricing,
    StatusChange,
};
pub use notification::{Notification, NotificationKind};
pub use service::Service;
pub use user::{Role, User};
