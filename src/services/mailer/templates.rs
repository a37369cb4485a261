//! Email bodies for booking lifecycle events.

use crate::models::{Booking, Service, User};

pub fn confirmation_subject(service: &Service) -> String {
    format!("Your {} booking is confirmed", service.name)
}

pub fn confirmation_body(client: &User, booking: &Booking, service: &Service) -> String {
    format!(
        "<h2>Booking confirmed</h2>\
         <p>Hello {first},</p>\
         <p>Your <strong>{service}</strong> session has been confirmed.</p>\
         <ul>\
           <li>Date: {date}</li>\
           <li>Time: {start} - {end}</li>\
           <li>Total: {total:.2} {currency}</li>\
         </ul>\
         <p>We look forward to seeing you.</p>",
        first = client.first_name,
        service = service.name,
        date = booking.booking_date.format("%Y-%m-%d"),
        start = booking.start_time,
        end = booking.end_time,
        total = booking.pricing.total_amount,
        currency = booking.pricing.currency,
    )
}

pub fn cancellation_subject(service: &Service) -> String {
    format!("Your {} booking was cancelled", service.name)
}

pub fn cancellation_body(
    client: &User,
    booking: &Booking,
    service: &Service,
    reason: &str,
) -> String {
    format!(
        "<h2>Booking cancelled</h2>\
         <p>Hello {first},</p>\
         <p>Your <strong>{service}</strong> session on {date} at {start} has been cancelled.</p>\
         <p>Reason: {reason}</p>\
         <p>If this is unexpected, please contact us.</p>",
        first = client.first_name,
        service = service.name,
        date = booking.booking_date.format("%Y-%m-%d"),
        start = booking.start_time,
        reason = reason,
    )
}

pub fn payment_received_subject(service: &Service) -> String {
    format!("Payment received for your {} booking", service.name)
}

pub fn payment_received_body(client: &User, booking: &Booking, service: &Service) -> String {
    format!(
        "<h2>Payment received</h2>\
         <p>Hello {first},</p>\
         <p>We received your payment of {total:.2} {currency} for the \
         <strong>{service}</strong> session on {date}.</p>\
         <p>Your booking is awaiting final confirmation by our team.</p>",
        first = client.first_name,
        total = booking.pricing.total_amount,
        currency = booking.pricing.currency,
        service = service.name,
        date = booking.booking_date.format("%Y-%m-%d"),
    )
}
