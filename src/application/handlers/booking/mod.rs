//! Booking events from the scheduling subsystem.

mod booking_event;

pub use booking_event::{BookingEvent, BookingEventHandler, BookingOutcome, LessonBooking, SCHEDULER_ACTOR};
