pub mod booking;
pub mod customer;
pub mod housekeeping;
pub mod room;
pub mod room_service;
