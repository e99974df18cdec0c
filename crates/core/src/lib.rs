pub mod config;
pub mod domain;
pub mod errors;
pub mod pagination;
pub mod stats;

pub use domain::booking::{Booking, BookingId, BookingStatus};
pub use domain::customer::{Customer, CustomerId};
pub use domain::housekeeping::{
    HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus,
    HousekeepingRequestType, NewHousekeepingRequest,
};
pub use domain::room::{Room, RoomId, RoomType};
pub use domain::room_service::{
    NewRoomServiceOrder, RoomServiceId, RoomServiceOrder, RoomServiceStatus, RoomServiceType,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pagination::{Page, PageRequest};
