use std::collections::HashSet;

use concierge_core::domain::customer::CustomerId;
use concierge_db::{
    connect_with_settings, migrations, BookingRepository, CustomerRepository, DbPool,
    HousekeepingRepository, RoomServiceRepository, SampleStay, SqlBookingRepository,
    SqlCustomerRepository, SqlHousekeepingRepository, SqlRoomServiceRepository,
};

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn seeded_pool() -> ContractResult<(DbPool, SampleStay)> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    let stay = SampleStay::insert(&pool).await.map_err(|error| format!("seed: {error}"))?;
    Ok((pool, stay))
}

#[tokio::test]
async fn inserted_stay_reads_back_unchanged() -> ContractResult {
    let (pool, stay) = seeded_pool().await?;
    let customers = SqlCustomerRepository::new(pool.clone());
    let bookings = SqlBookingRepository::new(pool.clone());

    let guest = customers
        .find_by_email("MARIA.GARCIA@example.com ")
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(guest.as_ref(), Some(&stay.guest));

    let stored = bookings
        .list_for_customer(&stay.guest.id, false)
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(stored.len(), 2);
    require!(stored.contains(&stay.past_booking), "past booking should round-trip");
    require!(stored.contains(&stay.current_booking), "current booking should round-trip");

    let active = bookings
        .list_for_customer(&stay.guest.id, true)
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(active, vec![stay.current_booking.clone()]);

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn guest_listings_never_leak_other_guests_records() -> ContractResult {
    let (pool, stay) = seeded_pool().await?;
    let housekeeping = SqlHousekeepingRepository::new(pool.clone());
    let room_service = SqlRoomServiceRepository::new(pool.clone());

    let own_bookings: HashSet<i64> =
        [stay.past_booking.id.0, stay.current_booking.id.0].into_iter().collect();

    let requests =
        housekeeping.list_for_guest(&stay.guest.id).await.map_err(|error| error.to_string())?;
    require_eq!(requests.len(), 4);
    require!(
        requests.iter().all(|request| own_bookings.contains(&request.booking_id.0)),
        "housekeeping listing contained a foreign booking"
    );

    let orders =
        room_service.list_for_guest(&stay.guest.id).await.map_err(|error| error.to_string())?;
    require_eq!(orders.len(), 3);
    require!(
        orders.iter().all(|order| own_bookings.contains(&order.booking_id.0)),
        "room service listing contained a foreign booking"
    );

    let nobody =
        housekeeping.list_for_guest(&CustomerId(404)).await.map_err(|error| error.to_string())?;
    require!(nobody.is_empty(), "unknown guest should have no requests");

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn active_listings_are_newest_first_and_active_only() -> ContractResult {
    let (pool, stay) = seeded_pool().await?;
    let housekeeping = SqlHousekeepingRepository::new(pool.clone());
    let room_service = SqlRoomServiceRepository::new(pool.clone());

    let requests =
        housekeeping.active_for_guest(&stay.guest.id).await.map_err(|error| error.to_string())?;
    let ids: Vec<i64> = requests.iter().map(|request| request.id.0).collect();
    require_eq!(ids, vec![1, 2]);
    require!(requests.iter().all(|request| request.status.is_active()));

    let orders =
        room_service.active_for_guest(&stay.guest.id).await.map_err(|error| error.to_string())?;
    let ids: Vec<i64> = orders.iter().map(|order| order.id.0).collect();
    require_eq!(ids, vec![1, 2]);
    require!(
        orders.windows(2).all(|pair| pair[0].request_date >= pair[1].request_date),
        "active orders should be newest first"
    );

    pool.close().await;
    Ok(())
}
