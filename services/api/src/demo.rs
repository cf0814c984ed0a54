use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use rental_hub::error::AppError;
use rental_hub::rentals::{
    Bhk, BookingStatus, Clock, FixedClock, IdentityId, InMemoryBlobStore, InMemoryRentalStore,
    InlineNotifier, ListingDraft, ModelType, RentalError, RentalService, Role,
};
use rust_decimal::Decimal;
use std::sync::Arc;

const DEMO_LANDLORD: IdentityId = IdentityId(1);
const DEMO_TENANT: IdentityId = IdentityId(2);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Length of the demo stay in nights.
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=365))]
    pub(crate) nights: u32,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let (start, end) = demo_stay(today, args.nights).ok_or_else(|| {
        RentalError::Validation(format!(
            "a {}-night stay from {today} runs past the supported calendar",
            args.nights
        ))
    })?;
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(today));
    let store = Arc::new(InMemoryRentalStore::new());
    let notifier = Arc::new(InlineNotifier::new(store.clone(), clock.clone()));
    let service = RentalService::new(
        store,
        notifier,
        Arc::new(InMemoryBlobStore::default()),
    )
    .with_clock(clock);

    println!("== Rental Hub Demo ({today}) ==");

    let landlord = service.register_profile(
        DEMO_LANDLORD,
        Role::Landlord,
        "555-0100",
        "14 Harbour View",
    )?;
    let tenant =
        service.register_profile(DEMO_TENANT, Role::Tenant, "555-0200", "3 College Road")?;
    println!(
        "Profiles: landlord #{} (identity {}), tenant #{} (identity {})",
        landlord.id, landlord.identity, tenant.id, tenant.identity
    );

    let listing = service.create_listing(DEMO_LANDLORD, demo_listing())?;
    println!(
        "Listing #{}: {} [{}] at {} per stay",
        listing.id,
        listing.title,
        listing.bhk.label(),
        listing.price
    );

    let requested = service.create_booking(DEMO_TENANT, listing.id, start, end)?;
    println!(
        "Booking #{} requested for {start} to {end} (status {})",
        requested.booking.id,
        requested.booking.status.label()
    );
    if let Some(payment) = &requested.payment {
        println!(
            "  Payment #{} of {} created ({})",
            payment.id,
            payment.amount,
            payment.status.label()
        );
    }

    if let Err(err) = service.complete_payment(DEMO_TENANT, requested.booking.id) {
        println!("  Early payment attempt refused: {err}");
    }

    let accepted =
        service.transition_booking(DEMO_LANDLORD, requested.booking.id, BookingStatus::Accepted)?;
    println!(
        "Booking #{} {} by landlord (version {})",
        accepted.booking.id,
        accepted.booking.status.label(),
        accepted.booking.version
    );

    let payment = service.complete_payment(DEMO_TENANT, requested.booking.id)?;
    println!(
        "Payment #{} {}: {}",
        payment.id,
        payment.status.label(),
        payment.transaction_id.as_deref().unwrap_or("no transaction id")
    );

    for (label, identity) in [("Landlord", DEMO_LANDLORD), ("Tenant", DEMO_TENANT)] {
        let inbox = service.inbox(identity, false)?;
        println!("{label} inbox ({} messages):", inbox.len());
        for notification in inbox {
            println!("  - {}: {}", notification.title, notification.message);
        }
    }

    let dashboard = service.landlord_dashboard(DEMO_LANDLORD)?;
    match serde_json::to_string_pretty(&dashboard.bookings) {
        Ok(json) => println!("Landlord booking overview:\n{json}"),
        Err(err) => println!("Landlord booking overview unavailable: {err}"),
    }

    Ok(())
}

fn demo_stay(today: NaiveDate, nights: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = today.checked_add_signed(Duration::days(1))?;
    let end = start.checked_add_signed(Duration::days(i64::from(nights.max(1))))?;
    Some((start, end))
}

fn demo_listing() -> ListingDraft {
    ListingDraft {
        title: "Harbour View 2BHK".to_string(),
        description: "Furnished two-bedroom flat overlooking the marina".to_string(),
        address: "14 Harbour View, Unit 5".to_string(),
        price: Decimal::new(45000, 0),
        bhk: Bhk::TwoBhk,
        model_type: ModelType::New,
        year_built: Some(2012),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_end_to_end() {
        let args = DemoArgs {
            today: NaiveDate::from_ymd_opt(2025, 5, 20),
            nights: 3,
        };
        run_demo(args).expect("demo completes");
    }

    #[test]
    fn stay_dates_stop_at_the_calendar_edge() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date");
        assert_eq!(
            demo_stay(today, 3),
            Some((
                NaiveDate::from_ymd_opt(2025, 5, 21).expect("valid date"),
                NaiveDate::from_ymd_opt(2025, 5, 24).expect("valid date"),
            ))
        );
        assert_eq!(demo_stay(NaiveDate::MAX, 1), None);

        let err = run_demo(DemoArgs {
            today: Some(NaiveDate::MAX),
            nights: 7,
        })
        .expect_err("no room for the stay");
        assert!(matches!(err, AppError::Rental(RentalError::Validation(_))));
    }

    #[test]
    fn demo_listing_is_priced_for_the_walkthrough() {
        assert_eq!(demo_listing().price, Decimal::new(45000, 0));
    }
}
