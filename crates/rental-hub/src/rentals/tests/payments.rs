use super::common::*;
use crate::rentals::domain::Role;
use crate::rentals::error::RentalError;
use crate::rentals::lifecycle::{BookingStatus, PaymentStatus};
use crate::rentals::repository::{BookingLedger, Clock};

#[test]
fn payment_cannot_complete_before_acceptance() {
    let fx = fixture();
    let requested = fx.request_stay();

    let err = fx
        .service
        .complete_payment(TENANT, requested.booking.id)
        .expect_err("pending booking is not payable");

    assert!(matches!(err, RentalError::InvalidState(_)));
    let payment = fx
        .store
        .payment_for_booking(requested.booking.id)
        .expect("store readable")
        .expect("payment exists");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.transaction_id, None);
}

#[test]
fn tenant_pays_an_accepted_booking() {
    let fx = fixture();
    let accepted = fx.accepted_booking();

    let payment = fx
        .service
        .complete_payment(TENANT, accepted.booking.id)
        .expect("payment completes");

    assert_eq!(payment.status, PaymentStatus::Completed);
    let expected = format!(
        "TXN-{}-{}",
        accepted.booking.id,
        clock().now().timestamp()
    );
    assert_eq!(payment.transaction_id.as_deref(), Some(expected.as_str()));
    assert_eq!(
        fx.sink.titles_for(LANDLORD),
        vec!["New Booking Request", "Payment Received"]
    );

    let overview = fx.service.booking_overview(TENANT).expect("overview");
    assert_eq!(
        overview[0].payment.as_ref().map(|payment| payment.status),
        Some(PaymentStatus::Completed)
    );
}

#[test]
fn completed_payment_cannot_be_paid_again() {
    let fx = fixture();
    let accepted = fx.accepted_booking();
    let first = fx
        .service
        .complete_payment(TENANT, accepted.booking.id)
        .expect("first payment");

    let err = fx
        .service
        .complete_payment(TENANT, accepted.booking.id)
        .expect_err("already completed");

    assert!(matches!(err, RentalError::InvalidState(_)));
    let stored = fx
        .store
        .payment_for_booking(accepted.booking.id)
        .expect("store readable")
        .expect("payment exists");
    assert_eq!(stored, first);
}

#[test]
fn only_the_booking_tenant_can_pay() {
    let fx = fixture();
    fx.register(OTHER_TENANT, Role::Tenant);
    let accepted = fx.accepted_booking();

    for caller in [OTHER_TENANT, LANDLORD] {
        let err = fx
            .service
            .complete_payment(caller, accepted.booking.id)
            .expect_err("not the booking's tenant");
        assert!(matches!(err, RentalError::Authorization(_)));
    }
}

#[test]
fn failed_payment_can_be_retried() {
    let fx = fixture();
    let accepted = fx.accepted_booking();

    let failed = fx
        .service
        .fail_payment(TENANT, accepted.booking.id, "  ")
        .expect("failure recorded");
    assert_eq!(failed.status, PaymentStatus::Failed);

    let notice = fx
        .sink
        .sent()
        .into_iter()
        .find(|message| message.title == "Payment Failed")
        .expect("tenant told about failure");
    assert_eq!(notice.recipient, TENANT);
    assert!(notice.message.ends_with("declined by payment provider"));

    let retried = fx
        .service
        .complete_payment(TENANT, accepted.booking.id)
        .expect("retry succeeds");
    assert_eq!(retried.status, PaymentStatus::Completed);
}

#[test]
fn failed_payment_cannot_fail_twice() {
    let fx = fixture();
    let accepted = fx.accepted_booking();
    fx.service
        .fail_payment(TENANT, accepted.booking.id, "card expired")
        .expect("failure recorded");

    let err = fx
        .service
        .fail_payment(TENANT, accepted.booking.id, "card expired")
        .expect_err("already failed");

    assert!(matches!(err, RentalError::InvalidState(_)));
}

#[test]
fn completed_booking_is_no_longer_payable() {
    let fx = fixture();
    let accepted = fx.accepted_booking();
    fx.service
        .transition_booking(LANDLORD, accepted.booking.id, BookingStatus::Completed)
        .expect("stay completed");

    let err = fx
        .service
        .complete_payment(TENANT, accepted.booking.id)
        .expect_err("only accepted bookings are payable");

    assert!(matches!(err, RentalError::InvalidState(_)));
}

#[test]
fn rejected_booking_takes_no_payment_attempts() {
    let fx = fixture();
    let requested = fx.request_stay();
    let rejected = fx
        .service
        .transition_booking(LANDLORD, requested.booking.id, BookingStatus::Rejected)
        .expect("booking rejected");
    let before = fx.sink.sent().len();

    let completed = fx
        .service
        .complete_payment(TENANT, rejected.booking.id)
        .expect_err("rejected booking is not payable");
    let failed = fx
        .service
        .fail_payment(TENANT, rejected.booking.id, "card declined")
        .expect_err("rejected booking is not payable");

    assert!(matches!(completed, RentalError::InvalidState(_)));
    assert!(matches!(failed, RentalError::InvalidState(_)));
    let payment = fx
        .store
        .payment_for_booking(rejected.booking.id)
        .expect("store readable")
        .expect("payment exists");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.transaction_id, None);
    assert_eq!(fx.sink.sent().len(), before);
}

#[test]
fn payment_attempts_need_an_accepted_booking() {
    for status in [BookingStatus::Pending, BookingStatus::Rejected] {
        let fx = fixture();
        let requested = fx.request_stay();
        if status != BookingStatus::Pending {
            fx.service
                .transition_booking(LANDLORD, requested.booking.id, status)
                .expect("decision recorded");
        }

        for attempt in [
            fx.service.complete_payment(TENANT, requested.booking.id),
            fx.service.fail_payment(TENANT, requested.booking.id, ""),
        ] {
            let err = attempt.expect_err("not payable");
            assert!(matches!(err, RentalError::InvalidState(_)), "{status:?}: {err}");
        }
        assert_eq!(
            fx.store
                .payment_for_booking(requested.booking.id)
                .expect("store readable")
                .map(|payment| payment.status),
            Some(PaymentStatus::Pending),
            "{status:?}"
        );
    }
}
