use givebridge::db::models::{DonationStatus, MatchStatus, RequestStatus, Urgency};
use givebridge::db::{self, DbPool};
use givebridge::error::AppError;
use givebridge::lifecycle::{self, DonationAction, RequestAction};
use givebridge::matching;
use uuid::Uuid;

fn test_pool() -> DbPool {
    let url = format!("file:itest-{}?mode=memory&cache=shared", Uuid::new_v4());
    db::init_pool_at(&url).expect("init pool")
}

async fn seed_donor_and_ngo(pool: &DbPool) -> (i64, i64) {
    let donor_id =
        db::create_donor(pool, "Dana", "dana@example.org", "", "", "Springfield", "", "")
            .await
            .expect("create donor");
    let ngo_id =
        db::create_ngo(pool, "Harvest Hope", "hope@springfield.org", "", "", "", "Springfield", "", "")
            .await
            .expect("create ngo");
    (donor_id, ngo_id)
}

#[tokio::test]
async fn accept_succeeds_once_then_conflicts() {
    let pool = test_pool();
    let (donor_id, ngo_id) = seed_donor_and_ngo(&pool).await;
    let donation_id = db::create_donation(&pool, donor_id, "Warm socks", "", "clothing", 5, None)
        .await
        .expect("create donation");

    let status = lifecycle::transition_donation(&pool, donation_id, DonationAction::Accept, ngo_id)
        .await
        .expect("accept");
    assert_eq!(status, DonationStatus::Accepted);

    let donation = db::get_donation(&pool, donation_id)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.status, DonationStatus::Accepted);
    assert_eq!(donation.ngo_id, Some(ngo_id));

    let err = lifecycle::transition_donation(&pool, donation_id, DonationAction::Accept, ngo_id)
        .await
        .expect_err("second accept");
    assert!(matches!(err, AppError::InvalidState { entity: "donation", .. }));

    let donation = db::get_donation(&pool, donation_id)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.status, DonationStatus::Accepted);
}

#[tokio::test]
async fn declined_donation_is_terminal() {
    let pool = test_pool();
    let (donor_id, ngo_id) = seed_donor_and_ngo(&pool).await;
    let donation_id = db::create_donation(&pool, donor_id, "Old router", "", "electronics", 1, None)
        .await
        .expect("create donation");

    let status = lifecycle::transition_donation(&pool, donation_id, DonationAction::Decline, ngo_id)
        .await
        .expect("decline");
    assert_eq!(status, DonationStatus::Cancelled);

    for action in [DonationAction::Accept, DonationAction::Decline, DonationAction::Deliver] {
        let err = lifecycle::transition_donation(&pool, donation_id, action, ngo_id)
            .await
            .expect_err("transition out of cancelled");
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    let donation = db::get_donation(&pool, donation_id)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.status, DonationStatus::Cancelled);
}

#[tokio::test]
async fn deliver_requires_accepted_and_closes_the_match() {
    let pool = test_pool();
    let (donor_id, ngo_id) = seed_donor_and_ngo(&pool).await;
    let donation_id = db::create_donation(&pool, donor_id, "Rice bags", "", "food", 20, None)
        .await
        .expect("create donation");

    // Straight to deliver from pending is illegal.
    let err = lifecycle::transition_donation(&pool, donation_id, DonationAction::Deliver, ngo_id)
        .await
        .expect_err("deliver from pending");
    assert!(matches!(err, AppError::InvalidState { .. }));

    let outcome = matching::match_donation(&pool, donation_id).await.expect("match");
    assert_eq!(outcome.ngo_id, Some(ngo_id));

    let status = lifecycle::transition_donation(&pool, donation_id, DonationAction::Deliver, ngo_id)
        .await
        .expect("deliver");
    assert_eq!(status, DonationStatus::Delivered);

    let m = db::find_match_by_donation(&pool, donation_id)
        .await
        .expect("query match")
        .expect("match row exists");
    assert_eq!(m.status, MatchStatus::Delivered);
    assert!(m.delivered_at.is_some());

    // Delivered is terminal.
    let err = lifecycle::transition_donation(&pool, donation_id, DonationAction::Deliver, ngo_id)
        .await
        .expect_err("deliver twice");
    assert!(matches!(err, AppError::InvalidState { .. }));
}

#[tokio::test]
async fn request_lifecycle_follows_the_machine() {
    let pool = test_pool();
    let (_, ngo_id) = seed_donor_and_ngo(&pool).await;
    let recipient_id = db::create_recipient(
        &pool,
        "Rae",
        "rae@example.org",
        "",
        3,
        Urgency::High,
        "",
        "Springfield",
        "",
        "",
    )
    .await
    .expect("create recipient");
    let request_id =
        db::create_request(&pool, recipient_id, "School supplies", "", "education", Urgency::High)
            .await
            .expect("create request");

    let err = lifecycle::transition_request(&pool, request_id, RequestAction::Fulfill, ngo_id)
        .await
        .expect_err("fulfill from pending");
    assert!(matches!(err, AppError::InvalidState { entity: "request", .. }));

    let status = lifecycle::transition_request(&pool, request_id, RequestAction::Accept, ngo_id)
        .await
        .expect("accept");
    assert_eq!(status, RequestStatus::Accepted);

    let request = db::get_request(&pool, request_id)
        .await
        .expect("get request")
        .expect("request exists");
    assert_eq!(request.ngo_id, Some(ngo_id));

    let status = lifecycle::transition_request(&pool, request_id, RequestAction::Fulfill, ngo_id)
        .await
        .expect("fulfill");
    assert_eq!(status, RequestStatus::Fulfilled);

    for action in [RequestAction::Accept, RequestAction::Decline, RequestAction::Fulfill] {
        let err = lifecycle::transition_request(&pool, request_id, action, ngo_id)
            .await
            .expect_err("transition out of fulfilled");
        assert!(matches!(err, AppError::InvalidState { .. }));
    }
}

#[tokio::test]
async fn unregistered_actor_is_refused() {
    let pool = test_pool();
    let (donor_id, _) = seed_donor_and_ngo(&pool).await;
    let donation_id = db::create_donation(&pool, donor_id, "Chairs", "", "furniture", 4, None)
        .await
        .expect("create donation");

    let err = lifecycle::transition_donation(&pool, donation_id, DonationAction::Accept, 9999)
        .await
        .expect_err("unknown ngo");
    assert!(matches!(err, AppError::Authorization(_)));

    let donation = db::get_donation(&pool, donation_id)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.status, DonationStatus::Pending);
    assert_eq!(donation.ngo_id, None);
}

#[tokio::test]
async fn missing_entities_report_not_found() {
    let pool = test_pool();
    let (_, ngo_id) = seed_donor_and_ngo(&pool).await;

    let err = lifecycle::transition_donation(&pool, 404, DonationAction::Accept, ngo_id)
        .await
        .expect_err("missing donation");
    assert!(matches!(err, AppError::NotFound { entity: "donation", id: 404 }));

    let err = lifecycle::transition_request(&pool, 404, RequestAction::Accept, ngo_id)
        .await
        .expect_err("missing request");
    assert!(matches!(err, AppError::NotFound { entity: "request", id: 404 }));
}

#[tokio::test]
async fn owner_edits_are_pending_only() {
    let pool = test_pool();
    let (donor_id, ngo_id) = seed_donor_and_ngo(&pool).await;
    let donation_id = db::create_donation(&pool, donor_id, "Desk", "", "furniture", 1, None)
        .await
        .expect("create donation");

    let updated = db::update_donation(
        &pool,
        donor_id,
        donation_id,
        Some("Standing desk"),
        None,
        None,
        Some(2),
    )
    .await
    .expect("update pending");
    assert!(updated);

    // A stranger cannot edit someone else's donation.
    let foreign = db::update_donation(&pool, donor_id + 1, donation_id, Some("Hijack"), None, None, None)
        .await
        .expect("foreign update");
    assert!(!foreign);

    lifecycle::transition_donation(&pool, donation_id, DonationAction::Accept, ngo_id)
        .await
        .expect("accept");

    let updated = db::update_donation(&pool, donor_id, donation_id, Some("Too late"), None, None, None)
        .await
        .expect("update accepted");
    assert!(!updated);

    let deleted = db::delete_donation(&pool, donor_id, donation_id).await.expect("delete accepted");
    assert!(!deleted);

    let donation = db::get_donation(&pool, donation_id)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.title, "Standing desk");
    assert_eq!(donation.quantity, 2);
}
