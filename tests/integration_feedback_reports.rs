use givebridge::db::models::Urgency;
use givebridge::db::{self, DbPool};
use givebridge::error::AppError;
use givebridge::lifecycle::{self, DonationAction};
use givebridge::matching;
use uuid::Uuid;

fn test_pool() -> DbPool {
    let url = format!("file:itest-{}?mode=memory&cache=shared", Uuid::new_v4());
    db::init_pool_at(&url).expect("init pool")
}

#[tokio::test]
async fn feedback_rating_bounds_and_donation_check() {
    let pool = test_pool();
    let donor_id = db::create_donor(&pool, "Dana", "dana@example.org", "", "", "Springfield", "", "")
        .await
        .expect("create donor");
    let donation_id = db::create_donation(&pool, donor_id, "Toys", "", "other", 6, None)
        .await
        .expect("create donation");

    for rating in [1, 5] {
        db::create_feedback(&pool, donor_id, Some(donation_id), rating, "great")
            .await
            .expect("boundary rating accepted");
    }

    for rating in [0, 6] {
        let err = db::create_feedback(&pool, donor_id, Some(donation_id), rating, "")
            .await
            .expect_err("out of range rating");
        assert!(matches!(err, AppError::Validation { field: "rating", .. }));
    }

    let err = db::create_feedback(&pool, donor_id, Some(9999), 3, "")
        .await
        .expect_err("feedback on missing donation");
    assert!(matches!(err, AppError::NotFound { entity: "donation", id: 9999 }));

    // Feedback without a donation reference is fine.
    db::create_feedback(&pool, donor_id, None, 4, "smooth process")
        .await
        .expect("feedback without donation");

    let all = db::list_feedback(&pool).await.expect("list feedback");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn duplicate_profile_email_is_a_validation_failure() {
    let pool = test_pool();
    db::create_donor(&pool, "Dana", "dana@example.org", "", "", "Springfield", "", "")
        .await
        .expect("first registration");

    let err = db::create_donor(&pool, "Dana Again", "dana@example.org", "", "", "Shelbyville", "", "")
        .await
        .expect_err("duplicate email");
    assert!(matches!(err, AppError::Validation { field: "email", .. }));

    let err = db::create_ngo(&pool, "No Domain", "not-an-email", "", "", "", "", "", "")
        .await
        .expect_err("malformed email");
    assert!(matches!(err, AppError::Validation { field: "email", .. }));
}

#[tokio::test]
async fn summary_counts_follow_the_flow() {
    let pool = test_pool();
    let donor_id = db::create_donor(&pool, "Dana", "dana@example.org", "", "", "Springfield", "", "")
        .await
        .expect("create donor");
    db::create_ngo(&pool, "Harvest Hope", "hope@springfield.org", "", "", "", "Springfield", "", "")
        .await
        .expect("create ngo");
    for (name, email, city) in [
        ("Rae", "rae@example.org", "Springfield"),
        ("Remy", "remy@example.org", "Springfield"),
        ("Rita", "rita@example.org", "Shelbyville"),
    ] {
        db::create_recipient(&pool, name, email, "", 2, Urgency::Medium, "", city, "", "")
            .await
            .expect("create recipient");
    }

    let delivered = db::create_donation(&pool, donor_id, "Rice bags", "", "food", 20, None)
        .await
        .expect("create donation");
    let pending = db::create_donation(&pool, donor_id, "Lamps", "", "furniture", 2, None)
        .await
        .expect("create donation");

    let outcome = matching::match_donation(&pool, delivered).await.expect("match");
    let ngo_id = outcome.ngo_id.expect("matched ngo");
    lifecycle::transition_donation(&pool, delivered, DonationAction::Deliver, ngo_id)
        .await
        .expect("deliver");

    let counts = db::donation_status_counts(&pool).await.expect("donation counts");
    assert!(counts.contains(&("delivered".to_string(), 1)));
    assert!(counts.contains(&("pending".to_string(), 1)));

    assert_eq!(db::delivered_match_count(&pool).await.expect("delivered matches"), 1);

    let cities = db::top_recipient_cities(&pool, 5).await.expect("top cities");
    assert_eq!(cities[0], ("Springfield".to_string(), 2));
    assert_eq!(cities[1], ("Shelbyville".to_string(), 1));

    // The untouched donation still shows up as pending.
    let donation = db::get_donation(&pool, pending)
        .await
        .expect("get donation")
        .expect("donation exists");
    assert_eq!(donation.status.as_str(), "pending");
}
