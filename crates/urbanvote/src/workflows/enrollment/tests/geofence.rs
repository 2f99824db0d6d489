use super::common::*;

use crate::workflows::enrollment::draft::EnrollmentCategory;
use crate::workflows::enrollment::steps::StepError;

#[tokio::test]
async fn inside_click_fills_address_from_reverse_lookup() {
    let mut wizard = wizard_at(1.0, 1.0);
    wizard
        .place_marker(5.0, 5.0)
        .await
        .expect("point inside the square");

    let address = &wizard.draft().address;
    assert_eq!(address.within_perimeter, Some(true));
    assert_eq!(address.street, "Avenida do Estado");
    assert_eq!(address.postal_code, "04214-000");
}

#[tokio::test]
async fn outside_click_clears_text_but_keeps_the_marker() {
    let mut wizard = wizard_at(1.0, 1.0);
    *wizard.draft_mut() = crate::workflows::enrollment::draft::EnrollmentDraft {
        category: Some(EnrollmentCategory::Resident),
        address: valid_address_at(1.0, 1.0),
        ..Default::default()
    };

    let error = wizard
        .place_marker(50.0, 50.0)
        .await
        .expect_err("point far outside");
    assert!(matches!(error, StepError::OutsidePerimeter));

    let address = &wizard.draft().address;
    assert_eq!(address.within_perimeter, Some(false));
    assert!(address.street.is_empty());
    assert!(address.neighborhood.is_empty());
    assert!(address.city.is_empty());
    assert!(address.state.is_empty());
    assert!(address.postal_code.is_empty());

    let marker = address.coordinate.expect("marker survives the rejection");
    assert_eq!(marker.latitude, 50.0);
    assert_eq!(marker.longitude, 50.0);
}

#[tokio::test]
async fn address_predicate_clears_fields_on_geofence_rejection() {
    let mut wizard = wizard_at(1.0, 1.0);
    let draft = wizard.draft_mut();
    draft.category = Some(EnrollmentCategory::Resident);
    draft.address = valid_address_at(50.0, 50.0);

    wizard.advance().await.expect("category passes");
    let error = wizard.advance().await.expect_err("outside the perimeter");
    assert!(matches!(error, StepError::OutsidePerimeter));

    // Stale out-of-area text never survives; the coordinate does.
    assert!(!wizard.draft().address.has_required_text_fields());
    assert!(wizard.draft().address.coordinate.is_some());
    assert_eq!(wizard.state().current(), 1);
    assert!(!wizard.state().is_completed(1));
}

#[tokio::test]
async fn address_predicate_accepts_inside_coordinate() {
    let mut wizard = wizard_at(1.0, 1.0);
    let draft = wizard.draft_mut();
    draft.category = Some(EnrollmentCategory::Resident);
    draft.address = valid_address_at(1.0, 1.0);

    wizard.advance().await.expect("category passes");
    wizard.advance().await.expect("address inside the square");
    assert!(wizard.state().is_completed(1));
    assert_eq!(wizard.state().current(), 2);
    assert_eq!(wizard.draft().address.within_perimeter, Some(true));
}
