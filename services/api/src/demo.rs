use crate::infra::{CannedGeocoder, InMemoryEnrollmentRegistry};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use urbanvote::error::AppError;
use urbanvote::workflows::enrollment::debounce::Debouncer;
use urbanvote::workflows::enrollment::geocode::ForwardGeocoder;
use urbanvote::workflows::enrollment::draft::{
    Declarations, EnrollmentCategory, FileSelection, Gender, PersonalData,
};
use urbanvote::workflows::enrollment::perimeter::{Coordinate, Perimeter};
use urbanvote::workflows::enrollment::service::EnrollmentService;
use urbanvote::workflows::enrollment::steps::EnrollmentWizard;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional KML file describing the enrollment perimeter.
    /// Defaults to the built-in service-area boundary.
    #[arg(long)]
    pub(crate) kml: Option<PathBuf>,
    /// Latitude of the demo map click (defaults to the perimeter center)
    #[arg(long)]
    pub(crate) latitude: Option<f64>,
    /// Longitude of the demo map click (defaults to the perimeter center)
    #[arg(long)]
    pub(crate) longitude: Option<f64>,
    /// Skip the submission and status-query portion of the demo
    #[arg(long)]
    pub(crate) skip_submission: bool,
}

#[derive(Args, Debug)]
pub(crate) struct GeofenceCheckArgs {
    /// Latitude of the coordinate to check
    #[arg(long)]
    pub(crate) latitude: f64,
    /// Longitude of the coordinate to check
    #[arg(long)]
    pub(crate) longitude: f64,
    /// Optional KML file describing the enrollment perimeter
    #[arg(long)]
    pub(crate) kml: Option<PathBuf>,
}

fn demo_personal() -> PersonalData {
    PersonalData {
        full_name: "Maria da Silva".to_string(),
        social_name: None,
        phone: "(11) 91234-5678".to_string(),
        gender: Some(Gender::Female),
        email: "Maria@Example.com".to_string(),
        national_id: "529.982.247-25".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 4, 12),
        employer: None,
    }
}

fn demo_document() -> FileSelection {
    FileSelection {
        name: "document-front.jpg".to_string(),
        size_bytes: 2 * 1024 * 1024,
        content_type: "image/jpeg".to_string(),
    }
}

fn demo_declarations() -> Declarations {
    Declarations {
        identity: true,
        voting: true,
        document: true,
        authorization: true,
        truthfulness: true,
    }
}

/// Replays `keystrokes` against a debounced street autocomplete and
/// returns how many lookups actually reached the geocoder.
async fn debounced_street_lookups(
    geocoder: Arc<CannedGeocoder>,
    keystrokes: &[&str],
) -> usize {
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut autocomplete = Debouncer::new(Duration::from_millis(40));

    for keystroke in keystrokes {
        let geocoder = geocoder.clone();
        let lookups = lookups.clone();
        let query = keystroke.to_string();
        autocomplete.spawn(async move {
            if geocoder.search(&query).await.is_ok() {
                lookups.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    tokio::time::sleep(Duration::from_millis(120)).await;
    lookups.load(Ordering::SeqCst)
}

fn load_perimeter(kml: Option<PathBuf>) -> Result<Perimeter, AppError> {
    match kml {
        Some(path) => Ok(Perimeter::from_kml_file(&path)?),
        None => Ok(Perimeter::standard()),
    }
}

pub(crate) fn run_geofence_check(args: GeofenceCheckArgs) -> Result<(), AppError> {
    let GeofenceCheckArgs {
        latitude,
        longitude,
        kml,
    } = args;

    let perimeter = load_perimeter(kml)?;
    let bounds = perimeter.bounds();
    let verdict = if perimeter.contains(latitude, longitude) {
        "inside"
    } else {
        "outside"
    };

    println!("Coordinate ({latitude}, {longitude}) is {verdict} the enrollment perimeter");
    println!(
        "Perimeter bounds: lat [{:.4}, {:.4}] lon [{:.4}, {:.4}]",
        bounds.min_latitude, bounds.max_latitude, bounds.min_longitude, bounds.max_longitude
    );
    let center = bounds.center();
    println!("Center: ({:.4}, {:.4})", center.latitude, center.longitude);

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        kml,
        latitude,
        longitude,
        skip_submission,
    } = args;

    println!("Voter enrollment demo");

    let perimeter = Arc::new(load_perimeter(kml)?);
    let bounds = perimeter.bounds();
    let center = bounds.center();
    let marker = Coordinate {
        latitude: latitude.unwrap_or(center.latitude),
        longitude: longitude.unwrap_or(center.longitude),
    };

    let geocoder = Arc::new(CannedGeocoder::anchored_at(marker));
    let mut wizard = EnrollmentWizard::new(perimeter.clone(), geocoder.clone());

    println!("\nStep 1: category selection");
    wizard.draft_mut().category = Some(EnrollmentCategory::Resident);
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }
    println!("  - Enrolling as: {}", EnrollmentCategory::Resident.label());

    println!("\nStep 2: address and geofence");
    let keystrokes = ["Av", "Avenida", "Avenida do Estado"];
    let lookups = debounced_street_lookups(geocoder.clone(), &keystrokes).await;
    println!(
        "  - Street autocomplete: {} keystrokes, {} geocoder lookup(s)",
        keystrokes.len(),
        lookups
    );

    let outside = Coordinate {
        latitude: bounds.max_latitude + 1.0,
        longitude: bounds.max_longitude + 1.0,
    };
    match wizard.place_marker(outside.latitude, outside.longitude).await {
        Ok(()) => println!("  Unexpectedly accepted an outside click"),
        Err(err) => println!(
            "  - Click at ({:.4}, {:.4}) rejected: {err}",
            outside.latitude, outside.longitude
        ),
    }
    println!(
        "  - Street field after rejection: {:?}",
        wizard.draft().address.street
    );

    if let Err(err) = wizard.place_marker(marker.latitude, marker.longitude).await {
        println!("  Marker placement failed: {err}");
        return Ok(());
    }
    println!(
        "  - Click at ({:.4}, {:.4}) accepted; address filled from reverse lookup",
        marker.latitude, marker.longitude
    );
    println!(
        "  - {} | {} | {} - {}",
        wizard.draft().address.street,
        wizard.draft().address.neighborhood,
        wizard.draft().address.city,
        wizard.draft().address.state
    );
    wizard.draft_mut().address.number = Some("1200".to_string());
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }

    println!("\nStep 3: personal data");
    wizard.draft_mut().personal = demo_personal();
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }
    println!("  - Applicant: Maria da Silva");

    println!("\nStep 4: documents");
    wizard.draft_mut().files.push(demo_document());
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }
    println!("  - 1 document attached");

    println!("\nStep 5: review");
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }

    println!("\nStep 6: declarations");
    wizard.draft_mut().declarations = demo_declarations();
    println!("  - Ready to submit: {}", wizard.ready_to_submit());
    if let Err(err) = wizard.advance().await {
        println!("  Step rejected: {err}");
        return Ok(());
    }

    if skip_submission {
        return Ok(());
    }

    println!("\nSubmission");
    let registry = Arc::new(InMemoryEnrollmentRegistry::default());
    let service = EnrollmentService::new(registry, perimeter);
    let record = match service.submit(wizard.into_draft()) {
        Ok(record) => record,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "  - Stored enrollment {} -> status {}",
        record.draft.personal.national_id,
        record.status.label()
    );

    match service.status_by_national_id(&record.draft.personal.national_id) {
        Ok(Some(view)) => match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("  Public status payload:\n{json}"),
            Err(err) => println!("  Public status payload unavailable: {err}"),
        },
        Ok(None) => println!("  Status lookup returned no record"),
        Err(err) => println!("  Status lookup failed: {err}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The demo fixtures must carry a wizard from the first step all the
    /// way to a stored enrollment; a fixture missing a required field
    /// should fail here, not abort the scripted walkthrough at runtime.
    #[tokio::test]
    async fn demo_fixtures_complete_the_enrollment_walk() {
        let perimeter = Arc::new(Perimeter::standard());
        let center = perimeter.bounds().center();
        let geocoder = Arc::new(CannedGeocoder::anchored_at(center));
        let mut wizard = EnrollmentWizard::new(perimeter.clone(), geocoder);

        wizard.draft_mut().category = Some(EnrollmentCategory::Resident);
        wizard.advance().await.expect("category step");

        wizard
            .place_marker(center.latitude, center.longitude)
            .await
            .expect("center marker is inside the boundary");
        wizard.draft_mut().address.number = Some("1200".to_string());
        wizard.advance().await.expect("address step");

        wizard.draft_mut().personal = demo_personal();
        wizard.advance().await.expect("personal data step");

        wizard.draft_mut().files.push(demo_document());
        wizard.advance().await.expect("documents step");

        wizard.advance().await.expect("review step");

        wizard.draft_mut().declarations = demo_declarations();
        wizard.advance().await.expect("declarations step");
        assert!(wizard.ready_to_submit());

        let registry = Arc::new(InMemoryEnrollmentRegistry::default());
        let service = EnrollmentService::new(registry, perimeter);
        let record = service
            .submit(wizard.into_draft())
            .expect("submission accepted");
        assert_eq!(record.draft.personal.national_id, "52998224725");
    }

    #[tokio::test]
    async fn autocomplete_coalesces_rapid_keystrokes_into_one_lookup() {
        let center = Perimeter::standard().bounds().center();
        let geocoder = Arc::new(CannedGeocoder::anchored_at(center));
        let lookups =
            debounced_street_lookups(geocoder, &["Av", "Avenida", "Avenida do Estado"]).await;
        assert_eq!(lookups, 1);
    }
}
