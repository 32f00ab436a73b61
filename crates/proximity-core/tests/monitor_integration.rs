//! End-to-end tests for the monitor: geocode, persist, track, alert.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proximity_core::error::{GeocodeError, PersistenceError, ValidationError};
use proximity_core::monitor::{EvaluatorState, Notification, Presentation};
use proximity_core::tracker::{ChannelSource, ReplaySource};
use proximity_core::{
    AlertSink, AlertState, CoreError, Dispatcher, Event, GeoPoint, Geocoder, HomeStore, LocationRequest,
    LocationSample, LocationTracker, Monitor, NominatimGeocoder, ProximityEvaluator,
};

/// Geocoder that always answers with the same candidates.
struct StaticGeocoder(Vec<GeoPoint>);

impl Geocoder for StaticGeocoder {
    async fn lookup(&self, address: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
        if self.0.is_empty() {
            return Err(GeocodeError::NotFound {
                address: address.to_string(),
                reason: "empty result".into(),
            });
        }
        Ok(self.0.clone())
    }
}

#[derive(Clone, Default)]
struct CountingSink {
    raised: Arc<Mutex<u32>>,
    cleared: Arc<Mutex<u32>>,
}

impl AlertSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }
    fn alert_raised(&mut self, _: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        *self.raised.lock().unwrap() += 1;
        Ok(())
    }
    fn alert_cleared(&mut self, _: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }
}

fn origin_geocoder() -> StaticGeocoder {
    StaticGeocoder(vec![
        GeoPoint::new(0.0, 0.0, "Null Island"),
        GeoPoint::new(5.0, 5.0, "Somewhere else"),
    ])
}

fn replay(samples: Vec<LocationSample>) -> LocationTracker<ReplaySource> {
    LocationTracker::new(
        ReplaySource::new(samples).with_pace(Duration::ZERO),
        LocationRequest::default(),
    )
}

/// Hold an exclusive lock on the database until the connection is dropped.
fn lock_store(path: &Path) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch("BEGIN EXCLUSIVE").unwrap();
    conn
}

fn alert_events(events: &[Event]) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| matches!(e, Event::AlertRaised { .. } | Event::AlertCleared { .. }))
        .collect()
}

#[tokio::test]
async fn raise_clear_cycle_is_edge_triggered() {
    let sink = CountingSink::default();
    let samples = vec![
        LocationSample::now(0.01, 0.0),
        LocationSample::now(0.02, 0.0),
        LocationSample::now(0.001, 0.0),
        LocationSample::now(0.0005, 0.0),
    ];
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        replay(samples),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default().with_sink(Box::new(sink.clone())),
    );

    let home_event = monitor.submit_address("Null Island").await.unwrap();
    assert!(matches!(home_event, Event::HomeSet { ref home, .. } if home.display_name == "Null Island"));

    monitor.start_tracking().unwrap();
    let mut events = Vec::new();
    monitor.run(|e| events.push(e.clone())).await;

    let alerts = alert_events(&events);
    assert_eq!(alerts.len(), 2);
    assert!(matches!(alerts[0], Event::AlertRaised { distance_m, .. } if *distance_m > 1000.0));
    assert!(matches!(alerts[1], Event::AlertCleared { .. }));
    assert_eq!(*sink.raised.lock().unwrap(), 1);
    assert_eq!(*sink.cleared.lock().unwrap(), 1);
    assert_eq!(monitor.session().alert_state(), AlertState::Near);
    assert!(matches!(events.last(), Some(Event::TrackingStopped { .. })));
}

#[tokio::test]
async fn samples_before_home_never_alert() {
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        replay(vec![LocationSample::now(40.0, 40.0)]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.start_tracking().unwrap();
    let events = monitor.next_events().await.unwrap();
    assert!(matches!(
        events.as_slice(),
        [Event::SampleRecorded { distance_m: None, state: None, .. }]
    ));
    assert!(monitor.session().last_sample().is_some());
}

#[tokio::test]
async fn invalid_sample_is_reported_and_ignored() {
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        replay(vec![]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.submit_address("x").await.unwrap();
    monitor.process_sample(LocationSample::now(0.01, 0.0));
    let state = monitor.session().state();

    let events = monitor.process_sample(LocationSample::now(f64::NAN, 0.0));
    assert!(matches!(events.as_slice(), [Event::SampleRejected { .. }]));
    assert_eq!(monitor.session().state(), state);
    assert_eq!(monitor.session().last_sample().unwrap().latitude, 0.01);
}

#[tokio::test]
async fn home_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proximity.db");
    let original = GeoPoint::new(51.507_351, -0.127_758, "London");

    {
        let mut monitor = Monitor::restore(
            StaticGeocoder(vec![original.clone()]),
            replay(vec![]),
            HomeStore::open_at(&path).unwrap(),
            ProximityEvaluator::default(),
            Dispatcher::default(),
        );
        monitor.submit_address("London").await.unwrap();
    }

    let monitor = Monitor::restore(
        StaticGeocoder(vec![]),
        replay(vec![]),
        HomeStore::open_at(&path).unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    let home = monitor.session().home().unwrap();
    assert_eq!(home.display_name, "London");
    assert!((home.latitude - original.latitude).abs() < 1e-5);
    assert!((home.longitude - original.longitude).abs() < 1e-5);
}

#[tokio::test]
async fn failed_lookup_keeps_previous_home() {
    let mut monitor = Monitor::restore(
        StaticGeocoder(vec![]),
        replay(vec![]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor
        .apply_home(GeoPoint::new(1.0, 2.0, "kept"))
        .unwrap();
    assert!(monitor.submit_address("nowhere").await.is_err());
    assert_eq!(monitor.session().home().unwrap().display_name, "kept");
}

#[tokio::test]
async fn permission_denied_clears_tracking_flag() {
    let store = HomeStore::open_memory().unwrap();
    store.set_tracking_requested(true).unwrap();
    let tracker = LocationTracker::new(
        ReplaySource::new(vec![]).with_permission(false),
        LocationRequest::default(),
    );
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        tracker,
        store,
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    assert!(monitor.tracking_requested());
    assert!(monitor.start_tracking().is_err());
    assert!(!monitor.tracking_requested());
    assert!(!monitor.session().tracking_active());
}

#[tokio::test]
async fn background_promotion_and_stop() {
    let (source, feed) = ChannelSource::new();
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        LocationTracker::new(source, LocationRequest::default()),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.submit_address("home").await.unwrap();
    monitor.start_tracking().unwrap();
    assert!(monitor.tracking_requested());

    let promoted = monitor.detach_observer().unwrap();
    assert!(matches!(
        promoted,
        Event::PresentationChanged { presentation: Presentation::Foreground, .. }
    ));

    assert!(feed.push(LocationSample::now(0.05, 0.0)));
    let events = monitor.next_events().await.unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::AlertRaised { .. })));

    let events = monitor.stop_tracking().await.unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PresentationChanged { presentation: Presentation::Hidden, .. }
    )));
    assert!(!feed.is_subscribed());
    assert!(!feed.push(LocationSample::now(0.0, 0.0)));
    assert!(monitor.next_events().await.is_none());
    assert!(!monitor.tracking_requested());
}

#[tokio::test]
async fn nominatim_empty_result_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search/Nowhere")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let geocoder = NominatimGeocoder::new(
        &format!("{}/search", server.url()),
        Duration::from_secs(5),
        "proximity-test",
    )
    .unwrap();
    let mut monitor = Monitor::restore(
        geocoder,
        replay(vec![]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );

    let err = monitor.submit_address("Nowhere").await.unwrap_err();
    assert!(matches!(err, CoreError::Geocode(GeocodeError::NotFound { .. })));
    assert!(monitor.session().home().is_none());
}

#[tokio::test]
async fn failed_flag_write_leaves_tracking_off_and_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proximity.db");
    let (source, feed) = ChannelSource::new();
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        LocationTracker::new(source, LocationRequest::default()),
        HomeStore::open_at(&path).unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.submit_address("home").await.unwrap();

    let lock = lock_store(&path);
    let err = monitor.start_tracking().unwrap_err();
    assert!(matches!(err, CoreError::Persistence(PersistenceError::Locked)));
    assert!(!feed.is_subscribed());
    assert!(!monitor.session().tracking_active());
    assert!(!feed.push(LocationSample::now(0.05, 0.0)));
    assert!(monitor.next_events().await.is_none());

    drop(lock);
    monitor.start_tracking().unwrap();
    assert!(feed.is_subscribed());
    assert!(monitor.tracking_requested());
}

#[tokio::test]
async fn failed_flag_write_still_stops_and_dismisses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proximity.db");
    let (source, feed) = ChannelSource::new();
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        LocationTracker::new(source, LocationRequest::default()),
        HomeStore::open_at(&path).unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.start_tracking().unwrap();
    monitor.detach_observer();
    assert_eq!(monitor.dispatcher().presentation(), Presentation::Foreground);

    let lock = lock_store(&path);
    let err = monitor.stop_tracking().await.unwrap_err();
    assert!(matches!(err, CoreError::Persistence(PersistenceError::Locked)));
    assert!(!feed.is_subscribed());
    assert!(!monitor.session().tracking_active());
    assert_eq!(monitor.dispatcher().presentation(), Presentation::Hidden);

    drop(lock);
    assert!(monitor.tracking_requested());
    monitor.stop_tracking().await.unwrap();
    assert!(!monitor.tracking_requested());
}

#[tokio::test]
async fn unmeasurable_home_is_rejected() {
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        replay(vec![]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.submit_address("home").await.unwrap();

    let err = monitor
        .apply_home(GeoPoint::new(f64::NAN, 0.0, "bad"))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::InvalidHome { .. })
    ));
    assert_eq!(monitor.session().home().unwrap().display_name, "Null Island");
    assert_eq!(
        monitor.store().load_home().unwrap().unwrap().display_name,
        "Null Island"
    );

    let events = monitor.process_sample(LocationSample::now(45.0, 90.0));
    assert!(events.iter().any(|e| matches!(e, Event::AlertRaised { .. })));
}

#[tokio::test]
async fn seed_is_shown_but_never_evaluated() {
    let seed = LocationSample::now(10.0, 10.0);
    let tracker = LocationTracker::new(
        ReplaySource::new(vec![LocationSample::now(0.001, 0.0)])
            .with_pace(Duration::ZERO)
            .with_last_known(seed),
        LocationRequest::default(),
    );
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        tracker,
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.submit_address("home").await.unwrap();

    assert_eq!(monitor.last_known(), Some(seed));
    assert_eq!(monitor.session().state(), EvaluatorState::Uninitialized);
    assert!(monitor.session().last_sample().is_none());

    monitor.start_tracking().unwrap();
    let mut events = Vec::new();
    monitor.run(|e| events.push(e.clone())).await;
    assert!(alert_events(&events).is_empty());
    assert_eq!(monitor.session().last_sample().unwrap().latitude, 0.001);
}

#[tokio::test]
async fn exhausted_source_hides_ongoing_notification() {
    let mut monitor = Monitor::restore(
        origin_geocoder(),
        replay(vec![LocationSample::now(0.001, 0.0)]),
        HomeStore::open_memory().unwrap(),
        ProximityEvaluator::default(),
        Dispatcher::default(),
    );
    monitor.start_tracking().unwrap();
    monitor.detach_observer();
    assert_eq!(monitor.dispatcher().presentation(), Presentation::Foreground);

    let mut events = Vec::new();
    monitor.run(|e| events.push(e.clone())).await;
    assert!(matches!(
        events.last(),
        Some(Event::PresentationChanged { presentation: Presentation::Hidden, .. })
    ));
    // Exhaustion keeps the persisted request.
    assert!(monitor.tracking_requested());
}
