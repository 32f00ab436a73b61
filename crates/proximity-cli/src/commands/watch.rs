use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use proximity_core::monitor::LogSink;
use proximity_core::tracker::ReplaySource;
use proximity_core::{
    distance_m, Dispatcher, Event, HomeStore, LocationSample, LocationTracker, Monitor,
};

use crate::sink::TerminalSink;

#[derive(Args)]
pub struct WatchArgs {
    /// JSON array of {latitude, longitude, timestamp?} records to replay
    #[arg(long)]
    pub samples: PathBuf,
    /// Milliseconds between samples (defaults to the fastest update interval)
    #[arg(long)]
    pub pace_ms: Option<u64>,
    /// Run without an attached observer; alerts use an ongoing notification
    #[arg(long)]
    pub background: bool,
    /// Cached position shown before the first update; never alerts
    #[arg(
        long,
        num_args = 2,
        value_names = ["LAT", "LON"],
        allow_hyphen_values = true
    )]
    pub last_known: Option<Vec<f64>>,
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "could not serialize event"),
    }
}

pub async fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();

    let mut source = ReplaySource::from_json_file(&args.samples)?;
    if let Some(ms) = args.pace_ms {
        source = source.with_pace(Duration::from_millis(ms));
    }
    if source.is_empty() {
        return Err(format!("no samples in {}", args.samples.display()).into());
    }
    if let Some([latitude, longitude]) = args.last_known.as_deref() {
        let seed = LocationSample::now(*latitude, *longitude);
        seed.validate()?;
        source = source.with_last_known(seed);
    }

    let dispatcher = Dispatcher::new(config.vibration())
        .with_sink(Box::new(LogSink))
        .with_sink(Box::new(TerminalSink));
    let mut monitor = Monitor::restore(
        config.geocoder()?,
        LocationTracker::new(source, config.location_request()),
        HomeStore::open()?,
        config.evaluator(),
        dispatcher,
    );

    if monitor.session().home().is_none() {
        eprintln!("no home set; samples are recorded but never alert");
    }
    if let Some(seed) = monitor.last_known() {
        print_event(&Event::SampleRecorded {
            sample: seed,
            distance_m: monitor.session().home().map(|home| distance_m(home, &seed)),
            state: None,
        });
    }

    for event in monitor.start_tracking()? {
        print_event(&event);
    }
    if args.background {
        if let Some(event) = monitor.detach_observer() {
            print_event(&event);
        }
    }

    monitor.run(print_event).await;
    Ok(())
}
