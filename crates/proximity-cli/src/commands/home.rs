use clap::Subcommand;
use proximity_core::tracker::ReplaySource;
use proximity_core::{Dispatcher, Event, HomeStore, LocationTracker, Monitor};

#[derive(Subcommand)]
pub enum HomeAction {
    /// Geocode an address and make the best match home
    Set {
        /// Free-text address
        address: String,
    },
    /// Print the stored home as JSON
    Show,
    /// Forget the stored home
    Clear,
}

pub async fn run(action: HomeAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();
    // No tracking here; an empty source keeps the monitor idle.
    let mut monitor = Monitor::restore(
        config.geocoder()?,
        LocationTracker::new(ReplaySource::new(Vec::new()), config.location_request()),
        HomeStore::open()?,
        config.evaluator(),
        Dispatcher::new(config.vibration()),
    );

    match action {
        HomeAction::Set { address } => {
            if let Event::HomeSet { home, .. } = monitor.submit_address(&address).await? {
                eprintln!("Home set: {}", home.display_name);
                println!("{}", serde_json::to_string_pretty(&home)?);
            }
        }
        HomeAction::Show => match monitor.store().load_home()? {
            Some(home) => println!("{}", serde_json::to_string_pretty(&home)?),
            None => {
                eprintln!("no home set");
                std::process::exit(1);
            }
        },
        HomeAction::Clear => {
            monitor.clear_home()?;
            println!("home cleared");
        }
    }
    Ok(())
}
