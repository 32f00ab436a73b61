use proximity_core::monitor::{distance_text, EvaluatorState};
use proximity_core::{HomeStore, LocationSample};
use serde_json::json;

pub fn run(latitude: f64, longitude: f64) -> Result<(), Box<dyn std::error::Error>> {
    let store = HomeStore::open()?;
    let home = store
        .load_home()?
        .ok_or("no home set; run `proximity-cli home set <address>` first")?;

    let evaluator = super::load_config().evaluator();
    let sample = LocationSample::now(latitude, longitude);
    let transition = evaluator.evaluate(Some(&home), EvaluatorState::Uninitialized, &sample)?;

    let output = json!({
        "home": home,
        "distance_m": transition.distance_m,
        "threshold_m": evaluator.threshold_m(),
        "state": transition.state.alert_state(),
        "text": distance_text(transition.distance_m),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
