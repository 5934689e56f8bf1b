//! One-shot progress view against the running daemon.

use cadence_core::{DaemonClient, Panel};

pub fn run(json: bool) -> Result<(), String> {
    let client = DaemonClient::from_env().map_err(String::from)?;
    let snapshot = client.fetch().map_err(String::from)?;
    let panel = Panel::build(&snapshot);
    if json {
        let rendered = serde_json::to_string_pretty(&panel)
            .map_err(|err| format!("Failed to render panel: {}", err))?;
        println!("{}", rendered);
    } else {
        print!("{}", panel.render());
    }
    Ok(())
}
