//! parkmon main entrypoint.

use parkmon::run;
use parkmon::ui::messages::error;

fn main() {
    if let Err(e) = run() {
        error(format!("Error: {}", e));
        std::process::exit(1);
    }
}
