//! # autosort CLI
//!
//! Command-line front end for the download sorter.
//!
//! ## Usage
//! ```bash
//! autosort watch
//! autosort history --count 10
//! ```

mod cli;

use autosort::Result;

fn main() -> Result<()> {
    autosort::init_tracing();
    cli::run()
}
