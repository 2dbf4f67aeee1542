use bl_wavetables::{GeneratorConfig, WtCreator};

use flexi_logger::{Logger, opt_format};
use log::info;

use std::error::Error;
use std::fs;

/// Generate the band-limited tables and write them as JSON.
///
/// Usage: gen_tables [config.json] [output.json]
///
/// Without a config file the default parameters are used, without an output
/// file the tables are printed to stdout.
fn main() -> Result<(), Box<dyn Error>> {
    // Start as "RUST_LOG=debug gen_tables" to show zone details
    Logger::with_env_or_str("bl_wavetables=info, gen_tables=info")
                            .format(opt_format)
                            .start()?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(filename) => GeneratorConfig::from_file(&filename)?,
        None => GeneratorConfig::default(),
    };

    let tables = WtCreator::generate(&config)?;
    for entry in tables.resource_index() {
        info!("{} = {} ({} values, storage {})", entry.constant, entry.index, entry.size, entry.storage);
    }
    info!("{} tables, {} distinct", tables.len(), tables.unique_tables().len());

    let json = tables.to_json()?;
    match args.next() {
        Some(filename) => {
            info!("Writing tables to [{}]", filename);
            fs::write(&filename, json)?;
        }
        None => println!("{}", json),
    }
    Ok(())
}
