//! Thin demonstration CLI over the `rapio_grid` library (spec
//! `[AMBIENT] §10`): read/dump/convert, built with the same `clap` 3.x
//! `App`/`Arg` builder the teacher's `arg_parse` uses. Contains no domain
//! logic beyond argument parsing and calling into the library.

use clap::{App, AppSettings, Arg};

use rapio_grid::config::{init_logging, parse_log_level};
use rapio_grid::io;
use rapio_grid::Keys;

fn main() {
    let matches = App::new("rapio-cli")
        .version("0.1.0")
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(Arg::new("input").short('i').long("input").takes_value(true).required(true).help("Input file to read"))
        .arg(Arg::new("output").short('o').long("output").takes_value(true).help("Output file; converts if given"))
        .arg(Arg::new("dump").short('d').long("dump").help("Dump the read DataType as text to stdout"))
        .arg(Arg::new("log").long("log").takes_value(true).help("Log level (trace/debug/info/warn/error)"))
        .get_matches();

    let level = matches.value_of("log").map(parse_log_level).unwrap_or(tracing::Level::INFO);
    init_logging(level);

    let input = matches.value_of("input").unwrap();
    let keys = Keys::new();

    let dt = match io::read(input, &keys) {
        Ok(Some(dt)) => dt,
        Ok(None) => {
            eprintln!("could not read '{}' (unrecognized format or read failure, see log)", input);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("fatal error reading '{}': {}", input, e);
            std::process::exit(1);
        }
    };

    println!("read '{}': DataType={}", input, dt.data_type_tag());
    for member in dt.members() {
        if let Some(grid) = member.as_grid() {
            println!("  {} dims={:?}", grid.type_name(), grid.dims().iter().map(|d| (d.name.clone(), d.size)).collect::<Vec<_>>());
        }
    }

    if matches.is_present("dump") {
        let mut dump_keys = Keys::new();
        dump_keys.insert("console".to_string(), "true".to_string());
        if let Err(e) = rapio_grid::io::text::write_text(&dt, &dump_keys) {
            eprintln!("dump failed: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(output) = matches.value_of("output") {
        let mut dt = dt;
        match io::write(&mut dt, output, &keys) {
            Ok(true) => println!("wrote '{}'", output),
            Ok(false) => {
                eprintln!("could not write '{}' (see log)", output);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("fatal error writing '{}': {}", output, e);
                std::process::exit(1);
            }
        }
    }
}
