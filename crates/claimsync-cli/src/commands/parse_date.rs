//! Parse-date command - show how a date expression normalizes.

use claimsync::{Temporal, TemporalParser};
use colored::Colorize;

pub fn run(text: String, century: Option<i32>, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parser = match century {
        Some(century) => TemporalParser::new().with_century(century),
        None => TemporalParser::new(),
    };

    let temporal = match parser.parse(&text) {
        Ok(temporal) => temporal,
        Err(failure) => {
            println!("{} {}", "Unparsed:".yellow().bold(), failure);
            return Ok(());
        }
    };

    println!("{} {}", "Parsed:".green().bold(), temporal);
    match temporal {
        Temporal::Point(value) => {
            println!("  {} {} ({})", "value".dimmed(), value.year, value.precision.label());
        }
        Temporal::Interval(interval) => {
            println!("  {} {}", "earliest".dimmed(), interval.start.year);
            println!("  {} {}", "latest".dimmed(), interval.end.year);
        }
    }
    if temporal.is_circa() {
        println!("  {} circa", "sourcing".dimmed());
    }

    if verbose {
        println!("{}", serde_json::to_string_pretty(&temporal)?);
    }
    Ok(())
}
