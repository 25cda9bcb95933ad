//! Command line interface.

use crate::config::Config;
use crate::global;
use crate::store::StoreSerializer;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "callscribe", about = "Desktop meeting recorder service")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// List persisted meeting records
    Meetings {
        /// Maximum records to show per list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// Print upcoming and past meeting records from the persisted document.
pub async fn handle_meetings_command(limit: usize) -> Result<()> {
    let config = Config::load()?;
    let store = StoreSerializer::new(global::meetings_file()?, &config.store);
    let doc = store.read().await;

    println!("Upcoming meetings:");
    for record in doc.upcoming_meetings.iter().take(limit) {
        print_record(record);
    }

    println!("Past meetings:");
    for record in doc.past_meetings.iter().take(limit) {
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &crate::store::MeetingRecord) {
    let recording = match &record.recording_id {
        Some(id) => format!(" [recording {id}]"),
        None => String::new(),
    };
    println!(
        "  {} - {}{} ({} transcript lines, {} participants)",
        record.id,
        record.title,
        recording,
        record.transcript.len(),
        record.participants.len(),
    );
}
