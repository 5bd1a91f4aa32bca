//! Prints the structure and the first samples of an MDF file.
//!
//! Run with: `cargo run --example read_file -- recording.mf4`

use mdf_rs::{MdfReader, Result, create_channel_observer_for_channel_group};

fn main() -> Result<()> {
    env_logger::init();
    let path = std::env::args().nth(1).unwrap_or_else(|| "example.mf4".to_string());

    let mut reader = MdfReader::new(&path);
    if !reader.is_ok() {
        eprintln!("{path} is not an MDF file");
        return Ok(());
    }
    reader.read_everything_but_data()?;
    if let Some(file) = reader.file() {
        println!("{path}: MDF {} ({})", file.version(), file.program_id());
        println!("Finalized: {}", file.is_finalized());
    }
    if let Some(header) = reader.header() {
        println!("Author     : {}", header.author());
        println!("Project    : {}", header.project());
        println!("Start time : {} ns", header.start_time());
    }

    for position in 0..reader.data_group_count() {
        reader.read_data(position)?;
        let Some(dg) = reader.data_group(position) else {
            continue;
        };
        println!();
        println!("Data group {position} '{}'", dg.description());
        for cg in dg.channel_groups().iter().filter(|cg| !cg.is_vlsd()) {
            println!("  Channel group '{}': {} samples", cg.name(), cg.nof_samples());
            for observer in create_channel_observer_for_channel_group(dg, cg)? {
                let first: Vec<String> = (0..observer.nof_samples().min(5))
                    .map(|sample| match observer.eng_text(sample) {
                        Some(text) => text,
                        None => "-".to_string(),
                    })
                    .collect();
                println!(
                    "    {} [{}]: {}",
                    observer.name(),
                    observer.unit(),
                    first.join(", ")
                );
            }
        }
    }
    Ok(())
}
