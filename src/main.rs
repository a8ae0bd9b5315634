//! Thin CLI over the intake pipeline and profile store.
//!
//! ```text
//! voicesmith intake <file> <name> [language]   process a sample, store a profile
//! voicesmith inspect <file>                    process a sample, print the report
//! voicesmith list                              list stored profiles
//! voicesmith delete <voice_id>                 remove a profile
//! ```
//!
//! Storage root comes from `VOICESMITH_STORAGE` (default `storage`).

use std::path::PathBuf;
use std::process::ExitCode;

use voicesmith::config::PipelineConfig;
use voicesmith::intake::IntakePipeline;
use voicesmith::profile::{ProfileStore, VoiceProfile};

fn storage_root() -> PathBuf {
    std::env::var_os("VOICESMITH_STORAGE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("storage"))
}

fn usage() -> ExitCode {
    eprintln!("usage: voicesmith <intake|inspect|list|delete> ...");
    eprintln!("  intake <file> <name> [language]");
    eprintln!("  inspect <file>");
    eprintln!("  list");
    eprintln!("  delete <voice_id>");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("intake") if args.len() >= 3 => {
            intake(&args[1], &args[2], args.get(3).map(String::as_str))
        }
        Some("inspect") if args.len() == 2 => inspect(&args[1]),
        Some("list") if args.len() == 1 => list(),
        Some("delete") if args.len() == 2 => delete(&args[1]),
        _ => return usage(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn pipeline() -> Result<IntakePipeline, Box<dyn std::error::Error>> {
    let config = PipelineConfig::default();
    config.validate()?;
    Ok(IntakePipeline::new(config))
}

fn intake(file: &str, name: &str, language: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let sample = pipeline()?.process(&bytes)?;

    let profile = VoiceProfile::new(
        uuid::Uuid::new_v4().to_string(),
        name.to_string(),
        None,
        language.unwrap_or("en").to_string(),
        sample.duration,
        sample.quality.composite,
        sample.buffer.sample_rate,
    );

    let store = ProfileStore::new(&storage_root())?;
    store.save(&profile, &sample.buffer)?;

    println!("voice_id: {}", profile.voice_id);
    println!("duration: {:.2}s", sample.duration);
    println!("quality:  {:.2}", sample.quality.composite);
    Ok(())
}

fn inspect(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let sample = pipeline()?.process(&bytes)?;
    let q = &sample.quality;

    println!("duration:      {:.2}s", sample.duration);
    println!("sample_rate:   {}", sample.buffer.sample_rate);
    println!("clarity:       {:.2}", q.clarity);
    println!("dynamic_range: {:.2}", q.dynamic_range);
    println!("rolloff:       {:.2}", q.rolloff);
    println!("articulation:  {:.2}", q.articulation);
    println!("harmonicity:   {:.2}", q.harmonicity);
    println!("composite:     {:.2}", q.composite);
    if let Some(reason) = q.degraded {
        println!("degraded:      {:?}", reason);
    }
    Ok(())
}

fn list() -> Result<(), Box<dyn std::error::Error>> {
    let store = ProfileStore::new(&storage_root())?;
    let profiles = store.list()?;
    if profiles.is_empty() {
        println!("no voice profiles stored");
        return Ok(());
    }
    for p in profiles {
        println!(
            "{}  {:<20} {}  {:.2}s  q={:.2}",
            p.voice_id, p.name, p.language, p.sample_duration, p.quality_score
        );
    }
    Ok(())
}

fn delete(voice_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = ProfileStore::new(&storage_root())?;
    store.delete(voice_id)?;
    println!("deleted {}", voice_id);
    Ok(())
}
