use clap::Parser;
use track_aligner::cli::commands::{Cli, Commands};
use track_aligner::utils::reporting::Reporter;
use track_aligner::{
    assign_offsets, bench, AlignOutcome, Aligner, CancellationToken, FingerprintConfig,
    MatchConfig, ProgressEvent, ProgressMonitor, TrackImporter,
};

fn main() {
    env_logger::init();

    // Configure thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
        .unwrap();

    println!("Initialized with {} threads", rayon::current_num_threads());

    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            inputs,
            output,
            window_size,
            hop_size,
            bucket_width,
            min_votes,
            min_similarity,
            dry_run,
        } => {
            println!("=== Starting Track Alignment ===");
            println!("Scanning directories:");
            for dir in &inputs {
                println!("  - {}", dir.display());
            }
            println!("Window/hop: {}/{} samples", window_size, hop_size);
            println!("Offset bucket width: {}s", bucket_width);
            println!("Dry run mode: {}", dry_run);

            println!("\nScanning and decoding audio files...");
            let (mut tracks, import_failures) = TrackImporter::import_tracks(&inputs);
            for (path, error) in &import_failures {
                eprintln!("  Could not import {}: {}", path.display(), error);
            }
            println!("\nImported {} tracks", tracks.len());
            if tracks.len() < 2 {
                println!("Need at least two tracks to align.");
                return;
            }

            let monitor = ProgressMonitor::new();
            let events = monitor.subscribe();
            let printer = std::thread::spawn(move || {
                let mut last_percent = -1i32;
                for event in events {
                    match event {
                        ProgressEvent::Started => println!("Processing started"),
                        ProgressEvent::Progress(p) => {
                            let percent = p as i32;
                            if percent != last_percent {
                                println!("Progress: {:.1}%", p);
                                last_percent = percent;
                            }
                        }
                        ProgressEvent::Finished => println!("Processing finished"),
                    }
                }
            });

            let fingerprint_config = FingerprintConfig {
                window_size,
                hop_size,
                ..FingerprintConfig::default()
            };
            let match_config = MatchConfig {
                bucket_width_secs: bucket_width,
                min_votes,
            };
            let cancel = CancellationToken::new();
            let aligner = Aligner::new(fingerprint_config, match_config, monitor.clone(), cancel);

            println!("\nAnalyzing for shared content...");
            let outcome = aligner.align(&tracks);

            // Release the listener channel so the printer thread ends.
            drop(aligner);
            drop(monitor);
            if printer.join().is_err() {
                eprintln!("Progress printer thread panicked");
            }

            let result = match outcome {
                AlignOutcome::Cancelled => {
                    println!("\nAlignment cancelled.");
                    return;
                }
                AlignOutcome::Complete(result) => result,
            };

            for failure in &result.failures {
                eprintln!(
                    "  Track {} failed during analysis: {}",
                    failure.track, failure.error
                );
            }

            let matches: Vec<_> = result
                .matches
                .iter()
                .filter(|m| m.similarity >= min_similarity)
                .cloned()
                .collect();

            println!("\nFound {} matches", matches.len());
            for m in &matches {
                let name = |id: usize| {
                    tracks
                        .iter()
                        .find(|t| t.id == id)
                        .map(|t| t.name.as_str())
                        .unwrap_or("?")
                };
                println!(
                    "  {} @ {:.2}s  <->  {} @ {:.2}s  (similarity {:.3})",
                    name(m.track1),
                    m.track1_time,
                    name(m.track2),
                    m.track2_time,
                    m.similarity
                );
            }

            if matches.is_empty() {
                println!("No shared content detected.");
                return;
            }

            println!("\nAssigning timeline offsets...");
            assign_offsets(&mut tracks, &matches);
            for track in &tracks {
                match track.offset_secs {
                    Some(offset) => println!("  {}: {:+.3}s", track.name, offset),
                    None => println!("  {}: unaligned (no evidence)", track.name),
                }
            }

            if dry_run {
                println!("\nDry run - no report written");
            } else {
                println!("\nGenerating report...");
                let reporter = Reporter::new();
                match reporter.generate_match_report(&tracks, &matches, &output) {
                    Ok(_) => println!("Report saved to: {}", output.display()),
                    Err(e) => eprintln!("Error generating report: {}", e),
                }
            }

            println!("\n=== Track Alignment Complete ===");
        }

        Commands::Bench { input, output } => {
            println!("=== Starting Fingerprint Benchmark ===");
            println!("Scanning directory: {}", input.display());

            let (tracks, import_failures) = TrackImporter::import_tracks(&[input]);
            for (path, error) in &import_failures {
                eprintln!("  Could not import {}: {}", path.display(), error);
            }
            println!("\nImported {} tracks", tracks.len());
            if tracks.is_empty() {
                println!("No audio files found to benchmark.");
                return;
            }

            let variants = bench::default_variants();
            println!("Running {} variants per track...", variants.len());
            let entries = bench::run_benchmark(&tracks, &variants);

            for entry in &entries {
                println!(
                    "  {} / {}: {} hashes in {:.3}s",
                    entry.track,
                    entry.variant,
                    entry.hash_count,
                    entry.elapsed.as_secs_f64()
                );
            }

            println!("\nGenerating report...");
            let reporter = Reporter::new();
            match reporter.generate_benchmark_report(&entries, &output) {
                Ok(_) => println!("Report saved to: {}", output.display()),
                Err(e) => eprintln!("Error generating report: {}", e),
            }

            println!("\n=== Fingerprint Benchmark Complete ===");
        }
    }
}
