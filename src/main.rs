//! SegmentForge: customer tier segmentation CLI
//!
//! This is the main entrypoint that orchestrates data generation, labeling,
//! model training, evaluation, visualization and scenario simulation.

use anyhow::Result;
use clap::Parser;
use segmentforge::{channel_for, viz, Args, Session};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if args.verbose && !args.json {
        println!("SegmentForge - Customer Tier Segmentation");
        println!("=========================================\n");
    }

    let mut session = Session::new(args.pipeline_config())?;

    if let Some(values) = args.parse_predict()? {
        run_prediction_mode(&args, &mut session, values)?;
    } else if let Some(values) = args.parse_simulate()? {
        run_simulation_mode(&args, &session, values)?;
    } else {
        run_full_pipeline(&args, &mut session)?;
    }

    Ok(())
}

/// Classify a single customer with the trained model
fn run_prediction_mode(args: &Args, session: &mut Session, values: (f64, f64)) -> Result<()> {
    println!("=== Prediction Mode ===");
    println!("Input: income={}, investment={}", values.0, values.1);

    let start_time = Instant::now();
    let model = session.classifier()?;
    let tier = model.predict(values.0, values.1)?;
    let elapsed = start_time.elapsed();

    println!("\n✓ Predicted tier: {}", tier);
    println!("  Recommended channel: {}", channel_for(tier));
    if args.verbose {
        println!("  Processing time: {:.2}s", elapsed.as_secs_f64());
    }

    let report = session.evaluation()?;
    println!("  Model accuracy on held-out data: {:.2}%", report.accuracy * 100.0);

    Ok(())
}

/// Classify a hypothetical customer with the rule engine and plot it in context
fn run_simulation_mode(args: &Args, session: &Session, values: (f64, f64)) -> Result<()> {
    println!("=== Simulation Mode ===");

    let simulation = session.simulate(values.0, values.1);
    println!(
        "Income={:.2}, investment={:.2}",
        simulation.income, simulation.investment
    );
    println!("\n✓ Tier:    {}", simulation.tier);
    println!("  Channel: {}", simulation.channel);

    if !args.no_plots {
        let dataset = session.dataset().filter(&args.filter()?);
        viz::create_segment_visualization(
            &dataset,
            Some(&simulation),
            &args.output,
            Some("Simulated Customer in Context"),
        )?;
    }

    Ok(())
}

/// Run the full labeling, training and reporting pipeline
fn run_full_pipeline(args: &Args, session: &mut Session) -> Result<()> {
    let filter = args.filter()?;
    let dataset = session.dataset().filter(&filter);

    // JSON mode keeps stdout to a single document; charts are still logged
    if args.json {
        println!("{}", session.evaluation_json()?);
        if !args.no_plots && !dataset.is_empty() {
            viz::generate_visualization_report(&dataset, session.classifier()?, &args.output)?;
        }
        return Ok(());
    }

    println!("=== Full Segmentation Pipeline ===\n");

    let start_time = Instant::now();

    // Step 1: Generated and labeled dataset
    println!(
        "✓ Data generated: {} customers ({} after filters)",
        session.dataset().len(),
        dataset.len()
    );
    if args.verbose {
        println!("  Seed: {}", args.seed);
        println!("  Filters: {:?}", filter);
        println!("{}", dataset.to_dataframe()?.head(Some(5)));
    }

    // Step 2: Train and evaluate on the full dataset
    let model_start = Instant::now();
    let report = session.evaluation()?.clone();
    let model_time = model_start.elapsed();

    println!("✓ Model trained and evaluated");
    if args.verbose {
        println!("  Training time: {:.2}s", model_time.as_secs_f64());
    }
    viz::print_model_report(session.classifier()?, &report);

    // Step 3: Charts and statistics for the filtered view
    viz::print_segment_statistics(&dataset)?;
    if args.no_plots {
        // nothing to write
    } else if dataset.is_empty() {
        println!("\nNo customers match the filters; skipping charts");
    } else {
        let viz_start = Instant::now();
        viz::generate_visualization_report(&dataset, session.classifier()?, &args.output)?;
        println!("\n✓ Visualizations generated from base path: {}", args.output);
        if args.verbose {
            println!("  Visualization time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}
