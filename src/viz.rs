//! Chart rendering with Plotters and console statistics

use plotters::prelude::*;

use crate::data::LabeledDataset;
use crate::model::{EvaluationReport, Feature, TrainedModel};
use crate::rules::Tier;
use crate::session::Simulation;

/// Tier palette, indexed in tier order
const TIER_COLORS: [RGBColor; 4] = [
    RGBColor(0xCC, 0x09, 0x2F),
    RGBColor(0x00, 0x5F, 0xAB),
    RGBColor(0x87, 0xBB, 0xA2),
    RGBColor(0x5C, 0xA4, 0xA9),
];

fn tier_color(tier: Tier) -> RGBColor {
    match tier {
        Tier::TierI => TIER_COLORS[0],
        Tier::TierII => TIER_COLORS[1],
        Tier::TierIII => TIER_COLORS[2],
        Tier::TierIV => TIER_COLORS[3],
        Tier::Undefined => BLACK,
    }
}

/// Scatter plot of income against investment, coloured by tier
///
/// # Arguments
/// * `dataset` - Labeled customers to plot
/// * `simulation` - Optional simulated customer drawn as a highlighted marker
/// * `output_path` - Path to save the PNG plot
/// * `plot_title` - Title for the plot
pub fn create_segment_visualization(
    dataset: &LabeledDataset,
    simulation: Option<&Simulation>,
    output_path: &str,
    plot_title: Option<&str>,
) -> anyhow::Result<()> {
    let title = plot_title.unwrap_or("Customer Tiers: Income vs Investment");

    let points = dataset
        .iter()
        .map(|r| (r.customer.income, r.customer.investment))
        .chain(simulation.map(|s| (s.income, s.investment)));
    let (max_income, max_investment) = points.fold((0.0f64, 0.0f64), |(mx, my), (x, y)| {
        (mx.max(x), my.max(y))
    });
    if dataset.is_empty() && simulation.is_none() {
        anyhow::bail!("Nothing to plot: dataset is empty");
    }

    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0f64..(max_income * 1.05).max(1.0), 0f64..(max_investment * 1.05).max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("Monthly income")
        .y_desc("Investment balance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for tier in Tier::ALL {
        let color = tier_color(tier);
        let tier_points: Vec<(f64, f64)> = dataset
            .iter()
            .filter(|r| r.tier == tier)
            .map(|r| (r.customer.income, r.customer.investment))
            .collect();
        if tier_points.is_empty() {
            continue;
        }

        chart
            .draw_series(
                tier_points
                    .into_iter()
                    .map(|point| Circle::new(point, 3, color.filled())),
            )?
            .label(tier.name())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    if let Some(sim) = simulation {
        chart
            .draw_series(std::iter::once(Circle::new(
                (sim.income, sim.investment),
                9,
                RED.stroke_width(3),
            )))?
            .label(format!("Simulated ({} / {})", sim.tier, sim.channel))
            .legend(|(x, y)| Circle::new((x, y), 5, RED.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    log::info!("Segment visualization saved to: {}", output_path);

    Ok(())
}

/// Bar chart of customers per tier
pub fn create_tier_size_chart(dataset: &LabeledDataset, output_path: &str) -> anyhow::Result<()> {
    let means = dataset.tier_means()?;
    let names: Vec<&'static str> = means.iter().map(|m| m.tier.name()).collect();
    let max_size = means.iter().map(|m| m.customers).max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customers per Tier", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(names.len() as f64 - 0.5), 0f64..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .x_labels(names.len().max(1))
        .x_label_formatter(&|x| {
            names
                .get(x.round().max(0.0) as usize)
                .map(|name| name.to_string())
                .unwrap_or_default()
        })
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, m) in means.iter().enumerate() {
        let color = tier_color(m.tier);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, m.customers as f64)],
            color.filled(),
        )))?;
    }

    root.present()?;
    log::info!("Tier size chart saved to: {}", output_path);

    Ok(())
}

/// Side-by-side bars of mean income and mean investment per tier
pub fn create_tier_means_chart(dataset: &LabeledDataset, output_path: &str) -> anyhow::Result<()> {
    let means = dataset.tier_means()?;
    if means.is_empty() {
        anyhow::bail!("Nothing to plot: dataset is empty");
    }

    let root = BitMapBackend::new(output_path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(500);

    let panels = [
        (&left, "Mean Monthly Income", means.iter().map(|m| m.mean_income).collect::<Vec<_>>()),
        (&right, "Mean Investment", means.iter().map(|m| m.mean_investment).collect::<Vec<_>>()),
    ];
    let names: Vec<&'static str> = means.iter().map(|m| m.tier.name()).collect();

    for (area, title, values) in panels {
        let max_value = values.iter().cloned().fold(0.0f64, f64::max).max(1.0);
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 22))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(names.len() as f64 - 0.5), 0f64..(max_value * 1.1))?;

        chart
            .configure_mesh()
            .x_labels(names.len())
            .x_label_formatter(&|x| {
                names
                    .get(x.round().max(0.0) as usize)
                    .map(|name| name.to_string())
                    .unwrap_or_default()
            })
            .draw()?;

        for (i, (m, value)) in means.iter().zip(values.iter()).enumerate() {
            chart.draw_series(std::iter::once(Rectangle::new(
                [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, *value)],
                tier_color(m.tier).filled(),
            )))?;
        }
    }

    root.present()?;
    log::info!("Tier means chart saved to: {}", output_path);

    Ok(())
}

/// Bar chart of decision-tree feature importances
pub fn create_feature_importance_chart(
    importance: &[(Feature, f64)],
    output_path: &str,
) -> anyhow::Result<()> {
    let names: Vec<&'static str> = importance.iter().map(|(f, _)| f.name()).collect();

    let root = BitMapBackend::new(output_path, (600, 300)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(names.len() as f64 - 0.5), 0f64..1.05f64)?;

    chart
        .configure_mesh()
        .x_labels(names.len().max(1))
        .x_label_formatter(&|x| {
            names
                .get(x.round().max(0.0) as usize)
                .map(|name| name.to_string())
                .unwrap_or_default()
        })
        .y_desc("Importance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (_, value)) in importance.iter().enumerate() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, *value)],
            TIER_COLORS[i % TIER_COLORS.len()].filled(),
        )))?;
    }

    root.present()?;
    log::info!("Feature importance chart saved to: {}", output_path);

    Ok(())
}

/// Print headline figures and per-tier means to console
pub fn print_segment_statistics(dataset: &LabeledDataset) -> anyhow::Result<()> {
    let summary = dataset.summary();
    println!("\n=== Segment Statistics ===");
    println!("Total customers: {}", summary.customers);
    println!("Branch channel:  {}", summary.branch);
    println!("Digital channel: {}", summary.digital);
    println!("Mean investment: {:.2}", summary.mean_investment);

    if dataset.is_empty() {
        return Ok(());
    }

    println!("\n  Tier      | Customers | Mean income | Mean investment");
    println!("  ----------|-----------|-------------|----------------");
    for m in dataset.tier_means()? {
        let share = m.customers as f64 / summary.customers as f64 * 100.0;
        println!(
            "  {:9} | {:4} ({:4.1}%) | {:11.2} | {:15.2}",
            m.tier.name(),
            m.customers,
            share,
            m.mean_income,
            m.mean_investment
        );
    }
    Ok(())
}

/// Print the tree shape, evaluation report, confusion matrix and rules
pub fn print_model_report(model: &TrainedModel<Tier>, report: &EvaluationReport<Tier>) {
    println!("\n=== Decision Tree ===");
    println!("Depth: {}  Leaves: {}", model.depth(), model.leaves());
    for (feature, value) in model.feature_importance() {
        println!("  importance[{}] = {:.3}", feature, value);
    }

    println!("\n=== Evaluation ===");
    println!("Accuracy: {:.2}%", report.accuracy * 100.0);
    println!("\n{}", report);

    let classes = model.encoder().classes();
    println!("Confusion matrix (rows = actual, columns = predicted):");
    print!("  {:>10}", "");
    for class in classes {
        print!(" {:>9}", class.name());
    }
    println!();
    for (class, row) in classes.iter().zip(report.confusion.outer_iter()) {
        print!("  {:>10}", class.name());
        for count in row.iter() {
            print!(" {:>9}", count);
        }
        println!();
    }

    println!("\n=== Decision Rules ===");
    print!("{}", report.rules);
}

/// Write every chart derived from one base path
pub fn generate_visualization_report(
    dataset: &LabeledDataset,
    model: &TrainedModel<Tier>,
    base_output_path: &str,
) -> anyhow::Result<()> {
    create_segment_visualization(dataset, None, base_output_path, None)?;

    let size_chart_path = base_output_path.replace(".png", "_sizes.png");
    create_tier_size_chart(dataset, &size_chart_path)?;

    let means_chart_path = base_output_path.replace(".png", "_means.png");
    create_tier_means_chart(dataset, &means_chart_path)?;

    let importance_path = base_output_path.replace(".png", "_importance.png");
    create_feature_importance_chart(&model.feature_importance(), &importance_path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::session::Session;
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_session() -> Session {
        Session::new(PipelineConfig {
            records: 200,
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_segment_visualization() {
        let session = create_test_session();
        let sim = session.simulate(6000.0, 75_000.0);
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("test_plot.png");
        let output_str = output_path.to_str().unwrap();

        let result = create_segment_visualization(session.dataset(), Some(&sim), output_str, None);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("empty.png");
        let result = create_segment_visualization(
            &LabeledDataset::default(),
            None,
            output_path.to_str().unwrap(),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_create_tier_size_chart() {
        let session = create_test_session();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("test_sizes.png");
        let output_str = output_path.to_str().unwrap();

        let result = create_tier_size_chart(session.dataset(), output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_generate_visualization_report() {
        let mut session = create_test_session();
        session.classifier().unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("test_report.png");
        let output_str = output_path.to_str().unwrap();

        let dataset = session.dataset().clone();
        let model = session.classifier().unwrap();
        let result = generate_visualization_report(&dataset, model, output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
        assert!(temp_dir.path().join("test_report_sizes.png").exists());
        assert!(temp_dir.path().join("test_report_means.png").exists());
        assert!(temp_dir.path().join("test_report_importance.png").exists());
    }

    #[test]
    fn test_create_tier_means_chart() {
        let session = create_test_session();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("test_means.png");
        let output_str = output_path.to_str().unwrap();

        let result = create_tier_means_chart(session.dataset(), output_str);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());

        let empty_path = temp_dir.path().join("empty_means.png");
        let result = create_tier_means_chart(&LabeledDataset::default(), empty_path.to_str().unwrap());
        assert!(result.is_err());
    }
}
